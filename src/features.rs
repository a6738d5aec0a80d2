//! Human-readable feature descriptions for the upload form.
//!
//! Display-only: these labels never influence validation or inference,
//! which follow the schema discovered from the model artifact.

/// Description shown next to each known feature name on the form.
pub const FEATURE_DESCRIPTIONS: &[(&str, &str)] = &[
    ("age", "Age (normalized value from 0 to 1)"),
    ("cholesterol", "Cholesterol (normalized value from 0 to 1)"),
    ("heart_rate", "Heart rate"),
    ("diabetes", "Diabetes (1 - yes, 0 - no)"),
    ("family_history", "Family history of heart disease (1 - yes, 0 - no)"),
    ("smoking", "Smoking (1 - yes, 0 - no)"),
    ("obesity", "Obesity (1 - yes, 0 - no)"),
    ("alcohol_consumption", "Alcohol consumption (1 - yes, 0 - no)"),
    ("exercise_hours_per_week", "Exercise hours per week"),
    ("diet", "Diet type (0 - healthy, 1 - average, 2 - unhealthy)"),
    ("previous_heart_problems", "Previous heart problems (1 - yes, 0 - no)"),
    ("medication_use", "Medication use (1 - yes, 0 - no)"),
    ("stress_level", "Stress level (1 to 10)"),
    ("sedentary_hours_per_day", "Sedentary hours per day"),
    ("bmi", "Body mass index (BMI)"),
    ("triglycerides", "Triglyceride level"),
    ("physical_activity_days_per_week", "Days of physical activity per week"),
    ("sleep_hours_per_day", "Sleep hours per day"),
    ("blood_sugar", "Blood sugar level"),
    ("ck-mb", "CK-MB level"),
    ("troponin", "Troponin level"),
    ("gender", "Gender (1 - male, 0 - female)"),
    ("systolic_blood_pressure", "Systolic blood pressure"),
    ("diastolic_blood_pressure", "Diastolic blood pressure"),
];

/// Look up the display description for a feature name.
pub fn description(feature: &str) -> Option<&'static str> {
    FEATURE_DESCRIPTIONS
        .iter()
        .find(|(name, _)| *name == feature)
        .map(|(_, text)| *text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_feature_description() {
        assert_eq!(description("bmi"), Some("Body mass index (BMI)"));
    }

    #[test]
    fn test_unknown_feature_has_no_description() {
        assert_eq!(description("shoe_size"), None);
    }

    #[test]
    fn test_descriptions_are_unique_per_feature() {
        for (i, (name, _)) in FEATURE_DESCRIPTIONS.iter().enumerate() {
            let duplicate = FEATURE_DESCRIPTIONS
                .iter()
                .skip(i + 1)
                .any(|(other, _)| other == name);
            assert!(!duplicate, "duplicate description for {name}");
        }
    }
}
