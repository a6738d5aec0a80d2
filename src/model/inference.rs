//! Batch probability inference over the loaded classifier

use crate::model::loader::{LoadedModel, ModelLoader};
use crate::model::Predictor;
use anyhow::{Context, Result};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::path::Path;
use std::sync::RwLock;
use tracing::debug;

/// Process-wide risk model.
///
/// Logically read-only after startup; the ONNX session needs `&mut` to run,
/// so it sits behind an `RwLock` that callers never see.
pub struct RiskModel {
    model: RwLock<LoadedModel>,
    feature_names: Vec<String>,
}

impl RiskModel {
    /// Load the classifier artifact from `path`.
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let loader = ModelLoader::with_threads(onnx_threads)?;
        let model = loader.load_model(path)?;
        let feature_names = model.feature_names.clone();

        Ok(Self {
            model: RwLock::new(model),
            feature_names,
        })
    }

    /// Run one inference pass over a `[rows, features]` tensor.
    fn run_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>> {
        use ort::value::Tensor;

        let num_rows = rows.len();
        let num_features = self.feature_names.len();

        let mut flat = Vec::with_capacity(num_rows * num_features);
        for row in rows {
            anyhow::ensure!(
                row.len() == num_features,
                "Expected {} features per row, got {}",
                num_features,
                row.len()
            );
            flat.extend_from_slice(row);
        }

        let shape = vec![num_rows as i64, num_features as i64];
        let input_tensor =
            Tensor::from_array((shape, flat)).context("Failed to create input tensor")?;

        let mut model = self
            .model
            .write()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let input_name = model.input_name.clone();
        let output_name = model.output_name.clone();

        let outputs = model.session.run(ort::inputs![&input_name => input_tensor])?;

        let probs = extract_probabilities(&outputs, &output_name, num_rows)?;

        anyhow::ensure!(
            probs.len() == num_rows,
            "Model returned {} probabilities for {} rows",
            probs.len(),
            num_rows
        );

        Ok(probs)
    }
}

impl Predictor for RiskModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        sanitize_probabilities(self.run_batch(rows)?)
    }
}

/// Keep the probability contract tight even if the artifact misbehaves:
/// non-finite outputs are an error, out-of-range ones are clamped to [0, 1].
fn sanitize_probabilities(probs: Vec<f64>) -> Result<Vec<f64>> {
    probs
        .into_iter()
        .map(|p| {
            anyhow::ensure!(p.is_finite(), "Model produced a non-finite probability");
            Ok(p.clamp(0.0, 1.0))
        })
        .collect()
}

/// Extract per-row probabilities from the session outputs.
///
/// Handles both tensor outputs (XGBoost-style `[N, 2]` / `[N, 1]`) and
/// seq(map) outputs (CatBoost and LightGBM ONNX exports).
fn extract_probabilities(
    outputs: &ort::session::SessionOutputs,
    output_name: &str,
    num_rows: usize,
) -> Result<Vec<f64>> {
    // First, try the configured probabilities output by name
    if let Some(output) = outputs.get(output_name) {
        if let Some(probs) = try_extract(output, num_rows)? {
            debug!(output = %output_name, rows = num_rows, "Extracted probabilities");
            return Ok(probs);
        }
    }

    // Fallback: iterate all outputs and try extraction, skipping class labels
    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }
        if let Some(probs) = try_extract(&output, num_rows)? {
            debug!(output = %name, rows = num_rows, "Extracted probabilities (fallback)");
            return Ok(probs);
        }
    }

    anyhow::bail!("Could not extract probabilities from model output")
}

fn try_extract(output: &ort::value::DynValue, num_rows: usize) -> Result<Option<Vec<f64>>> {
    // Tensor format first
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        return Ok(Some(probabilities_from_tensor(shape, data, num_rows)?));
    }

    // seq(map(int64, float)) format
    if DynSequenceValueType::can_downcast(&output.dtype()) {
        return Ok(Some(probabilities_from_sequence(output, num_rows)?));
    }

    Ok(None)
}

/// Pull the positive-class probability per row out of a tensor output.
fn probabilities_from_tensor(
    shape: &ort::value::Shape,
    data: &[f32],
    num_rows: usize,
) -> Result<Vec<f64>> {
    let dims: Vec<i64> = shape.iter().copied().collect();

    match dims.as_slice() {
        // [N, num_classes]: positive class is index 1
        [n, c] if *n as usize == num_rows && *c >= 2 => Ok((0..num_rows)
            .map(|i| data[i * *c as usize + 1] as f64)
            .collect()),
        // [N, 1]: already a single probability per row
        [n, 1] if *n as usize == num_rows => {
            Ok(data.iter().take(num_rows).map(|&v| v as f64).collect())
        }
        // [N]: flat probability vector
        [n] if *n as usize == num_rows => {
            Ok(data.iter().take(num_rows).map(|&v| v as f64).collect())
        }
        _ => anyhow::bail!(
            "Unexpected output tensor shape {:?} for {} rows",
            dims,
            num_rows
        ),
    }
}

/// Pull the positive-class probability per row out of a seq(map) output.
fn probabilities_from_sequence(
    output: &ort::value::DynValue,
    num_rows: usize,
) -> Result<Vec<f64>> {
    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    // One map per input row, keyed by class id
    let maps = sequence.try_extract_sequence::<DynMapValueType>()?;
    anyhow::ensure!(
        maps.len() == num_rows,
        "Sequence output has {} entries for {} rows",
        maps.len(),
        num_rows
    );

    let mut probs = Vec::with_capacity(num_rows);
    for map_value in &maps {
        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

        let positive = kv_pairs
            .iter()
            .find(|(class_id, _)| *class_id == 1)
            .map(|(_, prob)| *prob as f64);

        match positive {
            Some(prob) => probs.push(prob),
            None => {
                // Binary classifier with only class 0 reported
                let negative = kv_pairs
                    .iter()
                    .find(|(class_id, _)| *class_id == 0)
                    .map(|(_, prob)| 1.0 - *prob as f64)
                    .context("No class probability found in map output")?;
                probs.push(negative);
            }
        }
    }

    Ok(probs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_probabilities_are_clamped() {
        let probs = sanitize_probabilities(vec![-0.1, 0.5, 1.2]).unwrap();
        assert_eq!(probs, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_nan_probability_is_an_error() {
        let err = sanitize_probabilities(vec![0.5, f64::NAN]).unwrap_err();
        assert!(err.to_string().contains("non-finite probability"));
    }

    #[test]
    fn test_infinite_probability_is_an_error() {
        assert!(sanitize_probabilities(vec![f64::INFINITY]).is_err());
    }
}
