//! Prediction results and their JSON/CSV renderings.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;

/// One identifier with its predicted risk probability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub id: String,
    pub probability: f64,
}

/// Identifier-keyed prediction results for one upload.
///
/// Entries keep first-seen order; a duplicate identifier overwrites the
/// probability of its earlier occurrence (last-write-wins) without moving it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predictions {
    entries: Vec<Prediction>,
    /// Identifier position index, kept in step with `entries`
    index: HashMap<String, usize>,
}

impl Predictions {
    /// Build results by zipping identifiers with per-row probabilities.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut results = Self::default();
        for (id, probability) in pairs {
            results.insert(id, probability);
        }
        results
    }

    fn insert(&mut self, id: String, probability: f64) {
        match self.index.get(&id) {
            Some(&position) => self.entries[position].probability = probability,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push(Prediction { id, probability });
            }
        }
    }

    /// Entries in first-seen order.
    pub fn entries(&self) -> &[Prediction] {
        &self.entries
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the upload produced no predictions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty-printed JSON object of `{id: probability}`.
    pub fn to_json(&self) -> Result<String> {
        let mut object = serde_json::Map::new();
        for entry in &self.entries {
            object.insert(
                entry.id.clone(),
                serde_json::Value::from(entry.probability),
            );
        }
        serde_json::to_string_pretty(&object).context("Failed to encode results as JSON")
    }

    /// CSV text with header `id,prediction` and one row per identifier.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(["id", "prediction"])
            .context("Failed to write CSV header")?;
        for entry in &self.entries {
            writer
                .write_record([entry.id.as_str(), &entry.probability.to_string()])
                .context("Failed to write CSV row")?;
        }
        let bytes = writer
            .into_inner()
            .context("Failed to flush CSV output")?;
        String::from_utf8(bytes).context("CSV output was not UTF-8")
    }
}
