//! Parsing and validation of uploaded patient CSVs.
//!
//! An upload is accepted only when its header carries the reserved `id`
//! column plus exactly the feature columns the model was trained on. Column
//! order in the file is free; rows are reordered to the model's schema
//! before inference.

use crate::error::UploadError;
use std::collections::HashSet;

/// Reserved column holding the per-record identifier.
pub const ID_COLUMN: &str = "id";

/// A validated batch of patient records ready for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientBatch {
    ids: Vec<String>,
    rows: Vec<Vec<f32>>,
}

impl PatientBatch {
    /// Parse an uploaded file into a batch, validating it against the
    /// model's feature schema.
    ///
    /// Validation short-circuits in the order the user sees it: filename
    /// extension, UTF-8 decode, CSV structure, `id` column presence, header
    /// uniqueness, feature schema match, then per-cell numeric parsing.
    pub fn parse(filename: &str, bytes: &[u8], schema: &[String]) -> Result<Self, UploadError> {
        if !filename.ends_with(".csv") {
            return Err(UploadError::InvalidExtension);
        }

        let text = std::str::from_utf8(bytes)?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let id_index = headers
            .iter()
            .position(|h| h == ID_COLUMN)
            .ok_or(UploadError::MissingIdColumn)?;

        // A repeated header would silently shadow one column's data
        for (i, header) in headers.iter().enumerate() {
            if headers[..i].contains(header) {
                return Err(UploadError::DuplicateColumn(header.clone()));
            }
        }

        // Map each schema feature to its column in the upload
        let column_indices = resolve_columns(&headers, id_index, schema)?;

        let mut ids = Vec::new();
        let mut rows = Vec::new();

        for (row_number, record) in reader.records().enumerate() {
            let record = record?;

            let id = record
                .get(id_index)
                .unwrap_or_default()
                .to_string();

            let mut row = Vec::with_capacity(schema.len());
            for (feature, &column) in schema.iter().zip(&column_indices) {
                let raw = record.get(column).unwrap_or_default();
                let value: f32 = raw.parse().map_err(|_| UploadError::BadCell {
                    row: row_number + 1,
                    column: feature.clone(),
                    value: raw.to_string(),
                })?;
                if !value.is_finite() {
                    return Err(UploadError::BadCell {
                        row: row_number + 1,
                        column: feature.clone(),
                        value: raw.to_string(),
                    });
                }
                row.push(value);
            }

            ids.push(id);
            rows.push(row);
        }

        Ok(Self { ids, rows })
    }

    /// Record identifiers in upload order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Feature rows in upload order, columns in schema order.
    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the upload contained no data rows.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Resolve each schema feature to its column index in the uploaded header,
/// rejecting uploads whose feature set differs from the schema.
fn resolve_columns(
    headers: &[String],
    id_index: usize,
    schema: &[String],
) -> Result<Vec<usize>, UploadError> {
    let schema_set: HashSet<&str> = schema.iter().map(String::as_str).collect();

    let mut unexpected: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|&(i, h)| i != id_index && !schema_set.contains(h.as_str()))
        .map(|(_, h)| h.clone())
        .collect();

    let mut missing = Vec::new();
    let mut indices = Vec::with_capacity(schema.len());
    for feature in schema {
        match headers
            .iter()
            .enumerate()
            .find(|&(i, h)| i != id_index && h == feature)
        {
            Some((index, _)) => indices.push(index),
            None => missing.push(feature.clone()),
        }
    }

    if !missing.is_empty() || !unexpected.is_empty() {
        missing.sort();
        unexpected.sort();
        return Err(UploadError::SchemaMismatch {
            missing,
            unexpected,
        });
    }

    Ok(indices)
}
