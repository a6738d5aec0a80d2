//! User-visible errors for the upload/predict request path.

use thiserror::Error;

/// Errors raised while validating or processing an uploaded patient CSV.
///
/// Every variant maps to a message rendered back into the upload form;
/// none of them terminate the process or surface as a raw server error.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The uploaded filename does not carry a literal `.csv` extension.
    #[error("Invalid file format: expected a .csv file")]
    InvalidExtension,

    /// The uploaded bytes are not valid UTF-8.
    #[error("File is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    /// The content could not be parsed as CSV with a header row.
    #[error("Failed to parse CSV: {0}")]
    Parse(#[from] csv::Error),

    /// The header row has no column literally named `id`.
    #[error("Missing 'id' column in the uploaded CSV")]
    MissingIdColumn,

    /// The same column name appears more than once in the header.
    #[error("Duplicate column '{0}' in the uploaded CSV")]
    DuplicateColumn(String),

    /// The feature columns do not match the model's schema.
    #[error("CSV columns do not match the model features{}{}",
        fmt_column_list(" (missing: ", .missing),
        fmt_column_list(" (unexpected: ", .unexpected))]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// A feature cell failed to parse as a finite number.
    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    BadCell {
        row: usize,
        column: String,
        value: String,
    },

    /// Model inference failed after validation succeeded.
    #[error("Prediction failed: {0}")]
    Inference(#[from] anyhow::Error),
}

fn fmt_column_list(prefix: &str, columns: &[String]) -> String {
    if columns.is_empty() {
        String::new()
    } else {
        format!("{}{})", prefix, columns.join(", "))
    }
}
