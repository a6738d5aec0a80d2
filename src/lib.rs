//! Heart Risk API Library
//!
//! A small web service wrapping a pre-trained gradient-boosting classifier.
//! Users upload a CSV of patient records; the service validates it against
//! the model's feature schema, runs batch inference, and renders per-record
//! risk probabilities as an HTML table plus JSON and CSV downloads.

pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod results;
pub mod server;

pub use batch::PatientBatch;
pub use config::AppConfig;
pub use error::UploadError;
pub use model::{Predictor, RiskModel};
pub use results::{Prediction, Predictions};
pub use server::AppState;
