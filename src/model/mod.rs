//! Model loading and inference components

pub mod inference;
pub mod loader;

pub use inference::RiskModel;
pub use loader::ModelLoader;

use anyhow::Result;

/// Seam between the HTTP layer and the inference backend.
///
/// The production implementation is [`RiskModel`] over an ONNX session;
/// tests substitute a deterministic stub.
pub trait Predictor: Send + Sync {
    /// Ordered feature names the model expects, discovered from the artifact.
    fn feature_names(&self) -> &[String];

    /// Compute one probability in [0, 1] per input row.
    ///
    /// Each row must hold the features in `feature_names()` order; the output
    /// preserves row order.
    fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>>;
}
