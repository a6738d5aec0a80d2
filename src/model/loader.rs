//! ONNX model loader and feature-schema discovery

use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::info;

/// Metadata key under which gradient-boosting ONNX exports record the
/// training-time feature names, comma-separated.
const FEATURE_NAMES_KEY: &str = "feature_names";

/// Loaded ONNX model with the metadata needed to run it
pub struct LoadedModel {
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the feature tensor
    pub input_name: String,
    /// Output name for probabilities
    pub output_name: String,
    /// Ordered feature names the model was trained on
    pub feature_names: Vec<String>,
}

/// Loader for the serialized classifier artifact
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        // Initialize ONNX Runtime
        ort::init().commit();
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load the classifier from an ONNX file.
    ///
    /// Fails if the artifact is missing, malformed, or does not carry the
    /// feature-name metadata the service needs to validate uploads against.
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();

        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .with_intra_threads(self.onnx_threads)
            .map_err(|e| anyhow::anyhow!("{e}"))?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let feature_names = Self::read_feature_names(&session)
            .context(format!("Model at {:?} has no usable feature schema", path))?;

        // Get input/output names
        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs()
            .iter()
            .find(|o| o.name().contains("prob") || o.name().contains("output"))
            .map(|o| o.name().to_string())
            .unwrap_or_else(|| {
                session
                    .outputs()
                    .last()
                    .map(|o| o.name().to_string())
                    .unwrap_or_else(|| "probabilities".to_string())
            });

        info!(
            input = %input_name,
            output = %output_name,
            features = feature_names.len(),
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            session,
            input_name,
            output_name,
            feature_names,
        })
    }

    /// Read the ordered feature names from the session metadata.
    fn read_feature_names(session: &Session) -> Result<Vec<String>> {
        let metadata = session.metadata()?;
        let raw = metadata
            .custom(FEATURE_NAMES_KEY)
            .with_context(|| format!("missing '{}' metadata entry", FEATURE_NAMES_KEY))?;

        let names: Vec<String> = raw
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        if names.is_empty() {
            anyhow::bail!("'{}' metadata entry is empty", FEATURE_NAMES_KEY);
        }

        Ok(names)
    }
}
