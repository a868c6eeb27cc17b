//! ONNX Runtime backed models
//!
//! Used for models exported from the training pipeline with `skl2onnx`:
//! a `float_input` tensor of shape `[1, n_features]`, a `variable` output
//! for regressors and an int64 `label` output for classifiers.

use crate::error::{ArtifactError, ModelError};
use crate::models::inference::{ModelHandle, ModelOutput};
use crate::types::Target;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Loaded ONNX model with metadata
pub struct OnnxModel {
    name: String,
    /// ONNX Runtime session; `run` needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    target: Target,
}

impl OnnxModel {
    /// Load a model from file with the given intra-op thread count.
    pub fn load<P: AsRef<Path>>(
        path: P,
        name: &str,
        target: Target,
        threads: usize,
    ) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let runtime = |e: ort::Error| ArtifactError::Runtime(e.to_string());

        info!(model = %name, path = %path.display(), threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(runtime)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(runtime)?
            .with_intra_threads(threads)
            .map_err(runtime)?
            .commit_from_file(path)
            .map_err(runtime)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = match target {
            Target::Gpa => session.outputs.first().map(|o| o.name.clone()),
            Target::GradeClass => session
                .outputs
                .iter()
                .find(|o| o.name.contains("label"))
                .or_else(|| session.outputs.first())
                .map(|o| o.name.clone()),
        }
        .ok_or_else(|| ArtifactError::Runtime(format!("model {name} declares no outputs")))?;

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "ONNX model loaded"
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            output_name,
            target,
        })
    }

    fn run(&self, features: &[f64]) -> Result<ModelOutput, ort::Error> {
        let shape = vec![1_i64, features.len() as i64];
        let data: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let input_tensor = Tensor::from_array((shape, data))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ort::Error::new(format!("session lock poisoned: {e}")))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| ort::Error::new(format!("missing output {}", self.output_name)))?;

        let result = match self.target {
            Target::Gpa => {
                let (_, data) = output.try_extract_tensor::<f32>()?;
                let value = data
                    .first()
                    .ok_or_else(|| ort::Error::new("empty regression output"))?;
                ModelOutput::Value(f64::from(*value))
            }
            Target::GradeClass => {
                let (_, data) = output.try_extract_tensor::<i64>()?;
                let label = data
                    .first()
                    .ok_or_else(|| ort::Error::new("empty label output"))?;
                ModelOutput::Label(*label)
            }
        };

        debug!(model = %self.name, output = %result, "ONNX inference complete");
        Ok(result)
    }
}

impl ModelHandle for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    /// Input shapes are checked by the runtime itself.
    fn input_width(&self) -> Option<usize> {
        None
    }

    fn infer(&self, features: &[f64]) -> Result<ModelOutput, ModelError> {
        self.run(features)
            .map_err(|e| ModelError::Backend(e.to_string()))
    }
}

/// Initialize the ONNX Runtime environment once per process.
pub fn init_runtime() -> Result<(), ArtifactError> {
    ort::init()
        .commit()
        .map_err(|e| ArtifactError::Runtime(e.to_string()))?;
    info!("ONNX Runtime initialized");
    Ok(())
}
