//! Startup loading of the fitted artifacts
//!
//! Every failure here is fatal to startup and names the artifact at fault.

use crate::config::ArtifactsConfig;
use crate::error::{Artifact, ArtifactError};
use crate::models::inference::ModelHandle;
use crate::models::native::NativeModelSpec;
use crate::scaler::{ScalerBundle, ScalingParameters};
use crate::schema::{CategoryCodes, FEATURE_COUNT};
use crate::types::Target;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything the service needs, loaded and verified
pub struct LoadedArtifacts {
    pub scaler: ScalingParameters,
    pub category_codes: CategoryCodes,
    pub gpa_model: Box<dyn ModelHandle>,
    pub grade_class_model: Box<dyn ModelHandle>,
}

/// Loader for the scaler bundle and both models
pub struct ArtifactLoader {
    dir: PathBuf,
    /// Number of threads for ONNX inference
    onnx_threads: usize,
    #[cfg(feature = "onnx")]
    onnx_ready: std::cell::Cell<bool>,
}

impl ArtifactLoader {
    /// Create a loader resolving artifact names against `dir`
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            onnx_threads: 1,
            #[cfg(feature = "onnx")]
            onnx_ready: std::cell::Cell::new(false),
        }
    }

    pub fn with_onnx_threads(mut self, threads: usize) -> Self {
        self.onnx_threads = threads.max(1);
        self
    }

    /// Load all three artifacts named in the configuration
    pub fn load_all(&self, config: &ArtifactsConfig) -> Result<LoadedArtifacts, ArtifactError> {
        let (scaler, category_codes) = self.load_scaler(&config.scaler)?;
        let gpa_model = self.load_model(&config.gpa_model, Target::Gpa)?;
        let grade_class_model = self.load_model(&config.grade_class_model, Target::GradeClass)?;

        info!(
            dir = %self.dir.display(),
            gpa_model = gpa_model.name(),
            grade_class_model = grade_class_model.name(),
            "All artifacts loaded"
        );

        Ok(LoadedArtifacts {
            scaler,
            category_codes,
            gpa_model,
            grade_class_model,
        })
    }

    /// Load and verify the scaler bundle
    pub fn load_scaler(
        &self,
        file: &str,
    ) -> Result<(ScalingParameters, CategoryCodes), ArtifactError> {
        let path = self.dir.join(file);
        let bundle: ScalerBundle = read_json(&path, Artifact::Scaler)?;
        let parts = bundle
            .into_parts()
            .map_err(|e| e.in_artifact(Artifact::Scaler, &path))?;

        info!(path = %path.display(), "Scaler loaded");
        Ok(parts)
    }

    /// Load one model, picking the backend from the file extension
    pub fn load_model(
        &self,
        file: &str,
        target: Target,
    ) -> Result<Box<dyn ModelHandle>, ArtifactError> {
        let artifact = match target {
            Target::Gpa => Artifact::GpaModel,
            Target::GradeClass => Artifact::GradeClassModel,
        };
        let path = self.dir.join(file);
        if !path.exists() {
            return Err(ArtifactError::Missing { artifact, path });
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file)
            .to_string();

        let model: Box<dyn ModelHandle> = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                let spec: NativeModelSpec = read_json(&path, artifact)?;
                spec.check_target(target)
                    .map_err(|e| e.in_artifact(artifact, &path))?;
                spec.build(&name)
                    .map_err(|e| e.in_artifact(artifact, &path))?
            }
            #[cfg(feature = "onnx")]
            Some("onnx") => {
                self.ensure_onnx_runtime()?;
                let model = crate::models::onnx::OnnxModel::load(
                    &path,
                    &name,
                    target,
                    self.onnx_threads,
                )
                .map_err(|e| e.in_artifact(artifact, &path))?;
                Box::new(model)
            }
            _ => return Err(ArtifactError::UnsupportedFormat { artifact, path }),
        };

        if let Some(width) = model.input_width() {
            if width != FEATURE_COUNT {
                warn!(
                    model = %name,
                    expected = FEATURE_COUNT,
                    actual = width,
                    "Model input width does not match the feature schema; requests will fail"
                );
            }
        }

        info!(model = %name, target = %target, path = %path.display(), "Model loaded");
        Ok(model)
    }

    #[cfg(feature = "onnx")]
    fn ensure_onnx_runtime(&self) -> Result<(), ArtifactError> {
        if !self.onnx_ready.get() {
            crate::models::onnx::init_runtime()?;
            self.onnx_ready.set(true);
        }
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, artifact: Artifact) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing {
            artifact,
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(|source| ArtifactError::Read {
        artifact,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        artifact,
        path: path.to_path_buf(),
        source,
    })
}
