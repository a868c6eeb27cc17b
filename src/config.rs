//! Configuration management for the prediction service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "STUDENT_PREDICTOR_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub serving: ServingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for GPA prediction requests
    pub gpa_subject: String,
    /// Subject for grade class prediction requests
    pub grade_class_subject: String,
    /// Subject answering readiness probes
    pub health_subject: String,
    /// Queue group shared by all replicas
    #[serde(default = "default_queue_group")]
    pub queue_group: String,
}

fn default_queue_group() -> String {
    "student-predictor".to_string()
}

/// Fitted artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory containing the artifact files
    pub dir: String,
    /// Scaler bundle (statistics and category codes)
    pub scaler: String,
    /// GPA regression model, `.json` or `.onnx`
    pub gpa_model: String,
    /// Grade class classifier, `.json` or `.onnx`
    pub grade_class_model: String,
    /// Number of threads for ONNX inference per model (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Input validation configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationConfig {
    /// Reject requests carrying unrecognised fields
    #[serde(default)]
    pub strict: bool,
}

/// Request handling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServingConfig {
    /// Maximum number of requests handled concurrently
    pub workers: usize,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self { workers: 8 }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between summaries, 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `$STUDENT_PREDICTOR_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    ///
    /// `PREDICTOR__SECTION__KEY` environment variables override file values.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("PREDICTOR").separator("__"))
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path.as_ref().display()))?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Artifact directory as a path
    pub fn artifacts_dir(&self) -> PathBuf {
        PathBuf::from(&self.artifacts.dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                gpa_subject: "predict.gpa".to_string(),
                grade_class_subject: "predict.gradeclass".to_string(),
                health_subject: "predict.health".to_string(),
                queue_group: default_queue_group(),
            },
            artifacts: ArtifactsConfig {
                dir: "artifacts".to_string(),
                scaler: "scaler.json".to_string(),
                gpa_model: "gpa_linear_regression.json".to_string(),
                grade_class_model: "gradeclass_decision_tree.json".to_string(),
                onnx_threads: default_onnx_threads(),
            },
            validation: ValidationConfig::default(),
            serving: ServingConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
