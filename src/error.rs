//! Error taxonomy for the prediction service.
//!
//! Validation errors are caused by the client and always recoverable.
//! Artifact errors only happen during startup and abort it. Prediction
//! errors fail a single request and are never replaced by a default value.

use crate::schema::{Domain, Feature};
use crate::types::Target;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Rejection of an untrusted input record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    MissingField(Feature),

    #[error("invalid value for {field}: {raw:?} is not a finite number")]
    InvalidFieldValue { field: Feature, raw: String },

    #[error("value {value} for {field} is outside the allowed set {allowed}")]
    OutOfDomainValue {
        field: Feature,
        value: f64,
        allowed: Domain,
    },

    #[error("unknown field: {0}")]
    UnknownField(String),
}

impl ValidationError {
    /// Stable reason code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::InvalidFieldValue { .. } => "invalid_field_value",
            ValidationError::OutOfDomainValue { .. } => "out_of_domain_value",
            ValidationError::UnknownField(_) => "unknown_field",
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::MissingField(field)
            | ValidationError::InvalidFieldValue { field, .. }
            | ValidationError::OutOfDomainValue { field, .. } => field.name(),
            ValidationError::UnknownField(name) => name,
        }
    }
}

/// Which startup artifact failed to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Scaler,
    GpaModel,
    GradeClassModel,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Artifact::Scaler => "scaler",
            Artifact::GpaModel => "gpa model",
            Artifact::GradeClassModel => "grade class model",
        })
    }
}

/// Failure to load or verify a fitted artifact. Fatal at startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{artifact} artifact not found at {}", path.display())]
    Missing { artifact: Artifact, path: PathBuf },

    #[error("failed to read {artifact} artifact {}: {source}", path.display())]
    Read {
        artifact: Artifact,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {artifact} artifact {}: {source}", path.display())]
    Parse {
        artifact: Artifact,
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{artifact} artifact {} is corrupt: {source}", path.display())]
    Invalid {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: Box<ArtifactError>,
    },

    #[error("unsupported artifact format for {artifact}: {}", path.display())]
    UnsupportedFormat { artifact: Artifact, path: PathBuf },

    #[error("degenerate scale for feature {index} ({feature}): standard deviation is zero")]
    DegenerateScale { index: usize, feature: Feature },

    #[error("non-finite {parameter} for feature {feature}")]
    NonFiniteParameter {
        feature: Feature,
        parameter: &'static str,
    },

    #[error("expected {expected} {what}, found {actual}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("feature order mismatch at position {index}: expected {expected}, found {found:?}")]
    FeatureOrder {
        index: usize,
        expected: Feature,
        found: String,
    },

    #[error("category table for unknown field {0:?}")]
    UnknownCategoryField(String),

    #[error("category table for non-categorical field {0}")]
    NotCategorical(Feature),

    #[error("category {label:?} of {feature} has code {code} outside {allowed}")]
    CategoryCodeOutOfDomain {
        feature: Feature,
        label: String,
        code: i64,
        allowed: Domain,
    },

    #[error("invalid decision tree: {0}")]
    InvalidTree(String),

    #[error("invalid linear model: {0}")]
    InvalidLinearModel(String),

    #[error("{kind} model cannot serve {target} predictions")]
    ModelKindMismatch { kind: &'static str, target: Target },

    #[error("model runtime error: {0}")]
    Runtime(String),
}

impl ArtifactError {
    /// Attach the artifact and path to a content-level error.
    pub fn in_artifact(self, artifact: Artifact, path: impl Into<PathBuf>) -> Self {
        match self {
            err @ (ArtifactError::Missing { .. }
            | ArtifactError::Read { .. }
            | ArtifactError::Parse { .. }
            | ArtifactError::Invalid { .. }
            | ArtifactError::UnsupportedFormat { .. }) => err,
            other => ArtifactError::Invalid {
                artifact,
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}

/// Failure reported by a model backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("model expects {expected} features, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("{0}")]
    Backend(String),
}

/// Per-request failure while producing a prediction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("model input mismatch: expected {expected} features, got {actual}")]
    ModelInputMismatch { expected: usize, actual: usize },

    #[error("corrupt model {model}: unexpected output {output}")]
    CorruptModel { model: String, output: String },

    #[error("model {model} failed: {message}")]
    ModelFailure { model: String, message: String },
}

/// Any failure of a single prediction request.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl ServiceError {
    /// Whether the client caused the failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ServiceError::MalformedRequest(_) | ServiceError::Validation(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::MalformedRequest(_) => "malformed_request",
            ServiceError::Validation(e) => e.code(),
            ServiceError::Prediction(_) => "internal_error",
        }
    }
}
