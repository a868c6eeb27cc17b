//! Prediction service: validate, scale, route.
//!
//! A [`PredictionService`] only exists once every artifact has loaded, so
//! holding one means the process is ready to serve.

use crate::config::AppConfig;
use crate::error::{ArtifactError, ServiceError};
use crate::models::{ArtifactLoader, LoadedArtifacts, PredictionRouter};
use crate::scaler::ScalingParameters;
use crate::schema::FEATURE_COUNT;
use crate::types::{PredictionRequest, PredictionResponse, PredictionResult, Target};
use crate::validator::FeatureValidator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Immutable serving state shared by all requests
pub struct PredictionService {
    validator: FeatureValidator,
    scaler: ScalingParameters,
    router: PredictionRouter,
    ready_since: DateTime<Utc>,
}

impl PredictionService {
    pub fn new(validator: FeatureValidator, scaler: ScalingParameters, router: PredictionRouter) -> Self {
        Self {
            validator,
            scaler,
            router,
            ready_since: Utc::now(),
        }
    }

    /// Assemble the service from loaded artifacts
    pub fn from_artifacts(artifacts: LoadedArtifacts, strict: bool) -> Self {
        let validator = FeatureValidator::new(artifacts.category_codes).strict(strict);
        let router = PredictionRouter::new(artifacts.gpa_model, artifacts.grade_class_model);
        Self::new(validator, artifacts.scaler, router)
    }

    /// Load every artifact named in the configuration.
    ///
    /// Errors are fatal to startup.
    pub fn load(config: &AppConfig) -> Result<Self, ArtifactError> {
        let artifacts = ArtifactLoader::new(config.artifacts_dir())
            .with_onnx_threads(config.artifacts.onnx_threads)
            .load_all(&config.artifacts)?;
        let service = Self::from_artifacts(artifacts, config.validation.strict);

        let [gpa_model, grade_class_model] = service.router.model_names();
        info!(
            gpa_model,
            grade_class_model,
            strict = service.validator.is_strict(),
            "Prediction service assembled"
        );
        Ok(service)
    }

    /// Validate, scale and route one request
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, ServiceError> {
        let raw = self.validator.validate(&request.fields)?;
        let scaled = self.scaler.scale(&raw);
        Ok(self.router.predict(&scaled, request.target)?)
    }

    /// Decode a JSON payload and predict
    pub fn handle_payload(
        &self,
        target: Target,
        payload: &[u8],
    ) -> Result<PredictionResult, ServiceError> {
        let request = PredictionRequest::from_json(target, payload)
            .map_err(|e| ServiceError::MalformedRequest(e.to_string()))?;
        self.predict(&request)
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ready".to_string(),
            features: FEATURE_COUNT,
            ready_since: self.ready_since,
        }
    }
}

/// Reply to a readiness probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub features: usize,
    pub ready_since: DateTime<Utc>,
}

/// Whether the client or the service is at fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

/// Wire shape of a failed request.
///
/// Internal failures carry no detail; the cause is only logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        let body = match err {
            ServiceError::MalformedRequest(_) => ErrorBody {
                kind: ErrorKind::Validation,
                code: err.code().to_string(),
                field: None,
                message: err.to_string(),
            },
            ServiceError::Validation(e) => ErrorBody {
                kind: ErrorKind::Validation,
                code: e.code().to_string(),
                field: Some(e.field().to_string()),
                message: e.to_string(),
            },
            ServiceError::Prediction(_) => ErrorBody {
                kind: ErrorKind::Internal,
                code: err.code().to_string(),
                field: None,
                message: "internal error".to_string(),
            },
        };
        Self { error: body }
    }
}

/// Any reply body the service sends back
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Prediction(PredictionResponse),
    Error(ErrorResponse),
    Health(HealthResponse),
}

impl From<&Result<PredictionResult, ServiceError>> for Reply {
    fn from(result: &Result<PredictionResult, ServiceError>) -> Self {
        match result {
            Ok(prediction) => Reply::Prediction((*prediction).into()),
            Err(err) => Reply::Error(err.into()),
        }
    }
}
