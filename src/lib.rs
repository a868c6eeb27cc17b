//! Student Performance Prediction Service
//!
//! Serves GPA and grade class predictions from two fitted models that
//! share one standardization transform. Requests arrive over NATS,
//! are validated into a fixed 12-feature vector, scaled and routed to
//! exactly one model.

pub mod config;
pub mod consumer;
pub mod error;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod scaler;
pub mod schema;
pub mod service;
pub mod types;
pub mod validator;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::{ArtifactError, PredictionError, ServiceError, ValidationError};
pub use models::PredictionRouter;
pub use producer::ReplyProducer;
pub use scaler::ScalingParameters;
pub use schema::{Feature, FeatureVector, FEATURE_COUNT};
pub use service::PredictionService;
pub use types::{GradeClass, PredictionRequest, PredictionResult, Target};
pub use validator::FeatureValidator;
