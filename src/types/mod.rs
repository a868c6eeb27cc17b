//! Type definitions for the prediction service

pub mod prediction;
pub mod request;

pub use prediction::{GradeClass, PredictionResponse, PredictionResult};
pub use request::{PredictionRequest, RawValue, Target};
