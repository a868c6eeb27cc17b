//! Model handle abstraction shared by every backend

use crate::error::ModelError;
use std::fmt;

/// Raw output of a single model invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelOutput {
    /// Continuous value (regressors)
    Value(f64),
    /// Discrete class label (classifiers)
    Label(i64),
}

impl fmt::Display for ModelOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelOutput::Value(v) => write!(f, "value {v}"),
            ModelOutput::Label(l) => write!(f, "label {l}"),
        }
    }
}

/// A fitted model loaded once at startup.
///
/// Implementations must be callable from many requests at once and must
/// not change observable state between calls.
pub trait ModelHandle: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Number of input features, when the artifact declares it
    fn input_width(&self) -> Option<usize>;

    /// Run the model on one already-scaled feature row
    fn infer(&self, features: &[f64]) -> Result<ModelOutput, ModelError>;
}
