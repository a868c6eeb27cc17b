//! Prediction request data structures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Which model a request is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Continuous GPA (linear regression)
    Gpa,
    /// Bucketed grade class (decision tree)
    GradeClass,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Target::Gpa => "gpa",
            Target::GradeClass => "grade_class",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw, untrusted field value as sent by the client.
///
/// Numbers and strings are both accepted; anything else is kept so the
/// validator can name it in the rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawValue {
    /// Text rendering used in error messages.
    pub fn describe(&self) -> String {
        match self {
            RawValue::Number(n) => n.to_string(),
            RawValue::Text(s) => s.clone(),
            RawValue::Other(v) => v.to_string(),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// Student record plus the prediction wanted for it
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    /// Requested prediction
    pub target: Target,
    /// Field name to raw value, in whatever order the client sent them
    pub fields: HashMap<String, RawValue>,
}

impl PredictionRequest {
    pub fn new(target: Target, fields: HashMap<String, RawValue>) -> Self {
        Self { target, fields }
    }

    /// Parse a JSON object payload for the given target.
    pub fn from_json(target: Target, payload: &[u8]) -> serde_json::Result<Self> {
        let fields: HashMap<String, RawValue> = serde_json::from_slice(payload)?;
        Ok(Self { target, fields })
    }

    /// Add or replace a field value
    pub fn with_field(mut self, name: &str, value: impl Into<RawValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }
}
