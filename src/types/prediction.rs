//! Prediction result data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bucketed academic grade predicted by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeClass {
    A,
    B,
    C,
    D,
    F,
}

impl GradeClass {
    /// Every label the classifier may emit, by code.
    pub const ALL: [GradeClass; 5] = [
        GradeClass::A,
        GradeClass::B,
        GradeClass::C,
        GradeClass::D,
        GradeClass::F,
    ];

    /// Integer code used in training data and responses.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| GradeClass::ALL.get(i).copied())
    }

    pub fn letter(self) -> char {
        match self {
            GradeClass::A => 'A',
            GradeClass::B => 'B',
            GradeClass::C => 'C',
            GradeClass::D => 'D',
            GradeClass::F => 'F',
        }
    }
}

impl fmt::Display for GradeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.letter())
    }
}

/// Typed outcome of one prediction; exactly one variant per request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredictionResult {
    /// Raw regression output, not clamped to any GPA range
    Gpa(f64),
    GradeClass(GradeClass),
}

/// Wire shape of a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Gpa { predicted_gpa: f64 },
    GradeClass { predicted_gradeclass: u8 },
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        match result {
            PredictionResult::Gpa(gpa) => PredictionResponse::Gpa { predicted_gpa: gpa },
            PredictionResult::GradeClass(class) => PredictionResponse::GradeClass {
                predicted_gradeclass: class.code(),
            },
        }
    }
}
