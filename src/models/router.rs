//! Dispatch of scaled feature vectors to the GPA or grade class model

use crate::error::{ModelError, PredictionError};
use crate::models::inference::{ModelHandle, ModelOutput};
use crate::schema::FeatureVector;
use crate::types::{GradeClass, PredictionResult, Target};
use tracing::{debug, error};

/// Holds both fitted models and shapes their raw output into typed results.
pub struct PredictionRouter {
    gpa_model: Box<dyn ModelHandle>,
    grade_class_model: Box<dyn ModelHandle>,
}

impl PredictionRouter {
    pub fn new(gpa_model: Box<dyn ModelHandle>, grade_class_model: Box<dyn ModelHandle>) -> Self {
        Self {
            gpa_model,
            grade_class_model,
        }
    }

    /// Names of the loaded models, GPA first
    pub fn model_names(&self) -> [&str; 2] {
        [self.gpa_model.name(), self.grade_class_model.name()]
    }

    /// Run exactly one model for `target`.
    ///
    /// GPA values are returned as produced; the router enforces no range.
    pub fn predict(
        &self,
        vector: &FeatureVector,
        target: Target,
    ) -> Result<PredictionResult, PredictionError> {
        let model = match target {
            Target::Gpa => self.gpa_model.as_ref(),
            Target::GradeClass => self.grade_class_model.as_ref(),
        };

        let output = invoke(model, vector)?;
        debug!(model = model.name(), target = %target, output = %output, "Model invoked");

        let corrupt = || {
            error!(model = model.name(), output = %output, "Model produced an unexpected output");
            PredictionError::CorruptModel {
                model: model.name().to_string(),
                output: output.to_string(),
            }
        };

        match target {
            Target::Gpa => match output {
                ModelOutput::Value(gpa) if gpa.is_finite() => Ok(PredictionResult::Gpa(gpa)),
                ModelOutput::Value(_) | ModelOutput::Label(_) => Err(corrupt()),
            },
            Target::GradeClass => {
                let code = match output {
                    ModelOutput::Label(label) => Some(label),
                    ModelOutput::Value(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
                    ModelOutput::Value(_) => None,
                };
                code.and_then(GradeClass::from_code)
                    .map(PredictionResult::GradeClass)
                    .ok_or_else(corrupt)
            }
        }
    }
}

fn invoke(model: &dyn ModelHandle, vector: &FeatureVector) -> Result<ModelOutput, PredictionError> {
    if let Some(expected) = model.input_width() {
        if expected != vector.len() {
            return Err(PredictionError::ModelInputMismatch {
                expected,
                actual: vector.len(),
            });
        }
    }

    model.infer(vector.as_slice()).map_err(|e| match e {
        ModelError::WidthMismatch { expected, actual } => {
            PredictionError::ModelInputMismatch { expected, actual }
        }
        ModelError::Backend(message) => PredictionError::ModelFailure {
            model: model.name().to_string(),
            message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::testing::{FailingModel, FixedModel};
    use crate::schema::FEATURE_COUNT;

    fn vector() -> FeatureVector {
        FeatureVector::new([0.0; FEATURE_COUNT])
    }

    fn build_router(gpa: ModelOutput, grade: ModelOutput) -> PredictionRouter {
        PredictionRouter::new(
            Box::new(FixedModel::new(gpa)),
            Box::new(FixedModel::new(grade)),
        )
    }

    #[test]
    fn test_routes_by_target() {
        let router = build_router(ModelOutput::Value(3.2), ModelOutput::Label(1));

        assert_eq!(
            router.predict(&vector(), Target::Gpa).unwrap(),
            PredictionResult::Gpa(3.2)
        );
        assert_eq!(
            router.predict(&vector(), Target::GradeClass).unwrap(),
            PredictionResult::GradeClass(GradeClass::B)
        );
    }

    #[test]
    fn test_gpa_is_not_clamped() {
        let router = build_router(ModelOutput::Value(-0.4), ModelOutput::Label(0));
        assert_eq!(
            router.predict(&vector(), Target::Gpa).unwrap(),
            PredictionResult::Gpa(-0.4)
        );

        let router = build_router(ModelOutput::Value(f64::NAN), ModelOutput::Label(0));
        assert!(matches!(
            router.predict(&vector(), Target::Gpa),
            Err(PredictionError::CorruptModel { .. })
        ));
    }

    #[test]
    fn test_class_label_on_gpa_path_is_corrupt() {
        let router = build_router(ModelOutput::Label(2), ModelOutput::Label(2));
        assert_eq!(
            router.predict(&vector(), Target::Gpa),
            Err(PredictionError::CorruptModel {
                model: "fixed".to_string(),
                output: ModelOutput::Label(2).to_string(),
            })
        );
    }

    #[test]
    fn test_grade_class_label_set() {
        for code in 0..5 {
            let router = build_router(ModelOutput::Value(0.0), ModelOutput::Label(code));
            let result = router.predict(&vector(), Target::GradeClass).unwrap();
            assert_eq!(
                result,
                PredictionResult::GradeClass(GradeClass::from_code(code).unwrap())
            );
        }

        let router = build_router(ModelOutput::Value(0.0), ModelOutput::Value(4.0));
        assert_eq!(
            router.predict(&vector(), Target::GradeClass).unwrap(),
            PredictionResult::GradeClass(GradeClass::F)
        );

        for bad in [ModelOutput::Label(5), ModelOutput::Label(-1), ModelOutput::Value(2.5)] {
            let router = build_router(ModelOutput::Value(0.0), bad);
            assert_eq!(
                router.predict(&vector(), Target::GradeClass),
                Err(PredictionError::CorruptModel {
                    model: "fixed".to_string(),
                    output: bad.to_string(),
                })
            );
        }
    }

    #[test]
    fn test_input_width_mismatch() {
        let mut narrow = FixedModel::new(ModelOutput::Value(1.0));
        narrow.width = Some(10);
        let router = PredictionRouter::new(
            Box::new(narrow),
            Box::new(FixedModel::new(ModelOutput::Label(0))),
        );

        assert_eq!(
            router.predict(&vector(), Target::Gpa),
            Err(PredictionError::ModelInputMismatch {
                expected: 10,
                actual: FEATURE_COUNT
            })
        );
        // The other model is unaffected
        assert!(router.predict(&vector(), Target::GradeClass).is_ok());
    }

    #[test]
    fn test_backend_failure_is_surfaced() {
        let router = PredictionRouter::new(
            Box::new(FailingModel),
            Box::new(FixedModel::new(ModelOutput::Label(0))),
        );

        assert_eq!(
            router.predict(&vector(), Target::Gpa),
            Err(PredictionError::ModelFailure {
                model: "failing".to_string(),
                message: "session run failed".to_string(),
            })
        );
        assert_eq!(router.model_names(), ["failing", "fixed"]);
    }
}
