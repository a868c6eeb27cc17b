//! End-to-end tests against the shipped artifacts in `artifacts/`.

use proptest::prelude::*;
use std::collections::HashMap;
use student_predictor::config::AppConfig;
use student_predictor::error::{ServiceError, ValidationError};
use student_predictor::service::{ErrorResponse, Reply};
use student_predictor::types::{GradeClass, RawValue};
use student_predictor::{
    Feature, FeatureValidator, FeatureVector, PredictionRequest, PredictionResult,
    PredictionService, ScalingParameters, Target, FEATURE_COUNT,
};

fn shipped_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.artifacts.dir = format!("{}/artifacts", env!("CARGO_MANIFEST_DIR"));
    config
}

fn sample_fields() -> HashMap<String, RawValue> {
    [
        ("Age", 17.0),
        ("Gender", 1.0),
        ("Ethnicity", 0.0),
        ("ParentalEducation", 2.0),
        ("StudyTimeWeekly", 10.5),
        ("Absences", 3.0),
        ("Tutoring", 0.0),
        ("ParentalSupport", 2.0),
        ("Extracurricular", 1.0),
        ("Sports", 0.0),
        ("Music", 0.0),
        ("Volunteering", 1.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), RawValue::Number(v)))
    .collect()
}

#[test]
fn test_shipped_artifacts_serve_both_targets() {
    let service = PredictionService::load(&shipped_config()).unwrap();

    let gpa = service
        .predict(&PredictionRequest::new(Target::Gpa, sample_fields()))
        .unwrap();
    match gpa {
        PredictionResult::Gpa(value) => assert!(value.is_finite()),
        other => panic!("expected a GPA, got {other:?}"),
    }

    let class = service
        .predict(&PredictionRequest::new(Target::GradeClass, sample_fields()))
        .unwrap();
    match class {
        PredictionResult::GradeClass(class) => assert!(class.code() <= 4),
        other => panic!("expected a grade class, got {other:?}"),
    }
}

#[test]
fn test_swapped_model_paths_refuse_to_start() {
    let mut config = shipped_config();
    std::mem::swap(
        &mut config.artifacts.gpa_model,
        &mut config.artifacts.grade_class_model,
    );

    let err = PredictionService::load(&config).err().unwrap();
    let message = err.to_string();
    assert!(message.contains("gpa model"), "{message}");
    assert!(message.contains("cannot serve gpa predictions"), "{message}");
}

#[test]
fn test_shipped_category_labels() {
    let service = PredictionService::load(&shipped_config()).unwrap();

    let labelled = PredictionRequest::new(Target::Gpa, sample_fields())
        .with_field("Gender", "Female")
        .with_field("ParentalSupport", "Moderate")
        .with_field("Volunteering", "Yes");
    let numeric = PredictionRequest::new(Target::Gpa, sample_fields());

    assert_eq!(
        service.predict(&labelled).unwrap(),
        service.predict(&numeric).unwrap()
    );
}

#[test]
fn test_missing_absences_produces_no_prediction() {
    let service = PredictionService::load(&shipped_config()).unwrap();
    let mut fields = sample_fields();
    fields.remove("Absences");

    for target in [Target::Gpa, Target::GradeClass] {
        let err = service
            .predict(&PredictionRequest::new(target, fields.clone()))
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::MissingField(Feature::Absences))
        ));
        assert_eq!(ErrorResponse::from(&err).error.field.as_deref(), Some("Absences"));
    }
}

#[test]
fn test_strict_mode_from_config() {
    let mut config = shipped_config();
    config.validation.strict = true;
    let service = PredictionService::load(&config).unwrap();

    let request = PredictionRequest::new(Target::GradeClass, sample_fields())
        .with_field("StudentID", 1001.0);
    let result = service.predict(&request);
    let reply = serde_json::to_value(Reply::from(&result)).unwrap();

    assert_eq!(reply["error"]["code"], "unknown_field");
    assert_eq!(reply["error"]["field"], "StudentID");
}

#[test]
fn test_string_payload_matches_numbers() {
    let service = PredictionService::load(&shipped_config()).unwrap();
    let payload = br#"{"Age":"17","Gender":"1","Ethnicity":"0","ParentalEducation":"2",
        "StudyTimeWeekly":"10.5","Absences":"3","Tutoring":"0","ParentalSupport":"2",
        "Extracurricular":"1","Sports":"0","Music":"0","Volunteering":"1"}"#;

    let from_strings = service.handle_payload(Target::GradeClass, payload).unwrap();
    let from_numbers = service
        .predict(&PredictionRequest::new(Target::GradeClass, sample_fields()))
        .unwrap();
    assert_eq!(from_strings, from_numbers);
    assert!(GradeClass::ALL
        .iter()
        .any(|c| from_strings == PredictionResult::GradeClass(*c)));
}

fn record_strategy() -> impl Strategy<Value = Vec<(Feature, f64)>> {
    (
        15.0..=18.0_f64,
        0..=1u8,
        0..=3u8,
        0..=4u8,
        0.0..20.0_f64,
        0.0..30.0_f64,
        0..=1u8,
        0..=4u8,
        prop::array::uniform4(0..=1u8),
    )
        .prop_map(
            |(age, gender, ethnicity, education, study, absences, tutoring, support, flags)| {
                vec![
                    (Feature::Age, age),
                    (Feature::Gender, f64::from(gender)),
                    (Feature::Ethnicity, f64::from(ethnicity)),
                    (Feature::ParentalEducation, f64::from(education)),
                    (Feature::StudyTimeWeekly, study),
                    (Feature::Absences, absences),
                    (Feature::Tutoring, f64::from(tutoring)),
                    (Feature::ParentalSupport, f64::from(support)),
                    (Feature::Extracurricular, f64::from(flags[0])),
                    (Feature::Sports, f64::from(flags[1])),
                    (Feature::Music, f64::from(flags[2])),
                    (Feature::Volunteering, f64::from(flags[3])),
                ]
            },
        )
}

proptest! {
    #[test]
    fn prop_validation_is_order_independent(
        record in record_strategy(),
        order in Just((0..FEATURE_COUNT).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let validator = FeatureValidator::default();

        // Build the map by inserting fields in a shuffled order
        let mut fields = HashMap::new();
        for &i in &order {
            let (feature, value) = record[i];
            fields.insert(feature.name().to_string(), RawValue::Number(value));
        }

        let vector = validator.validate(&fields).unwrap();
        prop_assert_eq!(vector.len(), FEATURE_COUNT);
        for (feature, value) in &record {
            prop_assert_eq!(vector.as_slice()[feature.index()], *value);
        }
    }

    #[test]
    fn prop_scaling_matches_formula(
        values in prop::array::uniform12(-100.0..100.0_f64),
        mean in prop::array::uniform12(-10.0..10.0_f64),
        std_dev in prop::array::uniform12(0.01..10.0_f64),
    ) {
        let params = ScalingParameters::new(&mean, &std_dev).unwrap();
        let scaled = params.scale(&FeatureVector::new(values));

        for i in 0..FEATURE_COUNT {
            prop_assert_eq!(scaled.as_slice()[i], (values[i] - mean[i]) / std_dev[i]);
        }
    }

    #[test]
    fn prop_grade_class_always_in_label_set(record in record_strategy()) {
        let service = PredictionService::load(&shipped_config()).unwrap();
        let fields = record
            .iter()
            .map(|(f, v)| (f.name().to_string(), RawValue::Number(*v)))
            .collect();

        let result = service
            .predict(&PredictionRequest::new(Target::GradeClass, fields))
            .unwrap();
        prop_assert!(matches!(result, PredictionResult::GradeClass(c) if c.code() <= 4));
    }
}
