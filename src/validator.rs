//! Validation of untrusted student records into model input.
//!
//! This is the only place raw request values are coerced to numbers.

use crate::error::ValidationError;
use crate::schema::{CategoryCodes, Feature, FeatureVector, FEATURE_COUNT};
use crate::types::RawValue;
use std::collections::HashMap;

/// Turns raw field maps into [`FeatureVector`]s in canonical order.
#[derive(Debug, Clone, Default)]
pub struct FeatureValidator {
    codes: CategoryCodes,
    strict: bool,
}

impl FeatureValidator {
    /// Create a validator using the training-time category table.
    pub fn new(codes: CategoryCodes) -> Self {
        Self {
            codes,
            strict: false,
        }
    }

    /// Reject unrecognised fields instead of ignoring them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Validate a raw record.
    ///
    /// Fields are checked in canonical order and the first failure is
    /// returned. The input map's iteration order never affects the result.
    pub fn validate(
        &self,
        raw: &HashMap<String, RawValue>,
    ) -> Result<FeatureVector, ValidationError> {
        let mut values = [0.0; FEATURE_COUNT];

        for feature in Feature::ALL {
            let value = raw
                .get(feature.name())
                .ok_or(ValidationError::MissingField(feature))?;
            values[feature.index()] = self.coerce(feature, value)?;
        }

        if self.strict {
            let unknown = raw
                .keys()
                .filter(|name| Feature::from_name(name).is_none())
                .min();
            if let Some(name) = unknown {
                return Err(ValidationError::UnknownField(name.clone()));
            }
        }

        Ok(FeatureVector::new(values))
    }

    fn coerce(&self, feature: Feature, raw: &RawValue) -> Result<f64, ValidationError> {
        let invalid = || ValidationError::InvalidFieldValue {
            field: feature,
            raw: raw.describe(),
        };

        let value = match raw {
            RawValue::Number(n) => *n,
            RawValue::Text(text) => {
                let text = text.trim();
                match text.parse::<f64>() {
                    Ok(n) => n,
                    Err(_) => self
                        .codes
                        .code(feature, text)
                        .map(f64::from)
                        .ok_or_else(invalid)?,
                }
            }
            RawValue::Other(_) => return Err(invalid()),
        };

        if !value.is_finite() {
            return Err(invalid());
        }

        if let Some(domain) = feature.domain() {
            if !domain.contains(value) {
                return Err(ValidationError::OutOfDomainValue {
                    field: feature,
                    value,
                    allowed: domain,
                });
            }
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Domain;

    fn sample_record() -> HashMap<String, RawValue> {
        [
            ("Age", RawValue::Number(17.0)),
            ("Gender", RawValue::Number(1.0)),
            ("Ethnicity", RawValue::Number(0.0)),
            ("ParentalEducation", RawValue::Number(2.0)),
            ("StudyTimeWeekly", RawValue::Number(10.5)),
            ("Absences", RawValue::Number(3.0)),
            ("Tutoring", RawValue::Number(0.0)),
            ("ParentalSupport", RawValue::Number(2.0)),
            ("Extracurricular", RawValue::Number(1.0)),
            ("Sports", RawValue::Number(0.0)),
            ("Music", RawValue::Number(0.0)),
            ("Volunteering", RawValue::Number(1.0)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn codes() -> CategoryCodes {
        CategoryCodes::from_raw(HashMap::from([(
            "Gender".to_string(),
            HashMap::from([("Male".to_string(), 0), ("Female".to_string(), 1)]),
        )]))
        .unwrap()
    }

    #[test]
    fn test_valid_record() {
        let validator = FeatureValidator::default();
        let vector = validator.validate(&sample_record()).unwrap();

        assert_eq!(vector.len(), FEATURE_COUNT);
        assert_eq!(
            vector.as_slice(),
            &[17.0, 1.0, 0.0, 2.0, 10.5, 3.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_missing_each_field() {
        let validator = FeatureValidator::default();

        for feature in Feature::ALL {
            let mut record = sample_record();
            record.remove(feature.name());
            assert_eq!(
                validator.validate(&record),
                Err(ValidationError::MissingField(feature))
            );
        }
    }

    #[test]
    fn test_numeric_strings() {
        let mut record = sample_record();
        record.insert("StudyTimeWeekly".into(), RawValue::Text(" 12.25 ".into()));
        record.insert("Gender".into(), RawValue::Text("0".into()));

        let vector = FeatureValidator::default().validate(&record).unwrap();
        assert_eq!(vector.get(Feature::StudyTimeWeekly), 12.25);
        assert_eq!(vector.get(Feature::Gender), 0.0);
    }

    #[test]
    fn test_rejects_non_numeric_and_non_finite() {
        let validator = FeatureValidator::default();

        for bad in ["ten", "NaN", "inf", "-Infinity", ""] {
            let mut record = sample_record();
            record.insert("Absences".into(), RawValue::Text(bad.into()));
            assert_eq!(
                validator.validate(&record),
                Err(ValidationError::InvalidFieldValue {
                    field: Feature::Absences,
                    raw: bad.to_string(),
                })
            );
        }

        let mut record = sample_record();
        record.insert("Age".into(), RawValue::Other(serde_json::Value::Bool(true)));
        assert!(matches!(
            validator.validate(&record),
            Err(ValidationError::InvalidFieldValue { field: Feature::Age, .. })
        ));

        let mut record = sample_record();
        record.insert("Age".into(), RawValue::Number(f64::NAN));
        assert!(matches!(
            validator.validate(&record),
            Err(ValidationError::InvalidFieldValue { field: Feature::Age, .. })
        ));
    }

    #[test]
    fn test_category_domains() {
        let validator = FeatureValidator::default();

        for feature in Feature::ALL.into_iter().filter(|f| f.is_categorical()) {
            let domain = feature.domain().unwrap();

            for code in [0.0, f64::from(domain.max)] {
                let mut record = sample_record();
                record.insert(feature.name().into(), RawValue::Number(code));
                assert!(validator.validate(&record).is_ok(), "{feature}={code}");
            }

            for bad in [-1.0, f64::from(domain.max) + 1.0, 0.5] {
                let mut record = sample_record();
                record.insert(feature.name().into(), RawValue::Number(bad));
                assert_eq!(
                    validator.validate(&record),
                    Err(ValidationError::OutOfDomainValue {
                        field: feature,
                        value: bad,
                        allowed: domain,
                    })
                );
            }
        }
    }

    #[test]
    fn test_continuous_fields_have_no_domain() {
        let mut record = sample_record();
        record.insert("ParentalEducation".into(), RawValue::Number(7.0));
        record.insert("Absences".into(), RawValue::Number(-2.0));

        assert!(FeatureValidator::default().validate(&record).is_ok());
    }

    #[test]
    fn test_category_labels() {
        let validator = FeatureValidator::new(codes());

        let mut record = sample_record();
        record.insert("Gender".into(), RawValue::Text("Male".into()));
        let vector = validator.validate(&record).unwrap();
        assert_eq!(vector.get(Feature::Gender), 0.0);

        record.insert("Gender".into(), RawValue::Text("male".into()));
        assert!(matches!(
            validator.validate(&record),
            Err(ValidationError::InvalidFieldValue { field: Feature::Gender, .. })
        ));

        // Labels only apply to category-coded fields
        record.insert("Gender".into(), RawValue::Number(1.0));
        record.insert("Age".into(), RawValue::Text("Male".into()));
        assert!(matches!(
            validator.validate(&record),
            Err(ValidationError::InvalidFieldValue { field: Feature::Age, .. })
        ));
    }

    #[test]
    fn test_extra_fields() {
        let mut record = sample_record();
        record.insert("StudentID".into(), RawValue::Number(1001.0));
        record.insert("GPA".into(), RawValue::Number(3.1));

        assert!(FeatureValidator::default().validate(&record).is_ok());
        assert_eq!(
            FeatureValidator::default().strict(true).validate(&record),
            Err(ValidationError::UnknownField("GPA".into()))
        );
    }

    #[test]
    fn test_first_failure_in_canonical_order() {
        let mut record = sample_record();
        record.remove("Volunteering");
        record.insert("Gender".into(), RawValue::Number(5.0));

        assert_eq!(
            FeatureValidator::default().validate(&record),
            Err(ValidationError::OutOfDomainValue {
                field: Feature::Gender,
                value: 5.0,
                allowed: Domain::BINARY,
            })
        );
    }
}
