//! Feature schema for student performance model inference.
//!
//! The feature order below is the column order the scaler and both models
//! were fitted on. It is a fixed contract and never derived from input.

use crate::error::ArtifactError;
use std::collections::HashMap;
use std::fmt;

/// Number of features every model input carries.
pub const FEATURE_COUNT: usize = 12;

/// One input attribute of a student record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Age,
    Gender,
    Ethnicity,
    ParentalEducation,
    StudyTimeWeekly,
    Absences,
    Tutoring,
    ParentalSupport,
    Extracurricular,
    Sports,
    Music,
    Volunteering,
}

impl Feature {
    /// All features in canonical (training) order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Age,
        Feature::Gender,
        Feature::Ethnicity,
        Feature::ParentalEducation,
        Feature::StudyTimeWeekly,
        Feature::Absences,
        Feature::Tutoring,
        Feature::ParentalSupport,
        Feature::Extracurricular,
        Feature::Sports,
        Feature::Music,
        Feature::Volunteering,
    ];

    /// Field name as it appears in requests and artifacts.
    pub fn name(self) -> &'static str {
        match self {
            Feature::Age => "Age",
            Feature::Gender => "Gender",
            Feature::Ethnicity => "Ethnicity",
            Feature::ParentalEducation => "ParentalEducation",
            Feature::StudyTimeWeekly => "StudyTimeWeekly",
            Feature::Absences => "Absences",
            Feature::Tutoring => "Tutoring",
            Feature::ParentalSupport => "ParentalSupport",
            Feature::Extracurricular => "Extracurricular",
            Feature::Sports => "Sports",
            Feature::Music => "Music",
            Feature::Volunteering => "Volunteering",
        }
    }

    /// Position of this feature in the model input.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Coding domain for category-coded fields, `None` for continuous ones.
    pub fn domain(self) -> Option<Domain> {
        match self {
            Feature::Gender
            | Feature::Tutoring
            | Feature::Extracurricular
            | Feature::Sports
            | Feature::Music
            | Feature::Volunteering => Some(Domain::BINARY),
            Feature::Ethnicity => Some(Domain { max: 3 }),
            Feature::ParentalSupport => Some(Domain { max: 4 }),
            Feature::Age
            | Feature::ParentalEducation
            | Feature::StudyTimeWeekly
            | Feature::Absences => None,
        }
    }

    pub fn is_categorical(self) -> bool {
        self.domain().is_some()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Allowed integer codes `0..=max` of a category-coded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Domain {
    pub max: u8,
}

impl Domain {
    pub const BINARY: Domain = Domain { max: 1 };

    /// Whether `value` is an integral code inside the domain.
    pub fn contains(&self, value: f64) -> bool {
        value.fract() == 0.0 && value >= 0.0 && value <= f64::from(self.max)
    }

    pub fn codes(&self) -> impl Iterator<Item = u8> {
        0..=self.max
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<String> = self.codes().map(|c| c.to_string()).collect();
        write!(f, "{{{}}}", codes.join(", "))
    }
}

/// Validated model input in canonical feature order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Training-time category label to code table.
///
/// Loaded once from the scaler bundle so labels such as `"Female"` map to
/// the exact codes the models were trained with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryCodes {
    tables: HashMap<Feature, HashMap<String, u8>>,
}

impl CategoryCodes {
    /// Build the table from its raw artifact form, checking every field is
    /// category-coded and every code sits inside the field's domain.
    pub fn from_raw(raw: HashMap<String, HashMap<String, i64>>) -> Result<Self, ArtifactError> {
        let mut tables = HashMap::new();

        for (field, labels) in raw {
            let feature = Feature::from_name(&field)
                .ok_or_else(|| ArtifactError::UnknownCategoryField(field.clone()))?;
            let domain = feature
                .domain()
                .ok_or_else(|| ArtifactError::NotCategorical(feature))?;

            let mut table = HashMap::with_capacity(labels.len());
            for (label, code) in labels {
                if code < 0 || !domain.contains(code as f64) {
                    return Err(ArtifactError::CategoryCodeOutOfDomain {
                        feature,
                        label,
                        code,
                        allowed: domain,
                    });
                }
                table.insert(label, code as u8);
            }
            tables.insert(feature, table);
        }

        Ok(Self { tables })
    }

    /// Look up the code of `label` for `feature`.
    pub fn code(&self, feature: Feature, label: &str) -> Option<u8> {
        self.tables.get(&feature)?.get(label).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
