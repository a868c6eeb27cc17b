//! Standardization of feature vectors with training-time statistics.

use crate::error::ArtifactError;
use crate::schema::{CategoryCodes, Feature, FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-feature mean and standard deviation fitted offline.
///
/// Construction rejects deviations that are not positive normal floats, so
/// [`scale`] never
/// produces NaN or infinity for a finite input.
///
/// [`scale`]: ScalingParameters::scale
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingParameters {
    mean: [f64; FEATURE_COUNT],
    std_dev: [f64; FEATURE_COUNT],
}

impl ScalingParameters {
    pub fn new(mean: &[f64], std_dev: &[f64]) -> Result<Self, ArtifactError> {
        let mean = to_array(mean, "mean values")?;
        let std_dev = to_array(std_dev, "scale values")?;

        for feature in Feature::ALL {
            let i = feature.index();
            if !mean[i].is_finite() {
                return Err(ArtifactError::NonFiniteParameter {
                    feature,
                    parameter: "mean",
                });
            }
            if !std_dev[i].is_finite() {
                return Err(ArtifactError::NonFiniteParameter {
                    feature,
                    parameter: "scale",
                });
            }
            if std_dev[i] < 0.0 || !std_dev[i].is_normal() {
                return Err(ArtifactError::DegenerateScale { index: i, feature });
            }
        }

        Ok(Self { mean, std_dev })
    }

    /// `scaled[i] = (vector[i] - mean[i]) / std_dev[i]`
    pub fn scale(&self, vector: &FeatureVector) -> FeatureVector {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, (&x, out)) in vector.as_slice().iter().zip(scaled.iter_mut()).enumerate() {
            *out = (x - self.mean[i]) / self.std_dev[i];
        }
        FeatureVector::new(scaled)
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std_dev(&self) -> &[f64] {
        &self.std_dev
    }
}

fn to_array(values: &[f64], what: &'static str) -> Result<[f64; FEATURE_COUNT], ArtifactError> {
    values
        .try_into()
        .map_err(|_| ArtifactError::CountMismatch {
            what,
            expected: FEATURE_COUNT,
            actual: values.len(),
        })
}

/// On-disk scaler bundle: statistics plus the category table fixed at
/// training time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerBundle {
    /// Feature names in the order the statistics were fitted
    pub features: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default)]
    pub category_codes: HashMap<String, HashMap<String, i64>>,
}

impl ScalerBundle {
    /// Verify the bundle against the canonical schema and split it into
    /// scaling parameters and the category table.
    pub fn into_parts(self) -> Result<(ScalingParameters, CategoryCodes), ArtifactError> {
        if self.features.len() != FEATURE_COUNT {
            return Err(ArtifactError::CountMismatch {
                what: "feature names",
                expected: FEATURE_COUNT,
                actual: self.features.len(),
            });
        }
        for (index, (expected, found)) in Feature::ALL.iter().zip(&self.features).enumerate() {
            if expected.name() != found {
                return Err(ArtifactError::FeatureOrder {
                    index,
                    expected: *expected,
                    found: found.clone(),
                });
            }
        }

        let params = ScalingParameters::new(&self.mean, &self.scale)?;
        let codes = CategoryCodes::from_raw(self.category_codes)?;
        Ok((params, codes))
    }
}
