//! JSON-encoded model artifacts evaluated in-process.
//!
//! Covers the two model families the training notebook fits: an ordinary
//! least squares regressor for GPA and a decision tree classifier for the
//! grade class.

use crate::error::{ArtifactError, ModelError};
use crate::models::inference::{ModelHandle, ModelOutput};
use crate::types::Target;
use serde::{Deserialize, Serialize};

/// Serialized form of a native model file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NativeModelSpec {
    LinearRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    DecisionTree {
        n_features: usize,
        nodes: Vec<TreeNode>,
    },
}

impl NativeModelSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            NativeModelSpec::LinearRegression { .. } => "linear_regression",
            NativeModelSpec::DecisionTree { .. } => "decision_tree",
        }
    }

    /// Regressors serve GPA, classifiers serve the grade class.
    pub fn check_target(&self, target: Target) -> Result<(), ArtifactError> {
        match (self, target) {
            (NativeModelSpec::LinearRegression { .. }, Target::Gpa)
            | (NativeModelSpec::DecisionTree { .. }, Target::GradeClass) => Ok(()),
            _ => Err(ArtifactError::ModelKindMismatch {
                kind: self.kind(),
                target,
            }),
        }
    }

    /// Verify the artifact and build a callable handle.
    pub fn build(self, name: &str) -> Result<Box<dyn ModelHandle>, ArtifactError> {
        match self {
            NativeModelSpec::LinearRegression {
                coefficients,
                intercept,
            } => Ok(Box::new(LinearModel::new(name, coefficients, intercept)?)),
            NativeModelSpec::DecisionTree { n_features, nodes } => {
                Ok(Box::new(DecisionTree::new(name, n_features, nodes)?))
            }
        }
    }
}

/// `y = intercept + Σ coefficients[i] * x[i]`
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    pub fn new(name: &str, coefficients: Vec<f64>, intercept: f64) -> Result<Self, ArtifactError> {
        if coefficients.is_empty() {
            return Err(ArtifactError::InvalidLinearModel(
                "no coefficients".to_string(),
            ));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ArtifactError::InvalidLinearModel(
                "non-finite parameters".to_string(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            coefficients,
            intercept,
        })
    }
}

impl ModelHandle for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn infer(&self, features: &[f64]) -> Result<ModelOutput, ModelError> {
        if features.len() != self.coefficients.len() {
            return Err(ModelError::WidthMismatch {
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }

        let y = self
            .coefficients
            .iter()
            .zip(features)
            .fold(self.intercept, |acc, (c, x)| acc + c * x);
        Ok(ModelOutput::Value(y))
    }
}

/// One node of a flattened decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go to `left` when `x[feature] <= threshold`, else `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { label: i64 },
}

/// Decision tree classifier stored as a node array rooted at index 0.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    name: String,
    n_features: usize,
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Children must point strictly forward, so traversal always ends at
    /// a leaf in at most `nodes.len()` steps.
    pub fn new(name: &str, n_features: usize, nodes: Vec<TreeNode>) -> Result<Self, ArtifactError> {
        if nodes.is_empty() {
            return Err(ArtifactError::InvalidTree("tree has no nodes".to_string()));
        }

        for (i, node) in nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = *node
            {
                if feature >= n_features {
                    return Err(ArtifactError::InvalidTree(format!(
                        "node {i} splits on feature {feature} but the tree has {n_features} features"
                    )));
                }
                if !threshold.is_finite() {
                    return Err(ArtifactError::InvalidTree(format!(
                        "node {i} has a non-finite threshold"
                    )));
                }
                for child in [left, right] {
                    if child <= i || child >= nodes.len() {
                        return Err(ArtifactError::InvalidTree(format!(
                            "node {i} has invalid child index {child}"
                        )));
                    }
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            n_features,
            nodes,
        })
    }

}

impl ModelHandle for DecisionTree {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn infer(&self, features: &[f64]) -> Result<ModelOutput, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::WidthMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let mut index = 0;
        loop {
            match self.nodes[index] {
                TreeNode::Leaf { label } => return Ok(ModelOutput::Label(label)),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}
