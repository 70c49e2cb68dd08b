//! Serialized regressors the oracle can evaluate.
//!
//! Only inference lives here; artifacts are produced by an offline training
//! job and exported as JSON.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A node of a CART regression tree.
///
/// Samples with `x[feature_idx] <= threshold` descend left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        value: f64,
    },
}

impl TreeNode {
    pub fn predict_one(&self, x: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature_idx] <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }

    /// Largest feature index referenced anywhere in the tree.
    fn max_feature_idx(&self) -> Option<usize> {
        match self {
            TreeNode::Leaf { .. } => None,
            TreeNode::Split {
                feature_idx,
                left,
                right,
                ..
            } => [Some(*feature_idx), left.max_feature_idx(), right.max_feature_idx()]
                .into_iter()
                .flatten()
                .max(),
        }
    }
}

/// The regression model, tagged by `kind` in the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    /// `intercept + Σ coefficients[i] · x[i]`
    Linear { intercept: f64, coefficients: Vec<f64> },
    /// Mean of the trees.
    RandomForest { trees: Vec<TreeNode> },
    /// `init + learning_rate · Σ trees`
    GradientBoosting {
        init: f64,
        learning_rate: f64,
        trees: Vec<TreeNode>,
    },
}

impl Estimator {
    pub fn name(&self) -> &'static str {
        match self {
            Estimator::Linear { .. } => "linear",
            Estimator::RandomForest { .. } => "random_forest",
            Estimator::GradientBoosting { .. } => "gradient_boosting",
        }
    }

    /// Check the estimator can evaluate rows of width `n_features`.
    pub fn validate(&self, n_features: usize) -> Result<()> {
        let trees = match self {
            Estimator::Linear { coefficients, .. } => {
                if coefficients.len() != n_features {
                    bail!(
                        "linear model has {} coefficients for {n_features} features",
                        coefficients.len()
                    );
                }
                return Ok(());
            }
            Estimator::RandomForest { trees } => {
                if trees.is_empty() {
                    bail!("random forest has no trees");
                }
                trees
            }
            Estimator::GradientBoosting { trees, .. } => trees,
        };

        for (i, tree) in trees.iter().enumerate() {
            if let Some(idx) = tree.max_feature_idx().filter(|&idx| idx >= n_features) {
                bail!("tree {i} splits on feature {idx} but only {n_features} features exist");
            }
        }
        Ok(())
    }

    pub fn predict_row(&self, x: &[f64]) -> f64 {
        match self {
            Estimator::Linear {
                intercept,
                coefficients,
            } => intercept + coefficients.iter().zip(x).map(|(c, v)| c * v).sum::<f64>(),
            Estimator::RandomForest { trees } => {
                trees.iter().map(|t| t.predict_one(x)).sum::<f64>() / trees.len() as f64
            }
            Estimator::GradientBoosting {
                init,
                learning_rate,
                trees,
            } => init + learning_rate * trees.iter().map(|t| t.predict_one(x)).sum::<f64>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature_idx: usize, threshold: f64, left: f64, right: f64) -> TreeNode {
        TreeNode::Split {
            feature_idx,
            threshold,
            left: Box::new(TreeNode::Leaf { value: left }),
            right: Box::new(TreeNode::Leaf { value: right }),
        }
    }

    #[test]
    fn tree_threshold_goes_left_when_equal() {
        let tree = stump(0, 5.0, -1.0, 1.0);
        assert_eq!(tree.predict_one(&[5.0]), -1.0);
        assert_eq!(tree.predict_one(&[5.1]), 1.0);
    }

    #[test]
    fn ensembles_combine_trees() {
        let forest = Estimator::RandomForest {
            trees: vec![stump(0, 1.0, 10.0, 20.0), stump(1, 1.0, 30.0, 40.0)],
        };
        assert_eq!(forest.predict_row(&[0.0, 2.0]), 25.0);

        let boosted = Estimator::GradientBoosting {
            init: 100.0,
            learning_rate: 0.5,
            trees: vec![stump(0, 1.0, 10.0, 20.0), stump(1, 1.0, 30.0, 40.0)],
        };
        assert_eq!(boosted.predict_row(&[2.0, 0.0]), 125.0);
    }

    #[test]
    fn validate_rejects_out_of_range_split() {
        let forest = Estimator::RandomForest {
            trees: vec![TreeNode::Split {
                feature_idx: 0,
                threshold: 0.0,
                left: Box::new(stump(3, 0.0, 1.0, 2.0)),
                right: Box::new(TreeNode::Leaf { value: 0.0 }),
            }],
        };
        assert!(forest.validate(4).is_ok());
        let err = forest.validate(3).unwrap_err();
        assert_eq!(err.to_string(), "tree 0 splits on feature 3 but only 3 features exist");

        let linear = Estimator::Linear {
            intercept: 0.0,
            coefficients: vec![1.0],
        };
        assert!(linear.validate(2).is_err());
        assert!(Estimator::RandomForest { trees: vec![] }.validate(1).is_err());
    }

    #[test]
    fn artifact_json_shape() {
        let json = r#"{
            "kind": "gradient_boosting",
            "init": 15000.0,
            "learning_rate": 0.1,
            "trees": [
                {"feature_idx": 0, "threshold": 4.5,
                 "left": {"value": 2000.0}, "right": {"value": -3000.0}}
            ]
        }"#;
        let estimator: Estimator = serde_json::from_str(json).unwrap();
        assert_eq!(estimator.name(), "gradient_boosting");
        assert_eq!(estimator.predict_row(&[3.0]), 15_200.0);
        assert_eq!(estimator.predict_row(&[6.0]), 14_700.0);
    }
}
