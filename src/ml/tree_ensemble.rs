//! Gradient-boosted decision trees (model A)
//!
//! Each tree is a flat node list whose root is node 0. A split sends the
//! sample left when `x[feature] < threshold`; a missing (NaN) value follows
//! `default_left`. The margin is `base_margin` plus the reached leaf of every
//! tree, and the probability is its logistic.
//!
//! ```json
//! {
//!   "n_features": 4,
//!   "base_margin": -0.2,
//!   "trees": [
//!     { "nodes": [
//!       { "feature": 0, "threshold": 0.5, "left": 1, "right": 2 },
//!       { "leaf": -0.4 },
//!       { "leaf": 0.7 }
//!     ] }
//!   ]
//! }
//! ```

use super::{sigmoid, Scorer};
use crate::error::AnalysisError;
use serde::Deserialize;
use std::path::Path;

/// One tree node
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Internal split
    Split {
        /// Feature index tested
        feature: usize,
        /// Go left when the value is below this
        threshold: f64,
        /// Node index for `x < threshold`
        left: usize,
        /// Node index otherwise
        right: usize,
        /// Direction taken for NaN (default: left)
        #[serde(default = "default_left")]
        default_left: bool,
    },
    /// Terminal node contributing to the margin
    Leaf {
        /// Margin contribution
        leaf: f64,
    },
}

fn default_left() -> bool {
    true
}

/// One regression tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tree {
    /// Flat node list, root at index 0
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { leaf } => return *leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = features[*feature];
                    let go_left = if x.is_nan() { *default_left } else { x < *threshold };
                    index = if go_left { *left } else { *right };
                }
            }
        }
    }

    fn validate(&self, tree: usize, n_features: usize) -> Result<(), AnalysisError> {
        if self.nodes.is_empty() {
            return Err(AnalysisError::Configuration(format!("tree {} has no nodes", tree)));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { leaf } if !leaf.is_finite() => {
                    return Err(AnalysisError::Configuration(format!(
                        "tree {} node {}: leaf value is not finite",
                        tree, i
                    )));
                }
                TreeNode::Leaf { .. } => {}
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(AnalysisError::Configuration(format!(
                            "tree {} node {}: feature {} out of range ({} features)",
                            tree, i, feature, n_features
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(AnalysisError::Configuration(format!(
                            "tree {} node {}: threshold is not finite",
                            tree, i
                        )));
                    }
                    // Children after their parent rules out cycles
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(AnalysisError::Configuration(format!(
                                "tree {} node {}: child {} must follow it and be below {}",
                                tree,
                                i,
                                child,
                                self.nodes.len()
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Boosted tree ensemble with a logistic link
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TreeEnsemble {
    n_features: usize,
    #[serde(default)]
    base_margin: f64,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Build and validate an ensemble
    pub fn new(n_features: usize, base_margin: f64, trees: Vec<Tree>) -> Result<Self, AnalysisError> {
        let ensemble = Self {
            n_features,
            base_margin,
            trees,
        };
        ensemble.validate()?;
        Ok(ensemble)
    }

    /// Load from a JSON artifact
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let ensemble: Self = super::read_artifact(path.as_ref(), "tree ensemble")?;
        ensemble.validate()?;
        log::info!(
            "Tree ensemble: {} trees over {} features",
            ensemble.trees.len(),
            ensemble.n_features
        );
        Ok(ensemble)
    }

    /// Parse from JSON text
    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        let ensemble: Self = serde_json::from_str(text)
            .map_err(|e| AnalysisError::Configuration(format!("invalid tree ensemble: {}", e)))?;
        ensemble.validate()?;
        Ok(ensemble)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if self.n_features == 0 {
            return Err(AnalysisError::Configuration(
                "tree ensemble declares zero features".to_string(),
            ));
        }
        if !self.base_margin.is_finite() {
            return Err(AnalysisError::Configuration(
                "tree ensemble base_margin is not finite".to_string(),
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.n_features)?;
        }
        Ok(())
    }

    /// Raw margin before the logistic
    pub fn margin(&self, features: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.leaf_value(features)).sum::<f64>()
    }
}

impl Scorer for TreeEnsemble {
    fn name(&self) -> &str {
        "tree ensemble"
    }

    fn input_len(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn score(&self, features: &[f64]) -> Result<f64, AnalysisError> {
        if features.len() != self.n_features {
            return Err(AnalysisError::ModelInference(format!(
                "tree ensemble expects {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        Ok(sigmoid(self.margin(features)))
    }
}
