//! Two-model ensemble with weighted probability fusion
//!
//! `fused = tree_weight * model_a + sequence_weight * model_b`, labelled
//! positive only when strictly above the threshold. A fused score exactly at
//! the threshold is negative.

use super::Scorer;
use crate::error::AnalysisError;
use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};

/// Tolerance on the weight sum
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Fusion weights and decision threshold
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FusionRule {
    /// Weight of model A, the tree ensemble (default: 0.4)
    pub tree_weight: f64,

    /// Weight of model B, the sequence model (default: 0.6)
    pub sequence_weight: f64,

    /// Fused probability must exceed this to be positive (default: 0.5)
    pub threshold: f64,
}

impl Default for FusionRule {
    fn default() -> Self {
        Self {
            tree_weight: 0.4,
            sequence_weight: 0.6,
            threshold: 0.5,
        }
    }
}

impl FusionRule {
    /// Check that weights lie in [0, 1] and sum to 1, and the threshold lies in [0, 1]
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let unit = |x: f64| x.is_finite() && (0.0..=1.0).contains(&x);
        if !unit(self.tree_weight) || !unit(self.sequence_weight) {
            return Err(AnalysisError::Configuration(format!(
                "Fusion weights must be in [0, 1], got {} and {}",
                self.tree_weight, self.sequence_weight
            )));
        }
        if (self.tree_weight + self.sequence_weight - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AnalysisError::Configuration(format!(
                "Fusion weights must sum to 1.0, got {}",
                self.tree_weight + self.sequence_weight
            )));
        }
        if !unit(self.threshold) {
            return Err(AnalysisError::Configuration(format!(
                "Decision threshold must be in [0, 1], got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Weighted average of the two probabilities
    pub fn fuse(&self, model_a: f64, model_b: f64) -> f64 {
        self.tree_weight * model_a + self.sequence_weight * model_b
    }

    /// Label for a fused probability; ties go negative
    pub fn decide(&self, fused: f64) -> Prediction {
        if fused > self.threshold {
            Prediction::Positive
        } else {
            Prediction::Negative
        }
    }
}

/// Binary label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    /// Disorder likely
    Positive,
    /// Disorder not indicated
    Negative,
}

/// Scores from both models and their fusion, all in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Tree ensemble probability
    pub model_a: f64,
    /// Sequence model probability
    pub model_b: f64,
    /// Weighted fusion
    pub fused: f64,
    /// Label from the fused probability
    pub prediction: Prediction,
}

/// Tree model + sequence model + fusion rule
pub struct EnsembleClassifier {
    tree: Box<dyn Scorer>,
    sequence: Box<dyn Scorer>,
    rule: FusionRule,
}

impl std::fmt::Debug for EnsembleClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleClassifier")
            .field("tree", &self.tree.name())
            .field("sequence", &self.sequence.name())
            .field("rule", &self.rule)
            .finish()
    }
}

impl EnsembleClassifier {
    /// Combine two scorers under a fusion rule
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Configuration` if the rule is invalid.
    pub fn new(
        tree: Box<dyn Scorer>,
        sequence: Box<dyn Scorer>,
        rule: FusionRule,
    ) -> Result<Self, AnalysisError> {
        rule.validate()?;
        Ok(Self {
            tree,
            sequence,
            rule,
        })
    }

    /// The fusion rule in use
    pub fn rule(&self) -> &FusionRule {
        &self.rule
    }

    /// Model A
    pub fn tree_model(&self) -> &dyn Scorer {
        self.tree.as_ref()
    }

    /// Model B
    pub fn sequence_model(&self) -> &dyn Scorer {
        self.sequence.as_ref()
    }

    /// Score a normalized vector with both models and fuse
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ModelInference` if either model fails or
    /// returns a non-finite value or one outside [0, 1].
    pub fn classify(&self, vector: &FeatureVector) -> Result<Classification, AnalysisError> {
        log::debug!("Classifying {}-dimensional vector", vector.len());

        let model_a = run_scorer(self.tree.as_ref(), vector.values())?;
        let model_b = run_scorer(self.sequence.as_ref(), vector.values())?;
        let fused = self.rule.fuse(model_a, model_b);
        let prediction = self.rule.decide(fused);

        log::debug!(
            "Scores: model A={:.4}, model B={:.4}, fused={:.4} -> {:?}",
            model_a,
            model_b,
            fused,
            prediction
        );

        Ok(Classification {
            model_a,
            model_b,
            fused,
            prediction,
        })
    }
}

fn run_scorer(scorer: &dyn Scorer, features: &[f64]) -> Result<f64, AnalysisError> {
    let score = scorer.score(features).map_err(|e| match e {
        AnalysisError::ModelInference(msg) => AnalysisError::ModelInference(msg),
        other => AnalysisError::ModelInference(format!("{}: {}", scorer.name(), other)),
    })?;

    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(AnalysisError::ModelInference(format!(
            "{} returned {}, expected a probability in [0, 1]",
            scorer.name(),
            score
        )));
    }
    Ok(score)
}

#[cfg(test)]
pub(crate) mod test_scorers {
    //! Scorer doubles

    use super::*;

    /// Returns the same value for every input
    pub struct Fixed(pub f64);

    impl Scorer for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn score(&self, _features: &[f64]) -> Result<f64, AnalysisError> {
            Ok(self.0)
        }
    }

    /// Always fails
    pub struct Broken;

    impl Scorer for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn score(&self, _features: &[f64]) -> Result<f64, AnalysisError> {
            Err(AnalysisError::ModelInference("shape mismatch".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_scorers::*;
    use super::*;
    use crate::features::BiomarkerLayout;

    fn vector() -> FeatureVector {
        FeatureVector::new(BiomarkerLayout::Core, vec![0.1, -0.3, 1.2, 0.0]).unwrap()
    }

    fn ensemble(a: f64, b: f64) -> EnsembleClassifier {
        EnsembleClassifier::new(Box::new(Fixed(a)), Box::new(Fixed(b)), FusionRule::default())
            .unwrap()
    }

    #[test]
    fn test_weighted_fusion_positive() {
        let c = ensemble(0.2, 0.8).classify(&vector()).unwrap();
        assert_eq!(c.model_a, 0.2);
        assert_eq!(c.model_b, 0.8);
        assert!((c.fused - 0.56).abs() < 1e-12);
        assert_eq!(c.prediction, Prediction::Positive);
    }

    #[test]
    fn test_threshold_tie_is_negative() {
        let c = ensemble(0.5, 0.5).classify(&vector()).unwrap();
        assert_eq!(c.fused, 0.5);
        assert_eq!(c.prediction, Prediction::Negative);
    }

    #[test]
    fn test_fused_stays_in_unit_interval() {
        for (a, b) in [(0.0, 0.0), (1.0, 1.0), (0.0, 1.0), (1.0, 0.0), (0.33, 0.71)] {
            let c = ensemble(a, b).classify(&vector()).unwrap();
            assert!((0.0..=1.0).contains(&c.fused));
            assert_eq!(c.prediction == Prediction::Positive, c.fused > 0.5);
        }
    }

    #[test]
    fn test_out_of_range_score_not_clamped() {
        for bad in [1.2, -0.1, f64::NAN, f64::INFINITY] {
            let result = ensemble(bad, 0.5).classify(&vector());
            assert!(matches!(result, Err(AnalysisError::ModelInference(_))), "{}", bad);
        }
    }

    #[test]
    fn test_scorer_failure_is_inference_error() {
        let ensemble =
            EnsembleClassifier::new(Box::new(Fixed(0.3)), Box::new(Broken), FusionRule::default())
                .unwrap();
        let err = ensemble.classify(&vector()).unwrap_err();
        assert!(matches!(err, AnalysisError::ModelInference(_)));
        assert!(err.to_string().contains("shape mismatch"));
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let rules = [
            FusionRule {
                tree_weight: 0.5,
                sequence_weight: 0.6,
                threshold: 0.5,
            },
            FusionRule {
                tree_weight: -0.2,
                sequence_weight: 1.2,
                threshold: 0.5,
            },
            FusionRule {
                threshold: 1.5,
                ..Default::default()
            },
            FusionRule {
                tree_weight: f64::NAN,
                ..Default::default()
            },
        ];
        for rule in rules {
            let result = EnsembleClassifier::new(Box::new(Fixed(0.1)), Box::new(Fixed(0.1)), rule);
            assert!(matches!(result, Err(AnalysisError::Configuration(_))));
        }
    }

    #[test]
    fn test_custom_rule() {
        let rule = FusionRule {
            tree_weight: 0.5,
            sequence_weight: 0.5,
            threshold: 0.3,
        };
        let ensemble =
            EnsembleClassifier::new(Box::new(Fixed(0.2)), Box::new(Fixed(0.5)), rule).unwrap();
        let c = ensemble.classify(&vector()).unwrap();
        assert!((c.fused - 0.35).abs() < 1e-12);
        assert_eq!(c.prediction, Prediction::Positive);
    }
}
