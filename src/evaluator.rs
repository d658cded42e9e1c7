/*!
Instance level scoring. A `TaskEvaluator` is handed explicitly to whatever computes the
performance of a label: the readers expose the one their task uses, the predictors receive it.
*/
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Returns `1.0` when the prediction matches the groundtruth exactly, `0.0` otherwise.
pub fn accuracy_score(predicted: &str, groundtruth: &str) -> f32 {
    if predicted == groundtruth {
        1.0
    } else {
        0.0
    }
}

/// Scoring function of a task and its primary metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskEvaluator {
    #[default]
    Accuracy,
}

impl TaskEvaluator {
    pub fn primary_metric(&self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
        }
    }

    /// Scores `predicted` against every groundtruth and keeps the best value of each metric. An
    /// empty list of groundtruths scores 0.
    pub fn evaluate(&self, predicted: &str, groundtruths: &[&str]) -> BTreeMap<String, f32> {
        let best = match self {
            Self::Accuracy => groundtruths
                .iter()
                .map(|g| accuracy_score(predicted, g))
                .fold(0.0, f32::max),
        };
        BTreeMap::from([(String::from(self.primary_metric()), best)])
    }
}

impl Display for TaskEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.primary_metric())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown task evaluator `{0}`")]
pub struct UnknownEvaluator(String);

impl FromStr for TaskEvaluator {
    type Err = UnknownEvaluator;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accuracy" | "accuracy_score" => Ok(Self::Accuracy),
            _ => Err(UnknownEvaluator(String::from(s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn test_evaluate_without_groundtruth() {
        let scores = TaskEvaluator::Accuracy.evaluate("per:title", &[]);
        assert_eq!(scores.get("accuracy"), Some(&0.0));
    }

    #[test]
    fn test_parse() {
        assert_eq!("Accuracy".parse::<TaskEvaluator>(), Ok(TaskEvaluator::Accuracy));
        assert!("f1".parse::<TaskEvaluator>().is_err());
        assert_eq!(TaskEvaluator::Accuracy.to_string(), "accuracy");
    }

    quickcheck! {
        fn prop_accuracy_is_reflexive(label: String) -> bool {
            accuracy_score(&label, &label) == 1.0
        }

        fn prop_accuracy_is_binary(a: String, b: String) -> bool {
            let score = accuracy_score(&a, &b);
            score == 0.0 || score == 1.0
        }
    }
}
