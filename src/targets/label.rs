use crate::evaluator::TaskEvaluator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Model name reserved for the labels read from a corpus.
pub const GROUNDTRUTH: &str = "groundtruth";

/// A predicted or groundtruth output, drawn from a predefined set of classes (e.g. the relation
/// names of TACRED). A label remembers how it performed against the groundtruth in `perform`,
/// keyed by metric name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Name of the model that produced this label, or [`GROUNDTRUTH`].
    pub model: String,
    pub qid: String,
    pub vid: u32,
    pub text: String,
    #[serde(default)]
    pub perform: BTreeMap<String, f32>,
}

impl Label {
    pub fn new<M, Q, T>(model: M, qid: Q, text: T, vid: u32) -> Self
    where
        M: Into<String>,
        Q: Into<String>,
        T: Into<String>,
    {
        Self {
            model: model.into(),
            qid: qid.into(),
            vid,
            text: text.into(),
            perform: BTreeMap::new(),
        }
    }

    pub fn groundtruth<Q: Into<String>, T: Into<String>>(qid: Q, text: T, vid: u32) -> Self {
        Self::new(GROUNDTRUTH, qid, text, vid)
    }

    pub fn is_groundtruth(&self) -> bool {
        self.model == GROUNDTRUTH
    }

    /// Scores this label against the groundtruths and stores the result. When more than one
    /// groundtruth is given, each metric keeps its best value.
    pub fn compute_perform(&mut self, groundtruths: &[&Label], evaluator: TaskEvaluator) {
        let golds: Vec<&str> = groundtruths.iter().map(|g| g.text.as_str()).collect();
        for (metric, value) in evaluator.evaluate(&self.text, &golds) {
            self.perform.insert(metric, value);
        }
    }

    pub fn set_perform<S: Into<String>>(&mut self, metric: S, value: f32) {
        self.perform.insert(metric.into(), value);
    }

    pub fn get_perform(&self, metric: &str) -> Option<f32> {
        self.perform.get(metric).copied()
    }

    /// Value of the primary metric of the task, if it has been computed.
    pub fn primary_perform(&self, evaluator: TaskEvaluator) -> Option<f32> {
        self.get_perform(evaluator.primary_metric())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("per:employee_of", 1.0)]
    #[case("no_relation", 0.0)]
    fn test_compute_perform(#[case] predicted: &str, #[case] expected: f32) {
        let gold = Label::groundtruth("q1", "per:employee_of", 0);
        let mut label = Label::new("model", "q1", predicted, 0);
        label.compute_perform(&[&gold], TaskEvaluator::Accuracy);
        assert_eq!(label.get_perform("accuracy"), Some(expected));
        assert_eq!(label.primary_perform(TaskEvaluator::Accuracy), Some(expected));
    }

    #[test]
    fn test_best_of_many_groundtruths() {
        let golds = [
            Label::groundtruth("q1", "org:founded_by", 0),
            Label::groundtruth("q1", "per:employee_of", 0),
        ];
        let mut label = Label::new("model", "q1", "per:employee_of", 0);
        label.compute_perform(&golds.iter().collect::<Vec<_>>(), TaskEvaluator::Accuracy);
        assert_eq!(label.get_perform("accuracy"), Some(1.0));
    }

    #[test]
    fn test_set_perform() {
        let mut label = Label::new("model", "q1", "no_relation", 0);
        assert!(!label.is_groundtruth());
        assert_eq!(label.get_perform("confidence"), None);
        label.set_perform("confidence", 0.75);
        assert_eq!(label.get_perform("confidence"), Some(0.75));
        assert!(Label::groundtruth("q1", "no_relation", 0).is_groundtruth());
    }
}
