use super::{BinaryRelation, Label};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Identifies an instance: its id and its version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceKey {
    pub qid: String,
    pub vid: u32,
}

impl Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.qid, self.vid)
    }
}

/// A single example used for evaluation: the text, its groundtruth and the predictions of the
/// models that ran on it, keyed by model name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub qid: String,
    pub vid: u32,
    pub text: BinaryRelation,
    pub groundtruth: Label,
    #[serde(default)]
    pub predictions: BTreeMap<String, Label>,
}

impl Instance {
    pub fn new<Q: Into<String>>(qid: Q, vid: u32, text: BinaryRelation, groundtruth: Label) -> Self {
        Self {
            qid: qid.into(),
            vid,
            text,
            groundtruth,
            predictions: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> InstanceKey {
        InstanceKey {
            qid: self.qid.clone(),
            vid: self.vid,
        }
    }

    /// Stores a prediction under its model name. Returns the prediction it replaced, if any.
    pub fn add_prediction(&mut self, label: Label) -> Option<Label> {
        self.predictions.insert(label.model.clone(), label)
    }

    pub fn prediction(&self, model: &str) -> Option<&Label> {
        self.predictions.get(model)
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.predictions.keys().map(|k| k.as_str())
    }
}
