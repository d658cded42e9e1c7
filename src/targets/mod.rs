/*!
Value objects attached to an instance: the annotated text ([`Target`], [`BinaryRelation`]) and
the groundtruth or predicted outputs ([`Label`]).
*/
mod instance;
mod label;
mod relation;

pub use instance::{Instance, InstanceKey};
pub use label::{Label, GROUNDTRUTH};
pub use relation::BinaryRelation;

use doc_annotation::{AnnotatedDoc, AnnotationError, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TargetError {
    #[error("the {role} entity {span} does not fit in target {qid} ({len} tokens)")]
    EntityOutOfBounds {
        qid: String,
        role: &'static str,
        span: Span,
        len: usize,
    },
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

/// A typed piece of text content. It holds the annotated document along with the id of the
/// instance it belongs to and its version. A target read from a corpus has version 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub qid: String,
    pub vid: u32,
    pub doc: AnnotatedDoc,
    /// Additional information about the target, such as entity types.
    #[serde(default)]
    pub metas: BTreeMap<String, serde_json::Value>,
}

impl Target {
    pub fn new<S: Into<String>>(qid: S, vid: u32, doc: AnnotatedDoc) -> Self {
        Self {
            qid: qid.into(),
            vid,
            doc,
            metas: BTreeMap::new(),
        }
    }

    pub fn with_metas(mut self, metas: BTreeMap<String, serde_json::Value>) -> Self {
        self.metas = metas;
        self
    }

    pub fn get_text(&self) -> String {
        self.doc.text()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.doc.words()
    }

    pub fn len(&self) -> usize {
        self.doc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metas.get(key)
    }
}
