use super::{Target, TargetError};
use doc_annotation::Span;
use serde::{Deserialize, Serialize};

/// A relation between two entity spans of a target. The head is the subject of the relation and
/// the tail its object. Corpora without entity markup produce relations without spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryRelation {
    pub target: Target,
    pub head: Option<Span>,
    pub tail: Option<Span>,
}

impl BinaryRelation {
    pub fn new(
        target: Target,
        head: Option<Span>,
        tail: Option<Span>,
    ) -> Result<Self, TargetError> {
        for (role, span) in [("head", head), ("tail", tail)] {
            if let Some(span) = span {
                if span.check_bounds(target.len()).is_err() {
                    return Err(TargetError::EntityOutOfBounds {
                        qid: target.qid.clone(),
                        role,
                        span,
                        len: target.len(),
                    });
                }
            }
        }
        Ok(Self { target, head, tail })
    }

    pub fn qid(&self) -> &str {
        &self.target.qid
    }

    pub fn vid(&self) -> u32 {
        self.target.vid
    }

    pub fn get_text(&self) -> String {
        self.target.get_text()
    }

    pub fn head_text(&self) -> Option<String> {
        self.head.and_then(|s| self.target.doc.span_text(&s).ok())
    }

    pub fn tail_text(&self) -> Option<String> {
        self.tail.and_then(|s| self.target.doc.span_text(&s).ok())
    }

    pub fn has_entity_pair(&self) -> bool {
        self.head.is_some() && self.tail.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_annotation::{Annotator, PreTaggedAnnotator, TagLayers};

    fn target() -> Target {
        let tokens: Vec<String> = ["Bill", "Gates", "founded", "Microsoft", "."]
            .iter()
            .map(|t| String::from(*t))
            .collect();
        let doc = PreTaggedAnnotator::new()
            .annotate(&tokens, &TagLayers::default())
            .unwrap();
        Target::new("q1", 0, doc)
    }

    #[test]
    fn test_entity_texts() {
        let relation = BinaryRelation::new(
            target(),
            Some(Span::new(0, 2).unwrap()),
            Some(Span::new(3, 4).unwrap()),
        )
        .unwrap();
        assert_eq!(relation.head_text().unwrap(), "Bill Gates");
        assert_eq!(relation.tail_text().unwrap(), "Microsoft");
        assert_eq!(relation.get_text(), "Bill Gates founded Microsoft .");
        assert!(relation.has_entity_pair());
    }

    #[test]
    fn test_out_of_bounds_entity() {
        let tail = Span::new(4, 6).unwrap();
        let err = BinaryRelation::new(target(), Some(Span::new(0, 2).unwrap()), Some(tail));
        assert_eq!(
            err,
            Err(TargetError::EntityOutOfBounds {
                qid: String::from("q1"),
                role: "tail",
                span: tail,
                len: 5
            })
        );
    }

    #[test]
    fn test_relation_without_entities() {
        let relation = BinaryRelation::new(target(), None, None).unwrap();
        assert!(!relation.has_entity_pair());
        assert_eq!(relation.head_text(), None);
    }
}
