/*!
Annotated documents used by `errata`. The linguistic annotation itself (tokenization, tagging,
parsing) is computed elsewhere; this crate only holds the result and aligns it with the indices
used by relation-extraction corpora.

# Terminology
* A *token* is a single word of a document, along with its tags.
* A *layer* is one kind of tag computed for every token: part-of-speech, dependency relation,
    dependency head or named entity type.
* A *span* is a contiguous range of tokens. Spans always have an exclusive end. Corpora such as
    TACRED store inclusive ends; use [`Span::from_inclusive`] and [`Span::to_inclusive`] to go back
    and forth.
*/

mod align;
mod annotator;
mod normalize;

pub use align::{align_heads, entity_spans};
pub use annotator::{Annotator, Layer, PreTaggedAnnotator, TagLayers, WhitespaceAnnotator};
pub use normalize::{normalize_token, normalize_tokens};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;
use thiserror::Error;

/// Errors raised while building or aligning an annotated document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("the {layer} layer has {actual} entries but the document has {expected} tokens")]
    LengthMismatch {
        layer: Layer,
        expected: usize,
        actual: usize,
    },
    #[error("dependency head {head} of token {token} is outside of a document of {len} tokens")]
    HeadOutOfRange { token: usize, head: usize, len: usize },
    #[error("invalid span: start ({start}) must be smaller than end ({end})")]
    InvalidSpan { start: usize, end: usize },
    #[error("span {span} is outside of a document of {len} tokens")]
    SpanOutOfBounds { span: Span, len: usize },
    #[error("could not parse the entity tag `{0}`")]
    InvalidTag(String),
}

/// Range of tokens `[start, end)`. Deserialized spans go through [`Span::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSpan")]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Deserialize)]
struct RawSpan {
    start: usize,
    end: usize,
}

impl TryFrom<RawSpan> for Span {
    type Error = AnnotationError;

    fn try_from(raw: RawSpan) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl Span {
    pub fn new(start: usize, end: usize) -> Result<Self, AnnotationError> {
        if start >= end {
            return Err(AnnotationError::InvalidSpan { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds a span from a pair of indices where `end` is the index of the last token.
    pub fn from_inclusive(start: usize, end: usize) -> Result<Self, AnnotationError> {
        let exclusive = end
            .checked_add(1)
            .ok_or(AnnotationError::InvalidSpan { start, end })?;
        Self::new(start, exclusive)
    }

    /// Returns `(start, last)` where `last` is the index of the last token of the span.
    pub fn to_inclusive(&self) -> (usize, usize) {
        (self.start, self.end.saturating_sub(1))
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Checks that the span is not empty and fits in a document of `len` tokens.
    pub fn check_bounds(&self, len: usize) -> Result<(), AnnotationError> {
        if self.is_empty() {
            return Err(AnnotationError::InvalidSpan {
                start: self.start,
                end: self.end,
            });
        }
        if self.end > len {
            return Err(AnnotationError::SpanOutOfBounds { span: *self, len });
        }
        Ok(())
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A single token and the tags computed for it. Missing tags are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnnotatedToken {
    pub text: String,
    /// Part-of-speech tag.
    pub pos: String,
    /// Dependency relation to the head.
    pub dep: String,
    /// Zero-based index of the head. The root points at itself.
    pub head: usize,
    /// Named entity type, or an empty string outside of entities.
    pub ent_type: String,
    /// Whitespace following the token in the original text.
    pub whitespace: String,
}

impl AnnotatedToken {
    pub(crate) fn bare(text: String, index: usize) -> Self {
        Self {
            text,
            head: index,
            whitespace: String::from(" "),
            ..Default::default()
        }
    }
}

/// An entity found in a document, such as `PERSON` over tokens `[2, 4)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntitySpan {
    pub label: String,
    pub span: Span,
}

impl Display for EntitySpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.label, self.span.start, self.span.end)
    }
}

/// Tagged document, as returned by an [`Annotator`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnnotatedDoc {
    pub tokens: Vec<AnnotatedToken>,
    pub entities: Vec<EntitySpan>,
    /// Layers attached by the annotator.
    #[serde(default)]
    pub layers: BTreeSet<Layer>,
}

impl AnnotatedDoc {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Rebuilds the text of the document from the tokens and their trailing whitespace. The
    /// trailing whitespace of the last token is dropped.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for token in self.tokens.iter() {
            text.push_str(&token.text);
            text.push_str(&token.whitespace);
        }
        let trimmed = text.trim_end().len();
        text.truncate(trimmed);
        text
    }

    /// Text covered by `span`, tokens separated by a single space.
    pub fn span_text(&self, span: &Span) -> Result<String, AnnotationError> {
        span.check_bounds(self.len())?;
        let words: Vec<&str> = self.tokens[span.start..span.end]
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        Ok(words.join(" "))
    }

    pub fn words(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.text.clone()).collect()
    }

    pub fn pos(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.pos.clone()).collect()
    }

    pub fn deps(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.dep.clone()).collect()
    }

    pub fn heads(&self) -> Vec<usize> {
        self.tokens.iter().map(|t| t.head).collect()
    }

    pub fn ent_types(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.ent_type.clone()).collect()
    }

    /// Entity types in CoNLL style: `O` outside of entities.
    pub fn ner_tags(&self) -> Vec<String> {
        self.tokens
            .iter()
            .map(|t| match t.ent_type.as_str() {
                "" => String::from("O"),
                ent_type => String::from(ent_type),
            })
            .collect()
    }

    /// One-based heads where `0` marks the root, the inverse of [`align_heads`].
    pub fn conll_heads(&self) -> Vec<usize> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(i, t)| if t.head == i { 0 } else { t.head + 1 })
            .collect()
    }

    pub fn has_layer(&self, layer: Layer) -> bool {
        self.layers.contains(&layer)
    }
}
