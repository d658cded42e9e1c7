use crate::{align_heads, entity_spans, AnnotatedDoc, AnnotatedToken, AnnotationError};
use ahash::AHashSet;
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

/// Kind of tag computed for every token of a document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence, Serialize, Deserialize,
)]
pub enum Layer {
    Pos,
    Dep,
    Head,
    Ner,
}

impl Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pos => "pos",
            Self::Dep => "dep",
            Self::Head => "head",
            Self::Ner => "ner",
        };
        write!(f, "{}", name)
    }
}

impl Layer {
    /// Layers produced by a pipeline component (`tagger`, `parser` or `ner`).
    pub fn from_component(component: &str) -> &'static [Layer] {
        match component {
            "tagger" => &[Layer::Pos],
            "parser" => &[Layer::Dep, Layer::Head],
            "ner" => &[Layer::Ner],
            _ => &[],
        }
    }
}

/// Tags computed by an external pipeline, one entry per token. Dependency heads are one-based,
/// with `0` marking the root, as found in CoNLL style corpora.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagLayers {
    pub pos: Option<Vec<String>>,
    pub ner: Option<Vec<String>>,
    pub deprel: Option<Vec<String>>,
    pub heads: Option<Vec<usize>>,
}

/// The tagged-document contract. An annotator turns a list of tokens into an [`AnnotatedDoc`].
pub trait Annotator: Send + Sync {
    /// Builds a document from `tokens`, attaching whatever `layers` are available.
    fn annotate(&self, tokens: &[String], layers: &TagLayers)
        -> Result<AnnotatedDoc, AnnotationError>;

    /// Splits raw text into tokens.
    fn tokenize(&self, text: &str) -> Vec<String>;

    fn annotate_text(&self, text: &str) -> Result<AnnotatedDoc, AnnotationError> {
        let tokens = self.tokenize(text);
        self.annotate(&tokens, &TagLayers::default())
    }
}

fn check_len(layer: Layer, actual: Option<usize>, expected: usize) -> Result<(), AnnotationError> {
    match actual {
        Some(actual) if actual != expected => Err(AnnotationError::LengthMismatch {
            layer,
            expected,
            actual,
        }),
        _ => Ok(()),
    }
}

/// Annotator for pre-tokenized corpora that already ship their tags. The tags are aligned with
/// the tokens and copied into the document. Layers can be switched off with [`Self::disable`].
#[derive(Debug, Clone, Default)]
pub struct PreTaggedAnnotator {
    disabled: AHashSet<Layer>,
}

impl PreTaggedAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disable(mut self, layers: &[Layer]) -> Self {
        self.disabled.extend(layers.iter().copied());
        self
    }

    pub fn is_enabled(&self, layer: Layer) -> bool {
        !self.disabled.contains(&layer)
    }
}

impl Annotator for PreTaggedAnnotator {
    fn annotate(
        &self,
        tokens: &[String],
        layers: &TagLayers,
    ) -> Result<AnnotatedDoc, AnnotationError> {
        let len = tokens.len();
        let pos = layers.pos.as_ref().filter(|_| self.is_enabled(Layer::Pos));
        let ner = layers.ner.as_ref().filter(|_| self.is_enabled(Layer::Ner));
        let deprel = layers.deprel.as_ref().filter(|_| self.is_enabled(Layer::Dep));
        let heads = layers.heads.as_ref().filter(|_| self.is_enabled(Layer::Head));
        check_len(Layer::Pos, pos.map(Vec::len), len)?;
        check_len(Layer::Ner, ner.map(Vec::len), len)?;
        check_len(Layer::Dep, deprel.map(Vec::len), len)?;
        check_len(Layer::Head, heads.map(Vec::len), len)?;

        let aligned_heads = match heads {
            Some(h) => Some(align_heads(h, len)?),
            None => None,
        };
        let entities = match ner {
            Some(tags) => entity_spans(tags)?,
            None => vec![],
        };

        let mut doc_tokens: Vec<AnnotatedToken> = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| AnnotatedToken::bare(t.clone(), i))
            .collect();
        for (i, token) in doc_tokens.iter_mut().enumerate() {
            if let Some(pos) = pos {
                token.pos = pos[i].clone();
            }
            if let Some(deprel) = deprel {
                token.dep = deprel[i].clone();
            }
            if let Some(heads) = &aligned_heads {
                token.head = heads[i];
            }
        }
        for entity in entities.iter() {
            for token in doc_tokens[entity.span.start..entity.span.end].iter_mut() {
                token.ent_type = entity.label.clone();
            }
        }
        let attached: BTreeSet<Layer> = [
            (Layer::Pos, pos.is_some()),
            (Layer::Ner, ner.is_some()),
            (Layer::Dep, deprel.is_some()),
            (Layer::Head, heads.is_some()),
        ]
        .into_iter()
        .filter_map(|(layer, present)| present.then_some(layer))
        .collect();
        Ok(AnnotatedDoc {
            tokens: doc_tokens,
            entities,
            layers: attached,
        })
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(String::from).collect()
    }
}

/// Annotator for raw sentences. Splits on whitespace and detaches punctuation glued to the start
/// or the end of a word. It produces untagged documents.
#[derive(Debug, Clone)]
pub struct WhitespaceAnnotator {
    inner: PreTaggedAnnotator,
}

impl WhitespaceAnnotator {
    pub fn new() -> Self {
        let every_layer: Vec<Layer> = ["tagger", "parser", "ner"]
            .iter()
            .flat_map(|c| Layer::from_component(c).iter().copied())
            .collect();
        Self {
            inner: PreTaggedAnnotator::new().disable(&every_layer),
        }
    }
}

impl Default for WhitespaceAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator for WhitespaceAnnotator {
    fn annotate(
        &self,
        tokens: &[String],
        layers: &TagLayers,
    ) -> Result<AnnotatedDoc, AnnotationError> {
        self.inner.annotate(tokens, layers)
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = vec![];
        for word in text.split_whitespace() {
            let core = word.trim_matches(|c: char| c.is_ascii_punctuation());
            if core.is_empty() {
                tokens.extend(word.chars().map(String::from));
                continue;
            }
            let start = word.len()
                - word
                    .trim_start_matches(|c: char| c.is_ascii_punctuation())
                    .len();
            let end = start + core.len();
            tokens.extend(word[..start].chars().map(String::from));
            tokens.push(String::from(core));
            tokens.extend(word[end..].chars().map(String::from));
        }
        tokens
    }
}
