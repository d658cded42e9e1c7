use super::{create_instance, example_id, sample_limit, DatasetReader, ReaderError};
use crate::targets::{BinaryRelation, Instance, Label, Target};
use doc_annotation::{normalize_tokens, Annotator, PreTaggedAnnotator, Span, TagLayers};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// A single example of a TACRED json file. Entity spans are inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacredExample {
    #[serde(default)]
    pub id: Option<String>,
    pub relation: String,
    pub token: Vec<String>,
    pub subj_start: usize,
    pub subj_end: usize,
    pub obj_start: usize,
    pub obj_end: usize,
    #[serde(default)]
    pub subj_type: Option<String>,
    #[serde(default)]
    pub obj_type: Option<String>,
    #[serde(default)]
    pub stanford_pos: Option<Vec<String>>,
    #[serde(default)]
    pub stanford_ner: Option<Vec<String>>,
    #[serde(default)]
    pub stanford_deprel: Option<Vec<String>>,
    #[serde(default)]
    pub stanford_head: Option<Vec<usize>>,
}

impl TacredExample {
    /// Tokens with the PTB bracket escapes replaced by the brackets.
    pub fn normalized_tokens(&self) -> Vec<String> {
        normalize_tokens(&self.token)
    }

    fn layers(&self) -> TagLayers {
        TagLayers {
            pos: self.stanford_pos.clone(),
            ner: self.stanford_ner.clone(),
            deprel: self.stanford_deprel.clone(),
            heads: self.stanford_head.clone(),
        }
    }
}

/// Reader of the TACRED relation extraction corpus: a json array of examples.
pub struct TacredReader {
    annotator: Box<dyn Annotator>,
}

impl TacredReader {
    pub fn new(annotator: Box<dyn Annotator>) -> Self {
        Self { annotator }
    }

    /// Builds the instance of an example. The relation becomes the groundtruth label and the
    /// entity types are kept in the metas of the target.
    pub fn text_to_instance(
        &self,
        example: TacredExample,
        index: usize,
    ) -> Result<Instance, ReaderError> {
        let qid = example_id(example.id.as_deref(), index);
        let tokens = example.normalized_tokens();
        let invalid = |e: doc_annotation::AnnotationError| ReaderError::InvalidExample {
            index,
            message: e.to_string(),
        };
        let head = Span::from_inclusive(example.subj_start, example.subj_end).map_err(invalid)?;
        let tail = Span::from_inclusive(example.obj_start, example.obj_end).map_err(invalid)?;
        let doc = self.annotator.annotate(&tokens, &example.layers())?;

        let mut metas = BTreeMap::new();
        for (key, value) in [("subj_type", &example.subj_type), ("obj_type", &example.obj_type)] {
            if let Some(value) = value {
                metas.insert(String::from(key), serde_json::Value::from(value.as_str()));
            }
        }
        let target = Target::new(qid.as_str(), 0, doc).with_metas(metas);
        let text = BinaryRelation::new(target, Some(head), Some(tail))?;
        let groundtruth = Label::groundtruth(qid.as_str(), example.relation, 0);
        Ok(create_instance(qid, text, groundtruth))
    }

    fn read_examples(&self, path: &Path) -> Result<Vec<TacredExample>, ReaderError> {
        let file = File::open(path).map_err(|e| ReaderError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ReaderError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for TacredReader {
    fn default() -> Self {
        Self::new(Box::new(PreTaggedAnnotator::new()))
    }
}

impl DatasetReader for TacredReader {
    fn name(&self) -> &'static str {
        "tacred"
    }

    fn read_instances(
        &self,
        path: &Path,
        sample_size: Option<usize>,
    ) -> Result<Vec<Instance>, ReaderError> {
        let examples = self.read_examples(path)?;
        let limit = sample_limit(sample_size);
        let instances = examples
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, example)| self.text_to_instance(example, index))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Read {} instances from {}", instances.len(), path.display());
        Ok(instances)
    }

    fn read_texts(
        &self,
        path: &Path,
        sample_size: Option<usize>,
    ) -> Result<Vec<String>, ReaderError> {
        let examples = self.read_examples(path)?;
        debug!("Read {} examples from {}", examples.len(), path.display());
        Ok(examples
            .iter()
            .take(sample_limit(sample_size))
            .map(|e| e.normalized_tokens().join(" "))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_annotation::Layer;

    fn example() -> TacredExample {
        serde_json::from_str(
            r#"{
                "id": "e7798fb926b9403cfcd2",
                "relation": "per:title",
                "token": ["-LRB-", "Tom", "Thabane", "-RRB-", "is", "the", "minister", "."],
                "subj_start": 1, "subj_end": 2,
                "obj_start": 6, "obj_end": 6,
                "subj_type": "PERSON", "obj_type": "TITLE",
                "stanford_pos": ["-LRB-", "NNP", "NNP", "-RRB-", "VBZ", "DT", "NN", "."],
                "stanford_ner": ["O", "PERSON", "PERSON", "O", "O", "O", "TITLE", "O"],
                "stanford_deprel": ["punct", "compound", "nsubj", "punct", "cop", "det", "ROOT", "punct"],
                "stanford_head": [3, 3, 7, 3, 7, 7, 0, 7]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_text_to_instance() {
        let instance = TacredReader::default()
            .text_to_instance(example(), 0)
            .unwrap();
        assert_eq!(instance.qid, "e7798fb926b9403cfcd2");
        assert_eq!(instance.vid, 0);
        assert_eq!(instance.groundtruth.text, "per:title");
        assert!(instance.groundtruth.is_groundtruth());
        assert_eq!(instance.text.head, Some(Span::new(1, 3).unwrap()));
        assert_eq!(instance.text.tail, Some(Span::new(6, 7).unwrap()));
        assert_eq!(instance.text.head_text().as_deref(), Some("Tom Thabane"));
        assert_eq!(instance.text.tail_text().as_deref(), Some("minister"));
        assert!(instance.text.get_text().starts_with("( Tom Thabane )"));
        assert_eq!(
            instance.text.target.meta("subj_type"),
            Some(&serde_json::Value::from("PERSON"))
        );
        let doc = &instance.text.target.doc;
        assert!(doc.has_layer(Layer::Pos));
        assert_eq!(doc.heads()[2], 6);
        assert_eq!(doc.heads()[6], 6);
    }

    #[test]
    fn test_missing_id_uses_index() {
        let mut example = example();
        example.id = None;
        let instance = TacredReader::default().text_to_instance(example, 12).unwrap();
        assert_eq!(instance.qid, "12");
        assert_eq!(instance.groundtruth.qid, "12");
    }

    #[test]
    fn test_entity_out_of_bounds() {
        let mut example = example();
        example.obj_start = 9;
        example.obj_end = 10;
        assert!(matches!(
            TacredReader::default().text_to_instance(example, 0),
            Err(ReaderError::Target(_))
        ));
    }

    #[test]
    fn test_reversed_span() {
        let mut example = example();
        example.subj_start = 3;
        example.subj_end = 1;
        assert!(matches!(
            TacredReader::default().text_to_instance(example, 4),
            Err(ReaderError::InvalidExample { index: 4, .. })
        ));
    }

    #[test]
    fn test_misaligned_tags() {
        let mut example = example();
        example.stanford_pos = Some(vec![String::from("NN")]);
        assert!(matches!(
            TacredReader::default().text_to_instance(example, 0),
            Err(ReaderError::Annotation(_))
        ));
    }
}
