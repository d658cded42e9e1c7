use super::{create_instance, example_id, sample_limit, DatasetReader, ReaderError};
use crate::targets::{BinaryRelation, Instance, Label, Target};
use doc_annotation::{Annotator, TagLayers, WhitespaceAnnotator};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// A line of a darkT file: `id \t relation \t <unused> \t sentence`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DarkTExample {
    pub id: String,
    pub relation: String,
    pub sentence: String,
}

impl DarkTExample {
    /// Parses a tab separated line. Lines with fewer than four fields are invalid.
    pub fn parse(line: &str, index: usize) -> Result<Self, ReaderError> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 4 {
            return Err(ReaderError::InvalidExample {
                index,
                message: format!("expected 4 tab separated fields, found {}", fields.len()),
            });
        }
        Ok(Self {
            id: example_id(Some(fields[0].trim()), index),
            relation: String::from(fields[1].trim()),
            sentence: String::from(fields[3].trim()),
        })
    }
}

/// Reader of the darkT corpus. Sentences are raw text without entity markup and are tokenized
/// without any tagging.
pub struct DarkTReader {
    annotator: Box<dyn Annotator>,
}

impl DarkTReader {
    pub fn new(annotator: Box<dyn Annotator>) -> Self {
        Self { annotator }
    }

    pub fn text_to_instance(&self, example: DarkTExample) -> Result<Instance, ReaderError> {
        let tokens = self.annotator.tokenize(&example.sentence);
        let doc = self.annotator.annotate(&tokens, &TagLayers::default())?;
        let target = Target::new(example.id.as_str(), 0, doc);
        let text = BinaryRelation::new(target, None, None)?;
        let groundtruth = Label::groundtruth(example.id.as_str(), example.relation, 0);
        Ok(create_instance(example.id, text, groundtruth))
    }

    /// Parses the non blank lines of the file. Examples are indexed by their position among them.
    fn read_examples(
        &self,
        path: &Path,
        sample_size: Option<usize>,
    ) -> Result<Vec<DarkTExample>, ReaderError> {
        let file = File::open(path).map_err(|e| ReaderError::io(path, e))?;
        let mut examples = vec![];
        let limit = sample_limit(sample_size);
        for line in BufReader::new(file).lines() {
            if examples.len() >= limit {
                break;
            }
            let line = line.map_err(|e| ReaderError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            examples.push(DarkTExample::parse(&line, examples.len())?);
        }
        Ok(examples)
    }
}

impl Default for DarkTReader {
    fn default() -> Self {
        Self::new(Box::new(WhitespaceAnnotator::new()))
    }
}

impl DatasetReader for DarkTReader {
    fn name(&self) -> &'static str {
        "darkT"
    }

    fn read_instances(
        &self,
        path: &Path,
        sample_size: Option<usize>,
    ) -> Result<Vec<Instance>, ReaderError> {
        let instances = self
            .read_examples(path, sample_size)?
            .into_iter()
            .map(|e| self.text_to_instance(e))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Read {} instances from {}", instances.len(), path.display());
        Ok(instances)
    }

    fn read_texts(
        &self,
        path: &Path,
        sample_size: Option<usize>,
    ) -> Result<Vec<String>, ReaderError> {
        Ok(self
            .read_examples(path, sample_size)?
            .into_iter()
            .map(|e| e.sentence)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_annotation::Layer;
    use rstest::rstest;

    #[test]
    fn test_parse_line() {
        let example =
            DarkTExample::parse("17\torg:founded_by\t0.93\tApple was founded by Jobs.", 0)
                .unwrap();
        assert_eq!(example.id, "17");
        assert_eq!(example.relation, "org:founded_by");
        assert_eq!(example.sentence, "Apple was founded by Jobs.");
    }

    #[rstest]
    #[case("17\torg:founded_by")]
    #[case("a sentence without tabs")]
    fn test_parse_invalid_line(#[case] line: &str) {
        assert!(matches!(
            DarkTExample::parse(line, 2),
            Err(ReaderError::InvalidExample { index: 2, .. })
        ));
    }

    #[test]
    fn test_text_to_instance() {
        let example = DarkTExample::parse("\tper:title\t-\tShe is the minister.", 5).unwrap();
        let instance = DarkTReader::default().text_to_instance(example).unwrap();
        assert_eq!(instance.qid, "5");
        assert_eq!(instance.groundtruth.text, "per:title");
        assert!(!instance.text.has_entity_pair());
        assert_eq!(
            instance.text.target.tokens(),
            vec!["She", "is", "the", "minister", "."]
        );
        assert!(!instance.text.target.doc.has_layer(Layer::Pos));
        assert!(!instance.text.target.doc.has_layer(Layer::Ner));
    }
}
