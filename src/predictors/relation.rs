use super::{ArchiveConfig, ArchivePredictor, BackendLoader, ModelBackend, Predictor, PredictorError};
use crate::evaluator::TaskEvaluator;
use crate::targets::{BinaryRelation, Instance, Label};
use ahash::{HashMap as AHashMap, HashMapExt};
use doc_annotation::{AnnotatedDoc, Layer};
use ndarray::Array1;
use ndarray_stats::QuantileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Metrics stored on the labels of relation predictors.
pub const RELATION_METRICS: [&str; 2] = ["accuracy", "confidence"];

/// Inputs of a relation extraction model. Entity spans are inclusive on both ends. The tag layers
/// follow the CoNLL conventions of the corpora the models are trained on: `O` outside of entities
/// and one-based heads with `0` for the root. Missing layers are sent empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationInput {
    pub text: String,
    pub head: Option<(usize, usize)>,
    pub tail: Option<(usize, usize)>,
    #[serde(rename = "id_")]
    pub id: Option<String>,
    pub ner: Vec<String>,
    pub pos: Vec<String>,
    pub dep: Vec<String>,
    pub dep_heads: Vec<usize>,
}

impl RelationInput {
    /// Inputs built from a relation. The tags of the document are sent along when available.
    pub fn from_relation(relation: &BinaryRelation) -> Self {
        let doc = &relation.target.doc;
        Self {
            text: relation.get_text(),
            head: relation.head.map(|s| s.to_inclusive()),
            tail: relation.tail.map(|s| s.to_inclusive()),
            id: Some(String::from(relation.qid())),
            ner: layer_or_empty(doc, Layer::Ner, AnnotatedDoc::ner_tags),
            pos: layer_or_empty(doc, Layer::Pos, AnnotatedDoc::pos),
            dep: layer_or_empty(doc, Layer::Dep, AnnotatedDoc::deps),
            dep_heads: layer_or_empty(doc, Layer::Head, AnnotatedDoc::conll_heads),
        }
    }
}

fn layer_or_empty<T>(
    doc: &AnnotatedDoc,
    layer: Layer,
    tags: fn(&AnnotatedDoc) -> Vec<T>,
) -> Vec<T> {
    if doc.has_layer(layer) {
        tags(doc)
    } else {
        vec![]
    }
}

/// Predicted relation and the confidence of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationPrediction {
    pub text: String,
    pub confidence: f32,
}

/// A predictor for relation extraction. `Ok(None)` means the model gave no prediction.
pub trait RelationPredictor: Predictor {
    fn predict(&self, input: &RelationInput) -> Result<Option<RelationPrediction>, PredictorError>;
}

/// Relation predictor backed by a model archive. The model outputs a probability per label of
/// its vocabulary; the most probable label is the prediction.
pub struct RelationArchivePredictor<B: ModelBackend> {
    inner: ArchivePredictor<B>,
    index_to_label: AHashMap<usize, String>,
}

impl<B: ModelBackend> RelationArchivePredictor<B> {
    pub fn new(inner: ArchivePredictor<B>, label_namespace: &str) -> Result<Self, PredictorError> {
        let vocabulary = inner.backend().label_vocabulary(label_namespace)?;
        let mut index_to_label = AHashMap::with_capacity(vocabulary.len());
        for (label, index) in vocabulary {
            index_to_label.insert(index, label);
        }
        Ok(Self {
            inner,
            index_to_label,
        })
    }

    pub fn from_archive<L, N, D>(
        name: N,
        description: D,
        config: &ArchiveConfig,
        loader: &L,
        label_namespace: &str,
    ) -> Result<Self, PredictorError>
    where
        L: BackendLoader<Backend = B>,
        N: Into<String>,
        D: Into<String>,
    {
        let inner = ArchivePredictor::from_archive(name, description, config, loader)?;
        Self::new(inner, label_namespace)
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.index_to_label.get(&index).map(|l| l.as_str())
    }
}

fn class_probabilities(output: &Value) -> Result<Array1<f32>, PredictorError> {
    let malformed = || PredictorError::MalformedOutput(String::from("no `class_probabilities`"));
    output
        .get("class_probabilities")
        .and_then(Value::as_array)
        .ok_or_else(malformed)?
        .iter()
        .map(|p| p.as_f64().map(|p| p as f32).ok_or_else(malformed))
        .collect()
}

impl<B: ModelBackend> Predictor for RelationArchivePredictor<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn perform_metrics(&self) -> &[&'static str] {
        &RELATION_METRICS
    }
}

impl<B: ModelBackend> RelationPredictor for RelationArchivePredictor<B> {
    fn predict(&self, input: &RelationInput) -> Result<Option<RelationPrediction>, PredictorError> {
        let output = self.inner.predict_json(&serde_json::to_value(input)?)?;
        if output.is_null() {
            return Ok(None);
        }
        let probabilities = class_probabilities(&output)?;
        let index = probabilities
            .argmax()
            .map_err(|e| PredictorError::MalformedOutput(e.to_string()))?;
        let label = self
            .label(index)
            .ok_or(PredictorError::UnknownLabelIndex(index))?;
        Ok(Some(RelationPrediction {
            text: String::from(label),
            confidence: probabilities[index],
        }))
    }
}

/// Runs the predictor on a relation and wraps its output into a label, scored against the
/// groundtruth. Returns `Ok(None)` without a predictor or when the model gives no prediction.
pub fn model_predict<P: RelationPredictor + ?Sized>(
    predictor: Option<&P>,
    text: &BinaryRelation,
    groundtruth: &Label,
    evaluator: TaskEvaluator,
) -> Result<Option<Label>, PredictorError> {
    let Some(predictor) = predictor else {
        return Ok(None);
    };
    let input = RelationInput::from_relation(text);
    let Some(predicted) = predictor.predict(&input)? else {
        return Ok(None);
    };
    let mut label = Label::new(
        predictor.name(),
        text.qid(),
        predicted.text,
        text.vid().max(groundtruth.vid),
    );
    label.compute_perform(&[groundtruth], evaluator);
    label.set_perform("confidence", predicted.confidence);
    Ok(Some(label))
}

/// Predicts every instance and stores the labels under the name of the predictor. Returns the
/// number of instances that received a prediction.
pub fn predict_instances<P: RelationPredictor + ?Sized>(
    predictor: &P,
    instances: &mut [Instance],
    evaluator: TaskEvaluator,
) -> Result<usize, PredictorError> {
    let mut predicted = 0;
    for instance in instances.iter_mut() {
        match model_predict(Some(predictor), &instance.text, &instance.groundtruth, evaluator)? {
            Some(label) => {
                instance.add_prediction(label);
                predicted += 1;
            }
            None => warn!("{} gave no prediction for {}", predictor.name(), instance.key()),
        }
    }
    debug!(
        "{} predicted {} of {} instances",
        predictor.name(),
        predicted,
        instances.len()
    );
    Ok(predicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictors::ReplayBackend;
    use crate::targets::Target;
    use doc_annotation::{Annotator, PreTaggedAnnotator, Span, TagLayers};
    use serde_json::json;

    fn relation(qid: &str, vid: u32) -> BinaryRelation {
        let tokens: Vec<String> = ["Tom", "is", "the", "minister"]
            .iter()
            .map(|t| String::from(*t))
            .collect();
        let layers = TagLayers {
            ner: Some(
                ["PERSON", "O", "O", "TITLE"]
                    .iter()
                    .map(|t| String::from(*t))
                    .collect(),
            ),
            ..Default::default()
        };
        let doc = PreTaggedAnnotator::new().annotate(&tokens, &layers).unwrap();
        BinaryRelation::new(
            Target::new(qid, vid, doc),
            Some(Span::new(0, 1).unwrap()),
            Some(Span::new(3, 4).unwrap()),
        )
        .unwrap()
    }

    fn predictor() -> RelationArchivePredictor<ReplayBackend> {
        let outputs = AHashMap::from_iter([
            (
                String::from("q1"),
                json!({"class_probabilities": [0.2, 0.7, 0.1]}),
            ),
            (String::from("q2"), json!({"logits": [1.0]})),
        ]);
        let labels = AHashMap::from_iter([
            (String::from("no_relation"), 0),
            (String::from("per:title"), 1),
            (String::from("org:founded_by"), 2),
        ]);
        let inner = ArchivePredictor::new("bert", "", ReplayBackend::new(outputs, labels));
        RelationArchivePredictor::new(inner, "labels").unwrap()
    }

    /// Records the inputs it receives and always predicts the same relation.
    struct Constant {
        seen: std::sync::Mutex<Vec<RelationInput>>,
    }

    impl Predictor for Constant {
        fn name(&self) -> &str {
            "constant"
        }
        fn description(&self) -> &str {
            ""
        }
        fn perform_metrics(&self) -> &[&'static str] {
            &RELATION_METRICS
        }
    }

    impl RelationPredictor for Constant {
        fn predict(
            &self,
            input: &RelationInput,
        ) -> Result<Option<RelationPrediction>, PredictorError> {
            self.seen.lock().unwrap().push(input.clone());
            Ok(Some(RelationPrediction {
                text: String::from("per:title"),
                confidence: 0.5,
            }))
        }
    }

    #[test]
    fn test_relation_input() {
        let input = RelationInput::from_relation(&relation("q1", 0));
        assert_eq!(input.text, "Tom is the minister");
        assert_eq!(input.head, Some((0, 0)));
        assert_eq!(input.tail, Some((3, 3)));
        assert_eq!(input.ner, vec!["PERSON", "O", "O", "TITLE"]);
        assert!(input.pos.is_empty());
        assert!(input.dep_heads.is_empty());
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["id_"], json!("q1"));
    }

    #[test]
    fn test_archive_predict() {
        let predictor = predictor();
        let input = RelationInput::from_relation(&relation("q1", 0));
        let prediction = predictor.predict(&input).unwrap().unwrap();
        assert_eq!(prediction.text, "per:title");
        assert_eq!(prediction.confidence, 0.7);
    }

    #[test]
    fn test_archive_predict_without_output() {
        let predictor = predictor();
        let input = RelationInput::from_relation(&relation("unknown", 0));
        assert_eq!(predictor.predict(&input).unwrap(), None);
    }

    #[test]
    fn test_archive_predict_malformed_output() {
        let predictor = predictor();
        let input = RelationInput::from_relation(&relation("q2", 0));
        assert!(matches!(
            predictor.predict(&input),
            Err(PredictorError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_model_predict() {
        let gold = Label::groundtruth("q1", "per:title", 0);
        let label = model_predict(Some(&predictor()), &relation("q1", 2), &gold, TaskEvaluator::Accuracy)
            .unwrap()
            .unwrap();
        assert_eq!(label.model, "bert");
        assert_eq!(label.qid, "q1");
        assert_eq!(label.vid, 2);
        assert_eq!(label.get_perform("accuracy"), Some(1.0));
        assert_eq!(label.get_perform("confidence"), Some(0.7));
    }

    #[test]
    fn test_model_predict_without_predictor() {
        let gold = Label::groundtruth("q1", "per:title", 0);
        let label = model_predict::<Constant>(None, &relation("q1", 0), &gold, TaskEvaluator::Accuracy)
            .unwrap();
        assert!(label.is_none());
    }

    #[test]
    fn test_model_predict_sends_inclusive_spans() {
        let constant = Constant {
            seen: std::sync::Mutex::new(vec![]),
        };
        let gold = Label::groundtruth("q1", "no_relation", 3);
        let label = model_predict(Some(&constant), &relation("q1", 1), &gold, TaskEvaluator::Accuracy)
            .unwrap()
            .unwrap();
        assert_eq!(label.vid, 3);
        assert_eq!(label.get_perform("accuracy"), Some(0.0));
        let seen = constant.seen.lock().unwrap();
        assert_eq!(seen[0].head, Some((0, 0)));
        assert_eq!(seen[0].tail, Some((3, 3)));
    }

    #[test]
    fn test_predict_instances() {
        let mut instances = vec![
            Instance::new("q1", 0, relation("q1", 0), Label::groundtruth("q1", "per:title", 0)),
            Instance::new(
                "q3",
                0,
                relation("q3", 0),
                Label::groundtruth("q3", "no_relation", 0),
            ),
        ];
        let predicted =
            predict_instances(&predictor(), &mut instances, TaskEvaluator::Accuracy).unwrap();
        assert_eq!(predicted, 1);
        assert_eq!(instances[0].prediction("bert").unwrap().text, "per:title");
        assert!(instances[1].prediction("bert").is_none());
    }
}
