/*!
Error analysis tooling for NLP models, focused on relation extraction.

# Overview
* Dataset readers ([`TacredReader`], [`DarkTReader`]) parse a corpus into [`Instance`]s. An
    instance holds the annotated text ([`BinaryRelation`]), its groundtruth [`Label`] and the
    labels predicted by the models that ran on it.
* Predictors ([`RelationArchivePredictor`]) wrap trained models served by an external inference
    framework and turn their outputs into labels, scored against the groundtruth.
* Metrics ([`relation_report`], [`precision_recall_fscore_support`]) compute the precision,
    recall and fscore of every relation, and the micro, macro and weighted averages.

# Terminology
* A relation is a label such as `per:title` or `org:founded_by`, linking a head entity (the
    subject) to a tail entity (the object).
* The negative label (`no_relation` in TACRED) means the entities are not related. It is
    excluded from the classes when computing the metrics.
* Entity spans are token offsets. Spans stored in targets are exclusive at the end; the corpora
    and the models use inclusive spans, which are converted at the boundaries.
*/

mod config;
mod evaluator;
pub mod io;
mod metrics;
pub mod predictors;
mod reporter;
pub mod targets;

// The public api starts here
pub use config::{ErrataConfig, ErrataConfigBuilder, NO_RELATION};

pub use evaluator::{accuracy_score, TaskEvaluator, UnknownEvaluator};

pub use metrics::{
    accuracy, precision_recall_fscore_support, relation_report, ArrayNotUniqueOrEmpty,
    ComputationError, DivByZeroStrat, DivisionByZeroError, FloatExt, InconsistentLengthError,
    ParsingDivisionByZeroStrategyError, PrecisionRecallFScoreTrueSum,
};

pub use reporter::{Average, AverageParsingError, ClassMetrics, OverallAverage, Reporter};

pub use targets::{BinaryRelation, Instance, InstanceKey, Label, Target, TargetError, GROUNDTRUTH};

pub use io::{
    create_instance, DarkTReader, DatasetReader, ReaderError, ReaderKind, TacredReader,
};

pub use predictors::{
    model_predict, predict_instances, ArchiveConfig, ArchivePredictor, BackendLoader,
    ModelBackend, Predictor, PredictorError, PredictorKind, RelationArchivePredictor,
    RelationInput, RelationPrediction, RelationPredictor, ReplayBackend, ReplayLoader,
};

pub use doc_annotation::{AnnotatedDoc, AnnotationError, Annotator, Layer, Span, TagLayers};

/// Computes the relation report of parallel gold and predicted relations, using the settings of
/// `config`.
///
/// # Example
/// ```rust
/// use errata::{relation_report_conf, ErrataConfigBuilder};
///
/// let y_true = vec!["per:title", "org:founded_by", "no_relation", "per:title"];
/// let y_pred = vec!["no_relation", "org:founded_by", "per:title", "per:title"];
/// let config = ErrataConfigBuilder::default().negative_label(None::<String>).build();
///
/// let reporter = relation_report_conf(&y_true, &y_pred, &config).unwrap();
/// let expected_report = "Class, Precision, Recall, Fscore, Support
/// Overall_Weighted, 0.5, 0.5, 0.5, 4
/// Overall_Micro, 0.5, 0.5, 0.5, 4
/// Overall_Macro, 0.5, 0.5, 0.5, 4
/// no_relation, 0, 0, 0, 1
/// org:founded_by, 1, 1, 1, 1
/// per:title, 0.5, 0.5, 0.5, 2\n";
///
/// assert_eq!(expected_report, reporter.to_string());
/// ```
pub fn relation_report_conf(
    y_true: &[&str],
    y_pred: &[&str],
    config: &ErrataConfig,
) -> Result<Reporter, ComputationError> {
    metrics::relation_report_inner(
        y_true,
        y_pred,
        config.beta(),
        config.zero_division(),
        config.negative_label(),
        config.parallel(),
    )
}

/// Main entrypoint for the evaluation of a model over a corpus. Every instance holding a
/// prediction of `model` contributes its groundtruth and predicted relation to the report;
/// instances without such a prediction are skipped.
pub fn evaluate_instances(
    instances: &[Instance],
    model: &str,
    config: &ErrataConfig,
) -> Result<Reporter, ComputationError> {
    let (y_true, y_pred): (Vec<&str>, Vec<&str>) = instances
        .iter()
        .filter_map(|i| {
            i.prediction(model)
                .map(|p| (i.groundtruth.text.as_str(), p.text.as_str()))
        })
        .unzip();
    if y_pred.len() < instances.len() {
        tracing::warn!(
            "{} of {} instances have no prediction from {}",
            instances.len() - y_pred.len(),
            instances.len(),
            model
        );
    }
    relation_report_conf(&y_true, &y_pred, config)
}
