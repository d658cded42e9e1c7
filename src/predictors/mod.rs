/*!
Predictors wrap trained models and turn their outputs into [`Label`](crate::targets::Label)s.
Models live in an external inference framework, reached through the [`ModelBackend`] contract.
*/
mod archive;
mod relation;

pub use archive::{
    ArchiveConfig, ArchivePredictor, BackendLoader, ModelBackend, ReplayBackend, ReplayLoader,
};
pub use relation::{
    model_predict, predict_instances, RelationArchivePredictor, RelationInput,
    RelationPrediction, RelationPredictor, RELATION_METRICS,
};

use enum_iterator::Sequence;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("the model backend failed: {0}")]
    Backend(String),
    #[error("malformed model output: {0}")]
    MalformedOutput(String),
    #[error("label index {0} is missing from the label vocabulary")]
    UnknownLabelIndex(usize),
    #[error("unknown label namespace `{0}`")]
    UnknownNamespace(String),
    #[error("could not read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not serialize the model inputs")]
    Serialization(#[from] serde_json::Error),
    #[error("unknown predictor `{0}`")]
    UnknownPredictor(String),
    #[error("predictor `{0}` names a task and cannot be built from an archive")]
    NotBuildable(String),
}

/// A named wrapper around a model.
pub trait Predictor {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Metrics stored in the `perform` of the labels produced by this predictor.
    fn perform_metrics(&self) -> &[&'static str];
}

/// Registry of the predictors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
pub enum PredictorKind {
    /// Any relation extraction predictor.
    Relation,
    /// Relation extraction predictor backed by a model archive.
    RelationArchive,
}

impl PredictorKind {
    pub fn by_name(name: &str) -> Result<Self, PredictorError> {
        name.parse()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Relation => "re_task_class",
            Self::RelationArchive => "re",
        }
    }

    pub fn perform_metrics(&self) -> &'static [&'static str] {
        &RELATION_METRICS
    }

    /// Loads the predictor from an archive. Only archive-backed kinds can be built.
    pub fn build<L>(
        &self,
        name: &str,
        description: &str,
        config: &ArchiveConfig,
        loader: &L,
        label_namespace: &str,
    ) -> Result<Box<dyn RelationPredictor>, PredictorError>
    where
        L: BackendLoader,
        L::Backend: 'static,
    {
        match self {
            Self::Relation => Err(PredictorError::NotBuildable(String::from(self.name()))),
            Self::RelationArchive => Ok(Box::new(RelationArchivePredictor::from_archive(
                name,
                description,
                config,
                loader,
                label_namespace,
            )?)),
        }
    }
}

impl Display for PredictorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PredictorKind {
    type Err = PredictorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        enum_iterator::all::<PredictorKind>()
            .find(|k| k.name() == s)
            .ok_or_else(|| PredictorError::UnknownPredictor(String::from(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("re", PredictorKind::RelationArchive)]
    #[case("re_task_class", PredictorKind::Relation)]
    fn test_registry(#[case] name: &str, #[case] expected: PredictorKind) {
        let kind = PredictorKind::by_name(name).unwrap();
        assert_eq!(kind, expected);
        assert_eq!(kind.to_string(), name);
        assert_eq!(kind.perform_metrics(), &["accuracy", "confidence"]);
    }

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("data")
            .join("model")
    }

    #[test]
    fn test_build() {
        let predictor = PredictorKind::RelationArchive
            .build("replayed", "", &ArchiveConfig::new(model_dir()), &ReplayLoader, "labels")
            .unwrap();
        assert_eq!(predictor.name(), "replayed");
        assert_eq!(predictor.perform_metrics(), &RELATION_METRICS);
    }

    #[test]
    fn test_build_task_kind() {
        let built = PredictorKind::Relation.build(
            "bert",
            "",
            &ArchiveConfig::new(model_dir()),
            &ReplayLoader,
            "labels",
        );
        assert!(matches!(
            built,
            Err(PredictorError::NotBuildable(name)) if name == "re_task_class"
        ));
    }

    #[test]
    fn test_unknown_predictor() {
        assert!(matches!(
            PredictorKind::by_name("qa"),
            Err(PredictorError::UnknownPredictor(_))
        ));
    }
}
