use super::{Predictor, PredictorError};
use ahash::{HashMap as AHashMap, HashMapExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_jsonlines::json_lines;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Contract of the external inference framework: JSON in, JSON out, plus the vocabulary the model
/// was trained with.
pub trait ModelBackend: Send + Sync {
    fn predict_json(&self, inputs: &Value) -> Result<Value, PredictorError>;

    /// Maps every token of the vocabulary `namespace` to its index.
    fn label_vocabulary(&self, namespace: &str) -> Result<AHashMap<String, usize>, PredictorError>;
}

/// Where and how to load a trained model. The overrides and the device are read by loaders that
/// run the model; [`ReplayLoader`] only uses the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub model_path: PathBuf,
    #[serde(default)]
    pub model_type: Option<String>,
    /// Overrides applied to the configuration stored in the archive.
    #[serde(default)]
    pub overrides: BTreeMap<String, Value>,
    /// Device the model runs on. `None` runs on the cpu.
    #[serde(default)]
    pub cuda_device: Option<u32>,
}

impl ArchiveConfig {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: model_path.into(),
            model_type: None,
            overrides: BTreeMap::new(),
            cuda_device: None,
        }
    }

    pub fn model_type<S: Into<String>>(mut self, model_type: S) -> Self {
        self.model_type = Some(model_type.into());
        self
    }

    pub fn overrides(mut self, overrides: BTreeMap<String, Value>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn cuda_device(mut self, cuda_device: Option<u32>) -> Self {
        self.cuda_device = cuda_device;
        self
    }

    /// Overrides serialized as a single JSON object.
    pub fn overrides_json(&self) -> Result<String, PredictorError> {
        Ok(serde_json::to_string(&self.overrides)?)
    }
}

/// Turns an [`ArchiveConfig`] into a running backend.
pub trait BackendLoader {
    type Backend: ModelBackend;

    fn load(&self, config: &ArchiveConfig) -> Result<Self::Backend, PredictorError>;
}

/// Predictor wrapping a model loaded from an archive. Its labels are scored with the accuracy.
pub struct ArchivePredictor<B: ModelBackend> {
    name: String,
    description: String,
    backend: B,
}

impl<B: ModelBackend> ArchivePredictor<B> {
    pub fn new<N: Into<String>, D: Into<String>>(name: N, description: D, backend: B) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            backend,
        }
    }

    pub fn from_archive<L, N, D>(
        name: N,
        description: D,
        config: &ArchiveConfig,
        loader: &L,
    ) -> Result<Self, PredictorError>
    where
        L: BackendLoader<Backend = B>,
        N: Into<String>,
        D: Into<String>,
    {
        info!("Loading model archive from {}", config.model_path.display());
        let backend = loader.load(config)?;
        Ok(Self::new(name, description, backend))
    }

    pub fn predict_json(&self, inputs: &Value) -> Result<Value, PredictorError> {
        self.backend.predict_json(inputs)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: ModelBackend> Predictor for ArchivePredictor<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn perform_metrics(&self) -> &[&'static str] {
        &["accuracy"]
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PredictorError {
    let path = path.to_path_buf();
    move |source| PredictorError::Io { path, source }
}

#[derive(Debug, Deserialize)]
struct ReplayRecord {
    id: String,
    #[serde(flatten)]
    output: Map<String, Value>,
}

/// Backend replaying outputs recorded from a model run. Outputs are looked up by the `id_` of the
/// inputs; unknown ids produce `null`, as a model declining to predict would.
#[derive(Debug, Clone, Default)]
pub struct ReplayBackend {
    outputs: AHashMap<String, Value>,
    labels: AHashMap<String, usize>,
}

impl ReplayBackend {
    pub const LABEL_NAMESPACE: &'static str = "labels";

    pub fn new(outputs: AHashMap<String, Value>, labels: AHashMap<String, usize>) -> Self {
        Self { outputs, labels }
    }

    /// Reads the outputs from JSON lines (`{"id": .., "class_probabilities": [..]}`) and the
    /// label vocabulary from a JSON object (`{"label": index}`).
    pub fn from_files(predictions: &Path, labels: &Path) -> Result<Self, PredictorError> {
        let mut outputs = AHashMap::new();
        for record in json_lines::<ReplayRecord, _>(predictions).map_err(io_error(predictions))? {
            let record = record.map_err(io_error(predictions))?;
            outputs.insert(record.id, Value::Object(record.output));
        }
        let file = File::open(labels).map_err(io_error(labels))?;
        let labels_map: AHashMap<String, usize> = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| PredictorError::Json {
                path: labels.to_path_buf(),
                source,
            })?;
        debug!(
            "Replaying {} outputs over {} labels",
            outputs.len(),
            labels_map.len()
        );
        Ok(Self::new(outputs, labels_map))
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl ModelBackend for ReplayBackend {
    fn predict_json(&self, inputs: &Value) -> Result<Value, PredictorError> {
        let id = inputs
            .get("id_")
            .and_then(Value::as_str)
            .ok_or_else(|| PredictorError::Backend(String::from("the inputs have no `id_`")))?;
        Ok(self.outputs.get(id).cloned().unwrap_or(Value::Null))
    }

    fn label_vocabulary(&self, namespace: &str) -> Result<AHashMap<String, usize>, PredictorError> {
        if namespace != Self::LABEL_NAMESPACE {
            return Err(PredictorError::UnknownNamespace(String::from(namespace)));
        }
        Ok(self.labels.clone())
    }
}

/// Loads a [`ReplayBackend`] from an archive folder holding `predictions.jsonl` and
/// `labels.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayLoader;

impl BackendLoader for ReplayLoader {
    type Backend = ReplayBackend;

    fn load(&self, config: &ArchiveConfig) -> Result<Self::Backend, PredictorError> {
        if !config.overrides.is_empty() || config.cuda_device.is_some() {
            warn!("Replayed outputs ignore the overrides and the device of the archive config");
        }
        ReplayBackend::from_files(
            &config.model_path.join("predictions.jsonl"),
            &config.model_path.join("labels.json"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend() -> ReplayBackend {
        let outputs = AHashMap::from_iter([(
            String::from("q1"),
            json!({"class_probabilities": [0.1, 0.9]}),
        )]);
        let labels = AHashMap::from_iter([
            (String::from("no_relation"), 0),
            (String::from("per:title"), 1),
        ]);
        ReplayBackend::new(outputs, labels)
    }

    #[test]
    fn test_replay() {
        let backend = backend();
        assert_eq!(
            backend.predict_json(&json!({"id_": "q1"})).unwrap(),
            json!({"class_probabilities": [0.1, 0.9]})
        );
        assert_eq!(backend.predict_json(&json!({"id_": "q2"})).unwrap(), Value::Null);
        assert!(matches!(
            backend.predict_json(&json!({"text": "no id"})),
            Err(PredictorError::Backend(_))
        ));
    }

    #[test]
    fn test_label_vocabulary() {
        let backend = backend();
        assert_eq!(backend.label_vocabulary("labels").unwrap().len(), 2);
        assert!(matches!(
            backend.label_vocabulary("tokens"),
            Err(PredictorError::UnknownNamespace(_))
        ));
    }

    #[test]
    fn test_archive_predictor() {
        let predictor = ArchivePredictor::new("bert", "a replayed model", backend());
        assert_eq!(predictor.name(), "bert");
        assert_eq!(predictor.description(), "a replayed model");
        assert_eq!(predictor.perform_metrics(), &["accuracy"]);
        assert_eq!(predictor.backend().len(), 1);
    }

    #[test]
    fn test_archive_config() {
        let config = ArchiveConfig::new("/models/bert")
            .model_type("relation_classifier")
            .cuda_device(Some(0))
            .overrides(BTreeMap::from([(String::from("batch_size"), json!(8))]));
        assert_eq!(config.model_type.as_deref(), Some("relation_classifier"));
        assert_eq!(config.overrides_json().unwrap(), r#"{"batch_size":8}"#);
    }
}
