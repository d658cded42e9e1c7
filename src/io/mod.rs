/*!
Dataset readers. A reader parses a corpus into [`Instance`]s, each holding a [`BinaryRelation`]
and its groundtruth [`Label`]. Readers are registered by name in [`ReaderKind`].
*/
mod dark_t;
mod tacred;

pub use dark_t::{DarkTExample, DarkTReader};
pub use tacred::{TacredExample, TacredReader};

use crate::config::ErrataConfig;
use crate::evaluator::TaskEvaluator;
use crate::targets::{BinaryRelation, Instance, Label, TargetError};
use doc_annotation::AnnotationError;
use either::Either;
use enum_iterator::Sequence;
use serde_jsonlines::{json_lines, write_json_lines};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ReaderError {
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
    #[error("invalid example at index {index}: {message}")]
    InvalidExample { index: usize, message: String },
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error("unknown dataset reader `{0}`")]
    UnknownReader(String),
}

impl ReaderError {
    pub(crate) fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Reads a corpus into instances. Each reader registers the scoring function of its task with
/// [`DatasetReader::evaluator`].
pub trait DatasetReader {
    /// Name under which the reader is registered.
    fn name(&self) -> &'static str;

    fn evaluator(&self) -> TaskEvaluator {
        TaskEvaluator::Accuracy
    }

    /// Reads at most `sample_size` instances from the corpus at `path`.
    fn read_instances(
        &self,
        path: &Path,
        sample_size: Option<usize>,
    ) -> Result<Vec<Instance>, ReaderError>;

    /// Reads only the (normalized) text of at most `sample_size` examples.
    fn read_texts(&self, path: &Path, sample_size: Option<usize>)
        -> Result<Vec<String>, ReaderError>;

    /// Eager reads return the instances, lazy reads only return the texts.
    fn read(
        &self,
        path: &Path,
        lazy: bool,
        sample_size: Option<usize>,
    ) -> Result<Either<Vec<Instance>, Vec<String>>, ReaderError> {
        let path = normalize_file_path(path);
        info!("Reading instances from lines in file at: {}", path.display());
        if lazy {
            self.read_texts(&path, sample_size).map(Either::Right)
        } else {
            self.read_instances(&path, sample_size).map(Either::Left)
        }
    }
}

/// Builds a fresh instance, at version 0 and without predictions.
pub fn create_instance<Q: Into<String>>(
    qid: Q,
    text: BinaryRelation,
    groundtruth: Label,
) -> Instance {
    Instance::new(qid, 0, text, groundtruth)
}

/// Expands a leading `~` into the home directory.
pub fn normalize_file_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

/// Number of examples to read. A sample size of 0 means the whole corpus.
pub(crate) fn sample_limit(sample_size: Option<usize>) -> usize {
    match sample_size {
        Some(0) | None => usize::MAX,
        Some(n) => n,
    }
}

/// Id of an example, falling back on its position in the corpus.
pub(crate) fn example_id(id: Option<&str>, index: usize) -> String {
    match id {
        Some(id) if !id.is_empty() => String::from(id),
        _ => index.to_string(),
    }
}

fn cache_path(folder: &Path, name: &str) -> PathBuf {
    folder.join(format!("{}.jsonl", name))
}

/// Writes the instances in `folder/name.jsonl`, one instance per line.
pub fn dump_instances(folder: &Path, name: &str, instances: &[Instance]) -> Result<(), ReaderError> {
    std::fs::create_dir_all(folder).map_err(|e| ReaderError::io(folder, e))?;
    let path = cache_path(folder, name);
    debug!("Caching {} instances at {}", instances.len(), path.display());
    write_json_lines(&path, instances).map_err(|e| ReaderError::io(&path, e))
}

/// Loads the instances cached by [`dump_instances`].
pub fn load_instances(folder: &Path, name: &str) -> Result<Vec<Instance>, ReaderError> {
    let path = cache_path(folder, name);
    json_lines::<Instance, _>(&path)
        .map_err(|e| ReaderError::io(&path, e))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| ReaderError::io(&path, e))
}

/// Reads a corpus with the settings of `config`. When a cache folder is set, the instances are
/// loaded from the cache if present and cached after reading otherwise.
pub fn read_with_config(
    reader: &dyn DatasetReader,
    path: &Path,
    config: &ErrataConfig,
) -> Result<Vec<Instance>, ReaderError> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cache_name = match config.sample_size() {
        Some(n) if n > 0 => format!("{}_{}_{}", reader.name(), stem, n),
        _ => format!("{}_{}", reader.name(), stem),
    };
    if let Some(folder) = config.cache_folder() {
        let folder = normalize_file_path(folder);
        if cache_path(&folder, &cache_name).exists() {
            info!("Loading cached instances from {}", folder.display());
            return load_instances(&folder, &cache_name);
        }
        let instances = reader
            .read(path, false, config.sample_size())?
            .left()
            .unwrap_or_default();
        dump_instances(&folder, &cache_name, &instances)?;
        return Ok(instances);
    }
    Ok(reader
        .read(path, false, config.sample_size())?
        .left()
        .unwrap_or_default())
}

/// Registry of the dataset readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
pub enum ReaderKind {
    Tacred,
    DarkT,
}

impl ReaderKind {
    pub fn by_name(name: &str) -> Result<Self, ReaderError> {
        name.parse()
    }

    pub fn all() -> impl Iterator<Item = ReaderKind> {
        enum_iterator::all::<ReaderKind>()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tacred => "tacred",
            Self::DarkT => "darkT",
        }
    }

    /// Builds the reader with its default annotator.
    pub fn build(&self) -> Box<dyn DatasetReader> {
        match self {
            Self::Tacred => Box::new(TacredReader::default()),
            Self::DarkT => Box::new(DarkTReader::default()),
        }
    }
}

impl Display for ReaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ReaderKind {
    type Err = ReaderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ReaderError::UnknownReader(String::from(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_annotation::Annotator;
    use rstest::rstest;

    #[rstest]
    #[case("tacred", ReaderKind::Tacred)]
    #[case("TACRED", ReaderKind::Tacred)]
    #[case("darkT", ReaderKind::DarkT)]
    #[case("darkt", ReaderKind::DarkT)]
    fn test_registry(#[case] name: &str, #[case] expected: ReaderKind) {
        let kind = ReaderKind::by_name(name).unwrap();
        assert_eq!(kind, expected);
        assert_eq!(kind.build().name(), expected.name());
    }

    #[test]
    fn test_unknown_reader() {
        assert!(matches!(
            ReaderKind::by_name("squad"),
            Err(ReaderError::UnknownReader(name)) if name == "squad"
        ));
        assert_eq!(ReaderKind::all().count(), 2);
    }

    #[rstest]
    #[case(None, usize::MAX)]
    #[case(Some(0), usize::MAX)]
    #[case(Some(5), 5)]
    fn test_sample_limit(#[case] sample_size: Option<usize>, #[case] expected: usize) {
        assert_eq!(sample_limit(sample_size), expected)
    }

    #[test]
    fn test_example_id() {
        assert_eq!(example_id(Some("abc"), 3), "abc");
        assert_eq!(example_id(Some(""), 3), "3");
        assert_eq!(example_id(None, 4), "4");
    }

    fn cached_instance() -> Instance {
        let doc = doc_annotation::WhitespaceAnnotator::new()
            .annotate_text("Tom is the minister")
            .unwrap();
        let text = BinaryRelation::new(
            crate::targets::Target::new("q1", 0, doc),
            Some(doc_annotation::Span::new(0, 1).unwrap()),
            Some(doc_annotation::Span::new(3, 4).unwrap()),
        )
        .unwrap();
        Instance::new("q1", 0, text, Label::groundtruth("q1", "per:title", 0))
    }

    #[test]
    fn test_cache_round_trip() {
        let folder = tempfile::tempdir().unwrap();
        let instances = vec![cached_instance()];
        dump_instances(folder.path(), "train", &instances).unwrap();
        assert_eq!(load_instances(folder.path(), "train").unwrap(), instances);
    }

    #[rstest]
    #[case(serde_json::json!({"start": 2, "end": 1}))]
    #[case(serde_json::json!({"start": 1, "end": 1}))]
    fn test_cache_rejects_empty_spans(#[case] head: serde_json::Value) {
        let folder = tempfile::tempdir().unwrap();
        let mut line = serde_json::to_value(cached_instance()).unwrap();
        line["text"]["head"] = head;
        std::fs::write(cache_path(folder.path(), "train"), format!("{}\n", line)).unwrap();
        assert!(matches!(
            load_instances(folder.path(), "train"),
            Err(ReaderError::Io { .. })
        ));
    }

    #[test]
    fn test_normalize_file_path() {
        assert_eq!(
            normalize_file_path("data/train.json"),
            PathBuf::from("data/train.json")
        );
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                normalize_file_path("~/train.json"),
                PathBuf::from(home).join("train.json")
            );
        }
    }
}
