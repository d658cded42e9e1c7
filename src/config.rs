/*
 * This modules contains the `ErrataConfig` struct, which implements the default trait. This config
 * can be passed to `evaluate_instances` to simplify its arguments, and carries the settings used
 * by the dataset readers.
*/
use crate::evaluator::TaskEvaluator;
use crate::metrics::DivByZeroStrat;
use std::fmt::Display;
use std::path::PathBuf;

/// Relation used by TACRED when the two entities are not related.
pub const NO_RELATION: &str = "no_relation";

#[derive(Clone, Debug, PartialEq)]
/// Config struct used to simplify the inputs of the evaluation and reading functions. It
/// implements the default trait and can be customized with `ErrataConfigBuilder`.
pub struct ErrataConfig {
    /// This parameter describes what to do when we encounter a division by zero when computing
    /// precision and recall. The most common solution is to replace the results by 0.
    pub(crate) zero_division: DivByZeroStrat,
    /// The relation meaning that the two entities are not related. It is excluded from the
    /// classes when computing the precision, recall and fscore. `None` keeps every relation.
    pub(crate) negative_label: Option<String>,
    /// Value of the `beta` parameter of the fscore.
    pub(crate) beta: f32,
    /// Can we use multiple cores to compute the metrics? In practice, the arrays are small
    /// (one entry per relation) and it is better to *not* parallelize the computations.
    pub(crate) parallel: bool,
    /// Maximum number of examples read from a corpus.
    pub(crate) sample_size: Option<usize>,
    /// Folder where the instances read from a corpus are cached.
    pub(crate) cache_folder: Option<PathBuf>,
    /// Scoring function of the task.
    pub(crate) evaluator: TaskEvaluator,
}

impl ErrataConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zero_division(&self) -> DivByZeroStrat {
        self.zero_division
    }

    pub fn negative_label(&self) -> Option<&str> {
        self.negative_label.as_deref()
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    pub fn sample_size(&self) -> Option<usize> {
        self.sample_size
    }

    pub fn cache_folder(&self) -> Option<&PathBuf> {
        self.cache_folder.as_ref()
    }

    pub fn evaluator(&self) -> TaskEvaluator {
        self.evaluator
    }
}

impl Default for ErrataConfig {
    fn default() -> Self {
        Self {
            zero_division: DivByZeroStrat::ReplaceBy0,
            negative_label: Some(String::from(NO_RELATION)),
            beta: 1.0,
            parallel: false,
            sample_size: None,
            cache_folder: None,
            evaluator: TaskEvaluator::Accuracy,
        }
    }
}

impl From<ErrataConfigBuilder> for ErrataConfig {
    fn from(value: ErrataConfigBuilder) -> Self {
        value.config
    }
}

impl Display for ErrataConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Strategy when encountering a division by zero: {:?}\n Negative relation: {:?}\n Beta: {}\n Using parallel computations: {}\n Sample size: {:?}\n Cache folder: {:?}\n Task evaluator: {}", self.zero_division, self.negative_label, self.beta, self.parallel, self.sample_size, self.cache_folder, self.evaluator)
    }
}

/// This builder can be used to build and customize an `ErrataConfig` stucture.
#[derive(Clone, Debug, Default)]
pub struct ErrataConfigBuilder {
    config: ErrataConfig,
}

impl ErrataConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn division_by_zero(mut self, division_by_zero: DivByZeroStrat) -> Self {
        self.config.zero_division = division_by_zero;
        self
    }
    pub fn negative_label<S: Into<String>>(mut self, negative_label: Option<S>) -> Self {
        self.config.negative_label = negative_label.map(Into::into);
        self
    }
    pub fn beta(mut self, beta: f32) -> Self {
        self.config.beta = beta;
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }
    pub fn sample_size(mut self, sample_size: Option<usize>) -> Self {
        self.config.sample_size = sample_size;
        self
    }
    pub fn cache_folder<P: Into<PathBuf>>(mut self, cache_folder: P) -> Self {
        self.config.cache_folder = Some(cache_folder.into());
        self
    }
    pub fn evaluator(mut self, evaluator: TaskEvaluator) -> Self {
        self.config.evaluator = evaluator;
        self
    }
    pub fn build(self) -> ErrataConfig {
        ErrataConfig::from(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DivByZeroStrat::ReplaceBy1)]
    #[case(DivByZeroStrat::ReplaceBy0)]
    #[case(DivByZeroStrat::ReturnError)]
    fn test_builder_setters_division_by_zero(#[case] strat: DivByZeroStrat) {
        let config = ErrataConfigBuilder::default()
            .division_by_zero(strat)
            .build();
        assert_eq!(config.zero_division(), strat)
    }

    #[rstest]
    #[case(Some("no_relation"), Some("no_relation"))]
    #[case(Some("Other"), Some("Other"))]
    #[case(None, None)]
    fn test_builder_setters_negative_label(
        #[case] label: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let config = ErrataConfigBuilder::default().negative_label(label).build();
        assert_eq!(config.negative_label(), expected)
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_builder_setters_parallel(#[case] parallel: bool) {
        let config = ErrataConfigBuilder::default().parallel(parallel).build();
        assert_eq!(config.parallel(), parallel)
    }

    #[test]
    fn test_builder_setters_reading() {
        let config = ErrataConfigBuilder::default()
            .sample_size(Some(10))
            .cache_folder("/tmp/errata")
            .beta(0.5)
            .build();
        assert_eq!(config.sample_size(), Some(10));
        assert_eq!(config.cache_folder(), Some(&PathBuf::from("/tmp/errata")));
        assert_eq!(config.beta(), 0.5);
    }

    #[test]
    fn test_defaults() {
        let config = ErrataConfig::default();
        assert_eq!(config.negative_label(), Some(NO_RELATION));
        assert_eq!(config.zero_division(), DivByZeroStrat::ReplaceBy0);
        assert_eq!(config.evaluator(), TaskEvaluator::Accuracy);
        assert!(config.to_string().contains("Negative relation"));
    }
}
