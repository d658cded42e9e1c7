/**
This module computes the corpus level metrics (precision, recall, f-score, support) of the
relations predicted by a model against the groundtruth relations.
*/
use crate::reporter::{Average, ClassMetricsInner, OverallAverage, Reporter};
use ahash::{random_state::RandomState, HashMap as AHashMap};
use itertools::multizip;
use ndarray::{prelude::*, ArcArray1, Data, ScalarOperand, Zip};
use ndarray_stats::{errors::MultiInputError, SummaryStatisticsExt};
use num::{Float, Num};
use std::{collections::BTreeSet, fmt::Debug, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("this array contains more than one element or is empty. It has length: {0}")]
pub struct ArrayNotUniqueOrEmpty(usize);

trait ItemArrayExt<Output> {
    /// Returns the element out of the Array. Can return an error if the array is empty of if the
    /// array has a length superior to 1.
    fn item(&self) -> Result<Output, ArrayNotUniqueOrEmpty>;
}

impl<F: Clone, T: Data<Elem = F>> ItemArrayExt<F> for ArrayBase<T, Ix1> {
    fn item(&self) -> Result<F, ArrayNotUniqueOrEmpty> {
        match (self.len(), self.first()) {
            (1, Some(first)) => Ok(first.clone()),
            (n, _) => Err(ArrayNotUniqueOrEmpty(n)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// What to do when the precision or the recall of a relation has a denominator of zero, i.e. the
/// relation is never predicted or never appears in the groundtruth. TACRED's scorer reports 0.
pub enum DivByZeroStrat {
    /// The metric is set to `1`
    ReplaceBy1,
    /// Returns an error
    ReturnError,
    /// The metric is set to `0`
    #[default]
    ReplaceBy0,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not parse `{0}` into a division by zero strategy")]
pub struct ParsingDivisionByZeroStrategyError(String);

impl FromStr for DivByZeroStrat {
    type Err = ParsingDivisionByZeroStrategyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_ref() {
            "replaceby1" | "replacebyone" | "1" => Ok(DivByZeroStrat::ReplaceBy1),
            "replaceby0" | "replacebyzero" | "0" => Ok(DivByZeroStrat::ReplaceBy0),
            "returnerror" | "error" => Ok(DivByZeroStrat::ReturnError),
            _ => Err(ParsingDivisionByZeroStrategyError(String::from(s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("encountered division by zero")]
pub struct DivisionByZeroError;

/// Float types the metrics are computed with.
pub trait FloatExt: Float + Send + Sync + Clone + ScalarOperand + Debug {}

impl<T: Float + Send + Sync + Clone + Copy + ScalarOperand + Debug> FloatExt for T {}

fn prf_divide(
    numerator: ArcArray1<f32>,
    denominator: ArrayViewMut1<f32>,
    parallel: bool,
    zero_division: DivByZeroStrat,
) -> Result<ArcArray1<f32>, DivisionByZeroError> {
    let (result, zero_mask) = if parallel {
        par_prf_divide_results_and_mask(numerator, denominator)
    } else {
        prf_divide_results_and_mask(numerator, denominator)
    };
    let has_zero = zero_mask.iter().any(|m| *m == 0.0);
    match zero_division {
        DivByZeroStrat::ReturnError if has_zero => Err(DivisionByZeroError),
        DivByZeroStrat::ReturnError | DivByZeroStrat::ReplaceBy0 => Ok(result * &zero_mask),
        DivByZeroStrat::ReplaceBy1 => {
            let fill = zero_mask.mapv(|m| 1.0 - m);
            Ok(result * &zero_mask + fill)
        }
    }
}

/// This function computes the result in parallel. For a synchronous
/// version of this function, see `prf_divide_results_and_mask`.
fn par_prf_divide_results_and_mask<I: Debug + Num + Clone + Copy + Send + Sync>(
    numerator: ArcArray1<I>,
    mut denominator: ArrayViewMut1<I>,
) -> (ArcArray1<I>, Array1<I>) {
    let zero_at_mask = Zip::from(&denominator).par_map_collect(|d| {
        if *d == I::zero() {
            I::zero()
        } else {
            I::one()
        }
    });
    denominator.par_mapv_inplace(|v| if v == I::zero() { I::one() } else { v });
    (numerator / &denominator, zero_at_mask)
}

/// This function computes the result synchronously. For a parallel
/// version of this function, see `par_prf_divide_results_and_mask`.
fn prf_divide_results_and_mask<I: Debug + Num + Clone + Copy>(
    numerator: ArcArray1<I>,
    mut denominator: ArrayViewMut1<I>,
) -> (ArcArray1<I>, Array1<I>) {
    let zero_at_mask =
        Zip::from(&denominator).map_collect(|d| if *d == I::zero() { I::zero() } else { I::one() });
    denominator.mapv_inplace(|v| if v == I::zero() { I::one() } else { v });
    (numerator / &denominator, zero_at_mask)
}

/// Helper function to replace values from an array.
fn replace<T: PartialEq + Copy + Send + Sync>(
    mut array: ArcArray1<T>,
    replaced: T,
    new_value: T,
    parallel: bool,
) -> ArcArray1<T> {
    if parallel {
        array.par_mapv_inplace(|v| if v == replaced { new_value } else { v });
    } else {
        array.mapv_inplace(|v| if v == replaced { new_value } else { v });
    }
    array
}

#[derive(Debug, PartialEq, Clone, Copy, Error)]
#[error("inconsistent length between two lists: `y_true` has length {0}, `y_pred` has length {1}")]
/// Two lists that should be parallel are not of the same length.
pub struct InconsistentLengthError(pub usize, pub usize);

#[derive(Debug, Clone, PartialEq, Error)]
/// Failures that can happen when computing the precison, recall, f-score and the support.
pub enum ComputationError {
    #[error("beta value is not positive")]
    BetaNotPositive,
    #[error(transparent)]
    InconsistentLength(#[from] InconsistentLengthError),
    #[error(transparent)]
    DivisionByZero(#[from] DivisionByZeroError),
    #[error("using sample weighting and no sample weight given")]
    NoSampleWeight,
    #[error(transparent)]
    InputError(#[from] MultiInputError),
    #[error(transparent)]
    EmptyOrNotUnique(#[from] ArrayNotUniqueOrEmpty),
    #[error("received an empty input {0}")]
    EmptyInput(&'static str),
    #[error("no relation other than the negative label `{0}` was found")]
    NoPositiveClass(String),
}

fn check_for_empty_slices<T>(y_true: &[T], y_pred: &[T]) -> Result<(), ComputationError> {
    if y_true.is_empty() {
        return Err(ComputationError::EmptyInput("y_true"));
    };
    if y_pred.is_empty() {
        return Err(ComputationError::EmptyInput("y_pred"));
    };
    Ok(())
}

fn check_consistent_length<T>(y_true: &[T], y_pred: &[T]) -> Result<(), InconsistentLengthError> {
    if y_true.len() != y_pred.len() {
        return Err(InconsistentLengthError(y_true.len(), y_pred.len()));
    }
    Ok(())
}

/// predicted sum, true positive sum and true sum
type ActualTPCorrect<T> = (Array1<T>, Array1<T>, Array1<T>);

/// Counts, for every relation but the negative one, how many times it was predicted, how many
/// of those predictions were right and how many times it appears in the groundtruth. The
/// relations are returned in ascending order.
fn extract_tp_actual_correct<'a>(
    y_true: &[&'a str],
    y_pred: &[&'a str],
    negative_label: Option<&str>,
) -> (Vec<&'a str>, ActualTPCorrect<usize>) {
    let mut counts: AHashMap<&str, (usize, usize, usize)> =
        AHashMap::with_capacity_and_hasher(64, RandomState::new());
    for (gold, pred) in y_true.iter().zip(y_pred.iter()) {
        counts.entry(*pred).or_default().0 += 1;
        counts.entry(*gold).or_default().2 += 1;
        if gold == pred {
            counts.entry(*gold).or_default().1 += 1;
        }
    }
    let target_names: BTreeSet<&str> = counts
        .keys()
        .copied()
        .filter(|name| Some(*name) != negative_label)
        .collect();
    let mut pred_sum = Vec::with_capacity(target_names.len());
    let mut tp_sum = Vec::with_capacity(target_names.len());
    let mut true_sum = Vec::with_capacity(target_names.len());
    for name in target_names.iter() {
        let (p, tp, t) = counts.get(name).copied().unwrap_or_default();
        pred_sum.push(p);
        tp_sum.push(tp);
        true_sum.push(t);
    }
    (
        target_names.into_iter().collect(),
        (
            Array::from(pred_sum),
            Array::from(tp_sum),
            Array::from(true_sum),
        ),
    )
}

/// Type alias for representing the output of the `precision_recall_fscore_support`. The first
/// array contains the precision, the second the recall, the third the f-score and the last one
/// the support.
pub type PrecisionRecallFScoreTrueSum = (Array1<f32>, Array1<f32>, Array1<f32>, Array1<usize>);

#[allow(clippy::too_many_arguments)]
/// Computes the precision, recall, fscore and support of the predicted relations.
///
/// * `y_true`: Groundtruth relations, one per instance
/// * `y_pred`: Predicted relations, one per instance
/// * `beta`: Value of the `beta` parameter of the fscore. `beta=1` for F1 and `beta=0.5` for F0.5.
/// * `average`: What type of average to use.
/// * `sample_weight`: Weights of the relations, required by `Average::Samples`.
/// * `zero_division`: What to do in case of division by zero.
/// * `negative_label`: Relation meaning "no relation". It never counts as a class, so predicting
///   it is never a true positive and missing it is never a false negative.
/// * `parallel`: Can we use multiple cores for computations?
pub fn precision_recall_fscore_support<F: FloatExt>(
    y_true: &[&str],
    y_pred: &[&str],
    beta: F,
    average: Average,
    sample_weight: Option<ArcArray1<f32>>,
    zero_division: DivByZeroStrat,
    negative_label: Option<&str>,
    parallel: bool,
) -> Result<PrecisionRecallFScoreTrueSum, ComputationError> {
    check_for_empty_slices(y_true, y_pred)?;
    check_consistent_length(y_true, y_pred)?;
    let (target_names, counts) = extract_tp_actual_correct(y_true, y_pred, negative_label);
    if target_names.is_empty() {
        return Err(ComputationError::NoPositiveClass(String::from(
            negative_label.unwrap_or_default(),
        )));
    }
    precision_recall_fscore_support_inner(
        counts,
        beta,
        average,
        sample_weight,
        zero_division,
        parallel,
    )
}

fn precision_recall_fscore_support_inner<F: FloatExt>(
    counts: ActualTPCorrect<usize>,
    beta: F,
    average: Average,
    sample_weight: Option<ArcArray1<f32>>,
    zero_division: DivByZeroStrat,
    parallel: bool,
) -> Result<PrecisionRecallFScoreTrueSum, ComputationError> {
    if beta.is_sign_negative() {
        return Err(ComputationError::BetaNotPositive);
    };
    let (mut pred_sum, mut tp_sum, mut true_sum) = counts;
    let beta2: f32 = num::cast(beta.powi(2)).ok_or(ComputationError::BetaNotPositive)?;
    if matches!(average, Average::Micro) {
        tp_sum = array![tp_sum.sum()];
        pred_sum = array![pred_sum.sum()];
        true_sum = array![true_sum.sum()];
    };
    let arc_tp_sum = tp_sum.mapv(|x| x as f32).into_shared();
    let precision = prf_divide(
        arc_tp_sum.clone(), // ArcArray are inexpensive to clone
        pred_sum.mapv(|x| x as f32).view_mut(),
        parallel,
        zero_division,
    )?;
    let recall = prf_divide(
        arc_tp_sum,
        true_sum.mapv(|x| x as f32).view_mut(),
        parallel,
        zero_division,
    )?;
    let f_score: ArcArray1<f32> = if beta2.is_infinite() {
        recall.clone()
    } else {
        let denom = &precision * beta2 + &recall;
        let denom_non_zero = replace(denom.into_shared(), 0.0, 1.0, parallel);
        ((&precision * &recall) * (beta2 + 1.0) / &denom_non_zero).into_shared()
    };
    match average {
        Average::Weighted => {
            let weights = true_sum;
            if weights.sum() == 0 {
                return match zero_division {
                    DivByZeroStrat::ReturnError => {
                        Err(ComputationError::DivisionByZero(DivisionByZeroError))
                    }
                    _ => Ok((array![0.0], array![0.0], array![0.0], array![0])),
                };
            };
            let float_weights = weights.mapv(|x| x as f32).into_shared();
            let final_precision = array![precision.weighted_mean(&float_weights)?];
            let final_recall = array![recall.weighted_mean(&float_weights)?];
            let final_f_score = array![f_score.weighted_mean(&float_weights)?];
            Ok((
                final_precision,
                final_recall,
                final_f_score,
                array![weights.sum()],
            ))
        }
        Average::Samples => {
            let weights = sample_weight.ok_or(ComputationError::NoSampleWeight)?;
            if weights.len() != precision.len() {
                return Err(InconsistentLengthError(precision.len(), weights.len()).into());
            }
            let final_precision = array![precision.weighted_mean(&weights)?];
            let final_recall = array![recall.weighted_mean(&weights)?];
            let final_f_score = array![f_score.weighted_mean(&weights)?];
            Ok((
                final_precision,
                final_recall,
                final_f_score,
                array![true_sum.sum()],
            ))
        }
        Average::None => Ok((
            precision.into_owned(),
            recall.into_owned(),
            f_score.into_owned(),
            true_sum,
        )),
        Average::Micro | Average::Macro => {
            let mean = |a: &ArcArray1<f32>| {
                a.mean()
                    .ok_or(ComputationError::EmptyOrNotUnique(ArrayNotUniqueOrEmpty(0)))
            };
            Ok((
                array![mean(&precision)?],
                array![mean(&recall)?],
                array![mean(&f_score)?],
                array![true_sum.sum()],
            ))
        }
    }
}

/// Fraction of the predictions matching the groundtruth exactly.
pub fn accuracy(y_true: &[&str], y_pred: &[&str]) -> Result<f32, ComputationError> {
    check_for_empty_slices(y_true, y_pred)?;
    check_consistent_length(y_true, y_pred)?;
    let matches = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(matches as f32 / y_true.len() as f32)
}

/// Computes the precision, recall, fscore and support of every relation, along with the micro,
/// macro and weighted averages. With the negative label excluded, the micro average is the score
/// reported by the TACRED scorer.
///
/// * `y_true`: Groundtruth relations, one per instance
/// * `y_pred`: Predicted relations, one per instance
/// * `zero_division`: What to do in case of division by zero.
/// * `negative_label`: Relation meaning "no relation", excluded from the classes.
/// * `parallel`: Can we use multiple cores for array computations?
pub fn relation_report(
    y_true: &[&str],
    y_pred: &[&str],
    zero_division: DivByZeroStrat,
    negative_label: Option<&str>,
    parallel: bool,
) -> Result<Reporter, ComputationError> {
    relation_report_inner(y_true, y_pred, 1.0, zero_division, negative_label, parallel)
}

pub(crate) fn relation_report_inner(
    y_true: &[&str],
    y_pred: &[&str],
    beta: f32,
    zero_division: DivByZeroStrat,
    negative_label: Option<&str>,
    parallel: bool,
) -> Result<Reporter, ComputationError> {
    check_for_empty_slices(y_true, y_pred)?;
    check_consistent_length(y_true, y_pred)?;
    let (target_names, counts) = extract_tp_actual_correct(y_true, y_pred, negative_label);
    if target_names.is_empty() {
        return Err(ComputationError::NoPositiveClass(String::from(
            negative_label.unwrap_or_default(),
        )));
    }
    let (p, r, f1, s) = precision_recall_fscore_support_inner::<f32>(
        counts.clone(),
        beta,
        Average::None,
        None,
        zero_division,
        parallel,
    )?;
    let mut reporter = Reporter::default();
    for (name, precision, recall, fscore, support) in multizip((
        target_names.iter(),
        p.into_iter(),
        r.into_iter(),
        f1.into_iter(),
        s.into_iter(),
    )) {
        reporter.insert(ClassMetricsInner {
            class: String::from(*name),
            precision,
            recall,
            fscore,
            support,
            average: Average::None,
        });
    }
    for avg in [
        OverallAverage::Micro,
        OverallAverage::Macro,
        OverallAverage::Weighted,
    ] {
        let (p, r, f1, s) = precision_recall_fscore_support_inner::<f32>(
            counts.clone(),
            beta,
            avg.into(),
            None,
            zero_division,
            parallel,
        )?;
        reporter.insert(ClassMetricsInner::new_overall(
            avg,
            p.item()?,
            r.item()?,
            f1.item()?,
            s.item()?,
        ));
    }
    Ok(reporter)
}
