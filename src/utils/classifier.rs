use crate::error::{EngineResult, ValueError};
use crate::models::{Market, MatchFeatures, Outcome, ProbabilityDistribution};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A trained model that scores match features into outcome probabilities.
///
/// `predict_proba` returns probabilities in the same order as `classes`.
/// That order is the model's own and need not match `Outcome`'s.
pub trait OutcomeClassifier {
    fn classes(&self) -> Vec<String>;
    fn predict_proba(&self, features: &MatchFeatures) -> Vec<f64>;
}

/// Pair classifier probabilities with outcomes by label name.
/// The result must cover Home, Draw and Away.
pub fn align_probabilities(
    labels: &[String],
    probabilities: &[f64],
) -> EngineResult<ProbabilityDistribution> {
    if labels.len() != probabilities.len() {
        return Err(ValueError::LabelCountMismatch {
            labels: labels.len(),
            probabilities: probabilities.len(),
        });
    }

    let mut seen = HashSet::new();
    let mut pairs = Vec::with_capacity(labels.len());
    for (label, prob) in labels.iter().zip(probabilities) {
        let outcome = Outcome::from_label(label)?;
        if !seen.insert(outcome) {
            return Err(ValueError::DuplicateLabel(label.clone()));
        }
        pairs.push((outcome, *prob));
    }

    let distribution = ProbabilityDistribution::from_pairs(pairs)?;
    if distribution.market() != Some(Market::ThreeWay) {
        return Err(ValueError::InvalidDistribution(format!(
            "classifier covers {:?}, expected Home, Draw and Away",
            distribution.outcomes()
        )));
    }
    Ok(distribution)
}

/// A finished match used for training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalMatch {
    pub home_xg: f64,
    pub away_xg: f64,
    /// Full-time result code: H, D or A
    pub result: String,
}

const CLASS_LABELS: [&str; 3] = ["A", "D", "H"];
const BUCKET_WIDTH: f64 = 0.5;
const MAX_BUCKET: i32 = 6;
const SMOOTHING: f64 = 1.0;

/// Outcome frequencies per expected-goal-difference bucket, Laplace smoothed.
/// Classes are kept in alphabetical label order (A, D, H).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalFrequencyClassifier {
    counts: BTreeMap<i32, [u32; 3]>,
    samples: usize,
}

impl HistoricalFrequencyClassifier {
    pub fn fit(matches: &[HistoricalMatch]) -> EngineResult<Self> {
        let mut classifier = Self::default();
        for m in matches {
            let class = Self::class_index(&m.result)?;
            let bucket = Self::bucket(m.home_xg - m.away_xg);
            classifier.counts.entry(bucket).or_insert([0; 3])[class] += 1;
            classifier.samples += 1;
        }
        Ok(classifier)
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Position of the result's class in `CLASS_LABELS`
    fn class_index(result: &str) -> EngineResult<usize> {
        Ok(match Outcome::from_label(result)? {
            Outcome::Away => 0,
            Outcome::Draw => 1,
            Outcome::Home => 2,
        })
    }

    fn bucket(goal_diff: f64) -> i32 {
        if goal_diff.is_nan() {
            return 0;
        }
        ((goal_diff / BUCKET_WIDTH).round() as i32).clamp(-MAX_BUCKET, MAX_BUCKET)
    }
}

impl OutcomeClassifier for HistoricalFrequencyClassifier {
    fn classes(&self) -> Vec<String> {
        CLASS_LABELS.iter().map(|l| l.to_string()).collect()
    }

    fn predict_proba(&self, features: &MatchFeatures) -> Vec<f64> {
        let counts = self
            .counts
            .get(&Self::bucket(features.goal_diff))
            .copied()
            .unwrap_or([0; 3]);
        let total: f64 = counts.iter().map(|c| *c as f64).sum::<f64>()
            + SMOOTHING * CLASS_LABELS.len() as f64;
        counts
            .iter()
            .map(|c| (*c as f64 + SMOOTHING) / total)
            .collect()
    }
}
