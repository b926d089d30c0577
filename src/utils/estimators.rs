use crate::error::{EngineResult, ValueError};
use crate::models::{MatchFeatures, Mode, ProbabilityDistribution};
use crate::utils::classifier::{align_probabilities, OutcomeClassifier};
use tracing::debug;

const BASELINE_WIN_PROB: f64 = 0.4;
const PROB_PER_GOAL: f64 = 0.1;
const MIN_WIN_PROB: f64 = 0.05;
const MAX_WIN_PROB: f64 = 0.9;

/// NaN passes through unchanged
fn clamp_win_prob(x: f64) -> f64 {
    x.clamp(MIN_WIN_PROB, MAX_WIN_PROB)
}

/// Three-way probabilities from expected goals.
///
/// Home and away win probabilities move 0.1 per goal of expected goal
/// difference away from a 0.4 baseline and are clamped to [0.05, 0.9].
/// The draw takes whatever is left and is not clamped.
pub fn estimate_three_way(
    expected_home_goals: f64,
    expected_away_goals: f64,
) -> ProbabilityDistribution {
    let goal_diff = expected_home_goals - expected_away_goals;

    let p_home = clamp_win_prob(BASELINE_WIN_PROB + PROB_PER_GOAL * goal_diff);
    let p_away = clamp_win_prob(BASELINE_WIN_PROB - PROB_PER_GOAL * goal_diff);
    let p_draw = 1.0 - p_home - p_away;

    debug!(goal_diff, p_home, p_draw, p_away, "heuristic estimate");

    ProbabilityDistribution::three_way(p_home, p_draw, p_away)
}

/// Two-way probabilities from each side's share of the total xG
pub fn estimate_two_way(home_xg: f64, away_xg: f64) -> EngineResult<ProbabilityDistribution> {
    let total = home_xg + away_xg;
    if total == 0.0 {
        return Err(ValueError::DivisionByZero("total expected goals is zero"));
    }

    let p_home = home_xg / total;
    let p_away = away_xg / total;

    debug!(home_xg, away_xg, p_home, p_away, "xG ratio estimate");

    Ok(ProbabilityDistribution::two_way(p_home, p_away))
}

/// Which estimator turns expected goals into probabilities
pub enum Estimator<'a> {
    Heuristic,
    XgRatio,
    Classifier(&'a dyn OutcomeClassifier),
}

impl Estimator<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Estimator::Heuristic => "heuristic",
            Estimator::XgRatio => "xg-ratio",
            Estimator::Classifier(_) => "classifier",
        }
    }

    /// Estimate, then apply the strictness mode
    pub fn estimate(
        &self,
        expected_home_goals: f64,
        expected_away_goals: f64,
        mode: Mode,
    ) -> EngineResult<ProbabilityDistribution> {
        let distribution = match self {
            Estimator::Heuristic => estimate_three_way(expected_home_goals, expected_away_goals),
            Estimator::XgRatio => estimate_two_way(expected_home_goals, expected_away_goals)?,
            Estimator::Classifier(classifier) => {
                let features =
                    MatchFeatures::from_expected_goals(expected_home_goals, expected_away_goals);
                estimate_with_classifier(*classifier, &features)?
            }
        };
        distribution.with_mode(mode)
    }
}

/// Run a classifier and pair its probabilities with outcomes by label
pub fn estimate_with_classifier(
    classifier: &dyn OutcomeClassifier,
    features: &MatchFeatures,
) -> EngineResult<ProbabilityDistribution> {
    let labels = classifier.classes();
    let probabilities = classifier.predict_proba(features);
    align_probabilities(&labels, &probabilities)
}
