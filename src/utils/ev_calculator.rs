use crate::error::{EngineResult, ValueError};
use crate::models::{Outcome, OddsQuote, ProbabilityDistribution};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Convert American odds to a decimal price (stake included)
/// Positive odds (+150) mean you win $150 on a $100 bet
/// Negative odds (-150) mean you need to bet $150 to win $100
pub fn american_to_decimal(odds: i32) -> f64 {
    if odds > 0 {
        1.0 + odds as f64 / 100.0
    } else {
        1.0 + 100.0 / odds.unsigned_abs() as f64
    }
}

/// Break-even decimal odds for a probability
pub fn fair_odds(probability: f64) -> EngineResult<f64> {
    if probability == 0.0 {
        return Err(ValueError::DivisionByZero("fair odds of a zero probability"));
    }
    Ok(1.0 / probability)
}

/// Expected value per unit staked: probability * odds - 1
pub fn calculate_value(probability: f64, odds: f64) -> f64 {
    probability * odds - 1.0
}

/// Value analysis for one outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeValue {
    pub outcome: Outcome,
    pub probability: f64,
    pub odds: f64,
    pub fair_odds: f64,
    pub value: f64,
    /// Probability implied by the bookmaker price
    pub implied_prob: f64,
    /// Model probability minus implied probability
    pub edge: f64,
}

impl OutcomeValue {
    pub fn is_value(&self) -> bool {
        self.value > 0.0
    }
}

/// What to bet on, if anything
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Recommendation {
    ValueBet { outcome: Outcome, value: f64 },
    NoValue,
}

impl Recommendation {
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Recommendation::ValueBet { outcome, .. } => Some(*outcome),
            Recommendation::NoValue => None,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::ValueBet { outcome, .. } => write!(f, "value bet found on {}", outcome),
            Recommendation::NoValue => write!(f, "no value bet found"),
        }
    }
}

/// Output of the value calculator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueReport {
    pub values: BTreeMap<Outcome, OutcomeValue>,
    /// Outcome with the highest value, whatever its sign
    pub best: Outcome,
}

impl ValueReport {
    pub fn get(&self, outcome: Outcome) -> Option<&OutcomeValue> {
        self.values.get(&outcome)
    }

    /// `None` only for a report whose `best` has no entry in `values`
    pub fn best_value(&self) -> Option<&OutcomeValue> {
        self.values.get(&self.best)
    }

    pub fn recommendation(&self) -> Recommendation {
        match self.best_value() {
            Some(best) if best.is_value() => Recommendation::ValueBet {
                outcome: best.outcome,
                value: best.value,
            },
            _ => Recommendation::NoValue,
        }
    }

    fn check(&self) -> EngineResult<()> {
        if let Some((key, v)) = self.values.iter().find(|(key, v)| **key != v.outcome) {
            return Err(ValueError::InvalidReport(format!(
                "entry under {} describes {}",
                key, v.outcome
            )));
        }
        if !self.values.contains_key(&self.best) {
            return Err(ValueError::InvalidReport(format!(
                "best outcome {} has no value entry",
                self.best
            )));
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for ValueReport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Fields {
            values: BTreeMap<Outcome, OutcomeValue>,
            best: Outcome,
        }

        let fields = Fields::deserialize(deserializer)?;
        let report = ValueReport {
            values: fields.values,
            best: fields.best,
        };
        report.check().map_err(de::Error::custom)?;
        Ok(report)
    }
}

/// Compute fair odds and value for every outcome and pick the best one.
///
/// The distribution and the quote must cover exactly the same outcomes.
/// Ties on value go to the outcome that comes first in canonical order
/// (Home, Draw, Away).
pub fn compute_value(
    distribution: &ProbabilityDistribution,
    odds: &OddsQuote,
) -> EngineResult<ValueReport> {
    let prob_outcomes = distribution.outcomes();
    let odds_outcomes = odds.outcomes();
    if prob_outcomes != odds_outcomes || prob_outcomes.is_empty() {
        return Err(ValueError::KeySetMismatch {
            probabilities: prob_outcomes,
            odds: odds_outcomes,
        });
    }

    let mut values = BTreeMap::new();
    let mut best: Option<(Outcome, f64)> = None;

    for (outcome, probability) in distribution.iter() {
        // Key sets were checked above
        let price = odds.get(outcome).unwrap_or_default();
        let fair = fair_odds(probability)?;
        let value = calculate_value(probability, price);
        let implied_prob = 1.0 / price;

        debug!(
            %outcome,
            probability, price, fair_odds = fair, value, "computed outcome value"
        );

        // Strictly greater keeps the earlier outcome on ties; NaN never stays best
        if best.map_or(true, |(_, best_value)| value > best_value || best_value.is_nan()) {
            best = Some((outcome, value));
        }

        values.insert(
            outcome,
            OutcomeValue {
                outcome,
                probability,
                odds: price,
                fair_odds: fair,
                value,
                implied_prob,
                edge: probability - implied_prob,
            },
        );
    }

    // The key set is non-empty, so the loop ran at least once
    let best = best.map(|(outcome, _)| outcome).unwrap_or(prob_outcomes[0]);

    Ok(ValueReport { values, best })
}
