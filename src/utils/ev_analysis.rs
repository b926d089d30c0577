use crate::api::xg_source::XgSource;
use crate::models::{round2, League, Mode, OddsQuote, ProbabilityDistribution};
use crate::utils::estimators::Estimator;
use crate::utils::ev_calculator::{compute_value, Recommendation, ValueReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Where a fixture's expected goals come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpectedGoals {
    /// Given directly by the caller
    Direct { home: f64, away: f64 },
    /// Looked up per team through an `XgSource`
    Season(String),
}

/// One match to evaluate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureRequest {
    pub league: League,
    pub home_team: String,
    pub away_team: String,
    pub expected_goals: ExpectedGoals,
    pub odds: OddsQuote,
}

/// Everything the engine worked out for one fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub league: League,
    pub home_team: String,
    pub away_team: String,
    pub estimator: String,
    pub mode: Mode,
    pub expected_home_goals: f64,
    pub expected_away_goals: f64,
    pub distribution: ProbabilityDistribution,
    pub value: ValueReport,
    pub recommendation: Recommendation,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationReport {
    pub fn best_value(&self) -> f64 {
        self.value
            .best_value()
            .map_or(f64::NEG_INFINITY, |best| best.value)
    }

    /// Format the evaluation as a readable line per outcome plus the verdict
    pub fn format(&self) -> String {
        let mut lines = vec![format!(
            "{} @ {} [{}] | xG {:.2} - {:.2} | {}",
            self.away_team,
            self.home_team,
            self.league,
            self.expected_home_goals,
            self.expected_away_goals,
            self.estimator,
        )];

        for v in self.value.values.values() {
            lines.push(format!(
                "  {} ({}) | Odds: {:.2} | Prob: {:.1}% | Fair: {:.2} | Value: {:+.2} | Edge: {:+.2}%",
                v.outcome.symbol(),
                v.outcome,
                v.odds,
                round2(v.probability) * 100.0,
                round2(v.fair_odds),
                round2(v.value),
                v.edge * 100.0
            ));
        }

        lines.push(format!("  => {}", self.recommendation));
        lines.join("\n")
    }
}

fn resolve_expected_goals(
    request: &FixtureRequest,
    source: Option<&dyn XgSource>,
) -> Result<(f64, f64)> {
    match &request.expected_goals {
        ExpectedGoals::Direct { home, away } => Ok((*home, *away)),
        ExpectedGoals::Season(season) => {
            let source = source.context("Fixture needs an expected goals source")?;
            let home = source
                .fetch_expected_goals(&request.home_team, season)
                .with_context(|| format!("Failed to get xG for {}", request.home_team))?;
            let away = source
                .fetch_expected_goals(&request.away_team, season)
                .with_context(|| format!("Failed to get xG for {}", request.away_team))?;
            Ok((home, away))
        }
    }
}

/// Estimate probabilities for a fixture and compute value against its odds
pub fn evaluate_fixture(
    request: &FixtureRequest,
    estimator: &Estimator<'_>,
    source: Option<&dyn XgSource>,
    mode: Mode,
) -> Result<EvaluationReport> {
    let (expected_home_goals, expected_away_goals) = resolve_expected_goals(request, source)?;

    let distribution = estimator
        .estimate(expected_home_goals, expected_away_goals, mode)
        .with_context(|| {
            format!(
                "Failed to estimate {} vs {}",
                request.home_team, request.away_team
            )
        })?;
    let value = compute_value(&distribution, &request.odds).with_context(|| {
        format!(
            "Failed to compute value for {} vs {}",
            request.home_team, request.away_team
        )
    })?;
    let recommendation = value.recommendation();

    info!(
        home = %request.home_team,
        away = %request.away_team,
        %recommendation,
        "evaluated fixture"
    );

    Ok(EvaluationReport {
        league: request.league,
        home_team: request.home_team.clone(),
        away_team: request.away_team.clone(),
        estimator: estimator.name().to_string(),
        mode,
        expected_home_goals,
        expected_away_goals,
        distribution,
        value,
        recommendation,
        evaluated_at: Utc::now(),
    })
}

/// Evaluate many fixtures and return them sorted by best value, highest first.
/// Fixtures that cannot be evaluated are skipped with a warning.
/// `top_n` of `None` keeps every fixture.
pub fn evaluate_fixtures(
    requests: &[FixtureRequest],
    estimator: &Estimator<'_>,
    source: Option<&dyn XgSource>,
    mode: Mode,
    top_n: Option<usize>,
) -> Vec<EvaluationReport> {
    let mut reports: Vec<EvaluationReport> = requests
        .iter()
        .filter_map(|request| match evaluate_fixture(request, estimator, source, mode) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(
                    "Skipping {} vs {}: {:#}",
                    request.home_team, request.away_team, e
                );
                None
            }
        })
        .collect();

    reports.sort_by(|a, b| {
        b.best_value()
            .partial_cmp(&a.best_value())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    match top_n {
        Some(n) => reports.into_iter().take(n).collect(),
        None => reports,
    }
}

/// Only the fixtures with a value bet
pub fn value_bets(reports: &[EvaluationReport]) -> Vec<&EvaluationReport> {
    reports
        .iter()
        .filter(|r| r.recommendation != Recommendation::NoValue)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::xg_source::StaticXgSource;
    use crate::models::Outcome;

    fn request(home: f64, away: f64, odds: OddsQuote) -> FixtureRequest {
        FixtureRequest {
            league: League::Bundesliga,
            home_team: "Home FC".to_string(),
            away_team: "Away FC".to_string(),
            expected_goals: ExpectedGoals::Direct { home, away },
            odds,
        }
    }

    #[test]
    fn test_end_to_end_three_way() {
        let req = request(1.5, 1.2, OddsQuote::three_way(2.2, 3.3, 3.0).unwrap());
        let report = evaluate_fixture(&req, &Estimator::Heuristic, None, Mode::Lenient).unwrap();

        let rounded = report.distribution.rounded();
        assert_eq!(rounded.get(Outcome::Home), Some(0.43));
        assert_eq!(rounded.get(Outcome::Draw), Some(0.2));
        assert_eq!(rounded.get(Outcome::Away), Some(0.37));

        let home = report.value.get(Outcome::Home).unwrap().value;
        let draw = report.value.get(Outcome::Draw).unwrap().value;
        let away = report.value.get(Outcome::Away).unwrap().value;
        assert!((home + 0.054).abs() < 1e-9);
        assert!((draw + 0.34).abs() < 1e-9);
        assert!((away - 0.11).abs() < 1e-9);

        assert_eq!(report.recommendation.outcome(), Some(Outcome::Away));
        assert_eq!(report.recommendation.to_string(), "value bet found on Away");
    }

    #[test]
    fn test_two_way_key_set_mismatch_is_reported() {
        let req = request(1.5, 1.5, OddsQuote::three_way(2.0, 3.0, 2.0).unwrap());
        let err = evaluate_fixture(&req, &Estimator::XgRatio, None, Mode::Lenient).unwrap_err();
        assert!(err.to_string().contains("Failed to compute value"));
    }

    #[test]
    fn test_season_lookup_through_source() {
        let mut source = StaticXgSource::new();
        source.insert("Home FC", "2024", 2.0);
        source.insert("Away FC", "2024", 1.0);

        let req = FixtureRequest {
            expected_goals: ExpectedGoals::Season("2024".to_string()),
            ..request(0.0, 0.0, OddsQuote::two_way(1.4, 3.5).unwrap())
        };
        let report = evaluate_fixture(&req, &Estimator::XgRatio, Some(&source), Mode::Lenient)
            .unwrap();
        assert_eq!(report.expected_home_goals, 2.0);
        let home = report.distribution.get(Outcome::Home).unwrap();
        assert!((home - 2.0 / 3.0).abs() < 1e-12);

        assert!(evaluate_fixture(&req, &Estimator::XgRatio, None, Mode::Lenient).is_err());
    }

    #[test]
    fn test_batch_sorted_and_skips_failures() {
        let requests = vec![
            request(1.0, 1.0, OddsQuote::two_way(1.5, 1.5).unwrap()),
            request(0.0, 0.0, OddsQuote::two_way(2.0, 2.0).unwrap()),
            request(1.0, 1.0, OddsQuote::two_way(2.5, 1.5).unwrap()),
        ];
        let reports = evaluate_fixtures(&requests, &Estimator::XgRatio, None, Mode::Lenient, None);

        assert_eq!(reports.len(), 2);
        assert!(reports[0].best_value() > reports[1].best_value());
        assert_eq!(value_bets(&reports).len(), 1);

        let top = evaluate_fixtures(&requests, &Estimator::XgRatio, None, Mode::Lenient, Some(1));
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_format_mentions_every_outcome() {
        let req = request(1.5, 1.2, OddsQuote::three_way(2.2, 3.3, 3.0).unwrap());
        let report = evaluate_fixture(&req, &Estimator::Heuristic, None, Mode::Lenient).unwrap();
        let text = report.format();
        assert!(text.contains("1 (Home)"));
        assert!(text.contains("X (Draw)"));
        assert!(text.contains("2 (Away)"));
        assert!(text.contains("value bet found on Away"));
    }
}
