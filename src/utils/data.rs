use crate::models::{round2, League, OddsQuote, Outcome};
use crate::utils::classifier::HistoricalMatch;
use crate::utils::ev_analysis::{EvaluationReport, ExpectedGoals, FixtureRequest};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One row of a fixtures file. Leave `odds_draw` empty for a two-way market
/// and the xG columns empty to look them up by `season`.
#[derive(Debug, Deserialize)]
struct FixtureRow {
    league: String,
    home_team: String,
    away_team: String,
    season: Option<String>,
    home_xg: Option<f64>,
    away_xg: Option<f64>,
    odds_home: f64,
    odds_draw: Option<f64>,
    odds_away: f64,
}

impl FixtureRow {
    fn into_request(self) -> Result<FixtureRequest> {
        let league: League = self.league.parse()?;

        let expected_goals = match (self.home_xg, self.away_xg, self.season) {
            (Some(home), Some(away), _) => ExpectedGoals::Direct { home, away },
            (_, _, Some(season)) if !season.trim().is_empty() => ExpectedGoals::Season(season),
            _ => anyhow::bail!(
                "{} vs {} has neither xG values nor a season",
                self.home_team,
                self.away_team
            ),
        };

        let odds = match self.odds_draw {
            Some(draw) => OddsQuote::three_way(self.odds_home, draw, self.odds_away)?,
            None => OddsQuote::two_way(self.odds_home, self.odds_away)?,
        };

        Ok(FixtureRequest {
            league,
            home_team: self.home_team,
            away_team: self.away_team,
            expected_goals,
            odds,
        })
    }
}

/// Load fixtures from a CSV file
pub fn load_fixtures_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<FixtureRequest>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open fixtures {}", path.display()))?;
    read_fixtures(file)
}

pub fn read_fixtures<R: Read>(reader: R) -> Result<Vec<FixtureRequest>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut fixtures = Vec::new();
    for (i, row) in reader.deserialize().enumerate() {
        let row: FixtureRow = row.with_context(|| format!("Failed to parse fixture row {}", i + 1))?;
        fixtures.push(
            row.into_request()
                .with_context(|| format!("Invalid fixture row {}", i + 1))?,
        );
    }
    Ok(fixtures)
}

/// Load historical results (`home_xg,away_xg,result`) for training a classifier
pub fn load_historical_matches<P: AsRef<Path>>(path: P) -> Result<Vec<HistoricalMatch>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open historical results {}", path.display()))?;
    read_historical_matches(file)
}

pub fn read_historical_matches<R: Read>(reader: R) -> Result<Vec<HistoricalMatch>> {
    let mut reader = csv::Reader::from_reader(reader);
    reader
        .deserialize()
        .map(|row| row.context("Failed to parse historical result"))
        .collect()
}

/// Save evaluation reports to a JSON file
pub fn save_reports_to_json<P: AsRef<Path>>(reports: &[EvaluationReport], path: P) -> Result<()> {
    let json =
        serde_json::to_string_pretty(reports).context("Failed to serialize evaluation reports")?;
    std::fs::write(path, json).context("Failed to write JSON file")?;
    Ok(())
}

/// Load evaluation reports back from JSON
pub fn load_reports_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<EvaluationReport>> {
    let json = std::fs::read_to_string(path).context("Failed to read JSON file")?;
    let reports = serde_json::from_str(&json).context("Failed to deserialize evaluation reports")?;
    Ok(reports)
}

/// One outcome of one evaluated fixture, as written to the results CSV
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "League")]
    league: String,
    #[serde(rename = "Home Team")]
    home_team: &'a str,
    #[serde(rename = "Away Team")]
    away_team: &'a str,
    #[serde(rename = "Estimator")]
    estimator: &'a str,
    #[serde(rename = "Outcome")]
    outcome: &'static str,
    #[serde(rename = "Odds")]
    odds: f64,
    #[serde(rename = "Probability (%)")]
    probability_pct: f64,
    #[serde(rename = "Fair Odds")]
    fair_odds: f64,
    #[serde(rename = "Value")]
    value: f64,
    #[serde(rename = "Edge (%)")]
    edge_pct: f64,
    #[serde(rename = "Recommended")]
    recommended: bool,
}

/// Save evaluation reports to CSV, one row per outcome
pub fn save_reports_to_csv<P: AsRef<Path>>(reports: &[EvaluationReport], path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("Failed to create CSV file")?;

    for report in reports {
        let recommended: Option<Outcome> = report.recommendation.outcome();
        for v in report.value.values.values() {
            writer
                .serialize(ReportRow {
                    league: report.league.to_string(),
                    home_team: &report.home_team,
                    away_team: &report.away_team,
                    estimator: &report.estimator,
                    outcome: v.outcome.symbol(),
                    odds: round2(v.odds),
                    probability_pct: (v.probability * 1000.0).round() / 10.0,
                    fair_odds: round2(v.fair_odds),
                    value: round2(v.value),
                    edge_pct: round2(v.edge * 100.0),
                    recommended: recommended == Some(v.outcome),
                })
                .context("Failed to write CSV row")?;
        }
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mode;
    use crate::utils::estimators::Estimator;
    use crate::utils::ev_analysis::evaluate_fixture;

    const FIXTURES: &str = "\
league,home_team,away_team,season,home_xg,away_xg,odds_home,odds_draw,odds_away
Bundesliga,Bayern,Dortmund,,1.5,1.2,2.2,3.3,3.0
Premier League,Arsenal,Chelsea,2024,,,1.9,,2.1
";

    #[test]
    fn test_read_fixtures() {
        let fixtures = read_fixtures(FIXTURES.as_bytes()).unwrap();
        assert_eq!(fixtures.len(), 2);

        assert_eq!(fixtures[0].league, League::Bundesliga);
        assert_eq!(
            fixtures[0].expected_goals,
            ExpectedGoals::Direct {
                home: 1.5,
                away: 1.2
            }
        );
        assert_eq!(fixtures[0].odds.get(Outcome::Draw), Some(3.3));

        assert_eq!(fixtures[1].league, League::PremierLeague);
        assert_eq!(
            fixtures[1].expected_goals,
            ExpectedGoals::Season("2024".to_string())
        );
        assert_eq!(fixtures[1].odds.get(Outcome::Draw), None);
    }

    #[test]
    fn test_read_fixtures_rejects_bad_odds() {
        let data = "\
league,home_team,away_team,season,home_xg,away_xg,odds_home,odds_draw,odds_away
Serie A,Inter,Milan,,1.0,1.0,0.9,3.0,2.0
";
        assert!(read_fixtures(data.as_bytes()).is_err());
    }

    #[test]
    fn test_read_historical_matches() {
        let data = "home_xg,away_xg,result\n1.8,0.9,H\n1.1,1.2,D\n";
        let matches = read_historical_matches(data.as_bytes()).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].result, "D");
    }

    #[test]
    fn test_save_reports() {
        let fixtures = read_fixtures(FIXTURES.as_bytes()).unwrap();
        let report =
            evaluate_fixture(&fixtures[0], &Estimator::Heuristic, None, Mode::Lenient).unwrap();

        let dir = std::env::temp_dir();
        let csv_path = dir.join("football_value_ev_reports.csv");
        let json_path = dir.join("football_value_ev_reports.json");

        save_reports_to_csv(std::slice::from_ref(&report), &csv_path).unwrap();
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().count(), 4);
        assert!(csv.lines().any(|l| l.contains(",2,") && l.ends_with("true")));

        save_reports_to_json(std::slice::from_ref(&report), &json_path).unwrap();
        let loaded = load_reports_from_json(&json_path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded[0].recommendation.outcome(),
            report.recommendation.outcome()
        );

        std::fs::remove_file(csv_path).ok();
        std::fs::remove_file(json_path).ok();
    }

    #[test]
    fn test_save_reports_quotes_team_names_with_commas() {
        let data = "\
league,home_team,away_team,season,home_xg,away_xg,odds_home,odds_draw,odds_away
Serie A,\"Inter, Milano\",Juventus,,1.6,1.1,2.0,3.4,3.8
";
        let fixtures = read_fixtures(data.as_bytes()).unwrap();
        assert_eq!(fixtures[0].home_team, "Inter, Milano");
        let report =
            evaluate_fixture(&fixtures[0], &Estimator::Heuristic, None, Mode::Lenient).unwrap();

        let csv_path = std::env::temp_dir().join("football_value_ev_comma_names.csv");
        save_reports_to_csv(std::slice::from_ref(&report), &csv_path).unwrap();

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.headers().unwrap().len(), 11);
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        for record in &records {
            assert_eq!(record.len(), 11);
            assert_eq!(&record[1], "Inter, Milano");
            assert_eq!(&record[2], "Juventus");
        }

        std::fs::remove_file(csv_path).ok();
    }
}
