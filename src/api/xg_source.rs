use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Supplies a team's expected goals for a season.
///
/// Implementations may sit on top of a network client, but the call itself is
/// synchronous: the evaluator just waits for the number.
pub trait XgSource {
    fn fetch_expected_goals(&self, team: &str, season: &str) -> Result<f64>;
}

/// Helper function to normalize team names for consistent matching
pub fn normalize_team_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace('&', "and")
        .replace(['.', '\''], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

fn key(team: &str, season: &str) -> (String, String) {
    (normalize_team_name(team), season.trim().to_string())
}

/// Expected goals held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticXgSource {
    table: HashMap<(String, String), f64>,
}

impl StaticXgSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, team: &str, season: &str, xg: f64) {
        self.table.insert(key(team, season), xg);
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl XgSource for StaticXgSource {
    fn fetch_expected_goals(&self, team: &str, season: &str) -> Result<f64> {
        self.table
            .get(&key(team, season))
            .copied()
            .with_context(|| format!("No expected goals for {} in season {}", team, season))
    }
}

/// One row of an expected-goals table
#[derive(Debug, Deserialize)]
struct XgRow {
    team: String,
    season: String,
    xg: f64,
}

/// Expected goals loaded from a CSV file with `team,season,xg` columns
#[derive(Debug, Clone)]
pub struct CsvXgSource {
    inner: StaticXgSource,
}

impl CsvXgSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open xG table {}", path.display()))?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut inner = StaticXgSource::new();
        for row in reader.deserialize() {
            let row: XgRow = row.context("Failed to parse xG row")?;
            inner.insert(&row.team, &row.season, row.xg);
        }
        tracing::info!("Loaded expected goals for {} team seasons", inner.len());
        Ok(Self { inner })
    }
}

impl XgSource for CsvXgSource {
    fn fetch_expected_goals(&self, team: &str, season: &str) -> Result<f64> {
        self.inner.fetch_expected_goals(team, season)
    }
}
