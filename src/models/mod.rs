use crate::error::{EngineResult, ValueError};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Bookmakers never quote below this decimal price
pub const MIN_DECIMAL_ODDS: f64 = 1.01;

/// How far a distribution's sum may drift from 1 before it counts as invalid
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// A match outcome. Declaration order is the canonical order used for
/// iteration and for breaking ties between equal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    /// Betting-slip symbol: 1, X or 2
    pub fn symbol(&self) -> &'static str {
        match self {
            Outcome::Home => "1",
            Outcome::Draw => "X",
            Outcome::Away => "2",
        }
    }

    /// Parse a classifier or data-feed label into an outcome.
    /// Accepts full names, result codes (H/D/A) and slip symbols (1/X/2).
    pub fn from_label(label: &str) -> EngineResult<Outcome> {
        match label.trim().to_lowercase().as_str() {
            "home" | "h" | "1" | "home_win" => Ok(Outcome::Home),
            "draw" | "d" | "x" => Ok(Outcome::Draw),
            "away" | "a" | "2" | "away_win" => Ok(Outcome::Away),
            _ => Err(ValueError::UnknownLabel(label.to_string())),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Home => "Home",
            Outcome::Draw => "Draw",
            Outcome::Away => "Away",
        };
        write!(f, "{}", name)
    }
}

/// Market type, which fixes the outcome set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    ThreeWay,
    TwoWay,
}

impl Market {
    pub fn outcomes(&self) -> &'static [Outcome] {
        match self {
            Market::ThreeWay => &[Outcome::Home, Outcome::Draw, Outcome::Away],
            Market::TwoWay => &[Outcome::Home, Outcome::Away],
        }
    }

    /// Work out the market from a set of outcomes, if it matches one exactly
    pub fn from_outcomes(outcomes: &[Outcome]) -> Option<Market> {
        [Market::ThreeWay, Market::TwoWay]
            .into_iter()
            .find(|market| market.outcomes() == outcomes)
    }
}

/// Whether estimator output is passed through untouched or repaired first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Keep the heuristic's output as-is, even when it does not sum to 1
    #[default]
    Lenient,
    /// Clamp into [0, 1] and renormalise; reject what cannot be repaired
    Strict,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lenient" | "legacy" => Ok(Mode::Lenient),
            "strict" => Ok(Mode::Strict),
            other => anyhow::bail!("unknown value mode '{}' (expected strict or lenient)", other),
        }
    }
}

/// Competitions offered for selection. Only used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum League {
    Bundesliga,
    PremierLeague,
    LaLiga,
    SerieA,
    Ligue1,
    Ekstraklasa,
    ChampionsLeague,
    EuropaLeague,
    ConferenceLeague,
}

impl League {
    pub fn all() -> &'static [League] {
        &[
            League::Bundesliga,
            League::PremierLeague,
            League::LaLiga,
            League::SerieA,
            League::Ligue1,
            League::Ekstraklasa,
            League::ChampionsLeague,
            League::EuropaLeague,
            League::ConferenceLeague,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            League::Bundesliga => "Bundesliga",
            League::PremierLeague => "Premier League",
            League::LaLiga => "La Liga",
            League::SerieA => "Serie A",
            League::Ligue1 => "Ligue 1",
            League::Ekstraklasa => "Ekstraklasa",
            League::ChampionsLeague => "Champions League",
            League::EuropaLeague => "Europa League",
            League::ConferenceLeague => "Conference League",
        }
    }
}

impl FromStr for League {
    type Err = anyhow::Error;

    /// Accepts display names ("Premier League") as well as compact forms ("premierleague")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        League::all()
            .iter()
            .copied()
            .find(|league| {
                league
                    .display_name()
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
                    .to_lowercase()
                    == wanted
            })
            .ok_or_else(|| anyhow::anyhow!("unknown league '{}'", s))
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Round to two decimals for display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Probability per outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityDistribution {
    probs: BTreeMap<Outcome, f64>,
}

impl ProbabilityDistribution {
    pub fn three_way(home: f64, draw: f64, away: f64) -> Self {
        Self {
            probs: BTreeMap::from([
                (Outcome::Home, home),
                (Outcome::Draw, draw),
                (Outcome::Away, away),
            ]),
        }
    }

    pub fn two_way(home: f64, away: f64) -> Self {
        Self {
            probs: BTreeMap::from([(Outcome::Home, home), (Outcome::Away, away)]),
        }
    }

    /// Build from outcome/probability pairs; an outcome may appear only once
    pub fn from_pairs<I>(pairs: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (Outcome, f64)>,
    {
        let mut probs = BTreeMap::new();
        for (outcome, prob) in pairs {
            if probs.insert(outcome, prob).is_some() {
                return Err(ValueError::DuplicateLabel(outcome.to_string()));
            }
        }
        Ok(Self { probs })
    }

    pub fn get(&self, outcome: Outcome) -> Option<f64> {
        self.probs.get(&outcome).copied()
    }

    /// Outcomes covered, in canonical order
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.probs.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Outcome, f64)> + '_ {
        self.probs.iter().map(|(outcome, prob)| (*outcome, *prob))
    }

    pub fn market(&self) -> Option<Market> {
        Market::from_outcomes(&self.outcomes())
    }

    pub fn sum(&self) -> f64 {
        self.probs.values().sum()
    }

    /// Check that every probability is finite and in [0, 1] and that they sum to 1
    pub fn validate(&self) -> EngineResult<()> {
        if self.probs.is_empty() {
            return Err(ValueError::InvalidDistribution(
                "distribution has no outcomes".to_string(),
            ));
        }
        for (outcome, prob) in self.iter() {
            if !prob.is_finite() || !(0.0..=1.0).contains(&prob) {
                return Err(ValueError::InvalidDistribution(format!(
                    "probability for {} is {}",
                    outcome, prob
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(ValueError::InvalidDistribution(format!(
                "probabilities sum to {}",
                sum
            )));
        }
        Ok(())
    }

    /// Clamp each probability into [0, 1] and rescale so they sum to 1.
    /// Fails when a probability is not finite or nothing is left to rescale.
    pub fn normalized(&self) -> EngineResult<Self> {
        let mut clamped = BTreeMap::new();
        for (outcome, prob) in self.iter() {
            if !prob.is_finite() {
                return Err(ValueError::InvalidDistribution(format!(
                    "probability for {} is {}",
                    outcome, prob
                )));
            }
            clamped.insert(outcome, prob.clamp(0.0, 1.0));
        }

        let total: f64 = clamped.values().sum();
        if total <= 0.0 {
            return Err(ValueError::InvalidDistribution(
                "no probability mass left after clamping".to_string(),
            ));
        }

        Ok(Self {
            probs: clamped
                .into_iter()
                .map(|(outcome, prob)| (outcome, prob / total))
                .collect(),
        })
    }

    /// Apply the strictness mode: lenient passes through, strict repairs or rejects
    pub fn with_mode(self, mode: Mode) -> EngineResult<Self> {
        match mode {
            Mode::Lenient => Ok(self),
            Mode::Strict => self.normalized(),
        }
    }

    /// Copy with every probability rounded to two decimals
    pub fn rounded(&self) -> Self {
        Self {
            probs: self
                .iter()
                .map(|(outcome, prob)| (outcome, round2(prob)))
                .collect(),
        }
    }
}

/// Bookmaker decimal odds per outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OddsQuote {
    odds: BTreeMap<Outcome, f64>,
}

impl OddsQuote {
    pub fn three_way(home: f64, draw: f64, away: f64) -> EngineResult<Self> {
        Self::from_pairs([
            (Outcome::Home, home),
            (Outcome::Draw, draw),
            (Outcome::Away, away),
        ])
    }

    pub fn two_way(home: f64, away: f64) -> EngineResult<Self> {
        Self::from_pairs([(Outcome::Home, home), (Outcome::Away, away)])
    }

    /// Build from outcome/odds pairs. Every price must be finite and at least
    /// `MIN_DECIMAL_ODDS`.
    pub fn from_pairs<I>(pairs: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (Outcome, f64)>,
    {
        let mut odds = BTreeMap::new();
        for (outcome, price) in pairs {
            if !price.is_finite() || price < MIN_DECIMAL_ODDS {
                return Err(ValueError::InvalidOdds {
                    outcome,
                    odds: price,
                    min: MIN_DECIMAL_ODDS,
                });
            }
            if odds.insert(outcome, price).is_some() {
                return Err(ValueError::DuplicateLabel(outcome.to_string()));
            }
        }
        Ok(Self { odds })
    }

    pub fn get(&self, outcome: Outcome) -> Option<f64> {
        self.odds.get(&outcome).copied()
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.odds.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Outcome, f64)> + '_ {
        self.odds.iter().map(|(outcome, price)| (*outcome, *price))
    }

    /// Implied probability of each price (1 / odds), margin included
    pub fn implied_probabilities(&self) -> BTreeMap<Outcome, f64> {
        self.iter()
            .map(|(outcome, price)| (outcome, 1.0 / price))
            .collect()
    }

    /// Bookmaker margin: sum of implied probabilities minus 1
    pub fn overround(&self) -> f64 {
        self.implied_probabilities().values().sum::<f64>() - 1.0
    }
}

/// Features handed to an outcome classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchFeatures {
    pub home_goals_est: f64,
    pub away_goals_est: f64,
    pub goal_diff: f64,
}

impl MatchFeatures {
    pub fn from_expected_goals(home_goals_est: f64, away_goals_est: f64) -> Self {
        Self {
            home_goals_est,
            away_goals_est,
            goal_diff: home_goals_est - away_goals_est,
        }
    }
}

// Deserialization goes through `from_pairs` so loaded values meet the same
// checks as constructed ones.
impl<'de> Deserialize<'de> for ProbabilityDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Fields {
            probs: BTreeMap<Outcome, f64>,
        }

        let fields = Fields::deserialize(deserializer)?;
        if fields.probs.is_empty() {
            return Err(de::Error::custom(ValueError::InvalidDistribution(
                "no outcomes".to_string(),
            )));
        }
        Self::from_pairs(fields.probs).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for OddsQuote {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Fields {
            odds: BTreeMap<Outcome, f64>,
        }

        let fields = Fields::deserialize(deserializer)?;
        Self::from_pairs(fields.odds).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_label() {
        assert_eq!(Outcome::from_label("H").unwrap(), Outcome::Home);
        assert_eq!(Outcome::from_label("x").unwrap(), Outcome::Draw);
        assert_eq!(Outcome::from_label(" Away ").unwrap(), Outcome::Away);
        assert_eq!(Outcome::from_label("2").unwrap(), Outcome::Away);
        assert!(matches!(
            Outcome::from_label("over"),
            Err(ValueError::UnknownLabel(_))
        ));
    }

    #[test]
    fn test_canonical_order() {
        let dist = ProbabilityDistribution::from_pairs([
            (Outcome::Away, 0.3),
            (Outcome::Home, 0.5),
            (Outcome::Draw, 0.2),
        ])
        .unwrap();
        assert_eq!(
            dist.outcomes(),
            vec![Outcome::Home, Outcome::Draw, Outcome::Away]
        );
        assert_eq!(dist.market(), Some(Market::ThreeWay));
    }

    #[test]
    fn test_duplicate_outcome_rejected() {
        let result =
            ProbabilityDistribution::from_pairs([(Outcome::Home, 0.5), (Outcome::Home, 0.5)]);
        assert!(matches!(result, Err(ValueError::DuplicateLabel(_))));
    }

    #[test]
    fn test_validate() {
        assert!(ProbabilityDistribution::three_way(0.4, 0.2, 0.4)
            .validate()
            .is_ok());
        assert!(matches!(
            ProbabilityDistribution::three_way(0.6, -0.1, 0.5).validate(),
            Err(ValueError::InvalidDistribution(_))
        ));
        assert!(matches!(
            ProbabilityDistribution::three_way(0.4, 0.4, 0.4).validate(),
            Err(ValueError::InvalidDistribution(_))
        ));
    }

    #[test]
    fn test_normalized_clamps_and_rescales() {
        let dist = ProbabilityDistribution::three_way(0.6, -0.2, 0.6)
            .normalized()
            .unwrap();
        assert!((dist.get(Outcome::Home).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(dist.get(Outcome::Draw).unwrap(), 0.0);
        assert!(dist.validate().is_ok());

        let nan = ProbabilityDistribution::three_way(f64::NAN, 0.2, 0.4);
        assert!(matches!(
            nan.normalized(),
            Err(ValueError::InvalidDistribution(_))
        ));
    }

    #[test]
    fn test_lenient_mode_passes_through() {
        let dist = ProbabilityDistribution::three_way(0.6, -0.2, 0.6);
        assert_eq!(dist.clone().with_mode(Mode::Lenient).unwrap(), dist);
    }

    #[test]
    fn test_odds_quote_rejects_low_prices() {
        assert!(OddsQuote::three_way(2.2, 3.3, 3.0).is_ok());
        assert!(matches!(
            OddsQuote::two_way(1.0, 3.0),
            Err(ValueError::InvalidOdds { .. })
        ));
        assert!(OddsQuote::two_way(f64::NAN, 3.0).is_err());
    }

    #[test]
    fn test_odds_quote_deserialize_checks_prices() {
        assert!(serde_json::from_str::<OddsQuote>(r#"{"odds":{"Home":0.5}}"#).is_err());
        assert!(
            serde_json::from_str::<OddsQuote>(r#"{"odds":{"Home":0.5,"Away":-3.0}}"#).is_err()
        );

        let quote: OddsQuote = serde_json::from_str(r#"{"odds":{"Home":2.2,"Away":1.8}}"#).unwrap();
        assert_eq!(quote, OddsQuote::two_way(2.2, 1.8).unwrap());
    }

    #[test]
    fn test_distribution_deserialize() {
        assert!(serde_json::from_str::<ProbabilityDistribution>(r#"{"probs":{}}"#).is_err());

        let dist: ProbabilityDistribution =
            serde_json::from_str(r#"{"probs":{"Away":0.4,"Home":0.6}}"#).unwrap();
        assert_eq!(dist.outcomes(), vec![Outcome::Home, Outcome::Away]);
    }

    #[test]
    fn test_overround() {
        let quote = OddsQuote::two_way(1.9, 1.9).unwrap();
        assert!((quote.overround() - (2.0 / 1.9 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.43000000000000005), 0.43);
        assert_eq!(round2(-0.054), -0.05);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("STRICT".parse::<Mode>().unwrap(), Mode::Strict);
        assert_eq!("legacy".parse::<Mode>().unwrap(), Mode::Lenient);
        assert!("loose".parse::<Mode>().is_err());
    }

    #[test]
    fn test_league_list() {
        assert_eq!(League::all().len(), 9);
        assert_eq!(League::ConferenceLeague.to_string(), "Conference League");
        assert_eq!("Premier League".parse::<League>().unwrap(), League::PremierLeague);
        assert_eq!("ligue-1".parse::<League>().unwrap(), League::Ligue1);
        assert!("MLS".parse::<League>().is_err());
    }
}
