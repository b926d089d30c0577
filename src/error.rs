use crate::models::Outcome;
use thiserror::Error;

/// Errors raised by the value engine. All of them are deterministic; nothing
/// here is worth retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("division by zero: {0}")]
    DivisionByZero(&'static str),

    #[error("outcome sets differ: probabilities cover {probabilities:?}, odds cover {odds:?}")]
    KeySetMismatch {
        probabilities: Vec<Outcome>,
        odds: Vec<Outcome>,
    },

    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("invalid odds for {outcome}: {odds} (must be at least {min})")]
    InvalidOdds { outcome: Outcome, odds: f64, min: f64 },

    #[error("unknown outcome label '{0}'")]
    UnknownLabel(String),

    #[error("outcome label '{0}' appears more than once")]
    DuplicateLabel(String),

    #[error("classifier returned {probabilities} probabilities for {labels} labels")]
    LabelCountMismatch { labels: usize, probabilities: usize },

    #[error("inconsistent value report: {0}")]
    InvalidReport(String),
}

pub type EngineResult<T> = std::result::Result<T, ValueError>;
