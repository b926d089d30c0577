pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod utils;

pub use api::*;
pub use error::*;
pub use models::*;
pub use utils::*;

pub use utils::classifier::{HistoricalFrequencyClassifier, OutcomeClassifier};
pub use utils::estimators::{estimate_three_way, estimate_two_way, Estimator};
pub use utils::ev_analysis::{evaluate_fixture, evaluate_fixtures, EvaluationReport, FixtureRequest};
pub use utils::ev_calculator::{compute_value, OutcomeValue, Recommendation, ValueReport};
