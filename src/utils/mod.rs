pub mod classifier;
pub mod data;
pub mod estimators;
pub mod ev_analysis;
pub mod ev_calculator;
