pub mod xg_source;

pub use xg_source::{normalize_team_name, CsvXgSource, StaticXgSource, XgSource};
