use crate::models::Mode;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Runtime settings read from the environment (and a `.env` file, if present)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub mode: Mode,
    pub save_csv: bool,
    pub save_json: bool,
    pub output_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Lenient,
            save_csv: false,
            save_json: false,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl EngineConfig {
    /// Load `.env` and read `VALUE_MODE`, `SAVE_CSV`, `SAVE_JSON` and `OUTPUT_DIR`
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mode = match lookup("VALUE_MODE") {
            Some(raw) => raw.parse().context("Invalid VALUE_MODE")?,
            None => defaults.mode,
        };

        Ok(Self {
            mode,
            save_csv: lookup("SAVE_CSV").unwrap_or_default() == "1",
            save_json: lookup("SAVE_JSON").unwrap_or_default() == "1",
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        })
    }
}
