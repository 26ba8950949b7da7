//! TOML-backed settings for the `slide2048` runner.
//!
//! Every section and key is optional; missing values fall back to defaults.
//!
//! ```toml
//! policy = "lookahead"
//!
//! [lookahead]
//! rollouts = 40
//! depth = 2
//!
//! [run]
//! seed = 7
//! games = 16
//! parallel = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lookahead::LookaheadConfig;
use crate::policy::PolicyKind;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub policy: PolicyKind,
    pub lookahead: LookaheadConfig,
    pub run: RunConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seed for the game RNG; drawn from entropy when absent.
    pub seed: Option<u64>,
    /// Stop a game after this many moves.
    pub max_moves: Option<u32>,
    /// Number of games played by `batch`.
    pub games: u32,
    /// Spread lookahead rollouts across the rayon pool.
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { seed: None, max_moves: None, games: 8, parallel: false }
    }
}

impl Settings {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}
