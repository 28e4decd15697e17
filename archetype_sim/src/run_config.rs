use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{catalog::ArchetypeCatalog, population::DEFAULT_INTERESTS_PER_USER};

pub const BUILTIN_RUN_CONFIG: &str = include_str!("data/run_config.json");

/// Parameters of one Monte Carlo run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub num_users: usize,
    pub num_rounds: usize,
    pub num_simulations: usize,
    pub interests_per_user: usize,
    /// Base seed; `None` draws one from entropy when the run starts.
    pub seed: Option<u64>,
    /// Run simulations on the rayon pool.
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_users: 10_000,
            num_rounds: 10,
            num_simulations: 20,
            interests_per_user: DEFAULT_INTERESTS_PER_USER,
            seed: None,
            parallel: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to parse run config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read run config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("interests_per_user is {requested} but the catalog only has {available} interests")]
    TooManyInterests { requested: usize, available: usize },
}

impl RunConfig {
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_RUN_CONFIG).expect("builtin run config should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, RunConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, RunConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| RunConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Structural checks against the catalog. Zero counts are allowed and
    /// simply produce empty runs.
    pub fn validate(&self, catalog: &ArchetypeCatalog) -> Result<(), RunConfigError> {
        if self.interests_per_user > catalog.interest_count() {
            return Err(RunConfigError::TooManyInterests {
                requested: self.interests_per_user,
                available: catalog.interest_count(),
            });
        }
        Ok(())
    }

    pub fn total_events(&self) -> u64 {
        self.num_users as u64 * self.num_rounds as u64 * self.num_simulations as u64
    }
}

pub fn load_run_config_from_env() -> RunConfig {
    let Some(path) = env::var("ARCHETYPE_RUN_CONFIG_PATH").ok().map(PathBuf::from) else {
        return RunConfig::builtin();
    };

    match RunConfig::from_file(&path) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                target: "archetype_sim::run_config",
                path = %path.display(),
                error = %err,
                "run_config.load_failed"
            );
            RunConfig::builtin()
        }
    }
}
