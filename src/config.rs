use crate::agents::AgentType;
use crate::callbacks::Callback;
use crate::experiment::BernoulliArm;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "config";

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    pub arms: Vec<BernoulliArm>,
    pub seed: Option<u64>,
    /// Checkpoint directory to resume the run from.
    pub resume_from: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    pub agent: AgentType,
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub callbacks: Vec<Box<dyn Callback>>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_path(DEFAULT_CONFIG_PATH)
    }

    /// Loads `path` (extension optional) then applies `BANDIT__*` overrides.
    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("BANDIT").separator("__"))
            .build()?;

        builder.try_deserialize()
    }
}
