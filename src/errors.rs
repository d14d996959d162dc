use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("No active arms to select from")]
    EmptyArmSet,
    #[error("Arm {0} not found")]
    UnknownArm(String),
    #[error("Arm {0} already exists")]
    DuplicateArm(String),
    #[error("Selection probability of arm {0} is zero")]
    ZeroProbability(String),
    #[error("Invalid value {value} for parameter {name}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("Sampling failed: {0}")]
    Sampling(String),
    #[error(transparent)]
    InvalidCallback(#[from] CallbackError),
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),
    #[error(transparent)]
    Storage(#[from] PersistenceError),
    #[error("Failed to collect process state: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to (de)serialize '{path}': {source}")]
    Serialization {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint agent {found} does not match current agent {expected}")]
    Mismatch { expected: String, found: String },
    #[error("Invalid record for arm {name}: {source}")]
    Arm {
        name: String,
        source: serde_json::Error,
    },
    #[error("Invalid checkpoint parameters: {0}")]
    Params(#[from] serde_json::Error),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

#[derive(Debug, Error)]
pub enum BanditError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Callback(#[from] CallbackError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("Environment has no arm {0}")]
    UnknownEnvironmentArm(String),
}
