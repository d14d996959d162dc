use super::callback::{Callback, Process};
use super::storage::{ensure_dir, read_json, save_json};

use crate::agents::{AgentParams, Arm, ArmState, ArmWeights};
use crate::errors::{CallbackError, CheckpointError, PersistenceError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CHECKPOINT_PATH: &str = "./checkpoints";

const ARM_WEIGHTS: &str = "arm_weights";
const EXPERIMENT_PARAMS: &str = "experiment_params";
const AGENT_PARAMS: &str = "agent_params";

/// The three persisted parts of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    pub arm_weights: Vec<ArmWeights>,
    pub experiment_params: Map<String, Value>,
    pub agent_params: AgentParams,
}

impl Checkpoint {
    pub fn from_process(process: &Process<'_>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            arm_weights: process.agent.arm_weights()?,
            experiment_params: process.experiment.params()?,
            agent_params: process.agent.agent_type().to_params()?,
        })
    }

    /// Rebuilds the arms recorded in the checkpoint, in their saved order.
    pub fn arms<S: ArmState>(&self) -> Result<Vec<Arm<S>>, CheckpointError> {
        self.arm_weights
            .iter()
            .map(|record| {
                Arm::from_weights(record).map_err(|source| CheckpointError::Arm {
                    name: record.name.clone(),
                    source,
                })
            })
            .collect()
    }
}

/// Checkpoint directory. Opening it creates the directory, so a state
/// handle always points to an existing location.
#[derive(Clone, Debug)]
pub struct CheckPointState {
    path: PathBuf,
}

impl CheckPointState {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        ensure_dir(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        save_json(&self.path.join(AGENT_PARAMS), &checkpoint.agent_params)?;
        save_json(&self.path.join(EXPERIMENT_PARAMS), &checkpoint.experiment_params)?;
        save_json(&self.path.join(ARM_WEIGHTS), &checkpoint.arm_weights)
    }

    pub fn save_component_weights(&self, process: &Process<'_>) -> Result<(), CallbackError> {
        let checkpoint = Checkpoint::from_process(process)?;
        self.save(&checkpoint)?;
        info!(
            path = ?self.path,
            episode = process.experiment.episode(),
            "Saved checkpoint"
        );
        Ok(())
    }

    /// Reads a checkpoint back. Rebuilding agents from it is left to the
    /// caller, which must check the recorded agent name.
    pub fn load(path: impl AsRef<Path>) -> Result<Checkpoint, PersistenceError> {
        let path = path.as_ref();
        let checkpoint = Checkpoint {
            arm_weights: read_json(&path.join(ARM_WEIGHTS))?,
            experiment_params: read_json(&path.join(EXPERIMENT_PARAMS))?,
            agent_params: read_json(&path.join(AGENT_PARAMS))?,
        };
        info!(path = ?path, agent = %checkpoint.agent_params.name, "Loaded checkpoint");
        Ok(checkpoint)
    }
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from(DEFAULT_CHECKPOINT_PATH)
}

/// Saves the process state every `every_n` episodes, overwriting the
/// previous checkpoint under `path`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckPoint {
    pub every_n: u64,
    #[serde(default = "default_checkpoint_path")]
    pub path: PathBuf,
}

impl CheckPoint {
    pub fn new(every_n: u64, path: impl Into<PathBuf>) -> Result<Self, CallbackError> {
        let checkpoint = Self {
            every_n,
            path: path.into(),
        };
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    pub fn is_due(&self, episode: u64) -> bool {
        self.every_n != 0 && episode != 0 && episode % self.every_n == 0
    }
}

#[typetag::serde]
impl Callback for CheckPoint {
    fn validate(&self) -> Result<(), CallbackError> {
        if self.every_n == 0 {
            return Err(CallbackError::InvalidCallback(
                "CheckPoint every_n must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn call(&self, process: &Process<'_>) -> Result<(), CallbackError> {
        if self.is_due(process.experiment.episode()) {
            CheckPointState::open(&self.path)?.save_component_weights(process)?;
        }
        Ok(())
    }
}
