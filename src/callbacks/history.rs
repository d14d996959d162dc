use super::callback::{Callback, Process};
use super::storage::{ensure_dir, save_json};

use crate::errors::CallbackError;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_HISTORY_PATH: &str = "./history";
pub const HISTORY_FILE: &str = "hist.json";

fn default_history_path() -> PathBuf {
    PathBuf::from(DEFAULT_HISTORY_PATH)
}

/// Writes the episode history to `{path}/{experiment_id}/hist.json` once the
/// experiment is completed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryLogger {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

impl HistoryLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn history_file(&self, experiment_id: &str) -> PathBuf {
        self.path.join(experiment_id).join(HISTORY_FILE)
    }
}

impl Default for HistoryLogger {
    fn default() -> Self {
        Self::new(default_history_path())
    }
}

#[typetag::serde]
impl Callback for HistoryLogger {
    fn call(&self, process: &Process<'_>) -> Result<(), CallbackError> {
        let experiment = process.experiment;
        if !experiment.is_completed() {
            return Ok(());
        }

        let file = self.history_file(&experiment.experiment_id());
        if let Some(dir) = file.parent() {
            ensure_dir(dir)?;
        }
        save_json(&file, &experiment.hist()?)?;
        info!(path = ?file, "Saved experiment history");
        Ok(())
    }
}
