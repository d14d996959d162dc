use crate::agents::Agent;
use crate::errors::CallbackError;
use crate::experiment::Experiment;

use std::fmt::Debug;

/// Snapshot of a running experiment handed to callbacks between episodes.
#[derive(Clone, Copy)]
pub struct Process<'a> {
    pub agent: &'a dyn Agent,
    pub experiment: &'a dyn Experiment,
}

impl<'a> Process<'a> {
    pub fn new(agent: &'a dyn Agent, experiment: &'a dyn Experiment) -> Self {
        Self { agent, experiment }
    }
}

/// Observer invoked after every episode.
#[typetag::serde(tag = "type")]
pub trait Callback: Debug {
    /// Checks the configuration before any episode runs.
    fn validate(&self) -> Result<(), CallbackError> {
        Ok(())
    }

    fn call(&self, process: &Process<'_>) -> Result<(), CallbackError>;
}

/// Invokes every callback in order, stopping at the first failure.
pub fn apply_callbacks(
    callbacks: &[Box<dyn Callback>],
    process: &Process<'_>,
) -> Result<(), CallbackError> {
    callbacks
        .iter()
        .try_for_each(|callback| callback.call(process))
}
