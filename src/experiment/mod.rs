mod environment;
mod simulation;

pub use environment::{BernoulliArm, BernoulliEnvironment, Environment};
pub use simulation::{EpisodeRecord, Simulation, SimulationParams};

use serde_json::{Map, Value};

/// Episode driver observed by callbacks. Implementations update every field
/// for the current episode before invoking callbacks.
pub trait Experiment {
    fn episode(&self) -> u64;
    fn experiment_id(&self) -> String;
    fn is_completed(&self) -> bool;
    /// Per-episode records, in episode order.
    fn hist(&self) -> Result<Value, serde_json::Error>;
    /// Flat mapping of the experiment's own attributes.
    fn params(&self) -> Result<Map<String, Value>, serde_json::Error>;
}
