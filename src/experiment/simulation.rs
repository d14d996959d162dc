use super::environment::Environment;
use super::Experiment;

use crate::agents::Agent;
use crate::callbacks::{apply_callbacks, Process};
use crate::errors::BanditError;

use serde::{ser::Error as _, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode: u64,
    pub arm: String,
    pub reward: f64,
}

/// Attributes of a simulation saved in checkpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub experiment_id: Uuid,
    pub episodes: u64,
    pub episode: u64,
    pub is_completed: bool,
}

/// Runs an agent against an environment for a fixed number of episodes,
/// invoking the agent callbacks after each one.
///
/// Checkpoints keep the counters and the episode records, so a resumed run
/// extends the history of the run it continues.
#[derive(Debug, Serialize, Deserialize)]
pub struct Simulation {
    #[serde(flatten)]
    params: SimulationParams,
    #[serde(default)]
    hist: Vec<EpisodeRecord>,
}

impl Simulation {
    pub fn new(episodes: u64) -> Self {
        Self::with_id(Uuid::new_v4(), episodes)
    }

    pub fn with_id(experiment_id: Uuid, episodes: u64) -> Self {
        Self {
            params: SimulationParams {
                experiment_id,
                episodes,
                episode: 0,
                is_completed: episodes == 0,
            },
            hist: Vec::new(),
        }
    }

    /// Restores the counters and episode records saved in a checkpoint.
    pub fn resume(params: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let simulation: Self = serde_json::from_value(Value::Object(params.clone()))?;
        info!(
            id = %simulation.params.experiment_id,
            episode = simulation.params.episode,
            records = simulation.hist.len(),
            "Resuming experiment"
        );
        Ok(simulation)
    }

    pub fn simulation_params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn records(&self) -> &[EpisodeRecord] {
        &self.hist
    }

    pub fn step(
        &mut self,
        agent: &mut dyn Agent,
        environment: &mut dyn Environment,
    ) -> Result<(), BanditError> {
        let arm = agent.selection_policy()?;
        let reward = environment.reward(&arm)?;
        agent.reward_policy(&arm, reward)?;

        self.params.episode += 1;
        debug!(episode = self.params.episode, arm = %arm, reward, "Episode done");
        self.hist.push(EpisodeRecord {
            episode: self.params.episode,
            arm,
            reward,
        });
        self.params.is_completed = self.params.episode >= self.params.episodes;

        let agent: &dyn Agent = agent;
        apply_callbacks(agent.callbacks(), &Process::new(agent, &*self))?;
        Ok(())
    }

    pub fn run(
        &mut self,
        agent: &mut dyn Agent,
        environment: &mut dyn Environment,
    ) -> Result<(), BanditError> {
        info!(
            id = %self.params.experiment_id,
            agent = agent.name(),
            episodes = self.params.episodes,
            "Starting experiment"
        );

        while !self.params.is_completed {
            self.step(agent, environment)?;
        }
        agent.finish();

        info!(id = %self.params.experiment_id, "Experiment completed");
        Ok(())
    }
}

impl Experiment for Simulation {
    fn episode(&self) -> u64 {
        self.params.episode
    }

    fn experiment_id(&self) -> String {
        self.params.experiment_id.to_string()
    }

    fn is_completed(&self) -> bool {
        self.params.is_completed
    }

    fn hist(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.hist)
    }

    fn params(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(params) => Ok(params),
            other => Err(serde_json::Error::custom(format!(
                "experiment params are not a JSON object: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentType, Exp3, Exp3Params, Fpl, FplParams};
    use crate::callbacks::storage::read_json;
    use crate::callbacks::{Callback, CheckPoint, CheckPointState, HistoryLogger};
    use crate::errors::AgentError;
    use serde_json::json;
    use tempfile::tempdir;

    const SEED: u64 = 42;

    fn names() -> Vec<String> {
        ["low", "mid", "high"].map(String::from).to_vec()
    }

    fn fixed_reward(arm: &str) -> f64 {
        match arm {
            "low" => 0.1,
            "mid" => 0.4,
            _ => 0.9,
        }
    }

    fn make_exp3(episodes: u64, callbacks: Vec<Box<dyn Callback>>) -> Exp3 {
        let params = Exp3Params {
            episodes,
            seed: Some(SEED),
            ..Exp3Params::default()
        };
        Exp3::new(&names(), params, callbacks).unwrap()
    }

    #[test]
    fn run_records_every_episode() {
        let mut agent = make_exp3(100, Vec::new());
        let mut simulation = Simulation::new(agent.episodes());
        simulation.run(&mut agent, &mut fixed_reward).unwrap();

        assert!(simulation.is_completed());
        assert_eq!(simulation.episode(), 100);
        let episodes: Vec<u64> = simulation.records().iter().map(|r| r.episode).collect();
        assert_eq!(episodes, (1..=100).collect::<Vec<_>>());

        let selected: u64 = agent.arms().iter().map(|arm| arm.times_selected()).sum();
        assert_eq!(selected, 100);
    }

    #[test]
    fn params_are_flat() {
        let simulation = Simulation::new(7);
        let params = simulation.params().unwrap();
        assert_eq!(params["episodes"], json!(7));
        assert_eq!(params["episode"], json!(0));
        assert_eq!(params["is_completed"], json!(false));
        assert_eq!(params["experiment_id"], json!(simulation.experiment_id()));
        assert_eq!(params["hist"], json!([]));
    }

    #[test]
    fn zero_episodes() {
        let mut agent = make_exp3(0, Vec::new());
        let mut simulation = Simulation::new(0);
        simulation.run(&mut agent, &mut fixed_reward).unwrap();
        assert!(simulation.records().is_empty());
        assert_eq!(agent.arms().iter().map(|arm| arm.times_selected()).sum::<u64>(), 0);
    }

    #[test]
    fn reset_at_end_keeps_history() {
        let params = FplParams {
            episodes: 20,
            reset_at_end: true,
            seed: Some(SEED),
            ..FplParams::default()
        };
        let mut agent = Fpl::new(&names(), params, Vec::new()).unwrap();
        let mut simulation = Simulation::new(agent.episodes());
        simulation.run(&mut agent, &mut fixed_reward).unwrap();

        assert_eq!(simulation.records().len(), 20);
        assert!(agent
            .arms()
            .iter()
            .all(|arm| arm.times_selected() == 0 && arm.cumulative_reward() == 0.0));
    }

    #[test]
    fn environment_errors_propagate() {
        let mut agent = make_exp3(5, Vec::new());
        let mut environment = crate::experiment::BernoulliEnvironment::new(&[], None).unwrap();
        let mut simulation = Simulation::new(5);
        assert!(matches!(
            simulation.run(&mut agent, &mut environment),
            Err(BanditError::UnknownEnvironmentArm(_))
        ));
    }

    #[test]
    fn empty_agent_fails() {
        let mut agent = Exp3::new(&[], Exp3Params::default(), Vec::new()).unwrap();
        let mut simulation = Simulation::new(3);
        assert!(matches!(
            simulation.run(&mut agent, &mut fixed_reward),
            Err(BanditError::Agent(AgentError::EmptyArmSet))
        ));
    }

    #[test]
    fn checkpoint_and_resume() {
        let dir = tempdir().unwrap();
        let checkpoints = dir.path().join("checkpoints");
        let history = dir.path().join("history");
        let callbacks: Vec<Box<dyn Callback>> = vec![
            Box::new(CheckPoint::new(25, &checkpoints).unwrap()),
            Box::new(HistoryLogger::new(&history)),
        ];

        let mut agent = make_exp3(100, callbacks);
        let mut simulation = Simulation::new(agent.episodes());
        simulation.run(&mut agent, &mut fixed_reward).unwrap();

        let hist_file = HistoryLogger::new(&history).history_file(&simulation.experiment_id());
        assert!(hist_file.is_file());

        let checkpoint = CheckPointState::load(&checkpoints).unwrap();
        assert_eq!(checkpoint.experiment_params["episode"], json!(100));

        let config_type = AgentType::Exp3(Exp3Params::default());
        let resumed = config_type.resume(&checkpoint, Vec::new()).unwrap();
        assert_eq!(resumed.agent_type(), agent.agent_type());
        assert_eq!(resumed.arm_weights().unwrap(), agent.arm_weights().unwrap());

        let resumed_simulation = Simulation::resume(&checkpoint.experiment_params).unwrap();
        assert_eq!(resumed_simulation.simulation_params(), simulation.simulation_params());
        assert_eq!(resumed_simulation.records(), simulation.records());
    }

    #[test]
    fn resumed_run_writes_full_history() {
        let dir = tempdir().unwrap();
        let checkpoints = dir.path().join("checkpoints");
        let history = dir.path().join("history");
        let make_callbacks = || -> Vec<Box<dyn Callback>> {
            vec![
                Box::new(CheckPoint::new(5, &checkpoints).unwrap()),
                Box::new(HistoryLogger::new(&history)),
            ]
        };

        let mut agent = make_exp3(10, make_callbacks());
        let mut simulation = Simulation::new(agent.episodes());
        for _ in 0..5 {
            simulation.step(&mut agent, &mut fixed_reward).unwrap();
        }

        let checkpoint = CheckPointState::load(&checkpoints).unwrap();
        let mut resumed_agent = AgentType::Exp3(Exp3Params::default())
            .resume(&checkpoint, make_callbacks())
            .unwrap();
        let mut resumed = Simulation::resume(&checkpoint.experiment_params).unwrap();
        assert_eq!(resumed.records(), simulation.records());
        resumed.run(resumed_agent.as_mut(), &mut fixed_reward).unwrap();

        let hist_file = HistoryLogger::new(&history).history_file(&simulation.experiment_id());
        let records: Vec<EpisodeRecord> = read_json(&hist_file).unwrap();
        let episodes: Vec<u64> = records.iter().map(|r| r.episode).collect();
        assert_eq!(episodes, (1..=10).collect::<Vec<_>>());
        assert_eq!(records[..5], simulation.records()[..]);
    }

    #[test]
    fn resume_rejects_other_algorithm() {
        let dir = tempdir().unwrap();
        let callbacks: Vec<Box<dyn Callback>> =
            vec![Box::new(CheckPoint::new(5, dir.path()).unwrap())];
        let mut agent = make_exp3(5, callbacks);
        let mut simulation = Simulation::new(5);
        simulation.run(&mut agent, &mut fixed_reward).unwrap();

        let checkpoint = CheckPointState::load(dir.path()).unwrap();
        let result = AgentType::Fpl(FplParams::default()).resume(&checkpoint, Vec::new());
        assert!(result.is_err());
    }
}
