use super::arm::{Arm, ArmState, ArmSummary, ArmWeights};
use super::exp3::{Exp3, Exp3Params};
use super::fpl::{Fpl, FplParams};

use crate::callbacks::{Callback, Checkpoint};
use crate::errors::{AgentError, CheckpointError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use tracing::{debug, warn};

pub const DEFAULT_EPISODES: u64 = 100;

/// Decision engine contract shared by every bandit algorithm.
pub trait Agent: Debug {
    /// Algorithm identifier, recorded in checkpoints.
    fn name(&self) -> &'static str;
    /// Hyperparameters of the agent, the only agent fields a checkpoint keeps.
    fn agent_type(&self) -> AgentType;
    fn episodes(&self) -> u64;
    fn reset_at_end(&self) -> bool;
    fn lifecycle(&self) -> Lifecycle;
    fn callbacks(&self) -> &[Box<dyn Callback>];
    /// Active arm names, in insertion order.
    fn arm_names(&self) -> Vec<&str>;
    /// Counters of the active arm `name`.
    fn arm(&self, name: &str) -> Result<ArmSummary, AgentError>;
    fn arm_weights(&self) -> Result<Vec<ArmWeights>, serde_json::Error>;
    fn add_arm(&mut self, name: &str) -> Result<(), AgentError>;
    /// Chooses an arm, marks it as selected and returns its name.
    fn selection_policy(&mut self) -> Result<String, AgentError>;
    /// Applies the algorithm update for `reward` then records it on the arm.
    fn reward_policy(&mut self, name: &str, reward: f64) -> Result<(), AgentError>;
    fn reset(&mut self);
    /// Ends a run, resetting the arms when `reset_at_end` is set.
    fn finish(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    Running,
    Reset,
}

#[derive(Debug)]
pub struct AgentOptions {
    pub episodes: u64,
    pub reset_at_end: bool,
    pub callbacks: Vec<Box<dyn Callback>>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            episodes: DEFAULT_EPISODES,
            reset_at_end: false,
            callbacks: Vec::new(),
        }
    }
}

/// Arms and run settings common to all agents.
#[derive(Debug)]
pub struct AgentCore<S> {
    arms: Vec<Arm<S>>,
    episodes: u64,
    reset_at_end: bool,
    callbacks: Vec<Box<dyn Callback>>,
    lifecycle: Lifecycle,
}

impl<S: ArmState> AgentCore<S> {
    pub fn new(arms: Vec<Arm<S>>, options: AgentOptions) -> Result<Self, AgentError> {
        options
            .callbacks
            .iter()
            .try_for_each(|callback| callback.validate())
            .inspect_err(|err| warn!(error = %err, "Rejected callback"))?;

        let mut core = Self {
            arms: Vec::with_capacity(arms.len()),
            episodes: options.episodes,
            reset_at_end: options.reset_at_end,
            callbacks: options.callbacks,
            lifecycle: Lifecycle::Uninitialized,
        };
        arms.into_iter().try_for_each(|arm| core.add_arm(arm))?;

        Ok(core)
    }

    pub fn arms(&self) -> &[Arm<S>] {
        &self.arms
    }

    pub(crate) fn arms_mut(&mut self) -> &mut [Arm<S>] {
        &mut self.arms
    }

    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn reset_at_end(&self) -> bool {
        self.reset_at_end
    }

    pub fn callbacks(&self) -> &[Box<dyn Callback>] {
        &self.callbacks
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn position(&self, name: &str) -> Result<usize, AgentError> {
        self.arms
            .iter()
            .position(|arm| arm.name() == name)
            .ok_or_else(|| AgentError::UnknownArm(name.to_string()))
    }

    pub fn arm(&self, name: &str) -> Result<&Arm<S>, AgentError> {
        self.position(name).map(|index| &self.arms[index])
    }

    pub fn arm_mut(&mut self, name: &str) -> Result<&mut Arm<S>, AgentError> {
        let index = self.position(name)?;
        Ok(&mut self.arms[index])
    }

    pub fn add_arm(&mut self, arm: Arm<S>) -> Result<(), AgentError> {
        if self.position(arm.name()).is_ok() {
            warn!(arm = arm.name(), "Arm already exists");
            return Err(AgentError::DuplicateArm(arm.name().to_string()));
        }
        self.arms.push(arm);
        if self.lifecycle == Lifecycle::Uninitialized {
            self.lifecycle = Lifecycle::Ready;
        }
        Ok(())
    }

    /// Marks the arm at `index` as selected and returns its name.
    pub fn select(&mut self, index: usize) -> Result<String, AgentError> {
        let arm = self.arms.get_mut(index).ok_or(AgentError::EmptyArmSet)?;
        arm.select();
        self.lifecycle = Lifecycle::Running;
        debug!(arm = arm.name(), "Selected arm");
        Ok(arm.name().to_string())
    }

    pub fn reset(&mut self) {
        self.arms.iter_mut().for_each(|arm| arm.reset());
        if self.lifecycle != Lifecycle::Uninitialized {
            self.lifecycle = Lifecycle::Reset;
        }
    }

    pub fn finish(&mut self) {
        if self.reset_at_end {
            self.reset();
        }
    }

    pub fn arm_weights(&self) -> Result<Vec<ArmWeights>, serde_json::Error> {
        self.arms.iter().map(Arm::to_weights).collect()
    }

    pub fn arm_names(&self) -> Vec<&str> {
        self.arms.iter().map(Arm::name).collect()
    }
}

/// Hyperparameters of every agent variant, persisted as `{name, params}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "params")]
pub enum AgentType {
    #[serde(rename = "exponential-weight-bandit")]
    Exp3(Exp3Params),
    #[serde(rename = "follow-perturbed-leader-bandit")]
    Fpl(FplParams),
}

impl AgentType {
    pub fn name(&self) -> &'static str {
        match self {
            AgentType::Exp3(_) => Exp3::NAME,
            AgentType::Fpl(_) => Fpl::NAME,
        }
    }

    pub fn into_agent(
        self,
        arms: &[String],
        callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<Box<dyn Agent>, AgentError> {
        let agent: Box<dyn Agent> = match self {
            AgentType::Exp3(params) => Box::new(Exp3::new(arms, params, callbacks)?),
            AgentType::Fpl(params) => Box::new(Fpl::new(arms, params, callbacks)?),
        };
        Ok(agent)
    }

    /// Rebuilds an agent of this type from a checkpoint. The hyperparameters
    /// come from the checkpoint, not from `self`.
    pub fn resume(
        &self,
        checkpoint: &Checkpoint,
        callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<Box<dyn Agent>, CheckpointError> {
        let agent: Box<dyn Agent> = match self {
            AgentType::Exp3(_) => Box::new(Exp3::from_checkpoint(checkpoint, callbacks)?),
            AgentType::Fpl(_) => Box::new(Fpl::from_checkpoint(checkpoint, callbacks)?),
        };
        Ok(agent)
    }

    pub fn to_params(&self) -> Result<AgentParams, serde_json::Error> {
        serde_json::to_value(self).and_then(serde_json::from_value)
    }
}

/// Agent parameters as read from storage, before the algorithm is known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentParams {
    pub name: String,
    pub params: Map<String, Value>,
}

impl AgentParams {
    pub fn expect_name(&self, expected: &str) -> Result<(), CheckpointError> {
        if self.name == expected {
            Ok(())
        } else {
            Err(CheckpointError::Mismatch {
                expected: expected.to_string(),
                found: self.name.clone(),
            })
        }
    }

    pub fn agent_type(&self) -> Result<AgentType, serde_json::Error> {
        serde_json::to_value(self).and_then(serde_json::from_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::arm::NoState;
    use crate::callbacks::CheckPoint;
    use serde_json::json;

    fn make_core(names: &[&str]) -> AgentCore<NoState> {
        let arms = names.iter().map(|&name| Arm::new(name)).collect();
        AgentCore::new(arms, AgentOptions::default()).unwrap()
    }

    #[test]
    fn lookup() {
        let core = make_core(&["a", "b"]);
        assert_eq!(core.arm("b").map(Arm::name).ok(), Some("b"));
        assert!(matches!(core.arm("z"), Err(AgentError::UnknownArm(name)) if name == "z"));
    }

    #[test]
    fn duplicate_arm() {
        let arms = vec![Arm::<NoState>::new("a"), Arm::new("a")];
        let result = AgentCore::new(arms, AgentOptions::default());
        assert!(matches!(result, Err(AgentError::DuplicateArm(_))));
    }

    #[test]
    fn lifecycle() {
        let mut core = make_core(&[]);
        assert_eq!(core.lifecycle(), Lifecycle::Uninitialized);
        assert!(matches!(core.select(0), Err(AgentError::EmptyArmSet)));

        core.add_arm(Arm::new("a")).unwrap();
        assert_eq!(core.lifecycle(), Lifecycle::Ready);

        assert_eq!(core.select(0).unwrap(), "a");
        assert_eq!(core.lifecycle(), Lifecycle::Running);

        core.reset();
        assert_eq!(core.lifecycle(), Lifecycle::Reset);
        assert_eq!(core.arm("a").unwrap().times_selected(), 0);

        core.select(0).unwrap();
        assert_eq!(core.lifecycle(), Lifecycle::Running);
    }

    #[test]
    fn finish_keeps_arms_without_reset_flag() {
        let mut core = make_core(&["a"]);
        core.select(0).unwrap();
        core.finish();
        assert_eq!(core.arm("a").unwrap().times_selected(), 1);
        assert_eq!(core.lifecycle(), Lifecycle::Running);
    }

    #[test]
    fn finish_resets_with_reset_flag() {
        let options = AgentOptions {
            reset_at_end: true,
            ..AgentOptions::default()
        };
        let mut core = AgentCore::new(vec![Arm::<NoState>::new("a")], options).unwrap();
        core.select(0).unwrap();
        core.arm_mut("a").unwrap().reward(3.0);
        core.finish();
        assert_eq!(core.arm("a").unwrap().times_selected(), 0);
        assert_eq!(core.arm("a").unwrap().cumulative_reward(), 0.0);
    }

    #[test]
    fn invalid_callback_rejected() {
        let options = AgentOptions {
            callbacks: vec![Box::new(CheckPoint {
                every_n: 0,
                path: "unused".into(),
            })],
            ..AgentOptions::default()
        };
        let result = AgentCore::<NoState>::new(Vec::new(), options);
        assert!(matches!(result, Err(AgentError::InvalidCallback(_))));
    }

    #[test]
    fn agent_type_shape() {
        let agent_type = AgentType::Fpl(FplParams {
            noise_param: 2.0,
            seed: Some(3),
            ..FplParams::default()
        });
        let value = serde_json::to_value(&agent_type).unwrap();
        assert_eq!(value["name"], json!("follow-perturbed-leader-bandit"));
        assert_eq!(value["params"]["noise_param"], json!(2.0));
        assert_eq!(value["params"]["seed"], json!(3));

        let params = agent_type.to_params().unwrap();
        assert_eq!(params.agent_type().unwrap(), agent_type);
    }

    #[test]
    fn expect_name() {
        let params = AgentType::Exp3(Exp3Params::default()).to_params().unwrap();
        assert!(params.expect_name(Exp3::NAME).is_ok());
        assert!(matches!(
            params.expect_name(Fpl::NAME),
            Err(CheckpointError::Mismatch { .. })
        ));
    }

    #[test]
    fn into_agent() {
        let arms = vec!["a".to_string(), "b".to_string()];
        let agent = AgentType::Exp3(Exp3Params::default())
            .into_agent(&arms, Vec::new())
            .unwrap();
        assert_eq!(agent.name(), Exp3::NAME);
        assert_eq!(agent.arm_names(), vec!["a", "b"]);
        assert_eq!(agent.episodes(), DEFAULT_EPISODES);
    }

    #[test]
    fn arm_through_trait_object() {
        let arms = vec!["a".to_string(), "b".to_string()];
        let mut agent = AgentType::Fpl(FplParams {
            seed: Some(5),
            ..FplParams::default()
        })
        .into_agent(&arms, Vec::new())
        .unwrap();

        let chosen = agent.selection_policy().unwrap();
        agent.reward_policy(&chosen, 0.5).unwrap();

        let summary = agent.arm(&chosen).unwrap();
        assert_eq!(summary.name, chosen);
        assert_eq!(summary.times_selected, 1);
        assert_eq!(summary.cumulative_reward, 0.5);
        assert!(matches!(agent.arm("z"), Err(AgentError::UnknownArm(name)) if name == "z"));
    }
}
