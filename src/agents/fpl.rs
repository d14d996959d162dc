use super::agent::{Agent, AgentCore, AgentOptions, AgentType, Lifecycle, DEFAULT_EPISODES};
use super::arm::{Arm, ArmSummary, ArmWeights, NoState};
use super::rng::MaybeSeededRng;

use crate::callbacks::{Callback, Checkpoint};
use crate::errors::{AgentError, CheckpointError};

use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub const DEFAULT_NOISE_PARAM: f64 = 5.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FplParams {
    pub episodes: u64,
    pub reset_at_end: bool,
    /// Scale (mean) of the exponential noise added to every arm.
    pub noise_param: f64,
    pub seed: Option<u64>,
}

impl Default for FplParams {
    fn default() -> Self {
        Self {
            episodes: DEFAULT_EPISODES,
            reset_at_end: false,
            noise_param: DEFAULT_NOISE_PARAM,
            seed: None,
        }
    }
}

/// Follow the perturbed leader: picks the arm with the largest cumulative
/// reward after adding fresh exponential noise to each one.
#[derive(Debug)]
pub struct Fpl {
    core: AgentCore<NoState>,
    noise_param: f64,
    noise: Exp<f64>,
    rng: MaybeSeededRng,
}

impl Fpl {
    pub const NAME: &'static str = "follow-perturbed-leader-bandit";

    pub fn new(
        arms: &[String],
        params: FplParams,
        callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<Self, AgentError> {
        let arms = arms.iter().map(|name| Arm::new(name.as_str())).collect();
        Self::with_arms(arms, params, callbacks)
    }

    pub fn with_arms(
        arms: Vec<Arm<NoState>>,
        params: FplParams,
        callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<Self, AgentError> {
        let invalid = AgentError::InvalidParameter {
            name: "noise_param",
            value: params.noise_param,
        };
        if !(params.noise_param > 0.0 && params.noise_param.is_finite()) {
            warn!(noise_param = params.noise_param, "Rejected FPL parameters");
            return Err(invalid);
        }
        let noise = Exp::new(1.0 / params.noise_param).map_err(|_| invalid)?;

        let options = AgentOptions {
            episodes: params.episodes,
            reset_at_end: params.reset_at_end,
            callbacks,
        };

        Ok(Self {
            core: AgentCore::new(arms, options)?,
            noise_param: params.noise_param,
            noise,
            rng: MaybeSeededRng::new(params.seed),
        })
    }

    pub fn from_checkpoint(
        checkpoint: &Checkpoint,
        callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<Self, CheckpointError> {
        checkpoint.agent_params.expect_name(Self::NAME)?;
        let params: FplParams =
            serde_json::from_value(Value::Object(checkpoint.agent_params.params.clone()))?;

        Ok(Self::with_arms(checkpoint.arms()?, params, callbacks)?)
    }

    pub fn noise_param(&self) -> f64 {
        self.noise_param
    }

    pub fn arms(&self) -> &[Arm<NoState>] {
        self.core.arms()
    }

    pub fn arm(&self, name: &str) -> Result<&Arm<NoState>, AgentError> {
        self.core.arm(name)
    }
}

/// Index of the first maximum score. Ties go to the earliest arm in
/// insertion order.
fn leader(scores: impl IntoIterator<Item = f64>) -> Option<usize> {
    scores
        .into_iter()
        .enumerate()
        .fold(None, |best, (index, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((index, score)),
        })
        .map(|(index, _)| index)
}

impl Agent for Fpl {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn agent_type(&self) -> AgentType {
        AgentType::Fpl(FplParams {
            episodes: self.core.episodes(),
            reset_at_end: self.core.reset_at_end(),
            noise_param: self.noise_param,
            seed: self.rng.seed(),
        })
    }

    fn episodes(&self) -> u64 {
        self.core.episodes()
    }

    fn reset_at_end(&self) -> bool {
        self.core.reset_at_end()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.core.lifecycle()
    }

    fn callbacks(&self) -> &[Box<dyn Callback>] {
        self.core.callbacks()
    }

    fn arm_names(&self) -> Vec<&str> {
        self.core.arm_names()
    }

    fn arm(&self, name: &str) -> Result<ArmSummary, AgentError> {
        self.core.arm(name).map(ArmSummary::from)
    }

    fn arm_weights(&self) -> Result<Vec<ArmWeights>, serde_json::Error> {
        self.core.arm_weights()
    }

    fn add_arm(&mut self, name: &str) -> Result<(), AgentError> {
        self.core.add_arm(Arm::new(name))
    }

    fn selection_policy(&mut self) -> Result<String, AgentError> {
        let rng = self.rng.get_rng();
        let noise = &self.noise;
        let scores = self
            .core
            .arms()
            .iter()
            .map(|arm| arm.cumulative_reward() + noise.sample(rng));

        let index = leader(scores).ok_or(AgentError::EmptyArmSet)?;
        self.core.select(index)
    }

    fn reward_policy(&mut self, name: &str, reward: f64) -> Result<(), AgentError> {
        self.core.arm_mut(name)?.reward(reward);
        Ok(())
    }

    fn reset(&mut self) {
        self.core.reset();
    }

    fn finish(&mut self) {
        self.core.finish();
    }
}
