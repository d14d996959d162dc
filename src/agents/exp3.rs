use super::agent::{Agent, AgentCore, AgentOptions, AgentType, Lifecycle, DEFAULT_EPISODES};
use super::arm::{Arm, ArmState, ArmSummary, ArmWeights};
use super::rng::MaybeSeededRng;

use crate::callbacks::{Callback, Checkpoint};
use crate::errors::{AgentError, CheckpointError};

use rand::distr::{weighted::WeightedIndex, Distribution};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{trace, warn};

pub const DEFAULT_GAMMA: f64 = 0.1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Exp3State {
    pub weight: f64,
}

impl Default for Exp3State {
    fn default() -> Self {
        Self { weight: 1.0 }
    }
}

impl ArmState for Exp3State {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exp3Params {
    pub episodes: u64,
    pub reset_at_end: bool,
    /// Share of the uniform exploration in the selection mixture, in (0, 1].
    pub gamma: f64,
    /// Rescale weights by their maximum after each update.
    pub renormalize: bool,
    pub seed: Option<u64>,
}

impl Default for Exp3Params {
    fn default() -> Self {
        Self {
            episodes: DEFAULT_EPISODES,
            reset_at_end: false,
            gamma: DEFAULT_GAMMA,
            renormalize: false,
            seed: None,
        }
    }
}

/// Exponential-weight algorithm for exploration and exploitation.
///
/// Arm `a` is drawn with probability
/// `(1 - gamma) * w(a) / sum(w) + gamma / n`, so every arm keeps at least
/// `gamma / n`. A reward `r` multiplies the weight of its arm by
/// `exp(gamma * (r / p(a)) / n)`.
///
/// Weights grow without bound under persistent positive rewards. With
/// `renormalize` set they are divided by the largest weight after every
/// update, which leaves the probabilities unchanged.
#[derive(Debug)]
pub struct Exp3 {
    core: AgentCore<Exp3State>,
    gamma: f64,
    renormalize: bool,
    rng: MaybeSeededRng,
}

impl Exp3 {
    pub const NAME: &'static str = "exponential-weight-bandit";

    pub fn new(
        arms: &[String],
        params: Exp3Params,
        callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<Self, AgentError> {
        let arms = arms.iter().map(|name| Arm::new(name.as_str())).collect();
        Self::with_arms(arms, params, callbacks)
    }

    pub fn with_arms(
        arms: Vec<Arm<Exp3State>>,
        params: Exp3Params,
        callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<Self, AgentError> {
        if !(params.gamma > 0.0 && params.gamma <= 1.0) {
            warn!(gamma = params.gamma, "Rejected EXP3 parameters");
            return Err(AgentError::InvalidParameter {
                name: "gamma",
                value: params.gamma,
            });
        }

        let options = AgentOptions {
            episodes: params.episodes,
            reset_at_end: params.reset_at_end,
            callbacks,
        };

        Ok(Self {
            core: AgentCore::new(arms, options)?,
            gamma: params.gamma,
            renormalize: params.renormalize,
            rng: MaybeSeededRng::new(params.seed),
        })
    }

    pub fn from_checkpoint(
        checkpoint: &Checkpoint,
        callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<Self, CheckpointError> {
        checkpoint.agent_params.expect_name(Self::NAME)?;
        let params: Exp3Params =
            serde_json::from_value(Value::Object(checkpoint.agent_params.params.clone()))?;

        Ok(Self::with_arms(checkpoint.arms()?, params, callbacks)?)
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn arms(&self) -> &[Arm<Exp3State>] {
        self.core.arms()
    }

    pub fn arm(&self, name: &str) -> Result<&Arm<Exp3State>, AgentError> {
        self.core.arm(name)
    }

    fn weight_sum(&self) -> f64 {
        self.core.arms().iter().map(|arm| arm.state().weight).sum()
    }

    fn arm_probability(&self, arm: &Arm<Exp3State>, weight_sum: f64) -> f64 {
        let n = self.core.arms().len() as f64;
        (1.0 - self.gamma) * (arm.state().weight / weight_sum) + self.gamma / n
    }

    /// Selection probabilities of the active arms, in insertion order.
    pub fn probabilities(&self) -> Vec<f64> {
        let weight_sum = self.weight_sum();
        self.core
            .arms()
            .iter()
            .map(|arm| self.arm_probability(arm, weight_sum))
            .collect()
    }

    pub fn probability(&self, name: &str) -> Result<f64, AgentError> {
        let arm = self.core.arm(name)?;
        Ok(self.arm_probability(arm, self.weight_sum()))
    }

    fn renormalize_weights(&mut self) {
        let max_weight = self
            .core
            .arms()
            .iter()
            .map(|arm| arm.state().weight)
            .fold(0.0, f64::max);

        if max_weight.is_finite() && max_weight > 0.0 {
            self.core
                .arms_mut()
                .iter_mut()
                .for_each(|arm| arm.state_mut().weight /= max_weight);
        }
    }
}

impl Agent for Exp3 {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn agent_type(&self) -> AgentType {
        AgentType::Exp3(Exp3Params {
            episodes: self.core.episodes(),
            reset_at_end: self.core.reset_at_end(),
            gamma: self.gamma,
            renormalize: self.renormalize,
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
        if self.core.arms().is_empty() {
            return Err(AgentError::EmptyArmSet);
        }

        let index = WeightedIndex::new(self.probabilities())
            .map_err(|err| AgentError::Sampling(err.to_string()))?
            .sample(self.rng.get_rng());

        self.core.select(index)
    }

    fn reward_policy(&mut self, name: &str, reward: f64) -> Result<(), AgentError> {
        let index = self.core.position(name)?;
        let probability = self.arm_probability(&self.core.arms()[index], self.weight_sum());
        // also rejects NaN
        if !(probability > 0.0) {
            return Err(AgentError::ZeroProbability(name.to_string()));
        }

        let estimate = reward / probability;
        let n = self.core.arms().len() as f64;
        let arm = &mut self.core.arms_mut()[index];
        arm.state_mut().weight *= (estimate * self.gamma / n).exp();
        arm.reward(reward);
        trace!(arm = name, reward, probability, weight = arm.state().weight, "Updated arm weight");

        if self.renormalize {
            self.renormalize_weights();
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.core.reset();
    }

    fn finish(&mut self) {
        self.core.finish();
    }
}
