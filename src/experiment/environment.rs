use crate::agents::MaybeSeededRng;
use crate::errors::{AgentError, BanditError};

use rand_distr::{Bernoulli, Distribution};
use serde::{Deserialize, Serialize};

/// Source of the reward observed after selecting an arm.
pub trait Environment {
    fn reward(&mut self, arm: &str) -> Result<f64, BanditError>;
}

impl<F: FnMut(&str) -> f64> Environment for F {
    fn reward(&mut self, arm: &str) -> Result<f64, BanditError> {
        Ok(self(arm))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BernoulliArm {
    pub name: String,
    pub probability: f64,
}

/// Pays 1 with the arm's probability and 0 otherwise.
#[derive(Debug)]
pub struct BernoulliEnvironment {
    arms: Vec<(String, Bernoulli)>,
    rng: MaybeSeededRng,
}

impl BernoulliEnvironment {
    pub fn new(arms: &[BernoulliArm], seed: Option<u64>) -> Result<Self, AgentError> {
        let arms = arms
            .iter()
            .map(|arm| {
                Bernoulli::new(arm.probability)
                    .map(|distribution| (arm.name.clone(), distribution))
                    .map_err(|_| AgentError::InvalidParameter {
                        name: "probability",
                        value: arm.probability,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            arms,
            rng: MaybeSeededRng::new(seed),
        })
    }
}

impl Environment for BernoulliEnvironment {
    fn reward(&mut self, arm: &str) -> Result<f64, BanditError> {
        let (_, distribution) = self
            .arms
            .iter()
            .find(|(name, _)| name == arm)
            .ok_or_else(|| BanditError::UnknownEnvironmentArm(arm.to_string()))?;

        Ok(if distribution.sample(self.rng.get_rng()) {
            1.0
        } else {
            0.0
        })
    }
}
