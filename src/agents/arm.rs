use serde::{de::DeserializeOwned, ser::Error as _, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;

/// Algorithm-specific state carried by every arm of an agent.
/// `Default` gives the state of a freshly created arm.
pub trait ArmState: Clone + Debug + Default + Serialize + DeserializeOwned {}

/// State of arms whose agent learns nothing beyond the shared counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoState {}

impl ArmState for NoState {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "S: ArmState")]
pub struct Arm<S> {
    name: String,
    times_selected: u64,
    cumulative_reward: f64,
    #[serde(flatten)]
    state: S,
}

impl<S: ArmState> Arm<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            times_selected: 0,
            cumulative_reward: 0.0,
            state: S::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn times_selected(&self) -> u64 {
        self.times_selected
    }

    pub fn cumulative_reward(&self) -> f64 {
        self.cumulative_reward
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn select(&mut self) {
        self.times_selected += 1;
    }

    pub fn reward(&mut self, value: f64) {
        self.cumulative_reward += value;
    }

    pub fn reset(&mut self) {
        self.times_selected = 0;
        self.cumulative_reward = 0.0;
        self.state = S::default();
    }

    pub fn to_weights(&self) -> Result<ArmWeights, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(mut weights) => {
                weights.remove("name");
                Ok(ArmWeights {
                    name: self.name.clone(),
                    weights,
                })
            }
            other => Err(serde_json::Error::custom(format!(
                "arm {} is not a JSON object: {other}",
                self.name
            ))),
        }
    }

    pub fn from_weights(record: &ArmWeights) -> Result<Self, serde_json::Error> {
        let mut fields = record.weights.clone();
        fields.insert("name".to_string(), Value::String(record.name.clone()));
        serde_json::from_value(Value::Object(fields))
    }
}

/// Counters of an arm, without the algorithm state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArmSummary {
    pub name: String,
    pub times_selected: u64,
    pub cumulative_reward: f64,
}

impl<S: ArmState> From<&Arm<S>> for ArmSummary {
    fn from(arm: &Arm<S>) -> Self {
        Self {
            name: arm.name.clone(),
            times_selected: arm.times_selected,
            cumulative_reward: arm.cumulative_reward,
        }
    }
}

/// Persisted form of an arm: its name and every other field under `weights`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArmWeights {
    pub name: String,
    pub weights: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Scaled {
        scale: f64,
        history: Vec<f64>,
    }

    impl Default for Scaled {
        fn default() -> Self {
            Self {
                scale: 1.0,
                history: Vec::new(),
            }
        }
    }

    impl ArmState for Scaled {}

    #[test]
    fn select_and_reward() {
        let mut arm: Arm<NoState> = Arm::new("a");
        arm.select();
        arm.select();
        arm.reward(1.5);
        arm.reward(-0.5);
        assert_eq!(arm.times_selected(), 2);
        assert_eq!(arm.cumulative_reward(), 1.0);
    }

    #[test]
    fn reset() {
        let mut arm: Arm<Scaled> = Arm::new("a");
        arm.select();
        arm.reward(2.0);
        arm.state_mut().scale = 4.0;
        arm.reset();
        assert_eq!(arm, Arm::new("a"));
    }

    #[test]
    fn weights_exclude_name() {
        let mut arm: Arm<Scaled> = Arm::new("a");
        arm.state_mut().history = vec![0.5, 0.25];
        let record = arm.to_weights().unwrap();

        assert_eq!(record.name, "a");
        assert!(!record.weights.contains_key("name"));
        assert_eq!(record.weights["scale"], serde_json::json!(1.0));
        assert_eq!(record.weights["history"], serde_json::json!([0.5, 0.25]));
    }

    #[test]
    fn from_weights() {
        let mut arm: Arm<Scaled> = Arm::new("b");
        arm.select();
        arm.reward(0.1 + 0.2);
        arm.state_mut().scale = 1.0 / 3.0;

        let restored = Arm::<Scaled>::from_weights(&arm.to_weights().unwrap()).unwrap();
        assert_eq!(restored, arm);
    }

    #[test]
    fn from_invalid_weights() {
        let record = ArmWeights {
            name: "c".to_string(),
            weights: Map::new(),
        };
        assert!(Arm::<NoState>::from_weights(&record).is_err());
    }
}
