use adversarial_bandits::agents::Agent;
use adversarial_bandits::callbacks::CheckPointState;
use adversarial_bandits::config::{AppConfig, DEFAULT_CONFIG_PATH};
use adversarial_bandits::experiment::{BernoulliEnvironment, Simulation};

use serde_json::Value;
use std::error::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::from_path(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut environment =
        BernoulliEnvironment::new(&config.simulation.arms, config.simulation.seed)?;

    let (mut agent, mut simulation): (Box<dyn Agent>, Simulation) =
        match &config.simulation.resume_from {
            Some(checkpoint_path) => {
                let checkpoint = CheckPointState::load(checkpoint_path)?;
                let agent = config.agent.resume(&checkpoint, config.callbacks)?;
                let simulation = Simulation::resume(&checkpoint.experiment_params)?;
                (agent, simulation)
            }
            None => {
                let arms: Vec<String> = config
                    .simulation
                    .arms
                    .iter()
                    .map(|arm| arm.name.clone())
                    .collect();
                let agent = config.agent.into_agent(&arms, config.callbacks)?;
                let simulation = Simulation::new(agent.episodes());
                (agent, simulation)
            }
        };

    simulation.run(agent.as_mut(), &mut environment)?;

    for record in agent.arm_weights()? {
        let state = Value::Object(record.weights);
        info!(arm = %record.name, state = %state, "Final arm state");
    }
    Ok(())
}
