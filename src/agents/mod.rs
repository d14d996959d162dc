pub mod agent;
pub mod arm;
pub mod exp3;
pub mod fpl;
mod rng;

pub use agent::{Agent, AgentCore, AgentOptions, AgentParams, AgentType, Lifecycle};
pub use arm::{Arm, ArmState, ArmSummary, ArmWeights, NoState};
pub use exp3::{Exp3, Exp3Params, Exp3State};
pub use fpl::{Fpl, FplParams};
pub use rng::MaybeSeededRng;
