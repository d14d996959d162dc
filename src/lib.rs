pub mod agents;
pub mod callbacks;
pub mod config;
pub mod errors;
pub mod experiment;
