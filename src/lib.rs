pub mod agent;
pub mod config;
pub mod constants;
pub mod detection;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod rng;
pub mod subject;
pub mod timer;
pub mod types;
