pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod poc;
pub mod report;
pub mod simulator;
pub mod steps;

pub const VERSION: &str = env!("BUILD_VERSION");
