pub mod abi;
pub mod config;
pub mod contract;
pub mod error;
pub mod network;
pub mod types;

pub mod client;
