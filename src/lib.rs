pub mod agent;
pub mod config;
pub mod errors;
pub mod gates;
pub mod hyphae_config;
pub mod init;
pub mod mission;
pub mod orchestrator;
pub mod phase;
pub mod prompt;
pub mod retry;
pub mod store;
pub mod tools;
pub mod ui;
