// src/lib.rs

pub mod config;
pub mod eventbus;
pub mod orchestrator;
pub mod platforms;
pub mod services;
pub mod settings;
pub mod sources;
pub mod tasks;
pub mod test_utils;

pub use config::OrchestratorConfig;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use socialai_common::error::Error;
