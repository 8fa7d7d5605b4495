//! Shared models, error types and collaborator traits for the SocialAI
//! automation orchestrator.

pub mod error;
pub mod models;
pub mod traits;

pub use error::Error;
