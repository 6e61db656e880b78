// Core modules
pub mod agent;
pub mod config;
pub mod decision;
pub mod error;
pub mod execution;
pub mod features;
pub mod gateway;
pub mod guardrails;
pub mod indicators;
pub mod models;
pub mod sizing;
pub mod trust;

// Re-export commonly used types
pub use agent::{Agent, CycleSummary};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use models::*;
