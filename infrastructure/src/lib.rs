//! Infrastructure layer for scholar-debate
//!
//! Adapters for the application ports: an OpenAI-compatible chat-completion
//! invoker, a heuristic token estimator, and the figment-based
//! configuration loader that resolves model overrides.

pub mod config;
pub mod providers;
pub mod token;

pub use config::{ConfigError, ConfigLoader, FileConfig, ModelOverride};
pub use providers::openai::OpenAiInvoker;
pub use token::estimator::HeuristicEstimator;
