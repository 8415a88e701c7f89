//! Configuration loading and model resolution

pub mod file_config;
pub mod loader;

pub use file_config::{ConfigError, FileConfig, ModelOverride};
pub use loader::ConfigLoader;
