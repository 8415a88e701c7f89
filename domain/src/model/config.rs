//! Role-based model configuration.
//!
//! [`ModelConfig`] describes one resolved chat-completion endpoint;
//! [`DebateModels`] pairs the two roles of a debate run. Resolution of the
//! layered override chain (request > subject > global) happens in the
//! configuration layer — by the time a config reaches the orchestrators it
//! is final and immutable for that call.

use serde::{Deserialize, Serialize};

/// A fully resolved chat-completion model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider model name (e.g. `qwen-vl-max`, `deepseek-chat`).
    pub name: String,
    /// API key for the provider endpoint.
    pub api_key: String,
    /// Base URL of the OpenAI-compatible endpoint.
    pub base_url: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Optional cap on generated tokens. `None` leaves the provider default.
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl ModelConfig {
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            temperature: default_temperature(),
            max_output_tokens: None,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }
}

/// The resolved (proposer, reviewer) pair threaded through one debate run.
///
/// Single-pass solving uses only `proposer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateModels {
    /// Model that produces and refines the candidate answer.
    pub proposer: ModelConfig,
    /// Model that critiques the candidate and signals consensus.
    pub reviewer: ModelConfig,
}

impl DebateModels {
    pub fn new(proposer: ModelConfig, reviewer: ModelConfig) -> Self {
        Self { proposer, reviewer }
    }

    /// Use one model for both roles (self-debate).
    pub fn symmetric(model: ModelConfig) -> Self {
        Self {
            proposer: model.clone(),
            reviewer: model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ModelConfig::new("qwen-vl-max", "sk-test", "https://api.example.com/v1")
            .with_temperature(0.2)
            .with_max_output_tokens(4096);

        assert_eq!(config.name, "qwen-vl-max");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_output_tokens, Some(4096));
    }

    #[test]
    fn test_default_temperature() {
        let config = ModelConfig::new("m", "k", "u");
        assert_eq!(config.temperature, 0.7);
        assert!(config.max_output_tokens.is_none());
    }

    #[test]
    fn test_symmetric_pair() {
        let config = ModelConfig::new("deepseek-chat", "k", "u");
        let pair = DebateModels::symmetric(config.clone());
        assert_eq!(pair.proposer, config);
        assert_eq!(pair.reviewer, config);
    }
}
