//! Configuration file schema and model resolution.
//!
//! The layered override chain (request > subject > global default) is
//! resolved here, before the core ever runs — orchestrators receive an
//! already-resolved [`DebateModels`] pair and never re-layer.

use scholar_domain::{DebateModels, ModelConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config load error: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("No {0} model configured (set one under [default] or the subject table)")]
    MissingModel(&'static str),
}

/// One layer of model overrides: either role may be left unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelOverride {
    pub proposer: Option<ModelConfig>,
    pub reviewer: Option<ModelConfig>,
}

impl ModelOverride {
    pub fn is_empty(&self) -> bool {
        self.proposer.is_none() && self.reviewer.is_none()
    }
}

/// Top-level configuration file schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    /// Global default models.
    #[serde(default)]
    pub default: ModelOverride,
    /// Per-subject overrides, keyed by subject name (e.g. "math").
    #[serde(default)]
    pub subjects: HashMap<String, ModelOverride>,
    /// Default debate round budget.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    3
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            default: ModelOverride::default(),
            subjects: HashMap::new(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl FileConfig {
    /// Resolve the (proposer, reviewer) pair for one request.
    ///
    /// Each role resolves request > subject > global. An unresolvable
    /// proposer is an error; an unresolvable reviewer falls back to the
    /// proposer (symmetric self-debate).
    pub fn resolve(
        &self,
        subject: Option<&str>,
        request: &ModelOverride,
    ) -> Result<DebateModels, ConfigError> {
        let subject_override = subject.and_then(|s| self.subjects.get(s));

        let proposer = Self::pick(
            request.proposer.as_ref(),
            subject_override.and_then(|o| o.proposer.as_ref()),
            self.default.proposer.as_ref(),
        )
        .ok_or(ConfigError::MissingModel("proposer"))?
        .clone();

        let reviewer = Self::pick(
            request.reviewer.as_ref(),
            subject_override.and_then(|o| o.reviewer.as_ref()),
            self.default.reviewer.as_ref(),
        );

        Ok(match reviewer {
            Some(reviewer) => DebateModels::new(proposer, reviewer.clone()),
            None => DebateModels::symmetric(proposer),
        })
    }

    fn pick<'a>(
        request: Option<&'a ModelConfig>,
        subject: Option<&'a ModelConfig>,
        global: Option<&'a ModelConfig>,
    ) -> Option<&'a ModelConfig> {
        request.or(subject).or(global)
    }
}
