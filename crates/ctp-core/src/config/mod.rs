pub mod defaults;
mod inference_config;
mod learning_config;
mod observability_config;

pub use inference_config::InferenceConfig;
pub use learning_config::LearningConfig;
pub use observability_config::ObservabilityConfig;

use serde::{Deserialize, Serialize};

use crate::errors::{CtpError, CtpResult};

/// Workspace configuration. Every section falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CtpConfig {
    pub inference: InferenceConfig,
    pub learning: LearningConfig,
    pub observability: ObservabilityConfig,
}

impl CtpConfig {
    /// Parse a TOML document. Missing sections and fields keep their defaults.
    pub fn from_toml(source: &str) -> CtpResult<Self> {
        toml::from_str(source).map_err(|e| CtpError::ConfigError(e.to_string()))
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> CtpResult<String> {
        toml::to_string(self).map_err(|e| CtpError::ConfigError(e.to_string()))
    }
}
