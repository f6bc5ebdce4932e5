// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Service configuration loaded from TOML

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SentinelError};
use crate::generate::GeneratorConfig;
use crate::scrubber::ScrubberConfig;
use crate::shield::ShieldConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// Top-level configuration. Every section and field has a default, so a
/// partial file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub server: ServerConfig,
    pub shield: ShieldConfig,
    pub scrubber: ScrubberConfig,
    pub generator: GeneratorConfig,
}

impl SentinelConfig {
    /// Load from `path`. Returns defaults if no path is given or the file
    /// does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            SentinelError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SentinelConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.shield.threshold) {
            return Err(SentinelError::Config(format!(
                "shield threshold {} is outside [0, 1]",
                self.shield.threshold
            )));
        }
        self.scrubber.validate().map_err(SentinelError::Config)?;
        self.generator.validate()?;
        Ok(())
    }

    /// Server bind address, e.g. "127.0.0.1:8787"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
