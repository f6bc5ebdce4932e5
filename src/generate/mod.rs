// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// External generation service contract and backends

pub mod echo;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SentinelError};

pub use echo::EchoGenerator;
pub use openai::OpenAiGenerator;

/// The external language model. Only ever receives scrubbed text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable name of this backend.
    fn name(&self) -> &str;

    /// Produce a reply for an already-scrubbed prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// OpenAI-compatible chat completions API
    Openai,
    /// Offline acknowledgement, no network
    Echo,
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "Some values in the user's message were replaced by \
placeholders such as [USER_1] or [PHONE_1]. Treat each placeholder as the value it stands for \
and repeat placeholders exactly as written when you refer to them.";

/// Configuration for the Generate stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub provider: Provider,
    /// Chat completions API URL, not a documentation page
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the bearer token
    pub api_key_env: String,
    pub system_prompt: String,
    /// Bound on the whole external call; no retry after expiry
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Echo,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "SENTINEL_API_KEY".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout_secs: 12,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(SentinelError::Config(
                "generator timeout_secs must be positive".to_string(),
            ));
        }
        if self.provider == Provider::Openai {
            let url = reqwest::Url::parse(&self.endpoint).map_err(|e| {
                SentinelError::Config(format!("invalid generator endpoint '{}': {e}", self.endpoint))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(SentinelError::Config(format!(
                    "generator endpoint must be http(s), got '{}'",
                    url.scheme()
                )));
            }
        }
        Ok(())
    }
}

/// Create the configured backend
pub fn build_generator(config: &GeneratorConfig) -> Result<Arc<dyn Generator>> {
    config.validate()?;
    let generator: Arc<dyn Generator> = match config.provider {
        Provider::Openai => Arc::new(OpenAiGenerator::from_config(config)?),
        Provider::Echo => Arc::new(EchoGenerator::new()),
    };
    Ok(generator)
}
