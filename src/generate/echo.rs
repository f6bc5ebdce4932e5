// Copyright 2025
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use super::Generator;
use crate::error::Result;

/// Offline backend that acknowledges the prompt verbatim, placeholders
/// included. Useful for local runs where no model is reachable.
#[derive(Debug, Default, Clone)]
pub struct EchoGenerator;

impl EchoGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(format!("You said: \"{prompt}\""))
    }
}
