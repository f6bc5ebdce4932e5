// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SentinelConfig;
use crate::error::Result;
use crate::scrubber::Scrubber;
use crate::shield::{RuleClassifier, SecurityClassifier};

/// Sentinel - privacy middleware between users and language models
#[derive(Debug, Parser)]
#[command(name = "sentinel", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, env = "SENTINEL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host address to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Scrub text and print the clean text and mapping as JSON
    Anonymize {
        /// Text to scrub
        text: String,
    },

    /// Run the safety classifier and print the verdict as JSON
    Classify {
        /// Text to classify
        text: String,
    },
}

impl Cli {
    pub fn load_config(&self) -> Result<SentinelConfig> {
        SentinelConfig::load(self.config.as_deref())
    }
}

/// Apply `serve` flag overrides on top of the loaded configuration
pub fn apply_overrides(config: &mut SentinelConfig, host: Option<String>, port: Option<u16>) {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
}

pub fn anonymize(config: &SentinelConfig, text: &str) -> Result<serde_json::Value> {
    let scrubber = Scrubber::new(&config.scrubber)?;
    let result = scrubber.scrub(text)?;
    Ok(serde_json::json!({
        "clean_text": result.clean_text,
        "mapping": result.mapping,
        "masked_entities": result.masked_entities_count,
    }))
}

pub fn classify(config: &SentinelConfig, text: &str) -> Result<serde_json::Value> {
    let classifier = RuleClassifier::new(&config.shield)?;
    let verdict = classifier.classify(text)?;
    Ok(serde_json::to_value(verdict)?)
}
