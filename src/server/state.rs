// Copyright 2025
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use crate::config::SentinelConfig;
use crate::error::Result;
use crate::generate::build_generator;
use crate::pipeline::PipelineOrchestrator;
use crate::scrubber::Scrubber;
use crate::shield::RuleClassifier;

/// Shared application state accessible to all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PipelineOrchestrator>,
}

impl AppState {
    pub fn new(pipeline: Arc<PipelineOrchestrator>) -> Self {
        Self { pipeline }
    }

    /// Compile rule and pattern sets and build the configured generator
    pub fn from_config(config: &SentinelConfig) -> Result<Self> {
        config.validate()?;
        let classifier = Arc::new(RuleClassifier::new(&config.shield)?);
        let scrubber = Scrubber::new(&config.scrubber)?;
        let generator = build_generator(&config.generator)?;

        tracing::info!(
            shield_rules = classifier.rule_count(),
            detector = scrubber.detector_name(),
            generator = generator.name(),
            timeout_secs = config.generator.timeout_secs,
            "Initialized pipeline"
        );

        let pipeline =
            PipelineOrchestrator::new(classifier, scrubber, generator, config.generator.timeout());
        Ok(Self::new(Arc::new(pipeline)))
    }

    pub fn scrubber(&self) -> &Scrubber {
        self.pipeline.scrubber()
    }
}
