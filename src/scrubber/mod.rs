// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Scrubber - detection and reversible tokenization of sensitive entities
//
// - RegexSet pre-filtering over the pattern catalogue
// - Overlap resolution shared by every detection strategy
// - Single-pass rehydration keyed by exact token match

pub mod config;
pub mod detector;
pub mod mapping;
pub mod patterns;
pub mod rehydrate;
pub mod tokenizer;

use std::sync::Arc;

pub use config::{DetectorStrategy, EntityKind, NormalizationPolicy, ScrubberConfig};
pub use detector::{build_detector, Entity, EntityDetector};
pub use mapping::{Mapping, MappingEntry};
pub use rehydrate::rehydrate;
pub use tokenizer::{ScrubResult, Tokenizer};

use crate::error::Result;

/// Detector plus tokenizer, shared read-only by every in-flight request
#[derive(Clone)]
pub struct Scrubber {
    detector: Arc<dyn EntityDetector>,
    tokenizer: Tokenizer,
}

impl Scrubber {
    pub fn new(config: &ScrubberConfig) -> Result<Self> {
        Ok(Self::with_detector(build_detector(config)?, config))
    }

    /// Use a custom detection backend with the configured tokenizer
    pub fn with_detector(detector: Arc<dyn EntityDetector>, config: &ScrubberConfig) -> Self {
        Self {
            detector,
            tokenizer: Tokenizer::new(config),
        }
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    pub fn detect(&self, text: &str) -> Result<Vec<Entity>> {
        self.detector.detect(text)
    }

    /// Detect then tokenize in one step
    pub fn scrub(&self, text: &str) -> Result<ScrubResult> {
        let entities = self.detector.detect(text)?;
        self.tokenizer.tokenize(text, &entities)
    }
}
