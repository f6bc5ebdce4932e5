// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Entity detection strategies and overlap resolution

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

use super::config::{DetectorStrategy, EntityKind, ScrubberConfig};
use super::patterns::{compile_patterns, CompiledPatterns};
use crate::error::Result;

/// A single detected span of sensitive content
#[derive(Clone, PartialEq)]
pub struct Entity {
    pub kind: EntityKind,
    pub start: usize,
    pub end: usize,
    pub value: String,
    pub confidence: f64,
}

impl Entity {
    pub fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &Entity) -> bool {
        self.start < other.end && other.start < self.end
    }
}

// Values never reach logs through Debug
impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("kind", &self.kind)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("confidence", &self.confidence)
            .finish_non_exhaustive()
    }
}

/// Capability the pipeline depends on to find sensitive spans.
///
/// Implementations must be deterministic for a fixed input and return
/// non-overlapping entities ordered by start offset.
pub trait EntityDetector: Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, text: &str) -> Result<Vec<Entity>>;
}

/// Keep the best candidate wherever spans collide.
///
/// Higher confidence wins, then the longer span, then the earlier start.
/// A candidate overlapping (or contained in) an accepted span is dropped.
/// The sort is stable so full ties keep their input order.
pub fn resolve_overlaps(mut candidates: Vec<Entity>) -> Vec<Entity> {
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| a.start.cmp(&b.start))
    });

    let mut accepted: Vec<Entity> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if candidate.is_empty() {
            continue;
        }
        if !accepted.iter().any(|a| a.overlaps(&candidate)) {
            accepted.push(candidate);
        }
    }

    accepted.sort_by_key(|e| e.start);
    accepted
}

/// Regex catalogue detector
pub struct PatternDetector {
    patterns: CompiledPatterns,
}

impl PatternDetector {
    pub fn new(config: &ScrubberConfig) -> Result<Self> {
        Ok(Self {
            patterns: compile_patterns(config)?,
        })
    }

    /// Every raw match, before overlap resolution
    pub fn candidates(&self, text: &str) -> Vec<Entity> {
        let mut candidates = Vec::new();

        for pattern_idx in self.patterns.regex_set.matches(text).iter() {
            let pattern = &self.patterns.patterns[pattern_idx];

            for mat in pattern.regex.find_iter(text) {
                if self.is_whitelisted(mat.as_str()) {
                    continue;
                }
                candidates.push(Entity {
                    kind: pattern.kind,
                    start: mat.start(),
                    end: mat.end(),
                    value: mat.as_str().to_string(),
                    confidence: pattern.confidence,
                });
            }
        }

        candidates
    }

    fn is_whitelisted(&self, match_text: &str) -> bool {
        self.patterns
            .whitelist
            .iter()
            .any(|pattern| pattern.is_match(match_text))
    }
}

impl EntityDetector for PatternDetector {
    fn name(&self) -> &str {
        "patterns"
    }

    fn detect(&self, text: &str) -> Result<Vec<Entity>> {
        Ok(resolve_overlaps(self.candidates(text)))
    }
}

static NAME_SEQUENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)+\b").expect("valid regex"));

static NAME_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z][a-z]+").expect("valid regex"));

const NAME_STOPWORDS: &[&str] = &[
    "A", "An", "And", "Dear", "Hello", "Hey", "Hi", "How", "I", "In", "Is", "It", "My", "Of",
    "On", "Our", "Please", "Thanks", "The", "This", "That", "To", "What", "When", "Where", "Who",
    "Why", "Your", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// Two or more adjacent capitalized words, minus leading/trailing stop words.
///
/// Cheap and noisy, so it reports low confidence and loses to any pattern
/// match covering the same text.
pub struct NameDetector {
    confidence: f64,
}

impl NameDetector {
    pub const DEFAULT_CONFIDENCE: f64 = 0.4;

    pub fn new() -> Self {
        Self {
            confidence: Self::DEFAULT_CONFIDENCE,
        }
    }
}

impl Default for NameDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityDetector for NameDetector {
    fn name(&self) -> &str {
        "names"
    }

    fn detect(&self, text: &str) -> Result<Vec<Entity>> {
        let mut entities = Vec::new();

        for seq in NAME_SEQUENCE.find_iter(text) {
            let words: Vec<_> = NAME_WORD
                .find_iter(seq.as_str())
                .filter(|w| !NAME_STOPWORDS.contains(&w.as_str()))
                .collect();

            // Only trim at the edges; a stop word in the middle breaks the name
            let (Some(first), Some(last)) = (words.first(), words.last()) else {
                continue;
            };
            let start = seq.start() + first.start();
            let end = seq.start() + last.end();
            let value = &text[start..end];
            if value.split_whitespace().count() < 2
                || value
                    .split_whitespace()
                    .any(|w| NAME_STOPWORDS.contains(&w))
            {
                continue;
            }

            entities.push(Entity {
                kind: EntityKind::Person,
                start,
                end,
                value: value.to_string(),
                confidence: self.confidence,
            });
        }

        Ok(entities)
    }
}

/// Runs several strategies and resolves collisions across all of them
pub struct CompositeDetector {
    detectors: Vec<Arc<dyn EntityDetector>>,
}

impl CompositeDetector {
    pub fn new(detectors: Vec<Arc<dyn EntityDetector>>) -> Self {
        Self { detectors }
    }
}

impl EntityDetector for CompositeDetector {
    fn name(&self) -> &str {
        "composite"
    }

    fn detect(&self, text: &str) -> Result<Vec<Entity>> {
        let mut candidates = Vec::new();
        for detector in &self.detectors {
            candidates.extend(detector.detect(text)?);
        }
        Ok(resolve_overlaps(candidates))
    }
}

/// Build the detector described by the configured strategies
pub fn build_detector(config: &ScrubberConfig) -> Result<Arc<dyn EntityDetector>> {
    let mut detectors: Vec<Arc<dyn EntityDetector>> = Vec::new();
    for strategy in &config.strategies {
        match strategy {
            DetectorStrategy::Patterns => detectors.push(Arc::new(PatternDetector::new(config)?)),
            DetectorStrategy::Names => detectors.push(Arc::new(NameDetector::new())),
        }
    }

    if detectors.len() == 1 {
        return Ok(detectors.remove(0));
    }
    Ok(Arc::new(CompositeDetector::new(detectors)))
}
