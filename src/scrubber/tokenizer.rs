// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Reversible tokenization of detected entities

use std::collections::HashMap;
use zeroize::Zeroize;

use super::config::{EntityKind, NormalizationPolicy, ScrubberConfig};
use super::detector::Entity;
use super::mapping::Mapping;
use crate::error::{Result, SentinelError};

/// Output of the Scrubber stage
#[derive(Debug)]
pub struct ScrubResult {
    pub clean_text: String,
    pub mapping: Mapping,
    /// Distinct masked values, i.e. `mapping.len()`
    pub masked_entities_count: usize,
}

/// Replaces entity spans with `[LABEL_N]` placeholders.
///
/// Holds configuration only; all per-request state (counters, the value
/// index, the mapping) lives on the stack of `tokenize`.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    normalization: NormalizationPolicy,
    labels: HashMap<EntityKind, String>,
}

impl Tokenizer {
    pub fn new(config: &ScrubberConfig) -> Self {
        let labels = EntityKind::ALL
            .iter()
            .map(|&kind| (kind, config.token_label(kind)))
            .collect();
        Self {
            normalization: config.normalization,
            labels,
        }
    }

    fn label(&self, kind: EntityKind) -> &str {
        self.labels
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_token_label())
    }

    /// Substitute every entity span in `text` with its token.
    ///
    /// Spans are cut from the original offsets in a single forward pass, so
    /// one value being a substring of another cannot corrupt either.
    /// Equal normalized values share a token.
    pub fn tokenize(&self, text: &str, entities: &[Entity]) -> Result<ScrubResult> {
        let mut ordered: Vec<&Entity> = entities.iter().collect();
        ordered.sort_by_key(|e| e.start);
        validate_spans(text, &ordered)?;

        let mut mapping = Mapping::new();
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut counters: HashMap<&str, usize> = HashMap::new();
        let mut clean_text = String::with_capacity(text.len());
        let mut cursor = 0;

        for entity in ordered {
            let key = self.normalization.normalize(&entity.value);
            let token = match seen.get(&key) {
                Some(token) => token.clone(),
                None => {
                    let label = self.label(entity.kind);
                    let token = mint_token(text, &mapping, label, &mut counters);
                    mapping.insert(token.clone(), entity.value.clone(), Some(entity.kind));
                    seen.insert(key, token.clone());
                    token
                }
            };

            clean_text.push_str(&text[cursor..entity.start]);
            clean_text.push_str(&token);
            cursor = entity.end;
        }
        clean_text.push_str(&text[cursor..]);

        for (mut key, _) in seen.drain() {
            key.zeroize();
        }

        Ok(ScrubResult {
            clean_text,
            masked_entities_count: mapping.len(),
            mapping,
        })
    }
}

/// Next `[LABEL_N]` not already in the mapping nor present in the input.
fn mint_token<'a>(
    text: &str,
    mapping: &Mapping,
    label: &'a str,
    counters: &mut HashMap<&'a str, usize>,
) -> String {
    let counter = counters.entry(label).or_insert(0);
    loop {
        *counter += 1;
        let candidate = format!("[{label}_{counter}]");
        if !mapping.contains_token(&candidate) && !text.contains(&candidate) {
            return candidate;
        }
    }
}

fn validate_spans(text: &str, ordered: &[&Entity]) -> Result<()> {
    let mut prev_end = 0;
    for (idx, entity) in ordered.iter().enumerate() {
        if entity.start >= entity.end || entity.end > text.len() {
            return Err(SentinelError::Scrub(format!(
                "entity {idx} ({}) has invalid span {}..{}",
                entity.kind, entity.start, entity.end
            )));
        }
        if !text.is_char_boundary(entity.start) || !text.is_char_boundary(entity.end) {
            return Err(SentinelError::Scrub(format!(
                "entity {idx} ({}) does not fall on character boundaries",
                entity.kind
            )));
        }
        if idx > 0 && entity.start < prev_end {
            return Err(SentinelError::Scrub(format!(
                "entity {idx} ({}) overlaps the previous entity",
                entity.kind
            )));
        }
        if text[entity.start..entity.end] != entity.value {
            return Err(SentinelError::Scrub(format!(
                "entity {idx} ({}) value does not match its span",
                entity.kind
            )));
        }
        prev_end = entity.end;
    }
    Ok(())
}
