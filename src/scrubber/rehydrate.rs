// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Token rehydration: restore original values into model output

use regex::{Captures, Regex, RegexBuilder};
use std::borrow::Cow;

use super::mapping::{Mapping, MappingEntry};

// Generous ceiling; mappings are per-request and small in practice
const ALTERNATION_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Replace every known token in `text` with its original value.
///
/// All tokens are matched in one simultaneous pass, longest first, and
/// restored values are never scanned again. A value that happens to spell
/// another token therefore stays as written. Text without tokens, or an
/// empty mapping, comes back borrowed and untouched.
pub fn rehydrate<'a>(text: &'a str, mapping: &Mapping) -> Cow<'a, str> {
    rehydrate_with_limit(text, mapping, ALTERNATION_SIZE_LIMIT)
}

/// Falls back to a linear scan when the alternation exceeds `size_limit`
fn rehydrate_with_limit<'a>(text: &'a str, mapping: &Mapping, size_limit: usize) -> Cow<'a, str> {
    if mapping.is_empty() || text.is_empty() {
        return Cow::Borrowed(text);
    }

    match token_alternation(mapping, size_limit) {
        Some(re) => re.replace_all(text, |caps: &Captures| {
            let token = &caps[0];
            mapping.get(token).unwrap_or(token).to_string()
        }),
        None => scan_replace(text, mapping),
    }
}

fn by_length_desc(mapping: &Mapping) -> Vec<&MappingEntry> {
    let mut entries: Vec<&MappingEntry> = mapping.iter().collect();
    entries.sort_by(|a, b| b.token.len().cmp(&a.token.len()));
    entries
}

/// One alternation over every escaped token, longest first so a token that
/// is a prefix of another never shadows it.
fn token_alternation(mapping: &Mapping, size_limit: usize) -> Option<Regex> {
    let pattern = by_length_desc(mapping)
        .iter()
        .map(|e| regex::escape(&e.token))
        .collect::<Vec<_>>()
        .join("|");

    match RegexBuilder::new(&pattern)
        .size_limit(size_limit)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(
                tokens = mapping.len(),
                error = %e,
                "Token alternation too large, falling back to linear scan"
            );
            None
        }
    }
}

/// Same semantics as the alternation, without a compiled automaton
fn scan_replace<'a>(text: &'a str, mapping: &Mapping) -> Cow<'a, str> {
    let entries = by_length_desc(mapping);
    let mut result = String::new();
    let mut last = 0;
    let mut pos = 0;

    while pos < text.len() {
        if !text.is_char_boundary(pos) {
            pos += 1;
            continue;
        }
        let rest = &text[pos..];
        match entries.iter().find(|e| rest.starts_with(e.token.as_str())) {
            Some(entry) => {
                result.push_str(&text[last..pos]);
                result.push_str(&entry.value);
                pos += entry.token.len();
                last = pos;
            }
            None => pos += 1,
        }
    }

    if last == 0 {
        return Cow::Borrowed(text);
    }
    result.push_str(&text[last..]);
    Cow::Owned(result)
}
