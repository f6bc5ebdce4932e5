// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Per-request token -> original value mapping

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use zeroize::Zeroize;

use super::config::EntityKind;

/// One token and the value it stands for
#[derive(Clone)]
pub struct MappingEntry {
    pub token: String,
    pub value: String,
    /// Unknown when the mapping was supplied by a client
    pub kind: Option<EntityKind>,
}

/// Insertion-ordered, injective token -> value mapping.
///
/// Owned by exactly one request. Values are wiped when the mapping is
/// dropped and never appear in `Debug` output.
#[derive(Clone, Default)]
pub struct Mapping {
    entries: Vec<MappingEntry>,
    index: HashMap<String, usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(token, value)` pairs, e.g. a mapping echoed back by a
    /// client. Later duplicates replace earlier values; empty tokens are
    /// ignored since they would match everywhere.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut mapping = Self::new();
        for (token, value) in pairs {
            mapping.upsert(token.into(), value.into(), None);
        }
        mapping
    }

    /// Add a freshly minted token. Returns false (and changes nothing) if
    /// the token is already present or empty.
    pub fn insert(&mut self, token: String, value: String, kind: Option<EntityKind>) -> bool {
        if token.is_empty() || self.index.contains_key(&token) {
            return false;
        }
        self.index.insert(token.clone(), self.entries.len());
        self.entries.push(MappingEntry { token, value, kind });
        true
    }

    fn upsert(&mut self, token: String, value: String, kind: Option<EntityKind>) {
        match self.index.get(&token) {
            Some(&idx) => {
                let entry = &mut self.entries[idx];
                entry.value.zeroize();
                entry.value = value;
                entry.kind = kind;
            }
            None => {
                self.insert(token, value, kind);
            }
        }
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.index
            .get(token)
            .map(|&idx| self.entries[idx].value.as_str())
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.token.as_str())
    }

    /// Entry count per kind; the only mapping-derived data fit for logs.
    pub fn kind_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            let name = entry.kind.map(|k| k.as_str()).unwrap_or("unknown");
            *counts.entry(name).or_insert(0) += 1;
        }
        counts
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        for entry in &mut self.entries {
            entry.value.zeroize();
        }
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("entries", &self.entries.len())
            .field("kinds", &self.kind_counts())
            .finish()
    }
}

// Serialized as a plain JSON object, in insertion order
impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.token, &entry.value)?;
        }
        map.end()
    }
}

struct MappingVisitor;

impl<'de> Visitor<'de> for MappingVisitor {
    type Value = Mapping;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of token -> original value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Mapping, A::Error> {
        let mut mapping = Mapping::new();
        while let Some((token, value)) = access.next_entry::<String, String>()? {
            mapping.upsert(token, value, None);
        }
        Ok(mapping)
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MappingVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut mapping = Mapping::new();
        assert!(mapping.insert("[USER_1]".into(), "jane@example.com".into(), None));
        assert!(!mapping.insert("[USER_1]".into(), "bob@example.com".into(), None));
        assert!(!mapping.insert(String::new(), "x".into(), None));
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("[USER_1]"), Some("jane@example.com"));
    }

    #[test]
    fn test_serialize_preserves_order() {
        let mut mapping = Mapping::new();
        mapping.insert("[USER_2]".into(), "b".into(), Some(EntityKind::Email));
        mapping.insert("[USER_1]".into(), "a".into(), Some(EntityKind::Email));

        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"[USER_2]":"b","[USER_1]":"a"}"#);
    }

    #[test]
    fn test_deserialize_object() {
        let mapping: Mapping =
            serde_json::from_str(r#"{"[USER_1]":"jane@example.com","[PHONE_1]":"555-0100"}"#)
                .unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("[PHONE_1]"), Some("555-0100"));
        assert_eq!(mapping.tokens().collect::<Vec<_>>(), ["[USER_1]", "[PHONE_1]"]);
    }

    #[test]
    fn test_debug_redacts_values() {
        let mut mapping = Mapping::new();
        mapping.insert(
            "[USER_1]".into(),
            "jane@example.com".into(),
            Some(EntityKind::Email),
        );
        let debug = format!("{mapping:?}");
        assert!(!debug.contains("jane"));
        assert!(debug.contains("email"));
    }

    #[test]
    fn test_kind_counts() {
        let mut mapping = Mapping::from_pairs([("[X]", "1")]);
        mapping.insert("[USER_1]".into(), "a".into(), Some(EntityKind::Email));
        mapping.insert("[USER_2]".into(), "b".into(), Some(EntityKind::Person));
        mapping.insert("[USER_3]".into(), "c".into(), Some(EntityKind::Email));

        let counts = mapping.kind_counts();
        assert_eq!(counts["email"], 2);
        assert_eq!(counts["person"], 1);
        assert_eq!(counts["unknown"], 1);
    }
}
