// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Configuration types for the Scrubber

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kinds of sensitive entities the Scrubber can detect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Email,
    Phone,
    Location,
    Ssn,
    CreditCard,
    IpAddress,
    DateOfBirth,
    Passport,
    DriverLicense,
    BankAccount,
    MedicalRecord,
    AwsKey,
    ApiKey,
    Custom,
}

impl EntityKind {
    pub const ALL: [EntityKind; 15] = [
        EntityKind::Person,
        EntityKind::Email,
        EntityKind::Phone,
        EntityKind::Location,
        EntityKind::Ssn,
        EntityKind::CreditCard,
        EntityKind::IpAddress,
        EntityKind::DateOfBirth,
        EntityKind::Passport,
        EntityKind::DriverLicense,
        EntityKind::BankAccount,
        EntityKind::MedicalRecord,
        EntityKind::AwsKey,
        EntityKind::ApiKey,
        EntityKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Email => "email",
            EntityKind::Phone => "phone",
            EntityKind::Location => "location",
            EntityKind::Ssn => "ssn",
            EntityKind::CreditCard => "credit_card",
            EntityKind::IpAddress => "ip_address",
            EntityKind::DateOfBirth => "date_of_birth",
            EntityKind::Passport => "passport",
            EntityKind::DriverLicense => "driver_license",
            EntityKind::BankAccount => "bank_account",
            EntityKind::MedicalRecord => "medical_record",
            EntityKind::AwsKey => "aws_key",
            EntityKind::ApiKey => "api_key",
            EntityKind::Custom => "custom",
        }
    }

    /// Label used inside placeholder tokens, e.g. `USER` in `[USER_1]`.
    ///
    /// People and their mail addresses both stand for "a user" from the
    /// model's point of view, so they share a label.
    pub fn default_token_label(&self) -> &'static str {
        match self {
            EntityKind::Person | EntityKind::Email => "USER",
            EntityKind::Phone => "PHONE",
            EntityKind::Location => "LOCATION",
            EntityKind::Ssn => "SSN",
            EntityKind::CreditCard => "CARD",
            EntityKind::IpAddress => "IP",
            EntityKind::DateOfBirth => "DATE",
            EntityKind::Passport => "PASSPORT",
            EntityKind::DriverLicense => "LICENSE",
            EntityKind::BankAccount => "ACCOUNT",
            EntityKind::MedicalRecord => "MRN",
            EntityKind::AwsKey | EntityKind::ApiKey => "SECRET",
            EntityKind::Custom => "REDACTED",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown entity kind '{s}'"))
    }
}

/// Detection strategies that can back the Scrubber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorStrategy {
    /// Regex catalogue over structured identifiers
    Patterns,
    /// Capitalized-word heuristic for person names
    Names,
}

/// How values are compared when deciding whether to reuse a token.
///
/// Both folds are off by default: values that differ only in case or
/// spacing would share a token and rehydrate to one spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationPolicy {
    pub case_insensitive: bool,
    pub collapse_whitespace: bool,
}

impl Default for NormalizationPolicy {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            collapse_whitespace: false,
        }
    }
}

impl NormalizationPolicy {
    pub fn normalize(&self, value: &str) -> String {
        let collapsed = if self.collapse_whitespace {
            value.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            value.to_string()
        };
        if self.case_insensitive {
            collapsed.to_lowercase()
        } else {
            collapsed
        }
    }
}

/// Custom pattern definition from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPattern {
    pub pattern: String,
    pub description: String,
    #[serde(default = "default_custom_confidence")]
    pub confidence: f64,
    /// Kind reported for matches; defaults to `custom`
    #[serde(default)]
    pub kind: Option<EntityKind>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_custom_confidence() -> f64 {
    0.8
}

/// Configuration for the Scrubber stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrubberConfig {
    pub strategies: Vec<DetectorStrategy>,

    // Detection flags
    pub detect_email: bool,
    pub detect_phone: bool,
    pub detect_location: bool,
    pub detect_ssn: bool,
    pub detect_credit_card: bool,
    pub detect_ip_address: bool,
    pub detect_date_of_birth: bool,
    pub detect_passport: bool,
    pub detect_driver_license: bool,
    pub detect_bank_account: bool,
    pub detect_medical_record: bool,
    pub detect_aws_keys: bool,
    pub detect_api_keys: bool,

    pub normalization: NormalizationPolicy,

    /// Token label overrides keyed by entity kind name, e.g. `phone = "TEL"`
    pub token_labels: BTreeMap<String, String>,

    pub custom_patterns: Vec<CustomPattern>,

    // Whitelist patterns (regex strings)
    pub whitelist_patterns: Vec<String>,
}

impl Default for ScrubberConfig {
    fn default() -> Self {
        Self {
            strategies: vec![DetectorStrategy::Patterns],

            detect_email: true,
            detect_phone: true,
            detect_location: true,
            detect_ssn: true,
            detect_credit_card: true,
            detect_ip_address: true,
            detect_date_of_birth: true,
            detect_passport: true,
            detect_driver_license: true,
            detect_bank_account: true,
            detect_medical_record: true,
            detect_aws_keys: true,
            detect_api_keys: true,

            normalization: NormalizationPolicy::default(),
            token_labels: BTreeMap::new(),
            custom_patterns: Vec::new(),
            whitelist_patterns: Vec::new(),
        }
    }
}

impl ScrubberConfig {
    /// Resolve the token label for a kind, honouring overrides.
    pub fn token_label(&self, kind: EntityKind) -> String {
        self.token_labels
            .get(kind.as_str())
            .cloned()
            .unwrap_or_else(|| kind.default_token_label().to_string())
    }

    /// Check overrides name real kinds and produce bracket-safe labels.
    pub fn validate(&self) -> Result<(), String> {
        for (kind, label) in &self.token_labels {
            EntityKind::from_str(kind)?;
            if label.is_empty()
                || !label
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            {
                return Err(format!(
                    "token label '{label}' for '{kind}' must be non-empty upper-case ASCII"
                ));
            }
        }
        for custom in &self.custom_patterns {
            if !(0.0..=1.0).contains(&custom.confidence) {
                return Err(format!(
                    "confidence {} for custom pattern '{}' is outside [0, 1]",
                    custom.confidence, custom.description
                ));
            }
        }
        Ok(())
    }
}
