// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Shield - safety classification that gates every request

pub mod rules;

use regex::RegexSet;
use serde::{Deserialize, Serialize};

pub use rules::ThreatCategory;
use rules::{RuleDef, CREDENTIAL_RULES, IDENTIFIER_RULES, INJECTION_RULES};

use crate::error::{Result, SentinelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictLabel {
    Safe,
    Unsafe,
}

impl VerdictLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictLabel::Safe => "SAFE",
            VerdictLabel::Unsafe => "UNSAFE",
        }
    }
}

/// Shield decision for one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: VerdictLabel,
    /// Strongest signal observed, in [0, 1]
    pub score: f64,
    /// Always set when the label is UNSAFE
    pub reason: Option<String>,
    pub category: Option<ThreatCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_rules: Vec<String>,
}

impl Verdict {
    pub fn safe(score: f64) -> Self {
        Self {
            label: VerdictLabel::Safe,
            score,
            reason: None,
            category: None,
            matched_rules: Vec::new(),
        }
    }

    /// Verdict recorded when no classification could be made
    pub fn fail_closed(reason: impl Into<String>) -> Self {
        Self {
            label: VerdictLabel::Unsafe,
            score: 1.0,
            reason: Some(reason.into()),
            category: None,
            matched_rules: Vec::new(),
        }
    }

    pub fn is_safe(&self) -> bool {
        self.label == VerdictLabel::Safe
    }

    /// Alert title for blocked requests
    pub fn title(&self) -> &'static str {
        match self.category {
            Some(category) => category.title(),
            None => "Request blocked",
        }
    }
}

/// Scores raw input text for policy violations.
///
/// Implementations are pure functions of their input and static
/// configuration, so one instance serves all requests concurrently.
pub trait SecurityClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, text: &str) -> Result<Verdict>;
}

/// Operator-supplied rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRule {
    pub name: String,
    pub pattern: String,
    pub severity: f64,
    pub description: String,
    #[serde(default = "default_custom_category")]
    pub category: ThreatCategory,
}

fn default_custom_category() -> ThreatCategory {
    ThreatCategory::Custom
}

/// Configuration for the Shield stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldConfig {
    /// Score at or above which a request is blocked
    pub threshold: f64,
    pub detect_credentials: bool,
    pub detect_identifiers: bool,
    pub detect_injection: bool,
    pub custom_rules: Vec<CustomRule>,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            detect_credentials: true,
            detect_identifiers: true,
            detect_injection: true,
            custom_rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    name: String,
    category: ThreatCategory,
    severity: f64,
    description: String,
}

/// Regex rule classifier
pub struct RuleClassifier {
    regex_set: RegexSet,
    rules: Vec<CompiledRule>,
    threshold: f64,
}

impl RuleClassifier {
    pub fn new(config: &ShieldConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.threshold) {
            return Err(SentinelError::Config(format!(
                "shield threshold {} is outside [0, 1]",
                config.threshold
            )));
        }

        let mut pattern_strings = Vec::new();
        let mut rules = Vec::new();

        let mut add = |enabled: bool, category: ThreatCategory, defs: &[RuleDef]| {
            if !enabled {
                return;
            }
            for (name, pattern, severity, description) in defs {
                pattern_strings.push(format!("(?i){pattern}"));
                rules.push(CompiledRule {
                    name: name.to_string(),
                    category,
                    severity: *severity,
                    description: description.to_string(),
                });
            }
        };
        add(
            config.detect_credentials,
            ThreatCategory::CredentialDisclosure,
            CREDENTIAL_RULES.as_slice(),
        );
        add(
            config.detect_identifiers,
            ThreatCategory::SensitiveIdentifier,
            IDENTIFIER_RULES.as_slice(),
        );
        add(
            config.detect_injection,
            ThreatCategory::PromptInjection,
            INJECTION_RULES.as_slice(),
        );

        for custom in &config.custom_rules {
            if !(0.0..=1.0).contains(&custom.severity) {
                return Err(SentinelError::Config(format!(
                    "severity {} for rule '{}' is outside [0, 1]",
                    custom.severity, custom.name
                )));
            }
            pattern_strings.push(format!("(?i){}", custom.pattern));
            rules.push(CompiledRule {
                name: custom.name.clone(),
                category: custom.category,
                severity: custom.severity,
                description: custom.description.clone(),
            });
        }

        let regex_set = if pattern_strings.is_empty() {
            RegexSet::empty()
        } else {
            RegexSet::new(&pattern_strings)
                .map_err(|e| SentinelError::Pattern(format!("invalid shield rule: {e}")))?
        };

        Ok(Self {
            regex_set,
            rules,
            threshold: config.threshold,
        })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl SecurityClassifier for RuleClassifier {
    fn name(&self) -> &str {
        "rules"
    }

    fn classify(&self, text: &str) -> Result<Verdict> {
        let fired: Vec<&CompiledRule> = self
            .regex_set
            .matches(text)
            .iter()
            .map(|idx| &self.rules[idx])
            .collect();

        // First rule wins among equal severities, keeping catalogue order
        let strongest = fired.iter().copied().fold(None, |best: Option<&CompiledRule>, rule| {
            match best {
                Some(b) if b.severity >= rule.severity => Some(b),
                _ => Some(rule),
            }
        });

        let Some(strongest) = strongest else {
            return Ok(Verdict::safe(0.0));
        };

        let matched_rules = fired.iter().map(|r| r.name.clone()).collect();
        if strongest.severity < self.threshold {
            return Ok(Verdict {
                matched_rules,
                ..Verdict::safe(strongest.severity)
            });
        }

        Ok(Verdict {
            label: VerdictLabel::Unsafe,
            score: strongest.severity,
            reason: Some(format!(
                "{}: {}",
                strongest.category.reason_prefix(),
                strongest.description
            )),
            category: Some(strongest.category),
            matched_rules,
        })
    }
}
