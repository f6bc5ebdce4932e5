// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Built-in Shield rule catalogue

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of policy violation a rule detects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    CredentialDisclosure,
    SensitiveIdentifier,
    PromptInjection,
    Custom,
}

impl ThreatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatCategory::CredentialDisclosure => "credential_disclosure",
            ThreatCategory::SensitiveIdentifier => "sensitive_identifier",
            ThreatCategory::PromptInjection => "prompt_injection",
            ThreatCategory::Custom => "custom",
        }
    }

    /// Short title for user-facing alerts
    pub fn title(&self) -> &'static str {
        match self {
            ThreatCategory::CredentialDisclosure => "Credential disclosure blocked",
            ThreatCategory::SensitiveIdentifier => "Sensitive identifier blocked",
            ThreatCategory::PromptInjection => "Prompt injection blocked",
            ThreatCategory::Custom => "Policy violation blocked",
        }
    }

    /// Lead-in for verdict reasons
    pub fn reason_prefix(&self) -> &'static str {
        match self {
            ThreatCategory::CredentialDisclosure => "Credential disclosure detected",
            ThreatCategory::SensitiveIdentifier => "Sensitive identifier detected",
            ThreatCategory::PromptInjection => "Prompt injection attempt detected",
            ThreatCategory::Custom => "Policy violation detected",
        }
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule definition (name, pattern, severity, description)
pub type RuleDef = (&'static str, &'static str, f64, &'static str);

pub static CREDENTIAL_RULES: Lazy<Vec<RuleDef>> = Lazy::new(|| {
    vec![
        (
            "password_disclosure",
            r"\b(?:my\s+)?(?:password|passwd|pwd|passcode)\s*(?:is\b|=|:)\s*\S+",
            0.95,
            "Password shared in plain text",
        ),
        (
            "api_key_disclosure",
            r#"\b(?:api[_-]?key|secret[_-]?key|access[_-]?token|auth[_-]?token)\s*(?:is\b|=|:)\s*['"]?[A-Za-z0-9\-_.]{8,}"#,
            0.9,
            "API key or access token shared",
        ),
        (
            "private_key_block",
            r"-----BEGIN (?:RSA |EC |OPENSSH |DSA )?PRIVATE KEY-----",
            0.99,
            "Private key material",
        ),
        (
            "aws_access_key",
            r"\bAKIA[0-9A-Z]{16}\b",
            0.9,
            "AWS access key id",
        ),
    ]
});

pub static IDENTIFIER_RULES: Lazy<Vec<RuleDef>> = Lazy::new(|| {
    vec![
        (
            "us_ssn",
            r"\b\d{3}-\d{2}-\d{4}\b",
            0.95,
            "US Social Security Number",
        ),
        (
            "ssn_mention",
            r"\b(?:ssn|social\s+security\s+(?:number|no\.?))\W{0,3}\d{9}\b",
            0.9,
            "US Social Security Number",
        ),
        (
            "credit_card",
            r"\b(?:4\d{3}|5[1-5]\d{2}|3[47]\d{2}|6(?:011|5\d{2}))[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{3,4}\b",
            0.9,
            "Payment card number",
        ),
    ]
});

pub static INJECTION_RULES: Lazy<Vec<RuleDef>> = Lazy::new(|| {
    vec![
        (
            "ignore_instructions",
            r"\b(?:ignore|disregard|forget|override)\s+(?:all\s+)?(?:the\s+)?(?:previous|prior|above|your)\s+(?:instructions|rules|prompts?)\b",
            0.9,
            "Attempt to override system instructions",
        ),
        (
            "reveal_system_prompt",
            r"\b(?:reveal|show|print|repeat|leak|output)\s+(?:me\s+)?(?:your|the)\s+(?:system\s+)?(?:prompt|instructions)\b",
            0.85,
            "Attempt to extract the system prompt",
        ),
        (
            "developer_mode",
            r"\b(?:enter|enable|activate)\s+(?:developer|jailbreak|dan)\s+mode\b",
            0.85,
            "Attempt to bypass safety rules",
        ),
        (
            "chat_template_delimiter",
            r"<\|(?:im_start|im_end|endoftext)\|>|<</?sys>>",
            0.8,
            "Chat template delimiter injection",
        ),
        (
            "role_play_override",
            r"\byou\s+are\s+now\s+(?:an?\s+)?(?:unrestricted|unfiltered)\b",
            0.4,
            "Role override phrasing",
        ),
    ]
});
