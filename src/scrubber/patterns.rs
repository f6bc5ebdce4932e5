// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Regex pattern compilation for entity detection
// Uses RegexSet as a pre-filter so only patterns that can match are run

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder, RegexSet};

use super::config::{EntityKind, ScrubberConfig};
use crate::error::{Result, SentinelError};

/// Compiled pattern with metadata
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub kind: EntityKind,
    pub regex: Regex,
    pub confidence: f64,
    pub description: String,
}

/// All compiled patterns with RegexSet for parallel matching
pub struct CompiledPatterns {
    pub regex_set: RegexSet,
    pub patterns: Vec<CompiledPattern>,
    pub whitelist: Vec<Regex>,
}

/// Pattern definitions (pattern, description, base confidence, case-insensitive)
type PatternDef = (&'static str, &'static str, f64, bool);

static EMAIL_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![(
        r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        "Email address",
        0.95,
        true,
    )]
});

// Phone patterns (US and international)
static PHONE_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![
        (
            r"(?:\+?\b1[-.\s]?)?(?:\(\d{3}\)|\b\d{3})[-.\s]?\d{3}[-.\s]?\d{4}\b",
            "US phone number",
            0.75,
            false,
        ),
        (
            r"\+[1-9]\d{9,14}\b",
            "International phone number",
            0.75,
            false,
        ),
    ]
});

// Street addresses stand in for locations
static LOCATION_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![(
        r"\b\d{1,5}\s+(?:[A-Z][a-z]+\s){1,4}(?:St|Street|Ave|Avenue|Blvd|Boulevard|Dr|Drive|Ln|Lane|Rd|Road|Ct|Court|Pl|Place|Way)\b\.?",
        "Street address",
        0.6,
        false,
    )]
});

static SSN_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![
        (
            r"\b\d{3}-\d{2}-\d{4}\b",
            "US Social Security Number",
            0.9,
            false,
        ),
        (
            r"\b\d{9}\b",
            "US Social Security Number (undelimited)",
            0.5,
            false,
        ),
    ]
});

static CREDIT_CARD_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![(
        r"\b(?:\d{4}[-\s]?){3}\d{4}\b",
        "Credit card number",
        0.85,
        false,
    )]
});

// IP address patterns (IPv4 and IPv6)
static IP_ADDRESS_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![
        (
            r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b",
            "IPv4 address",
            0.8,
            false,
        ),
        (
            r"\b(?:[A-Fa-f0-9]{1,4}:){7}[A-Fa-f0-9]{1,4}\b",
            "IPv6 address",
            0.8,
            false,
        ),
    ]
});

static DOB_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![
        (
            r"\b(?:DOB|Date of Birth|Born|Birthday)[:\s]+\d{1,2}[-/]\d{1,2}[-/]\d{2,4}\b",
            "Date of birth with label",
            0.9,
            true,
        ),
        (
            r"\b(?:0[1-9]|1[0-2])[-/](?:0[1-9]|[12]\d|3[01])[-/](?:19|20)\d{2}\b",
            "Date in MM/DD/YYYY format",
            0.6,
            false,
        ),
    ]
});

static PASSPORT_PATTERNS: Lazy<Vec<PatternDef>> =
    Lazy::new(|| vec![(r"\b[A-Z]{1,2}\d{6,9}\b", "Passport number", 0.5, false)]);

static DRIVER_LICENSE_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![(
        r"\b(?:DL|License|Driver'?s? License)[#:\s]+[A-Z0-9]{5,20}\b",
        "Driver's license number",
        0.85,
        true,
    )]
});

static BANK_ACCOUNT_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![
        (r"\b\d{8,17}\b", "Bank account number", 0.4, false),
        (
            r"\b[A-Z]{2}\d{2}[A-Z0-9]{4}\d{7}(?:\d{3})?\b",
            "IBAN",
            0.85,
            false,
        ),
    ]
});

static MEDICAL_RECORD_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![(
        r"\b(?:MRN|Medical Record)[#:\s]+[A-Z0-9]{6,12}\b",
        "Medical record number",
        0.9,
        true,
    )]
});

static AWS_KEY_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![
        (r"\bAKIA[0-9A-Z]{16}\b", "AWS Access Key ID", 0.95, false),
        (
            r"\b[A-Za-z0-9/+=]{40}\b",
            "AWS Secret Access Key",
            0.5,
            false,
        ),
    ]
});

static API_KEY_PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![(
        r#"\b(?:api[_-]?key|apikey|api_token|access[_-]?token)[:\s]+['"]?[A-Za-z0-9\-_]{20,}['"]?"#,
        "Generic API key",
        0.9,
        true,
    )]
});

fn build_regex(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| SentinelError::Pattern(format!("failed to compile '{pattern}': {e}")))
}

/// Compile patterns based on configuration
pub fn compile_patterns(config: &ScrubberConfig) -> Result<CompiledPatterns> {
    let mut pattern_strings = Vec::new();
    let mut patterns = Vec::new();

    macro_rules! add_patterns {
        ($enabled:expr, $kind:expr, $pattern_list:expr) => {
            if $enabled {
                for (pattern, description, confidence, case_insensitive) in $pattern_list.iter() {
                    // RegexSet takes no builder flags, so inline them
                    if *case_insensitive {
                        pattern_strings.push(format!("(?i){}", pattern));
                    } else {
                        pattern_strings.push(pattern.to_string());
                    }
                    patterns.push(CompiledPattern {
                        kind: $kind,
                        regex: build_regex(pattern, *case_insensitive)?,
                        confidence: *confidence,
                        description: description.to_string(),
                    });
                }
            }
        };
    }

    add_patterns!(config.detect_email, EntityKind::Email, &*EMAIL_PATTERNS);
    add_patterns!(config.detect_phone, EntityKind::Phone, &*PHONE_PATTERNS);
    add_patterns!(
        config.detect_location,
        EntityKind::Location,
        &*LOCATION_PATTERNS
    );
    add_patterns!(config.detect_ssn, EntityKind::Ssn, &*SSN_PATTERNS);
    add_patterns!(
        config.detect_credit_card,
        EntityKind::CreditCard,
        &*CREDIT_CARD_PATTERNS
    );
    add_patterns!(
        config.detect_ip_address,
        EntityKind::IpAddress,
        &*IP_ADDRESS_PATTERNS
    );
    add_patterns!(
        config.detect_date_of_birth,
        EntityKind::DateOfBirth,
        &*DOB_PATTERNS
    );
    add_patterns!(
        config.detect_passport,
        EntityKind::Passport,
        &*PASSPORT_PATTERNS
    );
    add_patterns!(
        config.detect_driver_license,
        EntityKind::DriverLicense,
        &*DRIVER_LICENSE_PATTERNS
    );
    add_patterns!(
        config.detect_bank_account,
        EntityKind::BankAccount,
        &*BANK_ACCOUNT_PATTERNS
    );
    add_patterns!(
        config.detect_medical_record,
        EntityKind::MedicalRecord,
        &*MEDICAL_RECORD_PATTERNS
    );
    add_patterns!(config.detect_aws_keys, EntityKind::AwsKey, &*AWS_KEY_PATTERNS);
    add_patterns!(config.detect_api_keys, EntityKind::ApiKey, &*API_KEY_PATTERNS);

    for custom in config.custom_patterns.iter().filter(|c| c.enabled) {
        pattern_strings.push(format!("(?i){}", custom.pattern));
        patterns.push(CompiledPattern {
            kind: custom.kind.unwrap_or(EntityKind::Custom),
            regex: build_regex(&custom.pattern, true)?,
            confidence: custom.confidence,
            description: custom.description.clone(),
        });
    }

    // Handle empty pattern set gracefully (all detectors disabled)
    let regex_set = if pattern_strings.is_empty() {
        RegexSet::empty()
    } else {
        RegexSet::new(&pattern_strings)
            .map_err(|e| SentinelError::Pattern(format!("failed to compile RegexSet: {e}")))?
    };

    let whitelist = config
        .whitelist_patterns
        .iter()
        .map(|pattern| {
            build_regex(pattern, true).map_err(|_| {
                SentinelError::Pattern(format!("invalid whitelist pattern '{pattern}'"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CompiledPatterns {
        regex_set,
        patterns,
        whitelist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrubber::config::CustomPattern;

    fn only(kind_flag: impl FnOnce(&mut ScrubberConfig)) -> ScrubberConfig {
        let mut config = ScrubberConfig {
            detect_email: false,
            detect_phone: false,
            detect_location: false,
            detect_ssn: false,
            detect_credit_card: false,
            detect_ip_address: false,
            detect_date_of_birth: false,
            detect_passport: false,
            detect_driver_license: false,
            detect_bank_account: false,
            detect_medical_record: false,
            detect_aws_keys: false,
            detect_api_keys: false,
            ..Default::default()
        };
        kind_flag(&mut config);
        config
    }

    #[test]
    fn test_compile_patterns() {
        let compiled = compile_patterns(&ScrubberConfig::default()).unwrap();

        assert!(!compiled.patterns.is_empty());
        assert_eq!(compiled.patterns.len(), compiled.regex_set.len());
    }

    #[test]
    fn test_all_disabled_yields_empty_set() {
        let compiled = compile_patterns(&only(|_| {})).unwrap();
        assert!(compiled.patterns.is_empty());
        assert!(compiled.regex_set.is_empty());
        assert!(!compiled.regex_set.is_match("jane@example.com"));
    }

    #[test]
    fn test_email_pattern() {
        let compiled = compile_patterns(&only(|c| c.detect_email = true)).unwrap();
        assert!(compiled.regex_set.is_match("Contact me at john.doe@example.com"));
    }

    #[test]
    fn test_phone_pattern_keeps_parentheses() {
        let compiled = compile_patterns(&only(|c| c.detect_phone = true)).unwrap();
        let m = compiled.patterns[0]
            .regex
            .find("Call me at (555) 123-4567 today")
            .unwrap();
        assert_eq!(m.as_str(), "(555) 123-4567");
    }

    #[test]
    fn test_location_pattern_is_case_sensitive() {
        let compiled = compile_patterns(&only(|c| c.detect_location = true)).unwrap();
        assert!(compiled.regex_set.is_match("I live at 42 Maple Street"));
        assert!(!compiled.regex_set.is_match("I need 2 more days to drive"));
    }

    #[test]
    fn test_custom_pattern() {
        let config = only(|c| {
            c.custom_patterns.push(CustomPattern {
                pattern: r"\bEMP-\d{5}\b".to_string(),
                description: "Employee ID".to_string(),
                confidence: 0.9,
                kind: None,
                enabled: true,
            })
        });
        let compiled = compile_patterns(&config).unwrap();
        assert_eq!(compiled.patterns.len(), 1);
        assert_eq!(compiled.patterns[0].kind, EntityKind::Custom);
        assert!(compiled.regex_set.is_match("badge emp-12345"));
    }

    #[test]
    fn test_invalid_whitelist_rejected() {
        let config = ScrubberConfig {
            whitelist_patterns: vec!["(unclosed".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            compile_patterns(&config),
            Err(SentinelError::Pattern(_))
        ));
    }
}
