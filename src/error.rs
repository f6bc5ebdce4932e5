// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Error taxonomy shared by every pipeline stage

use std::time::Duration;

/// Errors raised by the Shield, Scrubber, Generate and Rehydrate stages and
/// by configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    /// Missing or empty input; user-correctable.
    #[error("{0}")]
    Validation(String),

    #[error("Request blocked: {reason}")]
    PolicyBlocked { reason: String },

    #[error("Safety classifier failed: {0}")]
    Classifier(String),

    #[error("Scrubber failed: {0}")]
    Scrub(String),

    #[error("Upstream generation failed: {0}")]
    Upstream(String),

    #[error("Upstream generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SentinelError>;

impl SentinelError {
    /// True for failures of the Shield, Scrubber or Generate stages, which
    /// surface to callers as a generic internal error.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            SentinelError::Classifier(_)
                | SentinelError::Scrub(_)
                | SentinelError::Upstream(_)
                | SentinelError::Timeout(_)
                | SentinelError::Http(_)
        )
    }

    /// Message safe to show to an end user. Internal failures collapse to a
    /// generic string so no entity value or mapping content can leak.
    pub fn public_message(&self) -> String {
        match self {
            SentinelError::Validation(msg) => msg.clone(),
            SentinelError::PolicyBlocked { reason } => reason.clone(),
            SentinelError::Timeout(_) => "Upstream model timed out".to_string(),
            e if e.is_upstream() => "Upstream model request failed".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(SentinelError::Scrub("bad span".into()).is_upstream());
        assert!(SentinelError::Timeout(Duration::from_secs(12)).is_upstream());
        assert!(!SentinelError::Validation("Missing message".into()).is_upstream());
        assert!(!SentinelError::Config("bad".into()).is_upstream());
    }

    #[test]
    fn test_public_message_hides_details() {
        let err = SentinelError::Scrub("value jane@example.com out of bounds".into());
        assert!(!err.public_message().contains("jane"));

        let err = SentinelError::Validation("Missing message".into());
        assert_eq!(err.public_message(), "Missing message");
    }
}
