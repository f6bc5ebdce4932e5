// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Orchestrator sequencing Shield -> Scrubber -> Generate -> Rehydrate
//
// Every stage failure aborts the rest of the run and nothing is retried.
// Only scrubbed text ever reaches the generator.

pub mod state;

use std::sync::Arc;
use std::time::Duration;

pub use state::{PipelineState, Stage, StageStatus};

use crate::audit::{self, Outcome};
use crate::error::{Result, SentinelError};
use crate::generate::Generator;
use crate::scrubber::{rehydrate, Mapping, Scrubber};
use crate::shield::{SecurityClassifier, Verdict};

/// Result of a run that reached a decision
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Shield classified the input UNSAFE. No later stage ran.
    Blocked {
        verdict: Verdict,
        state: PipelineState,
    },
    Completed {
        verdict: Verdict,
        masked_entities: usize,
        mapping: Mapping,
        /// Generator reply with every token restored
        assistant: String,
        state: PipelineState,
    },
}

impl PipelineOutcome {
    pub fn verdict(&self) -> &Verdict {
        match self {
            PipelineOutcome::Blocked { verdict, .. } | PipelineOutcome::Completed { verdict, .. } => {
                verdict
            }
        }
    }

    pub fn state(&self) -> &PipelineState {
        match self {
            PipelineOutcome::Blocked { state, .. } | PipelineOutcome::Completed { state, .. } => {
                state
            }
        }
    }
}

/// A stage failed. `state` shows which one.
#[derive(Debug)]
pub struct PipelineFailure {
    pub error: SentinelError,
    pub state: PipelineState,
    /// Set when the Shield itself failed
    pub verdict: Option<Verdict>,
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Runs requests through the four stages.
///
/// Collaborators are shared read-only; all per-request data lives in the
/// `run` call.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    classifier: Arc<dyn SecurityClassifier>,
    scrubber: Scrubber,
    generator: Arc<dyn Generator>,
    timeout: Duration,
}

impl PipelineOrchestrator {
    pub fn new(
        classifier: Arc<dyn SecurityClassifier>,
        scrubber: Scrubber,
        generator: Arc<dyn Generator>,
        timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            scrubber,
            generator,
            timeout,
        }
    }

    pub fn scrubber(&self) -> &Scrubber {
        &self.scrubber
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one message through every stage.
    ///
    /// Empty or whitespace-only input fails validation before any stage
    /// starts.
    pub async fn run(&self, message: &str) -> std::result::Result<PipelineOutcome, PipelineFailure> {
        let mut state = PipelineState::new();

        if message.trim().is_empty() {
            return Err(self.fail(
                state,
                SentinelError::Validation("Missing message".to_string()),
                None,
            ));
        }

        // Shield
        state.start(Stage::Shield);
        let verdict = match self.classifier.classify(message) {
            Ok(verdict) => verdict,
            Err(e) => {
                state.finish(Stage::Shield, StageStatus::Failed);
                tracing::error!(
                    request_id = %state.request_id(),
                    classifier = self.classifier.name(),
                    error = %e,
                    "Classifier failed, blocking request"
                );
                let verdict = Verdict::fail_closed("Safety classification unavailable");
                let error = match e {
                    e @ SentinelError::Classifier(_) => e,
                    other => SentinelError::Classifier(other.to_string()),
                };
                return Err(self.fail(state, error, Some(verdict)));
            }
        };

        if !verdict.is_safe() {
            state.finish(Stage::Shield, StageStatus::Blocked);
            tracing::info!(
                request_id = %state.request_id(),
                score = verdict.score,
                category = verdict.category.map(|c| c.as_str()).unwrap_or("none"),
                "Request blocked by shield"
            );
            audit::record(&state, Outcome::Blocked, Some(&verdict), None);
            return Ok(PipelineOutcome::Blocked { verdict, state });
        }
        state.finish(Stage::Shield, StageStatus::Passed);

        // Scrubber
        state.start(Stage::Scrubber);
        let scrubbed = match self.scrubber.scrub(message) {
            Ok(result) => result,
            Err(e) => {
                state.finish(Stage::Scrubber, StageStatus::Failed);
                let error = match e {
                    e @ SentinelError::Scrub(_) => e,
                    other => SentinelError::Scrub(other.to_string()),
                };
                return Err(self.fail(state, error, Some(verdict)));
            }
        };
        state.finish(Stage::Scrubber, StageStatus::Done);
        tracing::debug!(
            request_id = %state.request_id(),
            masked_entities = scrubbed.masked_entities_count,
            "Scrubbed message"
        );

        // Generate
        state.start(Stage::Generate);
        let reply = match self.generate(&scrubbed.clean_text).await {
            Ok(reply) => reply,
            Err(error) => {
                state.finish(Stage::Generate, StageStatus::Failed);
                return Err(self.fail(state, error, Some(verdict)));
            }
        };
        state.finish(Stage::Generate, StageStatus::Done);

        // Rehydrate
        state.start(Stage::Rehydrate);
        let assistant = rehydrate(&reply, &scrubbed.mapping).into_owned();
        state.finish(Stage::Rehydrate, StageStatus::Done);

        audit::record(
            &state,
            Outcome::Completed,
            Some(&verdict),
            Some(&scrubbed.mapping),
        );

        Ok(PipelineOutcome::Completed {
            verdict,
            masked_entities: scrubbed.masked_entities_count,
            mapping: scrubbed.mapping,
            assistant,
            state,
        })
    }

    async fn generate(&self, clean_text: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.generator.generate(clean_text)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => {
                tracing::warn!(generator = self.generator.name(), error = %e, "Generation failed");
                Err(match e {
                    e if e.is_upstream() => e,
                    other => SentinelError::Upstream(other.to_string()),
                })
            }
            Err(_) => {
                tracing::warn!(
                    generator = self.generator.name(),
                    timeout = ?self.timeout,
                    "Generation timed out"
                );
                Err(SentinelError::Timeout(self.timeout))
            }
        }
    }

    fn fail(
        &self,
        state: PipelineState,
        error: SentinelError,
        verdict: Option<Verdict>,
    ) -> PipelineFailure {
        audit::record(&state, Outcome::Failed, verdict.as_ref(), None);
        PipelineFailure {
            error,
            state,
            verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::EchoGenerator;
    use crate::scrubber::{Entity, EntityDetector, EntityKind, ScrubberConfig};
    use crate::shield::{RuleClassifier, ShieldConfig, VerdictLabel};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CapturingGenerator {
        seen: Mutex<Vec<String>>,
        reply: String,
    }

    #[async_trait]
    impl Generator for CapturingGenerator {
        fn name(&self) -> &str {
            "capturing"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl Generator for SlowGenerator {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(SentinelError::Upstream("HTTP 502".to_string()))
        }
    }

    struct BrokenClassifier;

    impl SecurityClassifier for BrokenClassifier {
        fn name(&self) -> &str {
            "broken"
        }

        fn classify(&self, _text: &str) -> Result<Verdict> {
            Err(SentinelError::Classifier("model unavailable".to_string()))
        }
    }

    /// Reports a span that does not exist in the text
    struct BogusDetector;

    impl EntityDetector for BogusDetector {
        fn name(&self) -> &str {
            "bogus"
        }

        fn detect(&self, text: &str) -> Result<Vec<Entity>> {
            Ok(vec![Entity {
                kind: EntityKind::Email,
                start: 0,
                end: text.len() + 10,
                value: "x".to_string(),
                confidence: 1.0,
            }])
        }
    }

    fn classifier() -> Arc<dyn SecurityClassifier> {
        Arc::new(RuleClassifier::new(&ShieldConfig::default()).unwrap())
    }

    fn scrubber() -> Scrubber {
        Scrubber::new(&ScrubberConfig::default()).unwrap()
    }

    fn orchestrator(generator: Arc<dyn Generator>) -> PipelineOrchestrator {
        PipelineOrchestrator::new(classifier(), scrubber(), generator, Duration::from_secs(12))
    }

    #[tokio::test]
    async fn test_completed_run() {
        let generator = Arc::new(CapturingGenerator {
            seen: Mutex::new(Vec::new()),
            reply: "Sure, I'll contact [USER_1].".to_string(),
        });
        let pipeline = orchestrator(generator.clone());

        let outcome = pipeline.run("Email me at jane@example.com").await.unwrap();
        let PipelineOutcome::Completed {
            verdict,
            masked_entities,
            mapping,
            assistant,
            state,
        } = outcome
        else {
            panic!("expected completed run");
        };

        assert_eq!(verdict.label, VerdictLabel::Safe);
        assert_eq!(masked_entities, 1);
        assert_eq!(mapping.get("[USER_1]"), Some("jane@example.com"));
        assert_eq!(assistant, "Sure, I'll contact jane@example.com.");
        for stage in [Stage::Scrubber, Stage::Generate, Stage::Rehydrate] {
            assert_eq!(state.status(stage), StageStatus::Done);
        }
        assert_eq!(state.status(Stage::Shield), StageStatus::Passed);

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), ["Email me at [USER_1]"]);
    }

    #[tokio::test]
    async fn test_blocked_run_stops_at_shield() {
        let generator = Arc::new(CapturingGenerator {
            seen: Mutex::new(Vec::new()),
            reply: String::new(),
        });
        let pipeline = orchestrator(generator.clone());

        let outcome = pipeline.run("What is my SSN 123-45-6789").await.unwrap();
        let PipelineOutcome::Blocked { verdict, state } = outcome else {
            panic!("expected blocked run");
        };
        assert_eq!(verdict.label, VerdictLabel::Unsafe);
        assert!(verdict
            .reason
            .as_deref()
            .unwrap()
            .contains("Sensitive identifier"));
        assert_eq!(state.status(Stage::Shield), StageStatus::Blocked);
        assert_eq!(state.status(Stage::Scrubber), StageStatus::Pending);
        assert_eq!(state.status(Stage::Generate), StageStatus::Pending);
        assert!(generator.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_password_always_blocked() {
        let pipeline = orchestrator(Arc::new(EchoGenerator::new()));
        let outcome = pipeline
            .run("Hi there, my password is 1234, can you remember it?")
            .await
            .unwrap();
        assert!(matches!(outcome, PipelineOutcome::Blocked { .. }));
    }

    #[tokio::test]
    async fn test_empty_message_rejected_before_stages() {
        let pipeline = orchestrator(Arc::new(EchoGenerator::new()));
        let failure = pipeline.run("   \n\t").await.unwrap_err();
        assert!(matches!(failure.error, SentinelError::Validation(_)));
        for stage in Stage::ALL {
            assert_eq!(failure.state.status(stage), StageStatus::Pending);
        }
    }

    #[tokio::test]
    async fn test_classifier_error_fails_closed() {
        let generator = Arc::new(CapturingGenerator {
            seen: Mutex::new(Vec::new()),
            reply: String::new(),
        });
        let pipeline = PipelineOrchestrator::new(
            Arc::new(BrokenClassifier),
            scrubber(),
            generator.clone(),
            Duration::from_secs(12),
        );

        let failure = pipeline.run("hello").await.unwrap_err();
        assert!(failure.error.is_upstream());
        assert_eq!(failure.state.status(Stage::Shield), StageStatus::Failed);
        let verdict = failure.verdict.unwrap();
        assert_eq!(verdict.label, VerdictLabel::Unsafe);
        assert_eq!(verdict.score, 1.0);
        assert!(generator.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scrubber_error_never_forwards() {
        let generator = Arc::new(CapturingGenerator {
            seen: Mutex::new(Vec::new()),
            reply: String::new(),
        });
        let bogus = Scrubber::with_detector(Arc::new(BogusDetector), &ScrubberConfig::default());
        let pipeline =
            PipelineOrchestrator::new(classifier(), bogus, generator.clone(), Duration::from_secs(12));

        let failure = pipeline.run("Email me at jane@example.com").await.unwrap_err();
        assert!(matches!(failure.error, SentinelError::Scrub(_)));
        assert_eq!(failure.state.status(Stage::Scrubber), StageStatus::Failed);
        assert_eq!(failure.state.status(Stage::Generate), StageStatus::Pending);
        assert!(generator.seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_timeout() {
        let pipeline = PipelineOrchestrator::new(
            classifier(),
            scrubber(),
            Arc::new(SlowGenerator),
            Duration::from_secs(12),
        );
        let failure = pipeline.run("hello there").await.unwrap_err();
        assert!(matches!(failure.error, SentinelError::Timeout(_)));
        assert_eq!(failure.state.status(Stage::Generate), StageStatus::Failed);
        assert_eq!(failure.state.status(Stage::Rehydrate), StageStatus::Pending);
    }

    #[tokio::test]
    async fn test_generate_error() {
        let pipeline = orchestrator(Arc::new(FailingGenerator));
        let failure = pipeline.run("hello there").await.unwrap_err();
        assert!(matches!(failure.error, SentinelError::Upstream(_)));
        assert_eq!(failure.state.status(Stage::Generate), StageStatus::Failed);
        assert_eq!(failure.error.public_message(), "Upstream model request failed");
    }
}
