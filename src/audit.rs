// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Audit trail for pipeline runs. Counts and kinds only, never values.

use crate::pipeline::PipelineState;
use crate::scrubber::Mapping;
use crate::shield::Verdict;

/// Tracing target for audit events
pub const AUDIT_TARGET: &str = "sentinel::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Blocked,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Blocked => "blocked",
            Outcome::Failed => "failed",
        }
    }
}

/// Emit one audit event for a finished run
pub fn record(
    state: &PipelineState,
    outcome: Outcome,
    verdict: Option<&Verdict>,
    mapping: Option<&Mapping>,
) {
    let label = verdict.map(|v| v.label.as_str()).unwrap_or("NONE");
    let score = verdict.map(|v| v.score).unwrap_or(0.0);
    let category = verdict
        .and_then(|v| v.category)
        .map(|c| c.as_str())
        .unwrap_or("none");
    let masked_entities = mapping.map(Mapping::len).unwrap_or(0);
    let entity_kinds = mapping.map(Mapping::kind_counts).unwrap_or_default();

    tracing::info!(
        target: AUDIT_TARGET,
        request_id = %state.request_id(),
        outcome = outcome.as_str(),
        verdict = label,
        score,
        category,
        masked_entities,
        entity_kinds = ?entity_kinds,
        latency_ms = state.latency_ms(),
        stages = %serde_json::to_string(state).unwrap_or_default(),
        "Pipeline finished"
    );
}
