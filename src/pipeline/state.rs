// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Per-request stage bookkeeping

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Shield,
    Scrubber,
    Generate,
    Rehydrate,
}

impl Stage {
    /// Execution order
    pub const ALL: [Stage; 4] = [
        Stage::Shield,
        Stage::Scrubber,
        Stage::Generate,
        Stage::Rehydrate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Shield => "shield",
            Stage::Scrubber => "scrubber",
            Stage::Generate => "generate",
            Stage::Rehydrate => "rehydrate",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    /// Shield only: classified SAFE
    Passed,
    /// Shield only: classified UNSAFE, terminal
    Blocked,
    Done,
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Passed => "passed",
            StageStatus::Blocked => "blocked",
            StageStatus::Done => "done",
            StageStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageStatus::Passed | StageStatus::Blocked | StageStatus::Done | StageStatus::Failed
        )
    }

    /// Legal moves for `stage`. Pending may only start; Running may only
    /// settle, and only the Shield settles as Passed or Blocked.
    pub fn can_transition_to(&self, stage: Stage, next: StageStatus) -> bool {
        match (self, next) {
            (StageStatus::Pending, StageStatus::Running) => true,
            (StageStatus::Running, StageStatus::Failed) => true,
            (StageStatus::Running, StageStatus::Passed | StageStatus::Blocked) => {
                stage == Stage::Shield
            }
            (StageStatus::Running, StageStatus::Done) => stage != Stage::Shield,
            _ => false,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
struct StageRecord {
    status: StageStatus,
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

impl Default for StageRecord {
    fn default() -> Self {
        Self {
            status: StageStatus::Pending,
            started: None,
            elapsed: None,
        }
    }
}

/// Status of every stage for one in-flight request.
///
/// Created at pipeline entry, owned by that request and returned with its
/// result. Serializes as `{shield, scrubber, generate, rehydrate}`.
#[derive(Debug, Clone)]
pub struct PipelineState {
    request_id: Uuid,
    started: Instant,
    stages: [StageRecord; 4],
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started: Instant::now(),
            stages: [StageRecord::default(); 4],
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.stages[stage.index()].status
    }

    /// Time spent in `stage`, once it has settled
    pub fn stage_elapsed(&self, stage: Stage) -> Option<Duration> {
        self.stages[stage.index()].elapsed
    }

    /// Time since pipeline entry
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn latency_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn start(&mut self, stage: Stage) {
        self.transition(stage, StageStatus::Running);
    }

    pub fn finish(&mut self, stage: Stage, status: StageStatus) {
        self.transition(stage, status);
    }

    fn transition(&mut self, stage: Stage, next: StageStatus) {
        let record = &mut self.stages[stage.index()];
        // Orchestrator drives stages in order, so an illegal move is a bug
        debug_assert!(
            record.status.can_transition_to(stage, next),
            "illegal transition for {stage}: {} -> {next}",
            record.status
        );
        let now = Instant::now();
        match next {
            StageStatus::Running => record.started = Some(now),
            _ => record.elapsed = record.started.map(|s| now.duration_since(s)),
        }
        record.status = next;
        tracing::trace!(
            request_id = %self.request_id,
            stage = stage.as_str(),
            status = next.as_str(),
            "Stage transition"
        );
    }
}

impl Serialize for PipelineState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Stage::ALL.len()))?;
        for stage in Stage::ALL {
            map.serialize_entry(stage.as_str(), &self.status(stage))?;
        }
        map.end()
    }
}
