// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Privacy middleware for language model traffic
//
// Requests pass through four stages in a fixed order:
// Shield (safety gate) -> Scrubber (reversible tokenization) ->
// Generate (external model, scrubbed text only) -> Rehydrate.

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod scrubber;
pub mod server;
pub mod shield;

pub use config::SentinelConfig;
pub use error::{Result, SentinelError};
pub use pipeline::{PipelineFailure, PipelineOrchestrator, PipelineOutcome, PipelineState};
pub use scrubber::{rehydrate, Mapping, ScrubResult, Scrubber};
pub use shield::{RuleClassifier, SecurityClassifier, Verdict, VerdictLabel};
