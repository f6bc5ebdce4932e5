// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// HTTP handlers
//
// - POST /anonymize    scrub only
// - POST /deanonymize  rehydrate only
// - POST /api/chat     full pipeline
// - GET  /health

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::error::SentinelError;
use crate::pipeline::{PipelineFailure, PipelineOutcome, PipelineState};
use crate::scrubber::{rehydrate, Mapping};
use crate::shield::VerdictLabel;

const MISSING_MESSAGE: &str = "Missing message";

// =============================================================================
// Request / Response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AnonymizeRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AnonymizeResponse {
    pub clean_text: String,
    pub mapping: Mapping,
    pub masked_entities: usize,
}

#[derive(Debug, Deserialize)]
pub struct DeanonymizeRequest {
    #[serde(alias = "ai_response")]
    pub text: String,
    #[serde(default)]
    pub mapping: Mapping,
}

#[derive(Debug, Serialize)]
pub struct DeanonymizeResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Alert {
    pub title: String,
    pub description: String,
}

/// Body of every `/api/chat` response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerdictLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
    #[serde(rename = "maskedEntities", skip_serializing_if = "Option::is_none")]
    pub masked_entities: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<Mapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant: Option<String>,
    #[serde(rename = "latencyMs", skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages: Option<PipelineState>,
}

impl ChatResponse {
    fn new(ok: bool) -> Self {
        Self {
            ok,
            verdict: None,
            security_score: None,
            error: None,
            alert: None,
            masked_entities: None,
            mapping: None,
            assistant: None,
            latency_ms: None,
            stages: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(false)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// =============================================================================
// Error mapping
// =============================================================================

impl SentinelError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SentinelError::Validation(_) => StatusCode::BAD_REQUEST,
            SentinelError::PolicyBlocked { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SentinelError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(ChatResponse::error(self.public_message()))).into_response()
    }
}

fn bad_request(rejection: JsonRejection) -> SentinelError {
    tracing::debug!(error = %rejection, "Rejected request body");
    SentinelError::Validation(format!("Invalid request body: {}", rejection.body_text()))
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /anonymize - scrub text and return the clean text plus mapping
pub async fn anonymize(
    State(state): State<AppState>,
    body: Result<Json<AnonymizeRequest>, JsonRejection>,
) -> Result<Json<AnonymizeResponse>, SentinelError> {
    let Json(request) = body.map_err(bad_request)?;
    let result = state.scrubber().scrub(&request.text)?;
    Ok(Json(AnonymizeResponse {
        clean_text: result.clean_text,
        masked_entities: result.masked_entities_count,
        mapping: result.mapping,
    }))
}

/// POST /deanonymize - restore tokens using a caller-supplied mapping
pub async fn deanonymize(
    body: Result<Json<DeanonymizeRequest>, JsonRejection>,
) -> Result<Json<DeanonymizeResponse>, SentinelError> {
    let Json(request) = body.map_err(bad_request)?;
    let text = rehydrate(&request.text, &request.mapping).into_owned();
    Ok(Json(DeanonymizeResponse { text }))
}

/// POST /api/chat - run the full pipeline
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let message = match body {
        Ok(Json(ChatRequest {
            message: Some(message),
        })) if !message.trim().is_empty() => message,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ChatResponse::error(MISSING_MESSAGE)),
            )
                .into_response()
        }
    };

    match state.pipeline.run(&message).await {
        Ok(outcome) => outcome_response(outcome),
        Err(failure) => failure_response(failure),
    }
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn outcome_response(outcome: PipelineOutcome) -> Response {
    match outcome {
        PipelineOutcome::Blocked { verdict, state } => {
            let blocked = SentinelError::PolicyBlocked {
                reason: verdict
                    .reason
                    .clone()
                    .unwrap_or_else(|| "Request blocked by policy".to_string()),
            };
            let body = ChatResponse {
                verdict: Some(verdict.label),
                security_score: Some(verdict.score),
                alert: Some(Alert {
                    title: verdict.title().to_string(),
                    description: blocked.public_message(),
                }),
                latency_ms: Some(state.latency_ms()),
                stages: Some(state),
                ..ChatResponse::new(false)
            };
            (blocked.status_code(), Json(body)).into_response()
        }
        PipelineOutcome::Completed {
            verdict,
            masked_entities,
            mapping,
            assistant,
            state,
        } => {
            let body = ChatResponse {
                verdict: Some(verdict.label),
                security_score: Some(verdict.score),
                masked_entities: Some(masked_entities),
                mapping: Some(mapping),
                assistant: Some(assistant),
                latency_ms: Some(state.latency_ms()),
                stages: Some(state),
                ..ChatResponse::new(true)
            };
            (StatusCode::OK, Json(body)).into_response()
        }
    }
}

fn failure_response(failure: PipelineFailure) -> Response {
    let PipelineFailure { error, state, .. } = failure;
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(request_id = %state.request_id(), error = %error, "Pipeline failed");
    }
    let body = ChatResponse {
        latency_ms: Some(state.latency_ms()),
        stages: Some(state),
        ..ChatResponse::error(error.public_message())
    };
    (status, Json(body)).into_response()
}
