//! HTTP routes and handlers.
//!
//! The router owns an [`AppState`] holding the registry (constructed at
//! startup and injected; there is no global), the metrics handle and the
//! start time for the health endpoint. Handlers translate between the
//! wire shapes and the engine's surface; every data-driven anomaly comes
//! back as an [`ApiError`] with the proper status code.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rockettrack_core::{
    ChannelDiagnostics, IngestOutcome, RocketRegistry, RocketState, RocketSummary,
};

use crate::error::ApiError;
use crate::metrics::SharedMetricsRegistry;
use crate::sort::{self, SortField, SortOrder};
use crate::wire::WireMessage;

/// Outcome label for requests that never reached the engine.
const OUTCOME_INVALID: &str = "invalid";

/// Minimum accepted rocket id length; real ids are UUID-like.
const MIN_ROCKET_ID_LEN: usize = 3;

/// Shared state behind every handler.
pub struct AppState {
    registry: RocketRegistry,
    metrics: SharedMetricsRegistry,
    started_at: DateTime<Utc>,
}

impl AppState {
    /// Creates the handler state around a registry and metrics handle.
    #[must_use]
    pub fn new(registry: RocketRegistry, metrics: SharedMetricsRegistry) -> Self {
        Self {
            registry,
            metrics,
            started_at: Utc::now(),
        }
    }

    /// The rocket registry.
    #[must_use]
    pub const fn registry(&self) -> &RocketRegistry {
        &self.registry
    }
}

/// Builds the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/messages", post(ingest_message))
        .route("/rockets", get(list_rockets))
        .route("/rockets/{id}", get(get_rocket))
        .route("/debug/rockets", get(debug_all))
        .route("/debug/rockets/{id}", get(debug_rocket))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Response for a processed message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageAccepted {
    status: &'static str,
    outcome: &'static str,
    rocket_id: String,
    message_number: u64,
}

/// Query parameters of the list endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    sort_by: Option<String>,
    sort_order: Option<String>,
}

/// Debug information for one channel.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugInfo {
    rocket_id: String,
    processed_message_count: usize,
    pending_message_count: usize,
    pending_message_numbers: Vec<u64>,
    last_processed_message: u64,
}

impl From<ChannelDiagnostics> for DebugInfo {
    fn from(diag: ChannelDiagnostics) -> Self {
        Self {
            rocket_id: diag.channel,
            processed_message_count: diag.processed_count,
            pending_message_count: diag.pending_numbers.len(),
            pending_message_numbers: diag.pending_numbers,
            last_processed_message: diag.last_applied,
        }
    }
}

/// One entry of the all-channels debug listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChannelCursorInfo {
    rocket_id: String,
    last_processed_message: u64,
}

/// Health endpoint body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    uptime_secs: u64,
    rockets_tracked: usize,
}

/// `POST /messages`: ingest one state-change message.
///
/// 1. Decode and validate the wire envelope (400 on failure).
/// 2. Hand it to the engine.
/// 3. Map an engine reject to 422; everything accepted is 200, including
///    duplicates and buffered out-of-order messages.
async fn ingest_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WireMessage>, JsonRejection>,
) -> Result<Json<MessageAccepted>, ApiError> {
    let Json(wire) = payload.map_err(|rejection| {
        state.metrics.ingest().message(OUTCOME_INVALID);
        ApiError::Validation {
            field: "body".to_string(),
            message: rejection.body_text(),
        }
    })?;

    let envelope = wire.into_envelope().map_err(|err| {
        state.metrics.ingest().message(OUTCOME_INVALID);
        tracing::debug!(field = err.field(), %err, "wire message failed validation");
        ApiError::from(err)
    })?;

    let channel = envelope.channel.clone();
    let message_number = envelope.message_number;
    let kind = envelope.kind();

    let outcome = state.registry.ingest(envelope);
    state.metrics.ingest().message(outcome.as_str());
    state
        .metrics
        .ingest()
        .set_rockets_tracked(state.registry.rocket_count());

    tracing::info!(
        channel = %channel,
        message_number,
        kind = %kind,
        outcome = outcome.as_str(),
        "message ingested"
    );

    match outcome {
        IngestOutcome::Rejected(reason) => Err(ApiError::Reject {
            channel,
            message_number,
            kind,
            reason,
        }),
        outcome => Ok(Json(MessageAccepted {
            status: "success",
            outcome: outcome.as_str(),
            rocket_id: channel,
            message_number,
        })),
    }
}

/// `GET /rockets/{id}`: one rocket's full state.
async fn get_rocket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RocketState>, ApiError> {
    validate_rocket_id(&id)?;
    state
        .registry
        .get(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(id))
}

/// `GET /rockets`: all rockets, sorted as requested.
async fn list_rockets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<RocketSummary>>, ApiError> {
    let field = match params.sort_by.filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse::<SortField>().map_err(|err| ApiError::Validation {
            field: "sortBy".to_string(),
            message: err.to_string(),
        })?,
        None => SortField::default(),
    };
    let order = match params.sort_order.filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse::<SortOrder>().map_err(|err| ApiError::Validation {
            field: "sortOrder".to_string(),
            message: err.to_string(),
        })?,
        None => SortOrder::default(),
    };

    let summaries = sort::sort_summaries(state.registry.summaries(), field, order);
    Ok(Json(summaries))
}

/// `GET /debug/rockets`: cursor positions of every known channel.
async fn debug_all(State(state): State<Arc<AppState>>) -> Json<Vec<ChannelCursorInfo>> {
    let cursors = state
        .registry
        .cursors()
        .into_iter()
        .map(|cursor| ChannelCursorInfo {
            rocket_id: cursor.channel,
            last_processed_message: cursor.last_applied,
        })
        .collect();
    Json(cursors)
}

/// `GET /debug/rockets/{id}`: reconciliation diagnostics for one
/// channel. Unknown channels report empty counters rather than 404 so a
/// stuck producer can always be inspected.
async fn debug_rocket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DebugInfo>, ApiError> {
    validate_rocket_id(&id)?;
    Ok(Json(DebugInfo::from(state.registry.diagnostics(&id))))
}

/// `GET /healthz`: liveness and a couple of cheap gauges.
#[allow(clippy::cast_sign_loss)] // max(0) ensures non-negative
async fn healthz(State(state): State<Arc<AppState>>) -> Json<Health> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;
    Json(Health {
        status: "ok",
        uptime_secs,
        rockets_tracked: state.registry.rocket_count(),
    })
}

fn validate_rocket_id(id: &str) -> Result<(), ApiError> {
    if id.len() < MIN_ROCKET_ID_LEN {
        return Err(ApiError::Validation {
            field: "id".to_string(),
            message: format!("rocket id must be at least {MIN_ROCKET_ID_LEN} characters"),
        });
    }
    Ok(())
}
