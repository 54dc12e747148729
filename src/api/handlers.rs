//! API Handlers
//!
//! HTTP handlers for inspecting and resetting the caching layer.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::models::{
    HealthResponse, LimiterStatsResponse, LookupRequest, LookupResponse, MemoryResponse,
    MemoryStatsResponse, MessageResponse, RemainingResponse, StatsResponse,
};
use crate::state::AppState;

/// Handler for GET /stats
///
/// Reports counters for both caches plus limiter and memory occupancy.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        facility_cache: state.facility_cache.stats().into(),
        response_cache: state.responses.stats().into(),
        rate_limiter: LimiterStatsResponse {
            tracked_subjects: state.limiter.tracked_subjects(),
            max_requests: state.limiter.max_requests(),
            window_secs: state.limiter.window_secs(),
        },
        memory: MemoryStatsResponse {
            users: state.memory.user_count(),
            ttl_secs: state.memory.ttl_secs(),
        },
    })
}

/// Handler for DELETE /cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.facility_cache.clear();
    Json(MessageResponse::new("Facility cache cleared"))
}

/// Handler for DELETE /responses
pub async fn clear_responses_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.responses.clear();
    Json(MessageResponse::new("Response cache cleared"))
}

/// Handler for POST /responses/lookup
///
/// Returns the cached fallback reply for a message without calling out.
pub async fn lookup_handler(
    State(state): State<AppState>,
    Json(req): Json<LookupRequest>,
) -> Result<Json<LookupResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(Error::InvalidRequest(error_msg));
    }
    let language = req.language()?;

    let value = state
        .responses
        .get(&req.message, language)
        .ok_or_else(|| Error::NotFound(format!("No cached reply for message in {}", language)))?;

    Ok(Json(LookupResponse { language, value }))
}

/// Handler for GET /limits/:subject
///
/// Read-only; checking never consumes a request.
pub async fn remaining_handler(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Json<RemainingResponse> {
    let remaining = state.limiter.remaining(&subject);
    Json(RemainingResponse {
        subject,
        remaining,
        limit: state.limiter.max_requests(),
    })
}

/// Handler for DELETE /limits/:subject
pub async fn reset_subject_handler(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Json<MessageResponse> {
    state.limiter.reset(Some(&subject));
    Json(MessageResponse::new(format!(
        "Rate limit reset for '{}'",
        subject
    )))
}

/// Handler for DELETE /limits
pub async fn reset_all_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.limiter.reset(None);
    Json(MessageResponse::new("Rate limits reset for all subjects"))
}

/// Handler for GET /memory/:user
///
/// Returns the user's unexpired context, or 404 if nothing is remembered.
pub async fn memory_handler(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<MemoryResponse>> {
    let context = state.memory.user_context(&user);
    if context.is_empty() {
        return Err(Error::NotFound(format!("No memory for user '{}'", user)));
    }
    Ok(Json(MemoryResponse { user, context }))
}

/// Handler for DELETE /memory/:user
pub async fn forget_handler(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Json<MessageResponse> {
    state.memory.forget(&user, None);
    Json(MessageResponse::new(format!("Forgot all memories for '{}'", user)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
