//! API Routes
//!
//! Configures the Axum router for the admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_cache_handler, clear_responses_handler, forget_handler, health_handler,
    lookup_handler, memory_handler, remaining_handler, reset_all_handler, reset_subject_handler,
    stats_handler,
};
use crate::state::AppState;

/// Creates the admin router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `GET /stats` - Cache, limiter and memory statistics
/// - `DELETE /cache` - Clear the facility cache
/// - `DELETE /responses` - Clear the fallback reply cache
/// - `POST /responses/lookup` - Look up a cached fallback reply
/// - `GET /limits/:subject` - Remaining requests for a subject
/// - `DELETE /limits/:subject` - Reset one subject
/// - `DELETE /limits` - Reset every subject
/// - `GET /memory/:user` - Unexpired conversation context
/// - `DELETE /memory/:user` - Forget a user
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/responses", delete(clear_responses_handler))
        .route("/responses/lookup", post(lookup_handler))
        .route("/limits", delete(reset_all_handler))
        .route(
            "/limits/:subject",
            get(remaining_handler).delete(reset_subject_handler),
        )
        .route("/memory/:user", get(memory_handler).delete(forget_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_router_health_endpoint() {
        let state = AppState::with_system_clock(&Config::default()).unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_router_unknown_route() {
        let state = AppState::with_system_clock(&Config::default()).unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/get/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
