//! HTTP API for the bracket engine.
//!
//! # Endpoints
//!
//! ```text
//! GET    /health                                          - Health check
//! POST   /api/v1/brackets/preview                         - Generate without storing
//! POST   /api/v1/tournaments                              - Create tournament
//! GET    /api/v1/tournaments/{id}                         - Get tournament
//! POST   /api/v1/tournaments/{id}/cancel                  - Cancel tournament
//! GET    /api/v1/tournaments/{id}/teams                   - List teams by seed
//! POST   /api/v1/tournaments/{id}/teams                   - Register team
//! DELETE /api/v1/tournaments/{id}/teams/{team_ref}        - Unregister team
//! PUT    /api/v1/tournaments/{id}/seeds                   - Reseed
//! POST   /api/v1/tournaments/{id}/start                   - Generate and start
//! GET    /api/v1/tournaments/{id}/bracket                 - Stored bracket
//! POST   /api/v1/tournaments/{id}/matches/{match_id}/result - Record result
//! ```
//!
//! Errors are returned as `{"error": "...", "code": "..."}` with 400 for
//! invalid input, 404 for unknown ids, 409 for lifecycle and uniqueness
//! conflicts and 500 for storage failures.

pub mod brackets;
pub mod error;
pub mod matches;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
};
use league_brackets::db::Database;
use league_brackets::tournament::{MatchResultProcessor, TournamentLifecycleManager};
use serde_json::json;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: TournamentLifecycleManager,
    pub results: MatchResultProcessor,
    /// Present when tournaments are stored in PostgreSQL
    pub database: Option<Database>,
}

/// Create the complete API router with all endpoints and middleware
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/brackets/preview", post(brackets::preview_bracket))
        .route("/tournaments", post(tournaments::create_tournament))
        .route("/tournaments/{id}", get(tournaments::get_tournament))
        .route("/tournaments/{id}/cancel", post(tournaments::cancel_tournament))
        .route(
            "/tournaments/{id}/teams",
            get(tournaments::list_teams).post(tournaments::add_team),
        )
        .route(
            "/tournaments/{id}/teams/{team_ref}",
            delete(tournaments::remove_team),
        )
        .route("/tournaments/{id}/seeds", put(tournaments::reseed))
        .route("/tournaments/{id}/start", post(tournaments::start_tournament))
        .route("/tournaments/{id}/bracket", get(tournaments::get_bracket))
        .route(
            "/tournaments/{id}/matches/{match_id}/result",
            post(matches::record_result),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check; reports 503 when the database does not answer
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, storage) = match &state.database {
        None => (StatusCode::OK, "memory"),
        Some(db) => match db.health_check().await {
            Ok(()) => (StatusCode::OK, "postgres"),
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                (StatusCode::SERVICE_UNAVAILABLE, "postgres")
            }
        },
    };

    let body = json!({
        "status": if status == StatusCode::OK { "healthy" } else { "degraded" },
        "storage": storage,
        "version": env!("CARGO_PKG_VERSION"),
    });
    (status, Json(body))
}
