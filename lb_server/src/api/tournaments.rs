//! Tournament lifecycle handlers.
//!
//! Create a tournament and register teams:
//! ```bash
//! curl -X POST http://localhost:7070/api/v1/tournaments \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Spring Cup", "format": "DOUBLE_ELIMINATION"}'
//!
//! curl -X POST http://localhost:7070/api/v1/tournaments/1/teams \
//!   -H "Content-Type: application/json" \
//!   -d '{"team_ref": "lions"}'
//! ```

use super::AppState;
use super::error::{ApiError, ApiResult, bracket_error, invalid_request};
use crate::{logging, metrics};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use league_brackets::tournament::{
    NewTournament, PersistedBracket, SeedAssignment, Tournament, TournamentId, TournamentTeam,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Deserialize)]
pub struct AddTeamRequest {
    pub team_ref: String,
}

#[derive(Debug, Deserialize)]
pub struct ReseedRequest {
    pub seeds: Vec<SeedAssignment>,
}

#[derive(Debug, Serialize)]
pub struct TeamListResponse {
    pub tournament_id: TournamentId,
    pub teams: Vec<TournamentTeam>,
}

/// Unwrap a JSON body, turning extractor rejections into the API error shape
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| invalid_request(rejection.body_text()))
}

/// Create a tournament in CREATED status
///
/// # Errors
///
/// - `400 Bad Request`: empty name, zero `max_teams`, or consolation on a
///   multi-elimination format
pub async fn create_tournament(
    State(state): State<AppState>,
    payload: Result<Json<NewTournament>, JsonRejection>,
) -> Result<(StatusCode, Json<Tournament>), ApiError> {
    let new = body(payload)?;
    let tournament = state
        .lifecycle
        .create_tournament(new)
        .await
        .map_err(bracket_error)?;

    metrics::tournaments_created_total(tournament.format.as_str());
    Ok((StatusCode::CREATED, Json(tournament)))
}

pub async fn get_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    state
        .lifecycle
        .get_tournament(id)
        .await
        .map(Json)
        .map_err(bracket_error)
}

pub async fn cancel_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Tournament> {
    state
        .lifecycle
        .cancel(id)
        .await
        .map(Json)
        .map_err(bracket_error)
}

pub async fn list_teams(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<TeamListResponse> {
    let teams = state.lifecycle.list_teams(id).await.map_err(bracket_error)?;
    Ok(Json(TeamListResponse {
        tournament_id: id,
        teams,
    }))
}

/// Register a team; it gets the next free seed
///
/// # Errors
///
/// - `409 Conflict`: already registered, tournament full or already started
pub async fn add_team(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
    payload: Result<Json<AddTeamRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TournamentTeam>), ApiError> {
    let request = body(payload)?;
    let team = state
        .lifecycle
        .add_team(id, &request.team_ref)
        .await
        .map_err(bracket_error)?;
    Ok((StatusCode::CREATED, Json(team)))
}

/// Unregister a team; returns the remaining teams with compacted seeds
pub async fn remove_team(
    State(state): State<AppState>,
    Path((id, team_ref)): Path<(TournamentId, String)>,
) -> ApiResult<TeamListResponse> {
    let teams = state
        .lifecycle
        .remove_team(id, &team_ref)
        .await
        .map_err(bracket_error)?;
    Ok(Json(TeamListResponse {
        tournament_id: id,
        teams,
    }))
}

/// Replace the seeding; the body must assign 1..N to every team
pub async fn reseed(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
    payload: Result<Json<ReseedRequest>, JsonRejection>,
) -> ApiResult<TeamListResponse> {
    let request = body(payload)?;
    let teams = state
        .lifecycle
        .reseed(id, &request.seeds)
        .await
        .map_err(bracket_error)?;
    Ok(Json(TeamListResponse {
        tournament_id: id,
        teams,
    }))
}

/// Generate the bracket and start the tournament
///
/// # Errors
///
/// - `409 Conflict`: not CREATED (`INVALID_STATE`), a concurrent start won
///   (`START_CONFLICT`), or fewer than two teams
pub async fn start_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<PersistedBracket> {
    let started = Instant::now();
    let bracket = state.lifecycle.start(id).await.map_err(bracket_error)?;
    let elapsed = started.elapsed();

    let format = bracket.tournament.format.as_str();
    metrics::tournaments_started_total(format);
    metrics::bracket_generation_duration_ms(format, elapsed.as_secs_f64() * 1000.0);
    logging::log_performance(
        "start_tournament",
        elapsed.as_millis() as u64,
        Some(&format!("{} teams", bracket.teams.len())),
    );
    Ok(Json(bracket))
}

pub async fn get_bracket(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<PersistedBracket> {
    state
        .lifecycle
        .get_bracket(id)
        .await
        .map(Json)
        .map_err(bracket_error)
}
