//! Match result handler.

use super::AppState;
use super::error::{ApiResult, bracket_error};
use super::request_id::RequestId;
use super::tournaments::body;
use crate::metrics;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use league_brackets::tournament::{MatchId, MatchResultOutcome, ResultSubmission, TournamentId};

/// Record the result of a scheduled match
///
/// ```json
/// {"home_score": 3, "away_score": 1, "notes": "extra time"}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: negative score or tie
/// - `404 Not Found`: unknown tournament or match, or the match belongs to
///   another tournament
/// - `409 Conflict`: match already played or still waiting for a team
pub async fn record_result(
    State(state): State<AppState>,
    Path((tournament_id, match_id)): Path<(TournamentId, MatchId)>,
    request_id: RequestId,
    payload: Result<Json<ResultSubmission>, JsonRejection>,
) -> ApiResult<MatchResultOutcome> {
    let submission = body(payload)?;
    let outcome = state
        .results
        .record_result(tournament_id, match_id, submission)
        .await
        .map_err(bracket_error)?;

    metrics::match_results_total(outcome.completed_match.bracket.as_str());
    if outcome.tournament_complete {
        metrics::tournaments_completed_total();
        tracing::info!(
            request_id = request_id.as_str(),
            tournament_id = tournament_id,
            "Tournament finished"
        );
    }
    Ok(Json(outcome))
}
