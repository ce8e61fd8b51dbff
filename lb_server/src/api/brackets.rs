//! Bracket preview: run the generator without creating a tournament.

use super::error::{ApiResult, bracket_error, invalid_request};
use super::tournaments::body;
use crate::metrics;
use axum::{Json, extract::rejection::JsonRejection};
use league_brackets::bracket::{
    BracketFormat, BracketOptions, BracketStructure, EntrantId, generate_bracket,
};
use league_brackets::tournament::BracketError;
use serde::Deserialize;
use std::time::Instant;

/// Largest field a preview will generate
pub const MAX_PREVIEW_ENTRANTS: usize = 1024;

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    /// Entrants in seed order
    pub entrants: Vec<EntrantId>,
    pub format: BracketFormat,
    #[serde(default)]
    pub has_consolation_bracket: bool,
    #[serde(default)]
    pub random_byes: bool,
}

pub async fn preview_bracket(
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> ApiResult<BracketStructure> {
    let request = body(payload)?;
    if request.entrants.len() > MAX_PREVIEW_ENTRANTS {
        return Err(invalid_request(format!(
            "At most {MAX_PREVIEW_ENTRANTS} entrants can be previewed"
        )));
    }

    let options = BracketOptions {
        format: request.format,
        has_consolation_bracket: request.has_consolation_bracket,
        random_byes: request.random_byes,
    };

    let started = Instant::now();
    let structure = generate_bracket(&request.entrants, &options)
        .map_err(|e| bracket_error(BracketError::from(e)))?;
    metrics::bracket_generation_duration_ms(
        request.format.as_str(),
        started.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(Json(structure))
}
