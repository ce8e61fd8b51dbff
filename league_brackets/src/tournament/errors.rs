//! Tournament error types.

use super::models::{MatchId, TournamentId, TournamentStatus};
use crate::bracket::{GeneratorError, ParseEnumError, Slot};
use crate::db::timeouts::TimeoutError;
use thiserror::Error;

/// Coarse error category, used for status mapping by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input
    Validation,
    /// Operation not allowed in the current lifecycle state
    State,
    NotFound,
    /// Lost a race or hit a uniqueness rule
    Conflict,
    Internal,
}

/// Bracket engine errors
#[derive(Debug, Error)]
pub enum BracketError {
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Team {team_ref} is not registered in tournament {tournament_id}")]
    TeamNotFound {
        tournament_id: TournamentId,
        team_ref: String,
    },

    #[error("Match {match_id} does not belong to tournament {tournament_id}")]
    WrongTournament {
        match_id: MatchId,
        tournament_id: TournamentId,
    },

    #[error("Invalid score: {0}")]
    InvalidScore(i32),

    #[error("Tied result {0}-{0} is not allowed")]
    TieNotAllowed(i32),

    #[error("Match {0} already has a result")]
    AlreadyComplete(MatchId),

    #[error("Match {0} is not scheduled yet")]
    NotScheduled(MatchId),

    #[error("Tournament not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    #[error("Team already registered: {0}")]
    TeamAlreadyRegistered(String),

    #[error("Invalid team reference: {0:?}")]
    InvalidTeamRef(String),

    #[error("Tournament is full")]
    TournamentFull,

    #[error("Insufficient teams: need {needed}, have {current}")]
    InsufficientTeams { needed: usize, current: usize },

    #[error("Invalid seeding: {0}")]
    InvalidSeeding(String),

    #[error("Seed {0} assigned more than once")]
    SeedConflict(u32),

    #[error("Invalid tournament configuration: {0}")]
    InvalidConfig(String),

    #[error("Tournament {0} was started concurrently")]
    StartConflict(TournamentId),

    #[error("Slot {slot:?} of match {match_id} is already filled")]
    SlotOccupied { match_id: MatchId, slot: Slot },

    #[error("Bracket generation failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Stored value is invalid: {0}")]
    InvalidStoredValue(#[from] ParseEnumError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Timeout(#[from] TimeoutError),
}

impl BracketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::InvalidScore(_)
            | BracketError::TieNotAllowed(_)
            | BracketError::InvalidTeamRef(_)
            | BracketError::InvalidSeeding(_)
            | BracketError::InvalidConfig(_)
            | BracketError::Generator(_) => ErrorKind::Validation,
            BracketError::AlreadyComplete(_)
            | BracketError::NotScheduled(_)
            | BracketError::InvalidState { .. }
            | BracketError::TournamentFull
            | BracketError::InsufficientTeams { .. } => ErrorKind::State,
            BracketError::TournamentNotFound(_)
            | BracketError::MatchNotFound(_)
            | BracketError::TeamNotFound { .. }
            | BracketError::WrongTournament { .. } => ErrorKind::NotFound,
            BracketError::TeamAlreadyRegistered(_)
            | BracketError::SeedConflict(_)
            | BracketError::StartConflict(_)
            | BracketError::SlotOccupied { .. } => ErrorKind::Conflict,
            BracketError::InvalidStoredValue(_)
            | BracketError::Database(_)
            | BracketError::Timeout(_) => ErrorKind::Internal,
        }
    }

    /// Stable reason code for API clients
    pub fn code(&self) -> &'static str {
        match self {
            BracketError::TournamentNotFound(_)
            | BracketError::MatchNotFound(_)
            | BracketError::TeamNotFound { .. } => "NOT_FOUND",
            BracketError::WrongTournament { .. } => "WRONG_TOURNAMENT",
            BracketError::InvalidScore(_) => "INVALID_SCORE",
            BracketError::TieNotAllowed(_) => "TIE_NOT_ALLOWED",
            BracketError::AlreadyComplete(_) => "ALREADY_COMPLETE",
            BracketError::NotScheduled(_) => "NOT_SCHEDULED",
            BracketError::InvalidState { .. } => "INVALID_STATE",
            BracketError::TeamAlreadyRegistered(_) => "TEAM_ALREADY_REGISTERED",
            BracketError::InvalidTeamRef(_) => "INVALID_TEAM_REF",
            BracketError::TournamentFull => "TOURNAMENT_FULL",
            BracketError::InsufficientTeams { .. } => "INSUFFICIENT_TEAMS",
            BracketError::InvalidSeeding(_) => "INVALID_SEEDING",
            BracketError::SeedConflict(_) => "SEED_CONFLICT",
            BracketError::InvalidConfig(_) | BracketError::Generator(_) => "INVALID_CONFIG",
            BracketError::StartConflict(_) => "START_CONFLICT",
            BracketError::SlotOccupied { .. } => "SLOT_OCCUPIED",
            BracketError::InvalidStoredValue(_)
            | BracketError::Database(_)
            | BracketError::Timeout(_) => "INTERNAL",
        }
    }

    /// Get a client-safe error message
    ///
    /// Storage errors are replaced by a generic message so SQL details and
    /// connection strings never reach API responses.
    pub fn client_message(&self) -> String {
        match self {
            BracketError::InvalidStoredValue(_)
            | BracketError::Database(_)
            | BracketError::Timeout(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket engine operations
pub type BracketResult<T> = Result<T, BracketError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_codes_for_result_errors() {
        assert_eq!(BracketError::InvalidScore(-1).code(), "INVALID_SCORE");
        assert_eq!(BracketError::TieNotAllowed(2).code(), "TIE_NOT_ALLOWED");
        assert_eq!(BracketError::AlreadyComplete(4).code(), "ALREADY_COMPLETE");
        assert_eq!(BracketError::NotScheduled(4).code(), "NOT_SCHEDULED");
        assert_eq!(BracketError::MatchNotFound(4).code(), "NOT_FOUND");
        assert_eq!(
            BracketError::WrongTournament {
                match_id: 4,
                tournament_id: 1
            }
            .code(),
            "WRONG_TOURNAMENT"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(BracketError::TieNotAllowed(1).kind(), ErrorKind::Validation);
        assert_eq!(BracketError::NotScheduled(1).kind(), ErrorKind::State);
        assert_eq!(BracketError::TournamentNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(BracketError::StartConflict(1).kind(), ErrorKind::Conflict);
        assert_eq!(
            BracketError::Generator(GeneratorError::TooFewEntrants(1)).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_client_message_hides_storage_details() {
        let err = BracketError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.client_message(), "Internal server error");
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err = BracketError::Timeout(TimeoutError::Timeout(Duration::from_secs(5)));
        assert_eq!(err.client_message(), "Internal server error");

        let err = BracketError::TieNotAllowed(3);
        assert_eq!(err.client_message(), "Tied result 3-3 is not allowed");
    }
}
