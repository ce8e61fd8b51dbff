//! Tournament lifecycle and result processing.
//!
//! [`TournamentLifecycleManager`] takes a tournament from creation through
//! team registration and seeding to a generated, persisted bracket.
//! [`MatchResultProcessor`] records results and advances winners until the
//! final is played.
//!
//! ## Example
//!
//! ```
//! use league_brackets::bracket::BracketFormat;
//! use league_brackets::db::MemoryBracketRepository;
//! use league_brackets::tournament::{
//!     LogEventSink, MatchResultProcessor, NewTournament, ResultSubmission,
//!     TournamentLifecycleManager,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repository = Arc::new(MemoryBracketRepository::new());
//!     let events = Arc::new(LogEventSink);
//!     let lifecycle = TournamentLifecycleManager::new(repository.clone(), events.clone());
//!     let results = MatchResultProcessor::new(repository, events);
//!
//!     let tournament = lifecycle
//!         .create_tournament(NewTournament::new("Spring Cup", BracketFormat::SingleElimination))
//!         .await?;
//!     lifecycle.add_team(tournament.id, "lions").await?;
//!     lifecycle.add_team(tournament.id, "tigers").await?;
//!
//!     let bracket = lifecycle.start(tournament.id).await?;
//!     let outcome = results
//!         .record_result(tournament.id, bracket.matches[0].id, ResultSubmission::new(3, 1))
//!         .await?;
//!     assert!(outcome.tournament_complete);
//!     Ok(())
//! }
//! ```

mod advancement;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod results;

pub use errors::{BracketError, BracketResult, ErrorKind};
pub use events::{BracketEvent, EventSink, LogEventSink, MemoryEventSink};
pub use lifecycle::TournamentLifecycleManager;
pub use models::{
    MatchId, MatchResultOutcome, MatchStatus, NewMatch, NewRound, NewTeam, NewTournament,
    PersistedBracket, Placement, ResultSubmission, RoundId, SeedAssignment, TeamId, Tournament,
    TournamentId, TournamentMatch, TournamentRound, TournamentStatus, TournamentTeam,
};
pub use results::{MatchResultProcessor, validate_scores};
