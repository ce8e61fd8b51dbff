//! Repository trait definitions.
//!
//! Every mutation in the engine happens inside a [`BracketTransaction`]
//! obtained from a [`BracketRepository`]. A transaction implements the typed
//! repository of each entity; nothing is visible to other transactions until
//! [`BracketTransaction::commit`], and dropping it rolls everything back.

use async_trait::async_trait;

use crate::tournament::{
    BracketResult, MatchId, NewMatch, NewRound, NewTeam, NewTournament, RoundId, TeamId,
    Tournament, TournamentId, TournamentMatch, TournamentRound, TournamentTeam,
};

/// Trait for tournament repository operations
#[async_trait]
pub trait TournamentRepository: Send {
    /// Insert a CREATED tournament
    async fn insert_tournament(&mut self, new: &NewTournament) -> BracketResult<Tournament>;

    /// Find tournament by ID
    async fn find_tournament(&mut self, id: TournamentId) -> BracketResult<Option<Tournament>>;

    /// Find tournament by ID and hold its row lock until the transaction ends
    async fn lock_tournament(&mut self, id: TournamentId) -> BracketResult<Option<Tournament>>;

    /// Write status, timestamps and results
    async fn update_tournament(&mut self, tournament: &Tournament) -> BracketResult<()>;
}

/// Trait for tournament team repository operations
#[async_trait]
pub trait TeamRepository: Send {
    async fn insert_team(&mut self, new: &NewTeam) -> BracketResult<TournamentTeam>;

    /// Teams of a tournament ordered by seed
    async fn list_teams(&mut self, tournament_id: TournamentId)
    -> BracketResult<Vec<TournamentTeam>>;

    async fn delete_team(&mut self, team_id: TeamId) -> BracketResult<()>;

    /// Rewrite seeds; uniqueness is checked at commit
    async fn update_seeds(&mut self, seeds: &[(TeamId, u32)]) -> BracketResult<()>;

    async fn set_final_placement(&mut self, team_id: TeamId, placement: u32)
    -> BracketResult<()>;
}

/// Trait for round repository operations
#[async_trait]
pub trait RoundRepository: Send {
    async fn insert_round(&mut self, new: &NewRound) -> BracketResult<TournamentRound>;

    /// Rounds ordered by bracket, then round number
    async fn list_rounds(
        &mut self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<TournamentRound>>;

    async fn find_round(&mut self, id: RoundId) -> BracketResult<Option<TournamentRound>>;

    async fn set_round_complete(&mut self, id: RoundId, is_complete: bool) -> BracketResult<()>;
}

/// Trait for match repository operations
#[async_trait]
pub trait MatchRepository: Send {
    async fn insert_match(&mut self, new: &NewMatch) -> BracketResult<TournamentMatch>;

    async fn find_match(&mut self, id: MatchId) -> BracketResult<Option<TournamentMatch>>;

    /// Matches of a tournament ordered by match number
    async fn list_matches(
        &mut self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<TournamentMatch>>;

    /// Matches of a round ordered by match number
    async fn list_round_matches(&mut self, round_id: RoundId)
    -> BracketResult<Vec<TournamentMatch>>;

    /// Write every mutable column of the match
    async fn update_match(&mut self, m: &TournamentMatch) -> BracketResult<()>;
}

/// An open unit of work over every bracket entity
#[async_trait]
pub trait BracketTransaction:
    TournamentRepository + TeamRepository + RoundRepository + MatchRepository + Send
{
    /// Make the changes visible; fails with `SeedConflict` if two teams of a
    /// tournament ended up with the same seed
    async fn commit(self: Box<Self>) -> BracketResult<()>;
}

/// Source of transactions
#[async_trait]
pub trait BracketRepository: Send + Sync {
    async fn begin(&self) -> BracketResult<Box<dyn BracketTransaction>>;
}
