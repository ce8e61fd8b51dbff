//! In-memory bracket store.
//!
//! A transaction holds the store mutex for its whole lifetime and works on a
//! copy of the state. Commit swaps the copy in; drop discards it.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repository::{
    BracketRepository, BracketTransaction, MatchRepository, RoundRepository, TeamRepository,
    TournamentRepository,
};
use crate::tournament::{
    BracketError, BracketResult, MatchId, NewMatch, NewRound, NewTeam, NewTournament, RoundId,
    TeamId, Tournament, TournamentId, TournamentMatch, TournamentRound, TournamentStatus,
    TournamentTeam,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: i64,
    tournaments: BTreeMap<TournamentId, Tournament>,
    teams: BTreeMap<TeamId, TournamentTeam>,
    rounds: BTreeMap<RoundId, TournamentRound>,
    matches: BTreeMap<MatchId, TournamentMatch>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    /// First seed shared by two teams of the same tournament
    fn duplicate_seed(&self) -> Option<u32> {
        let mut seen = HashSet::new();
        self.teams
            .values()
            .find(|team| !seen.insert((team.tournament_id, team.seed)))
            .map(|team| team.seed)
    }
}

/// Bracket repository backed by process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBracketRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBracketRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BracketRepository for MemoryBracketRepository {
    async fn begin(&self) -> BracketResult<Box<dyn BracketTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

/// Open in-memory transaction
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl TournamentRepository for MemoryTransaction {
    async fn insert_tournament(&mut self, new: &NewTournament) -> BracketResult<Tournament> {
        let tournament = Tournament {
            id: self.working.next_id(),
            name: new.name.trim().to_string(),
            format: new.format,
            status: TournamentStatus::Created,
            has_consolation_bracket: new.has_consolation_bracket,
            random_byes: new.random_byes,
            max_teams: new.max_teams,
            winner_id: None,
            runner_up_id: None,
            third_place_id: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        self.working
            .tournaments
            .insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn find_tournament(&mut self, id: TournamentId) -> BracketResult<Option<Tournament>> {
        Ok(self.working.tournaments.get(&id).cloned())
    }

    async fn lock_tournament(&mut self, id: TournamentId) -> BracketResult<Option<Tournament>> {
        // The store mutex is already held
        self.find_tournament(id).await
    }

    async fn update_tournament(&mut self, tournament: &Tournament) -> BracketResult<()> {
        let stored = self
            .working
            .tournaments
            .get_mut(&tournament.id)
            .ok_or(BracketError::TournamentNotFound(tournament.id))?;
        *stored = tournament.clone();
        Ok(())
    }
}

#[async_trait]
impl TeamRepository for MemoryTransaction {
    async fn insert_team(&mut self, new: &NewTeam) -> BracketResult<TournamentTeam> {
        let team = TournamentTeam {
            id: self.working.next_id(),
            tournament_id: new.tournament_id,
            external_team_ref: new.external_team_ref.clone(),
            seed: new.seed,
            final_placement: None,
        };
        self.working.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn list_teams(
        &mut self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<TournamentTeam>> {
        let mut teams: Vec<TournamentTeam> = self
            .working
            .teams
            .values()
            .filter(|t| t.tournament_id == tournament_id)
            .cloned()
            .collect();
        teams.sort_by_key(|t| (t.seed, t.id));
        Ok(teams)
    }

    async fn delete_team(&mut self, team_id: TeamId) -> BracketResult<()> {
        self.working.teams.remove(&team_id);
        Ok(())
    }

    async fn update_seeds(&mut self, seeds: &[(TeamId, u32)]) -> BracketResult<()> {
        for &(team_id, seed) in seeds {
            if let Some(team) = self.working.teams.get_mut(&team_id) {
                team.seed = seed;
            }
        }
        Ok(())
    }

    async fn set_final_placement(
        &mut self,
        team_id: TeamId,
        placement: u32,
    ) -> BracketResult<()> {
        if let Some(team) = self.working.teams.get_mut(&team_id) {
            team.final_placement = Some(placement);
        }
        Ok(())
    }
}

#[async_trait]
impl RoundRepository for MemoryTransaction {
    async fn insert_round(&mut self, new: &NewRound) -> BracketResult<TournamentRound> {
        let round = TournamentRound {
            id: self.working.next_id(),
            tournament_id: new.tournament_id,
            round_number: new.round_number,
            name: new.name.clone(),
            bracket: new.bracket,
            is_complete: false,
        };
        self.working.rounds.insert(round.id, round.clone());
        Ok(round)
    }

    async fn list_rounds(
        &mut self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<TournamentRound>> {
        let mut rounds: Vec<TournamentRound> = self
            .working
            .rounds
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect();
        rounds.sort_by_key(|r| (r.bracket, r.round_number));
        Ok(rounds)
    }

    async fn find_round(&mut self, id: RoundId) -> BracketResult<Option<TournamentRound>> {
        Ok(self.working.rounds.get(&id).cloned())
    }

    async fn set_round_complete(&mut self, id: RoundId, is_complete: bool) -> BracketResult<()> {
        if let Some(round) = self.working.rounds.get_mut(&id) {
            round.is_complete = is_complete;
        }
        Ok(())
    }
}

#[async_trait]
impl MatchRepository for MemoryTransaction {
    async fn insert_match(&mut self, new: &NewMatch) -> BracketResult<TournamentMatch> {
        let m = TournamentMatch {
            id: self.working.next_id(),
            tournament_id: new.tournament_id,
            round_id: new.round_id,
            match_number: new.match_number,
            bracket: new.bracket,
            home_team_id: new.home_team_id,
            away_team_id: new.away_team_id,
            home_score: None,
            away_score: None,
            winner_id: new.winner_id,
            status: new.status,
            next_match_id: None,
            next_slot: None,
            loser_match_id: None,
            loser_slot: None,
            is_bye: new.is_bye,
            played_at: None,
            notes: None,
        };
        self.working.matches.insert(m.id, m.clone());
        Ok(m)
    }

    async fn find_match(&mut self, id: MatchId) -> BracketResult<Option<TournamentMatch>> {
        Ok(self.working.matches.get(&id).cloned())
    }

    async fn list_matches(
        &mut self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<TournamentMatch>> {
        let mut matches: Vec<TournamentMatch> = self
            .working
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| m.match_number);
        Ok(matches)
    }

    async fn list_round_matches(
        &mut self,
        round_id: RoundId,
    ) -> BracketResult<Vec<TournamentMatch>> {
        let mut matches: Vec<TournamentMatch> = self
            .working
            .matches
            .values()
            .filter(|m| m.round_id == round_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| m.match_number);
        Ok(matches)
    }

    async fn update_match(&mut self, m: &TournamentMatch) -> BracketResult<()> {
        let stored = self
            .working
            .matches
            .get_mut(&m.id)
            .ok_or(BracketError::MatchNotFound(m.id))?;
        *stored = m.clone();
        Ok(())
    }
}

#[async_trait]
impl BracketTransaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> BracketResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        if let Some(seed) = working.duplicate_seed() {
            return Err(BracketError::SeedConflict(seed));
        }
        *guard = working;
        Ok(())
    }
}
