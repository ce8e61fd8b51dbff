//! Tournament lifecycle: registration, seeding, start and cancellation.

use super::advancement;
use super::errors::{BracketError, BracketResult};
use super::events::{BracketEvent, EventSink};
use super::models::{
    MatchId, NewMatch, NewRound, NewTeam, NewTournament, PersistedBracket, RoundId,
    SeedAssignment, TeamId, Tournament, TournamentId, TournamentMatch, TournamentRound,
    TournamentStatus, TournamentTeam,
};
use crate::bracket::{MatchLink, generate_bracket};
use crate::db::{BracketRepository, BracketTransaction};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Longest accepted external team reference
pub const MAX_TEAM_REF_LENGTH: usize = 100;

/// Fewest teams a bracket can be generated for
pub const MIN_TEAMS: usize = 2;

/// Lock the tournament row and require CREATED status
async fn lock_created(
    tx: &mut dyn BracketTransaction,
    tournament_id: TournamentId,
) -> BracketResult<Tournament> {
    let tournament = tx
        .lock_tournament(tournament_id)
        .await?
        .ok_or(BracketError::TournamentNotFound(tournament_id))?;

    if tournament.status != TournamentStatus::Created {
        return Err(BracketError::InvalidState {
            expected: TournamentStatus::Created,
            actual: tournament.status,
        });
    }
    Ok(tournament)
}

/// Read the whole bracket of a tournament
pub(crate) async fn load_bracket(
    tx: &mut dyn BracketTransaction,
    tournament_id: TournamentId,
) -> BracketResult<PersistedBracket> {
    let tournament = tx
        .find_tournament(tournament_id)
        .await?
        .ok_or(BracketError::TournamentNotFound(tournament_id))?;

    Ok(PersistedBracket {
        tournament,
        teams: tx.list_teams(tournament_id).await?,
        rounds: tx.list_rounds(tournament_id).await?,
        matches: tx.list_matches(tournament_id).await?,
    })
}

/// Validate a reseed request against the registered teams and return the
/// seed changes it implies.
fn seed_changes(
    teams: &[TournamentTeam],
    assignments: &[SeedAssignment],
) -> BracketResult<Vec<(TeamId, u32)>> {
    if assignments.len() != teams.len() {
        return Err(BracketError::InvalidSeeding(format!(
            "expected {} assignments, got {}",
            teams.len(),
            assignments.len()
        )));
    }

    let by_ref: HashMap<&str, &TournamentTeam> = teams
        .iter()
        .map(|t| (t.external_team_ref.as_str(), t))
        .collect();
    let count = teams.len() as u32;
    let mut seen_teams = HashSet::with_capacity(teams.len());
    let mut seen_seeds = HashSet::with_capacity(teams.len());
    let mut changes = Vec::new();

    for assignment in assignments {
        let team = by_ref.get(assignment.team_ref.as_str()).ok_or_else(|| {
            BracketError::InvalidSeeding(format!("unknown team {}", assignment.team_ref))
        })?;
        if !(1..=count).contains(&assignment.seed) {
            return Err(BracketError::InvalidSeeding(format!(
                "seed {} is outside 1..={}",
                assignment.seed, count
            )));
        }
        if !seen_teams.insert(team.id) {
            return Err(BracketError::InvalidSeeding(format!(
                "team {} listed more than once",
                assignment.team_ref
            )));
        }
        if !seen_seeds.insert(assignment.seed) {
            return Err(BracketError::SeedConflict(assignment.seed));
        }
        if team.seed != assignment.seed {
            changes.push((team.id, assignment.seed));
        }
    }

    Ok(changes)
}

/// Seeds 1..N in current seed order
fn compact_seeds(teams: &[TournamentTeam]) -> Vec<(TeamId, u32)> {
    teams
        .iter()
        .zip(1u32..)
        .filter(|(team, seed)| team.seed != *seed)
        .map(|(team, seed)| (team.id, seed))
        .collect()
}

fn normalize_team_ref(team_ref: &str) -> BracketResult<String> {
    let trimmed = team_ref.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_TEAM_REF_LENGTH {
        return Err(BracketError::InvalidTeamRef(team_ref.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Manages a tournament from creation until its bracket is generated
#[derive(Clone)]
pub struct TournamentLifecycleManager {
    repository: Arc<dyn BracketRepository>,
    events: Arc<dyn EventSink>,
}

impl TournamentLifecycleManager {
    pub fn new(repository: Arc<dyn BracketRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { repository, events }
    }

    /// Create a tournament in CREATED status
    pub async fn create_tournament(&self, new: NewTournament) -> BracketResult<Tournament> {
        new.validate().map_err(BracketError::InvalidConfig)?;

        let mut tx = self.repository.begin().await?;
        let tournament = tx.insert_tournament(&new).await?;
        tx.commit().await?;

        log::info!(
            "Created tournament {} ({}, {})",
            tournament.id,
            tournament.name,
            tournament.format.as_str()
        );
        Ok(tournament)
    }

    pub async fn get_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        let mut tx = self.repository.begin().await?;
        tx.find_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))
    }

    /// Teams in seed order
    pub async fn list_teams(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<TournamentTeam>> {
        let mut tx = self.repository.begin().await?;
        if tx.find_tournament(tournament_id).await?.is_none() {
            return Err(BracketError::TournamentNotFound(tournament_id));
        }
        tx.list_teams(tournament_id).await
    }

    /// Tournament, teams, rounds and matches as currently stored
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> BracketResult<PersistedBracket> {
        let mut tx = self.repository.begin().await?;
        load_bracket(tx.as_mut(), tournament_id).await
    }

    /// Register a team; it receives the next seed
    ///
    /// # Errors
    ///
    /// * `InvalidState` - the tournament is no longer CREATED
    /// * `TeamAlreadyRegistered` - `team_ref` is already in the tournament
    /// * `TournamentFull` - `max_teams` reached
    pub async fn add_team(
        &self,
        tournament_id: TournamentId,
        team_ref: &str,
    ) -> BracketResult<TournamentTeam> {
        let team_ref = normalize_team_ref(team_ref)?;

        let mut tx = self.repository.begin().await?;
        let tournament = lock_created(tx.as_mut(), tournament_id).await?;
        let teams = tx.list_teams(tournament_id).await?;

        if teams.iter().any(|t| t.external_team_ref == team_ref) {
            return Err(BracketError::TeamAlreadyRegistered(team_ref));
        }
        if let Some(max_teams) = tournament.max_teams {
            if teams.len() >= max_teams as usize {
                return Err(BracketError::TournamentFull);
            }
        }

        let team = tx
            .insert_team(&NewTeam {
                tournament_id,
                external_team_ref: team_ref,
                seed: teams.len() as u32 + 1,
            })
            .await?;
        tx.commit().await?;

        log::info!(
            "Team {} joined tournament {} as seed {}",
            team.external_team_ref,
            tournament_id,
            team.seed
        );
        Ok(team)
    }

    /// Unregister a team and close the gap in the seeding
    ///
    /// Returns the remaining teams in seed order.
    pub async fn remove_team(
        &self,
        tournament_id: TournamentId,
        team_ref: &str,
    ) -> BracketResult<Vec<TournamentTeam>> {
        let mut tx = self.repository.begin().await?;
        lock_created(tx.as_mut(), tournament_id).await?;

        let mut teams = tx.list_teams(tournament_id).await?;
        let position = teams
            .iter()
            .position(|t| t.external_team_ref == team_ref.trim())
            .ok_or_else(|| BracketError::TeamNotFound {
                tournament_id,
                team_ref: team_ref.to_string(),
            })?;
        let removed = teams.remove(position);

        tx.delete_team(removed.id).await?;
        tx.update_seeds(&compact_seeds(&teams)).await?;
        let teams = tx.list_teams(tournament_id).await?;
        tx.commit().await?;

        log::info!(
            "Team {} left tournament {}, {} teams remain",
            removed.external_team_ref,
            tournament_id,
            teams.len()
        );
        Ok(teams)
    }

    /// Replace the seeding with `assignments`, which must be a permutation
    /// of 1..N covering every registered team
    pub async fn reseed(
        &self,
        tournament_id: TournamentId,
        assignments: &[SeedAssignment],
    ) -> BracketResult<Vec<TournamentTeam>> {
        let mut tx = self.repository.begin().await?;
        lock_created(tx.as_mut(), tournament_id).await?;

        let teams = tx.list_teams(tournament_id).await?;
        let changes = seed_changes(&teams, assignments)?;
        tx.update_seeds(&changes).await?;
        let teams = tx.list_teams(tournament_id).await?;
        tx.commit().await?;

        log::info!(
            "Reseeded tournament {} ({} seeds changed)",
            tournament_id,
            changes.len()
        );
        Ok(teams)
    }

    /// Generate and persist the bracket, resolve byes and move the
    /// tournament to IN_PROGRESS
    ///
    /// # Errors
    ///
    /// * `InvalidState` - the tournament is not CREATED
    /// * `StartConflict` - another start committed first
    /// * `InsufficientTeams` - fewer than two teams
    pub async fn start(&self, tournament_id: TournamentId) -> BracketResult<PersistedBracket> {
        let current = self.get_tournament(tournament_id).await?;
        if current.status != TournamentStatus::Created {
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::Created,
                actual: current.status,
            });
        }

        let mut tx = self.repository.begin().await?;
        let mut tournament = tx
            .lock_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
        if tournament.status != TournamentStatus::Created {
            return Err(BracketError::StartConflict(tournament_id));
        }

        let teams = tx.list_teams(tournament_id).await?;
        if teams.len() < MIN_TEAMS {
            return Err(BracketError::InsufficientTeams {
                needed: MIN_TEAMS,
                current: teams.len(),
            });
        }

        let entrants: Vec<TeamId> = teams.iter().map(|t| t.id).collect();
        let structure = generate_bracket(&entrants, &tournament.bracket_options())?;

        let mut ids: HashMap<u32, MatchId> = HashMap::new();
        let mut stored: Vec<(TournamentMatch, Option<MatchLink>, Option<MatchLink>)> = Vec::new();
        let mut bye_rounds: Vec<RoundId> = Vec::new();

        for round in &structure.rounds {
            let stored_round = tx
                .insert_round(&NewRound {
                    tournament_id,
                    round_number: round.round_number,
                    name: round.name.clone(),
                    bracket: round.bracket,
                })
                .await?;

            if round.matches.iter().any(|m| m.is_bye) {
                bye_rounds.push(stored_round.id);
            }

            for m in &round.matches {
                let inserted = tx
                    .insert_match(&NewMatch {
                        tournament_id,
                        round_id: stored_round.id,
                        match_number: m.match_number,
                        bracket: m.bracket,
                        home_team_id: m.home,
                        away_team_id: m.away,
                        winner_id: m.winner,
                        status: m.status,
                        is_bye: m.is_bye,
                    })
                    .await?;
                ids.insert(m.match_number, inserted.id);
                stored.push((inserted, m.winner_to, m.loser_to));
            }
        }

        // Link once every target exists
        for (mut m, winner_to, loser_to) in stored {
            if winner_to.is_none() && loser_to.is_none() {
                continue;
            }
            if let Some(link) = winner_to {
                m.next_match_id = ids.get(&link.match_number).copied();
                m.next_slot = m.next_match_id.map(|_| link.slot);
            }
            if let Some(link) = loser_to {
                m.loser_match_id = ids.get(&link.match_number).copied();
                m.loser_slot = m.loser_match_id.map(|_| link.slot);
            }
            tx.update_match(&m).await?;
        }

        // Byes arrive completed; a round made only of byes is complete already
        let mut completed_rounds = Vec::new();
        for round_id in bye_rounds {
            let round = advancement::refresh_round_completion(tx.as_mut(), round_id).await?;
            completed_rounds.extend(round);
        }
        completed_rounds.extend(advancement::resolve_byes(tx.as_mut(), tournament_id).await?);

        tournament.status = TournamentStatus::InProgress;
        tournament.started_at = Some(Utc::now());
        tx.update_tournament(&tournament).await?;

        let bracket = load_bracket(tx.as_mut(), tournament_id).await?;
        tx.commit().await?;

        for round in &completed_rounds {
            self.events.publish(&round_completed(round));
        }

        log::info!(
            "Started tournament {} with {} teams: {} rounds, {} matches, {} byes",
            tournament_id,
            teams.len(),
            structure.rounds.len(),
            structure.total_matches,
            structure.byes
        );
        Ok(bracket)
    }

    /// Abandon a tournament that has not finished
    pub async fn cancel(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        let mut tx = self.repository.begin().await?;
        let mut tournament = tx
            .lock_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;

        match tournament.status {
            TournamentStatus::Created | TournamentStatus::InProgress => {}
            actual => {
                return Err(BracketError::InvalidState {
                    expected: TournamentStatus::InProgress,
                    actual,
                });
            }
        }

        tournament.status = TournamentStatus::Cancelled;
        tx.update_tournament(&tournament).await?;
        tx.commit().await?;

        log::info!("Cancelled tournament {}", tournament_id);
        Ok(tournament)
    }
}

pub(crate) fn round_completed(round: &TournamentRound) -> BracketEvent {
    BracketEvent::RoundCompleted {
        tournament_id: round.tournament_id,
        round_id: round.id,
        round_number: round.round_number,
        bracket: round.bracket,
        name: round.name.clone(),
    }
}
