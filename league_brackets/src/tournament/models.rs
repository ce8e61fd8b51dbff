//! Tournament data models.

use crate::bracket::{BracketFormat, BracketKind, BracketOptions, ParseEnumError, Slot};
pub use crate::bracket::MatchStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tournament ID type
pub type TournamentId = i64;

/// Tournament team ID type (not the external team reference)
pub type TeamId = i64;

/// Round ID type
pub type RoundId = i64;

/// Match ID type
pub type MatchId = i64;

/// Longest accepted tournament name
pub const MAX_NAME_LENGTH: usize = 200;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentStatus {
    /// Accepting teams and seeding changes
    Created,
    /// Bracket generated, results being recorded
    InProgress,
    /// Final played
    Completed,
    /// Abandoned before completion
    Cancelled,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Created => "created",
            TournamentStatus::InProgress => "in_progress",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TournamentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(TournamentStatus::Created),
            "in_progress" => Ok(TournamentStatus::InProgress),
            "completed" => Ok(TournamentStatus::Completed),
            "cancelled" => Ok(TournamentStatus::Cancelled),
            other => Err(ParseEnumError::new("tournament status", other)),
        }
    }
}

/// Tournament record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub format: BracketFormat,
    pub status: TournamentStatus,
    pub has_consolation_bracket: bool,
    pub random_byes: bool,
    /// Registration cap, unlimited when absent
    pub max_teams: Option<u32>,
    pub winner_id: Option<TeamId>,
    pub runner_up_id: Option<TeamId>,
    pub third_place_id: Option<TeamId>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Generator options for this tournament
    pub fn bracket_options(&self) -> BracketOptions {
        BracketOptions {
            format: self.format,
            has_consolation_bracket: self.has_consolation_bracket,
            random_byes: self.random_byes,
        }
    }
}

/// Tournament creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub format: BracketFormat,
    #[serde(default)]
    pub has_consolation_bracket: bool,
    #[serde(default)]
    pub random_byes: bool,
    #[serde(default)]
    pub max_teams: Option<u32>,
}

impl NewTournament {
    pub fn new(name: impl Into<String>, format: BracketFormat) -> Self {
        Self {
            name: name.into(),
            format,
            has_consolation_bracket: false,
            random_byes: false,
            max_teams: None,
        }
    }

    pub fn with_consolation(mut self) -> Self {
        self.has_consolation_bracket = true;
        self
    }

    pub fn with_random_byes(mut self) -> Self {
        self.random_byes = true;
        self
    }

    pub fn with_max_teams(mut self, max_teams: u32) -> Self {
        self.max_teams = Some(max_teams);
        self
    }

    /// Check the request, returning a description of the first problem
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Tournament name must not be empty".to_string());
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(format!(
                "Tournament name must be at most {MAX_NAME_LENGTH} characters"
            ));
        }
        match self.max_teams {
            Some(max_teams) if max_teams < 2 => {
                return Err(format!("max_teams must be at least 2, got {max_teams}"));
            }
            _ => {}
        }
        if self.has_consolation_bracket && self.format != BracketFormat::SingleElimination {
            return Err(
                "Consolation bracket is only available for single elimination".to_string(),
            );
        }
        Ok(())
    }
}

/// A team registered in a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentTeam {
    pub id: TeamId,
    pub tournament_id: TournamentId,
    /// Caller's identifier for the team (league team, club, ...)
    pub external_team_ref: String,
    /// Contiguous 1..N within the tournament
    pub seed: u32,
    pub final_placement: Option<u32>,
}

/// Team insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeam {
    pub tournament_id: TournamentId,
    pub external_team_ref: String,
    pub seed: u32,
}

/// Round record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentRound {
    pub id: RoundId,
    pub tournament_id: TournamentId,
    pub round_number: u32,
    pub name: String,
    pub bracket: BracketKind,
    pub is_complete: bool,
}

/// Round insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRound {
    pub tournament_id: TournamentId,
    pub round_number: u32,
    pub name: String,
    pub bracket: BracketKind,
}

/// Match record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentMatch {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round_id: RoundId,
    pub match_number: u32,
    pub bracket: BracketKind,
    pub home_team_id: Option<TeamId>,
    pub away_team_id: Option<TeamId>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub winner_id: Option<TeamId>,
    pub status: MatchStatus,
    pub next_match_id: Option<MatchId>,
    pub next_slot: Option<Slot>,
    pub loser_match_id: Option<MatchId>,
    pub loser_slot: Option<Slot>,
    pub is_bye: bool,
    pub played_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl TournamentMatch {
    /// Team in `slot`
    pub fn team(&self, slot: Slot) -> Option<TeamId> {
        match slot {
            Slot::Home => self.home_team_id,
            Slot::Away => self.away_team_id,
        }
    }

    pub fn set_team(&mut self, slot: Slot, team_id: TeamId) {
        match slot {
            Slot::Home => self.home_team_id = Some(team_id),
            Slot::Away => self.away_team_id = Some(team_id),
        }
    }

    pub fn has_both_teams(&self) -> bool {
        self.home_team_id.is_some() && self.away_team_id.is_some()
    }

    /// The team that did not win, once decided
    pub fn loser_id(&self) -> Option<TeamId> {
        let winner = self.winner_id?;
        [self.home_team_id, self.away_team_id]
            .into_iter()
            .flatten()
            .find(|&team| team != winner)
    }

    pub fn is_complete(&self) -> bool {
        self.status == MatchStatus::Completed
    }
}

/// Match insert; links are written once every match of the bracket exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub tournament_id: TournamentId,
    pub round_id: RoundId,
    pub match_number: u32,
    pub bracket: BracketKind,
    pub home_team_id: Option<TeamId>,
    pub away_team_id: Option<TeamId>,
    /// Set for byes, which are stored already completed
    pub winner_id: Option<TeamId>,
    pub status: MatchStatus,
    pub is_bye: bool,
}

/// Everything persisted for one tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedBracket {
    pub tournament: Tournament,
    /// Ordered by seed
    pub teams: Vec<TournamentTeam>,
    /// Ordered by bracket, then round number
    pub rounds: Vec<TournamentRound>,
    /// Ordered by match number
    pub matches: Vec<TournamentMatch>,
}

impl PersistedBracket {
    /// Matches of one round, in match number order
    pub fn round_matches(&self, round_id: RoundId) -> impl Iterator<Item = &TournamentMatch> {
        self.matches.iter().filter(move |m| m.round_id == round_id)
    }

    pub fn find_match_by_number(&self, match_number: u32) -> Option<&TournamentMatch> {
        self.matches.iter().find(|m| m.match_number == match_number)
    }

    pub fn team_by_ref(&self, external_team_ref: &str) -> Option<&TournamentTeam> {
        self.teams
            .iter()
            .find(|t| t.external_team_ref == external_team_ref)
    }
}

/// One entry of a reseed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAssignment {
    pub team_ref: String,
    pub seed: u32,
}

impl SeedAssignment {
    pub fn new(team_ref: impl Into<String>, seed: u32) -> Self {
        Self {
            team_ref: team_ref.into(),
            seed,
        }
    }
}

/// A submitted match result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSubmission {
    pub home_score: i32,
    pub away_score: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ResultSubmission {
    pub fn new(home_score: i32, away_score: i32) -> Self {
        Self {
            home_score,
            away_score,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Final placement of a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub team_id: TeamId,
    pub placement: u32,
}

/// Result of recording a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResultOutcome {
    #[serde(rename = "match")]
    pub completed_match: TournamentMatch,
    pub round_complete: bool,
    pub tournament_complete: bool,
    /// Placements decided by this result
    pub placements: Vec<Placement>,
}
