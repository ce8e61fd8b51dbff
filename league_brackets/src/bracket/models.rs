//! Bracket topology types produced by the generator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a bracket entrant as handed to the generator.
///
/// The lifecycle manager passes tournament team ids; the preview endpoint
/// passes external team references.
pub type EntrantId = i64;

/// Error returned when a stored enum value cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Elimination format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketFormat {
    /// One loss eliminates
    SingleElimination,
    /// Main bracket plus one losers ladder
    DoubleElimination,
    /// Main bracket plus two losers ladders
    TripleElimination,
}

impl BracketFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketFormat::SingleElimination => "single_elimination",
            BracketFormat::DoubleElimination => "double_elimination",
            BracketFormat::TripleElimination => "triple_elimination",
        }
    }

    /// Number of losers ladders generated for this format
    pub fn losers_ladders(&self) -> usize {
        match self {
            BracketFormat::SingleElimination => 0,
            BracketFormat::DoubleElimination => 1,
            BracketFormat::TripleElimination => 2,
        }
    }
}

impl FromStr for BracketFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_elimination" => Ok(BracketFormat::SingleElimination),
            "double_elimination" => Ok(BracketFormat::DoubleElimination),
            "triple_elimination" => Ok(BracketFormat::TripleElimination),
            other => Err(ParseEnumError::new("bracket format", other)),
        }
    }
}

/// Which ladder a round or match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketKind {
    Main,
    Losers,
    Consolation,
}

impl BracketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketKind::Main => "main",
            BracketKind::Losers => "losers",
            BracketKind::Consolation => "consolation",
        }
    }
}

impl FromStr for BracketKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(BracketKind::Main),
            "losers" => Ok(BracketKind::Losers),
            "consolation" => Ok(BracketKind::Consolation),
            other => Err(ParseEnumError::new("bracket", other)),
        }
    }
}

impl fmt::Display for BracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of a match a team occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Home,
    Away,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Home => "home",
            Slot::Away => "away",
        }
    }
}

impl FromStr for Slot {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Slot::Home),
            "away" => Ok(Slot::Away),
            other => Err(ParseEnumError::new("slot", other)),
        }
    }
}

/// Generator options, copied from the tournament settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketOptions {
    pub format: BracketFormat,
    pub has_consolation_bracket: bool,
    pub random_byes: bool,
}

impl BracketOptions {
    /// Plain single elimination with top-seed byes
    pub fn single_elimination() -> Self {
        Self {
            format: BracketFormat::SingleElimination,
            has_consolation_bracket: false,
            random_byes: false,
        }
    }

    pub fn with_format(mut self, format: BracketFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_consolation(mut self) -> Self {
        self.has_consolation_bracket = true;
        self
    }

    pub fn with_random_byes(mut self) -> Self {
        self.random_byes = true;
        self
    }
}

/// Match status: PENDING -> SCHEDULED -> COMPLETED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Waiting for at least one team
    Pending,
    /// Both teams known
    Scheduled,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Completed => "completed",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "scheduled" => Ok(MatchStatus::Scheduled),
            "completed" => Ok(MatchStatus::Completed),
            other => Err(ParseEnumError::new("match status", other)),
        }
    }
}

/// Forward edge from a generated match into a slot of a later match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLink {
    pub match_number: u32,
    pub slot: Slot,
}

/// A match in the generated topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedMatch {
    /// Unique within the bracket; edges always point to a larger number
    pub match_number: u32,
    pub bracket: BracketKind,
    pub home: Option<EntrantId>,
    pub away: Option<EntrantId>,
    /// One side populated; completed at generation with that side as winner
    pub is_bye: bool,
    pub status: MatchStatus,
    pub winner: Option<EntrantId>,
    /// Where the winner advances
    pub winner_to: Option<MatchLink>,
    /// Where the loser drops (losers ladders and consolation only)
    pub loser_to: Option<MatchLink>,
}

impl GeneratedMatch {
    /// Both slots already known at generation time
    pub fn is_ready(&self) -> bool {
        self.home.is_some() && self.away.is_some()
    }
}

/// A round in the generated topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedRound {
    pub bracket: BracketKind,
    /// 1-based, contiguous within `bracket`
    pub round_number: u32,
    pub name: String,
    pub matches: Vec<GeneratedMatch>,
}

/// Complete output of the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketStructure {
    pub format: BracketFormat,
    /// Smallest power of two holding every entrant
    pub bracket_size: usize,
    pub byes: usize,
    /// Ordered by bracket, then round number
    pub rounds: Vec<GeneratedRound>,
    /// Playable matches; bye matches are not counted
    pub total_matches: usize,
}

impl BracketStructure {
    /// Rounds of one bracket, in round order
    pub fn rounds_in(&self, bracket: BracketKind) -> impl Iterator<Item = &GeneratedRound> {
        self.rounds.iter().filter(move |r| r.bracket == bracket)
    }

    /// Every match, in match number order
    pub fn matches(&self) -> Vec<&GeneratedMatch> {
        let mut all: Vec<&GeneratedMatch> = self.rounds.iter().flat_map(|r| &r.matches).collect();
        all.sort_by_key(|m| m.match_number);
        all
    }

    /// Look up a match by number
    pub fn find_match(&self, match_number: u32) -> Option<&GeneratedMatch> {
        self.rounds
            .iter()
            .flat_map(|r| &r.matches)
            .find(|m| m.match_number == match_number)
    }
}
