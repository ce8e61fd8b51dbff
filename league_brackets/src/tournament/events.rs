//! Domain events emitted after a transaction commits.

use super::models::{MatchId, Placement, RoundId, TeamId, TournamentId};
use crate::bracket::BracketKind;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Bracket engine event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum BracketEvent {
    #[serde(rename = "match.completed")]
    MatchCompleted {
        tournament_id: TournamentId,
        match_id: MatchId,
        match_number: u32,
        bracket: BracketKind,
        home_team_id: Option<TeamId>,
        away_team_id: Option<TeamId>,
        home_score: Option<i32>,
        away_score: Option<i32>,
        winner_id: Option<TeamId>,
    },

    #[serde(rename = "round.completed")]
    RoundCompleted {
        tournament_id: TournamentId,
        round_id: RoundId,
        round_number: u32,
        bracket: BracketKind,
        name: String,
    },

    #[serde(rename = "tournament.completed")]
    TournamentCompleted {
        tournament_id: TournamentId,
        winner_id: Option<TeamId>,
        runner_up_id: Option<TeamId>,
        third_place_id: Option<TeamId>,
        placements: Vec<Placement>,
    },
}

impl BracketEvent {
    /// Event name as published
    pub fn name(&self) -> &'static str {
        match self {
            BracketEvent::MatchCompleted { .. } => "match.completed",
            BracketEvent::RoundCompleted { .. } => "round.completed",
            BracketEvent::TournamentCompleted { .. } => "tournament.completed",
        }
    }

    pub fn tournament_id(&self) -> TournamentId {
        match self {
            BracketEvent::MatchCompleted { tournament_id, .. }
            | BracketEvent::RoundCompleted { tournament_id, .. }
            | BracketEvent::TournamentCompleted { tournament_id, .. } => *tournament_id,
        }
    }
}

/// Receiver for committed bracket events
///
/// Publishing must not fail the operation that produced the event; sinks
/// handle their own delivery errors.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &BracketEvent);
}

/// Writes every event to the log as JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn publish(&self, event: &BracketEvent) {
        match serde_json::to_string(event) {
            Ok(json) => log::info!("{}: {}", event.name(), json),
            Err(e) => log::warn!("Failed to serialize {} event: {}", event.name(), e),
        }
    }
}

/// Keeps published events in memory
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<BracketEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far
    pub fn events(&self) -> Vec<BracketEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of published events, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(BracketEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for MemoryEventSink {
    fn publish(&self, event: &BracketEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_event() -> BracketEvent {
        BracketEvent::RoundCompleted {
            tournament_id: 7,
            round_id: 3,
            round_number: 1,
            bracket: BracketKind::Main,
            name: "Semifinals".to_string(),
        }
    }

    #[test]
    fn test_event_tag_is_dotted_name() {
        let json = serde_json::to_value(round_event()).unwrap();
        assert_eq!(json["event"], "round.completed");
        assert_eq!(json["bracket"], "main");
        assert_eq!(json["tournament_id"], 7);
    }

    #[test]
    fn test_memory_sink_collects_in_order() {
        let sink = MemoryEventSink::new();
        sink.publish(&round_event());
        sink.publish(&BracketEvent::TournamentCompleted {
            tournament_id: 7,
            winner_id: Some(1),
            runner_up_id: Some(2),
            third_place_id: None,
            placements: vec![],
        });

        assert_eq!(sink.names(), vec!["round.completed", "tournament.completed"]);
        assert!(sink.events().iter().all(|e| e.tournament_id() == 7));

        sink.clear();
        assert!(sink.events().is_empty());
    }
}
