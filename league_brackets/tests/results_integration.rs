//! Integration tests for result recording, advancement and placements.

use league_brackets::bracket::{BracketFormat, BracketKind};
use league_brackets::db::MemoryBracketRepository;
use league_brackets::tournament::{
    BracketError, BracketEvent, MatchResultOutcome, MatchResultProcessor, MatchStatus,
    MemoryEventSink, NewTournament, PersistedBracket, ResultSubmission,
    TournamentLifecycleManager, TournamentStatus,
};
use std::sync::Arc;

struct Harness {
    lifecycle: TournamentLifecycleManager,
    results: MatchResultProcessor,
    events: Arc<MemoryEventSink>,
}

impl Harness {
    fn new() -> Self {
        let repository = Arc::new(MemoryBracketRepository::new());
        let events = Arc::new(MemoryEventSink::new());
        Self {
            lifecycle: TournamentLifecycleManager::new(repository.clone(), events.clone()),
            results: MatchResultProcessor::new(repository, events.clone()),
            events,
        }
    }

    /// Create, register and start; returns the started bracket
    async fn started(&self, new: NewTournament, teams: &[&str]) -> PersistedBracket {
        let tournament = self.lifecycle.create_tournament(new).await.unwrap();
        for team in teams {
            self.lifecycle.add_team(tournament.id, team).await.unwrap();
        }
        self.lifecycle.start(tournament.id).await.unwrap()
    }

    async fn bracket(&self, tournament_id: i64) -> PersistedBracket {
        self.lifecycle.get_bracket(tournament_id).await.unwrap()
    }

    /// Record a result by match number; home wins when `home_wins`
    async fn play(
        &self,
        tournament_id: i64,
        match_number: u32,
        home_wins: bool,
    ) -> MatchResultOutcome {
        let bracket = self.bracket(tournament_id).await;
        let m = bracket.find_match_by_number(match_number).unwrap();
        let submission = if home_wins {
            ResultSubmission::new(2, 1)
        } else {
            ResultSubmission::new(0, 3)
        };
        self.results
            .record_result(tournament_id, m.id, submission)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_four_team_single_elimination_to_completion() {
    let h = Harness::new();
    let bracket = h
        .started(
            NewTournament::new("Cup", BracketFormat::SingleElimination),
            &["a", "b", "c", "d"],
        )
        .await;
    let id = bracket.tournament.id;
    let team = |r: &str| bracket.team_by_ref(r).unwrap().id;

    let outcome = h.play(id, 1, true).await;
    assert_eq!(outcome.completed_match.winner_id, Some(team("a")));
    assert!(!outcome.round_complete);
    assert!(!outcome.tournament_complete);
    let stored = h.bracket(id).await;
    assert!(stored.rounds.iter().all(|r| !r.is_complete));

    let outcome = h.play(id, 2, false).await;
    assert_eq!(outcome.completed_match.winner_id, Some(team("c")));
    assert!(outcome.round_complete);

    let stored = h.bracket(id).await;
    let final_match = stored.find_match_by_number(3).unwrap();
    assert_eq!(final_match.home_team_id, Some(team("a")));
    assert_eq!(final_match.away_team_id, Some(team("c")));
    assert_eq!(final_match.status, MatchStatus::Scheduled);
    let flags: Vec<(&str, bool)> = stored
        .rounds
        .iter()
        .map(|r| (r.name.as_str(), r.is_complete))
        .collect();
    assert_eq!(flags, vec![("Semifinals", true), ("Final", false)]);

    let outcome = h.play(id, 3, false).await;
    assert!(outcome.round_complete);
    assert!(outcome.tournament_complete);

    let tournament = h.lifecycle.get_tournament(id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Completed);
    assert_eq!(tournament.winner_id, Some(team("c")));
    assert_eq!(tournament.runner_up_id, Some(team("a")));
    assert!(tournament.completed_at.is_some());
    assert!(h.bracket(id).await.rounds.iter().all(|r| r.is_complete));

    let teams = h.lifecycle.list_teams(id).await.unwrap();
    let placed: Vec<(&str, Option<u32>)> = teams
        .iter()
        .map(|t| (t.external_team_ref.as_str(), t.final_placement))
        .collect();
    assert_eq!(
        placed,
        vec![("a", Some(2)), ("b", None), ("c", Some(1)), ("d", None)]
    );
}

#[tokio::test]
async fn test_three_teams_bye_winner_waits_in_final() {
    let h = Harness::new();
    let bracket = h
        .started(
            NewTournament::new("Cup", BracketFormat::SingleElimination),
            &["a", "b", "c"],
        )
        .await;
    let id = bracket.tournament.id;
    let a = bracket.team_by_ref("a").unwrap().id;
    let b = bracket.team_by_ref("b").unwrap().id;

    let bye = bracket.find_match_by_number(1).unwrap();
    let err = h
        .results
        .record_result(id, bye.id, ResultSubmission::new(1, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::AlreadyComplete(_)));

    let outcome = h.play(id, 2, true).await;
    assert!(outcome.round_complete);

    let outcome = h.play(id, 3, true).await;
    assert!(outcome.tournament_complete);
    assert_eq!(outcome.placements.len(), 2);
    assert_eq!(outcome.placements[0].team_id, a);
    assert_eq!(outcome.placements[0].placement, 1);
    assert_eq!(outcome.placements[1].team_id, b);
    assert_eq!(outcome.placements[1].placement, 2);
}

#[tokio::test]
async fn test_score_validation_runs_first() {
    let h = Harness::new();

    // Nothing exists, yet the score is what gets reported
    let err = h
        .results
        .record_result(1, 1, ResultSubmission::new(2, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::TieNotAllowed(2)));

    let err = h
        .results
        .record_result(1, 1, ResultSubmission::new(-1, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::InvalidScore(-1)));

    let err = h
        .results
        .record_result(1, 1, ResultSubmission::new(1, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::TournamentNotFound(1)));
}

#[tokio::test]
async fn test_rejections_leave_match_unchanged() {
    let h = Harness::new();
    let bracket = h
        .started(
            NewTournament::new("Cup", BracketFormat::SingleElimination),
            &["a", "b", "c", "d"],
        )
        .await;
    let id = bracket.tournament.id;
    let first = bracket.find_match_by_number(1).unwrap().clone();
    let final_match = bracket.find_match_by_number(3).unwrap().clone();

    let err = h
        .results
        .record_result(id, final_match.id, ResultSubmission::new(1, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::NotScheduled(_)));

    let err = h
        .results
        .record_result(id, 9_999, ResultSubmission::new(1, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::MatchNotFound(9_999)));

    h.play(id, 1, true).await;
    let err = h
        .results
        .record_result(id, first.id, ResultSubmission::new(0, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::AlreadyComplete(_)));

    let stored = h.bracket(id).await;
    let first = stored.find_match_by_number(1).unwrap();
    assert_eq!(first.home_score, Some(2));
    assert_eq!(first.away_score, Some(1));
}

#[tokio::test]
async fn test_match_from_another_tournament() {
    let h = Harness::new();
    let first = h
        .started(
            NewTournament::new("Cup", BracketFormat::SingleElimination),
            &["a", "b"],
        )
        .await;
    let second = h
        .started(
            NewTournament::new("Shield", BracketFormat::SingleElimination),
            &["c", "d"],
        )
        .await;

    let err = h
        .results
        .record_result(
            second.tournament.id,
            first.matches[0].id,
            ResultSubmission::new(1, 0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BracketError::WrongTournament { .. }));
}

#[tokio::test]
async fn test_results_rejected_before_start_and_after_cancel() {
    let h = Harness::new();
    let bracket = h
        .started(
            NewTournament::new("Cup", BracketFormat::SingleElimination),
            &["a", "b", "c", "d"],
        )
        .await;
    let id = bracket.tournament.id;
    h.lifecycle.cancel(id).await.unwrap();

    let err = h
        .results
        .record_result(id, bracket.matches[0].id, ResultSubmission::new(1, 0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BracketError::InvalidState {
            actual: TournamentStatus::Cancelled,
            ..
        }
    ));
}

#[tokio::test]
async fn test_notes_are_trimmed() {
    let h = Harness::new();
    let bracket = h
        .started(
            NewTournament::new("Cup", BracketFormat::SingleElimination),
            &["a", "b"],
        )
        .await;

    let outcome = h
        .results
        .record_result(
            bracket.tournament.id,
            bracket.matches[0].id,
            ResultSubmission::new(4, 2).with_notes("  decided on penalties "),
        )
        .await
        .unwrap();
    assert_eq!(
        outcome.completed_match.notes.as_deref(),
        Some("decided on penalties")
    );
    assert!(outcome.completed_match.played_at.is_some());
}

#[tokio::test]
async fn test_double_elimination_four_teams() {
    let h = Harness::new();
    let bracket = h
        .started(
            NewTournament::new("Cup", BracketFormat::DoubleElimination),
            &["a", "b", "c", "d"],
        )
        .await;
    let id = bracket.tournament.id;
    let team = |r: &str| bracket.team_by_ref(r).unwrap().id;
    assert_eq!(bracket.matches.len(), 6);

    // a beats d, b beats c
    h.play(id, 1, true).await;
    h.play(id, 2, true).await;

    let stored = h.bracket(id).await;
    let losers_opening = stored.find_match_by_number(4).unwrap();
    assert_eq!(losers_opening.bracket, BracketKind::Losers);
    assert_eq!(losers_opening.home_team_id, Some(team("d")));
    assert_eq!(losers_opening.away_team_id, Some(team("c")));
    assert_eq!(losers_opening.status, MatchStatus::Scheduled);

    // a wins the winners final, b drops into the losers final
    h.play(id, 3, true).await;
    // d beats c, c is out
    h.play(id, 4, true).await;

    let stored = h.bracket(id).await;
    let losers_final = stored.find_match_by_number(5).unwrap();
    assert_eq!(losers_final.home_team_id, Some(team("b")));
    assert_eq!(losers_final.away_team_id, Some(team("d")));

    // b beats d, who takes third
    let outcome = h.play(id, 5, true).await;
    assert!(!outcome.tournament_complete);
    assert_eq!(outcome.placements.len(), 1);
    assert_eq!(outcome.placements[0].team_id, team("d"));
    assert_eq!(outcome.placements[0].placement, 3);

    let stored = h.bracket(id).await;
    let grand_final = stored.find_match_by_number(6).unwrap();
    assert_eq!(grand_final.home_team_id, Some(team("a")));
    assert_eq!(grand_final.away_team_id, Some(team("b")));

    // Challenger wins; no reset match is played
    let outcome = h.play(id, 6, false).await;
    assert!(outcome.tournament_complete);

    let tournament = h.lifecycle.get_tournament(id).await.unwrap();
    assert_eq!(tournament.winner_id, Some(team("b")));
    assert_eq!(tournament.runner_up_id, Some(team("a")));
    assert_eq!(tournament.third_place_id, Some(team("d")));
}

#[tokio::test]
async fn test_double_elimination_two_team_rematch() {
    let h = Harness::new();
    let bracket = h
        .started(
            NewTournament::new("Cup", BracketFormat::DoubleElimination),
            &["a", "b"],
        )
        .await;
    let id = bracket.tournament.id;

    let outcome = h.play(id, 1, true).await;
    assert!(!outcome.tournament_complete);

    let stored = h.bracket(id).await;
    let rematch = stored.find_match_by_number(2).unwrap();
    assert_eq!(rematch.status, MatchStatus::Scheduled);
    assert_eq!(rematch.home_team_id, Some(stored.team_by_ref("a").unwrap().id));
    assert_eq!(rematch.away_team_id, Some(stored.team_by_ref("b").unwrap().id));

    let outcome = h.play(id, 2, false).await;
    assert!(outcome.tournament_complete);
}

#[tokio::test]
async fn test_consolation_match_after_final() {
    let h = Harness::new();
    let bracket = h
        .started(
            NewTournament::new("Cup", BracketFormat::SingleElimination).with_consolation(),
            &["a", "b", "c", "d"],
        )
        .await;
    let id = bracket.tournament.id;
    let team = |r: &str| bracket.team_by_ref(r).unwrap().id;

    let third_place = bracket.find_match_by_number(4).unwrap();
    assert_eq!(third_place.bracket, BracketKind::Consolation);

    h.play(id, 1, true).await;
    h.play(id, 2, true).await;

    let stored = h.bracket(id).await;
    let third_place = stored.find_match_by_number(4).unwrap();
    assert_eq!(third_place.home_team_id, Some(team("d")));
    assert_eq!(third_place.away_team_id, Some(team("c")));
    assert_eq!(third_place.status, MatchStatus::Scheduled);

    let outcome = h.play(id, 3, true).await;
    assert!(outcome.tournament_complete);

    // Still accepted once the tournament is complete
    let outcome = h.play(id, 4, false).await;
    assert!(!outcome.tournament_complete);
    assert_eq!(outcome.placements.len(), 2);

    let tournament = h.lifecycle.get_tournament(id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Completed);
    assert_eq!(tournament.winner_id, Some(team("a")));
    assert_eq!(tournament.third_place_id, Some(team("c")));

    let teams = h.lifecycle.list_teams(id).await.unwrap();
    let placements: Vec<Option<u32>> = teams.iter().map(|t| t.final_placement).collect();
    assert_eq!(placements, vec![Some(1), Some(2), Some(3), Some(4)]);
}

#[tokio::test]
async fn test_triple_elimination_runs_to_completion() {
    let h = Harness::new();
    let bracket = h
        .started(
            NewTournament::new("Cup", BracketFormat::TripleElimination),
            &["a", "b", "c", "d"],
        )
        .await;
    let id = bracket.tournament.id;
    assert_eq!(bracket.matches.len(), 8);

    // Home side always wins; play whatever is scheduled until the end
    let mut played = 0;
    loop {
        let stored = h.bracket(id).await;
        let Some(next) = stored
            .matches
            .iter()
            .find(|m| m.status == MatchStatus::Scheduled)
        else {
            break;
        };
        let outcome = h.play(id, next.match_number, true).await;
        played += 1;
        if outcome.tournament_complete {
            break;
        }
    }

    assert_eq!(played, 8);
    let tournament = h.lifecycle.get_tournament(id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Completed);
    assert_eq!(tournament.winner_id, Some(bracket.team_by_ref("a").unwrap().id));
}

#[tokio::test]
async fn test_events_follow_results() {
    let h = Harness::new();
    let bracket = h
        .started(
            NewTournament::new("Cup", BracketFormat::SingleElimination),
            &["a", "b"],
        )
        .await;
    let id = bracket.tournament.id;

    h.play(id, 1, true).await;

    assert_eq!(
        h.events.names(),
        vec!["match.completed", "round.completed", "tournament.completed"]
    );
    assert!(h.events.events().iter().all(|e| e.tournament_id() == id));

    match h.events.events().last() {
        Some(BracketEvent::TournamentCompleted { placements, .. }) => {
            assert_eq!(placements.len(), 2);
            assert_eq!(placements[0].placement, 1);
        }
        other => panic!("expected tournament.completed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_result_publishes_nothing() {
    let h = Harness::new();
    let bracket = h
        .started(
            NewTournament::new("Cup", BracketFormat::SingleElimination),
            &["a", "b", "c", "d"],
        )
        .await;

    let final_match = bracket.find_match_by_number(3).unwrap();
    let _ = h
        .results
        .record_result(bracket.tournament.id, final_match.id, ResultSubmission::new(1, 0))
        .await;
    assert!(h.events.events().is_empty());
}
