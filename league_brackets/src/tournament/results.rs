//! Match result recording and everything a result sets in motion.

use super::advancement;
use super::errors::{BracketError, BracketResult};
use super::events::{BracketEvent, EventSink};
use super::lifecycle::round_completed;
use super::models::{
    MatchId, MatchResultOutcome, MatchStatus, Placement, ResultSubmission, TeamId, Tournament,
    TournamentId, TournamentMatch, TournamentStatus,
};
use crate::bracket::BracketKind;
use crate::db::{BracketRepository, BracketTransaction};
use chrono::Utc;
use std::sync::Arc;

/// Reject negative scores and ties
pub fn validate_scores(home_score: i32, away_score: i32) -> BracketResult<()> {
    if home_score < 0 {
        return Err(BracketError::InvalidScore(home_score));
    }
    if away_score < 0 {
        return Err(BracketError::InvalidScore(away_score));
    }
    if home_score == away_score {
        return Err(BracketError::TieNotAllowed(home_score));
    }
    Ok(())
}

/// True when `m` is the only match of the highest main-bracket round
async fn is_final(tx: &mut dyn BracketTransaction, m: &TournamentMatch) -> BracketResult<bool> {
    if m.bracket != BracketKind::Main || m.next_match_id.is_some() {
        return Ok(false);
    }

    let rounds = tx.list_rounds(m.tournament_id).await?;
    let Some(highest) = rounds
        .iter()
        .filter(|r| r.bracket == BracketKind::Main)
        .max_by_key(|r| r.round_number)
    else {
        return Ok(false);
    };
    if highest.id != m.round_id {
        return Ok(false);
    }

    Ok(tx.list_round_matches(highest.id).await?.len() == 1)
}

/// True when the winner of a losers-bracket match goes to the grand final
async fn feeds_main_bracket(
    tx: &mut dyn BracketTransaction,
    m: &TournamentMatch,
) -> BracketResult<bool> {
    let Some(next) = m.next_match_id else {
        return Ok(false);
    };
    Ok(tx
        .find_match(next)
        .await?
        .is_some_and(|next| next.bracket == BracketKind::Main))
}

/// Placements decided by `m`, applied to `tournament`. Returns whether the
/// tournament completed.
async fn decide_placements(
    tx: &mut dyn BracketTransaction,
    tournament: &mut Tournament,
    m: &TournamentMatch,
    placements: &mut Vec<Placement>,
) -> BracketResult<bool> {
    let (Some(winner), Some(loser)) = (m.winner_id, m.loser_id()) else {
        return Ok(false);
    };
    let mut place = |team_id: TeamId, placement: u32| {
        placements.push(Placement { team_id, placement });
    };

    match m.bracket {
        BracketKind::Consolation => {
            place(winner, 3);
            place(loser, 4);
            tournament.third_place_id = Some(winner);
            Ok(false)
        }
        BracketKind::Losers => {
            if feeds_main_bracket(tx, m).await? {
                place(loser, 3);
                tournament.third_place_id = Some(loser);
            }
            Ok(false)
        }
        BracketKind::Main => {
            if !is_final(tx, m).await? {
                return Ok(false);
            }
            place(winner, 1);
            place(loser, 2);
            tournament.winner_id = Some(winner);
            tournament.runner_up_id = Some(loser);
            tournament.status = TournamentStatus::Completed;
            tournament.completed_at = Some(Utc::now());
            Ok(true)
        }
    }
}

/// Records match results and advances the bracket
#[derive(Clone)]
pub struct MatchResultProcessor {
    repository: Arc<dyn BracketRepository>,
    events: Arc<dyn EventSink>,
}

impl MatchResultProcessor {
    pub fn new(repository: Arc<dyn BracketRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { repository, events }
    }

    /// Record the result of a scheduled match
    ///
    /// In one transaction: completes the match, refreshes its round, moves
    /// the winner (and in losers ladders and the consolation round, the
    /// loser) into the linked slots, and assigns placements. Events are
    /// published after commit.
    ///
    /// # Errors
    ///
    /// * `InvalidScore` / `TieNotAllowed` - rejected before anything is read
    /// * `TournamentNotFound` / `MatchNotFound` / `WrongTournament`
    /// * `InvalidState` - tournament not IN_PROGRESS (consolation matches
    ///   are still accepted once it is COMPLETED)
    /// * `AlreadyComplete` / `NotScheduled` - match status
    pub async fn record_result(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        submission: ResultSubmission,
    ) -> BracketResult<MatchResultOutcome> {
        validate_scores(submission.home_score, submission.away_score)?;

        let mut tx = self.repository.begin().await?;
        let mut tournament = tx
            .lock_tournament(tournament_id)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
        let mut m = tx
            .find_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;

        if m.tournament_id != tournament_id {
            return Err(BracketError::WrongTournament {
                match_id,
                tournament_id,
            });
        }

        let accepts_results = match tournament.status {
            TournamentStatus::InProgress => true,
            TournamentStatus::Completed => m.bracket == BracketKind::Consolation,
            TournamentStatus::Created | TournamentStatus::Cancelled => false,
        };
        if !accepts_results {
            return Err(BracketError::InvalidState {
                expected: TournamentStatus::InProgress,
                actual: tournament.status,
            });
        }

        match m.status {
            MatchStatus::Completed => return Err(BracketError::AlreadyComplete(match_id)),
            MatchStatus::Pending => return Err(BracketError::NotScheduled(match_id)),
            MatchStatus::Scheduled => {}
        }
        let (Some(home), Some(away)) = (m.home_team_id, m.away_team_id) else {
            return Err(BracketError::NotScheduled(match_id));
        };

        m.home_score = Some(submission.home_score);
        m.away_score = Some(submission.away_score);
        m.winner_id = Some(if submission.home_score > submission.away_score {
            home
        } else {
            away
        });
        m.status = MatchStatus::Completed;
        m.played_at = Some(Utc::now());
        m.notes = submission
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        tx.update_match(&m).await?;

        let completed_round = advancement::propagate(tx.as_mut(), &m).await?;

        let mut placements = Vec::new();
        let before = tournament.clone();
        let tournament_complete =
            decide_placements(tx.as_mut(), &mut tournament, &m, &mut placements).await?;
        for placement in &placements {
            tx.set_final_placement(placement.team_id, placement.placement)
                .await?;
        }
        if tournament != before {
            tx.update_tournament(&tournament).await?;
        }

        let final_standings = if tournament_complete {
            let mut standings: Vec<Placement> = tx
                .list_teams(tournament_id)
                .await?
                .into_iter()
                .filter_map(|team| {
                    team.final_placement.map(|placement| Placement {
                        team_id: team.id,
                        placement,
                    })
                })
                .collect();
            standings.sort_by_key(|p| p.placement);
            Some(standings)
        } else {
            None
        };

        tx.commit().await?;

        log::info!(
            "Recorded {}-{} in match {} of tournament {}",
            submission.home_score,
            submission.away_score,
            m.match_number,
            tournament_id
        );

        self.events.publish(&BracketEvent::MatchCompleted {
            tournament_id,
            match_id,
            match_number: m.match_number,
            bracket: m.bracket,
            home_team_id: m.home_team_id,
            away_team_id: m.away_team_id,
            home_score: m.home_score,
            away_score: m.away_score,
            winner_id: m.winner_id,
        });
        if let Some(round) = &completed_round {
            self.events.publish(&round_completed(round));
        }
        if let Some(standings) = final_standings {
            log::info!(
                "Tournament {} completed, winner team {:?}",
                tournament_id,
                tournament.winner_id
            );
            self.events.publish(&BracketEvent::TournamentCompleted {
                tournament_id,
                winner_id: tournament.winner_id,
                runner_up_id: tournament.runner_up_id,
                third_place_id: tournament.third_place_id,
                placements: standings,
            });
        }

        Ok(MatchResultOutcome {
            completed_match: m,
            round_complete: completed_round.is_some(),
            tournament_complete,
            placements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_scores() {
        assert!(validate_scores(2, 1).is_ok());
        assert!(validate_scores(0, 3).is_ok());
        assert!(matches!(
            validate_scores(-1, 2),
            Err(BracketError::InvalidScore(-1))
        ));
        assert!(matches!(
            validate_scores(1, -4),
            Err(BracketError::InvalidScore(-4))
        ));
        assert!(matches!(
            validate_scores(2, 2),
            Err(BracketError::TieNotAllowed(2))
        ));
    }
}
