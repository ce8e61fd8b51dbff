//! Winner advancement shared by result recording and bye resolution.

use super::errors::{BracketError, BracketResult};
use super::models::{
    MatchId, MatchStatus, RoundId, TeamId, TournamentId, TournamentMatch, TournamentRound,
};
use crate::bracket::Slot;
use crate::db::BracketTransaction;

/// Write `team_id` into `slot` of match `target`.
///
/// A filled slot is never overwritten. The match becomes SCHEDULED once both
/// slots hold a team.
pub(crate) async fn fill_slot(
    tx: &mut dyn BracketTransaction,
    target: MatchId,
    slot: Slot,
    team_id: TeamId,
) -> BracketResult<TournamentMatch> {
    let mut m = tx
        .find_match(target)
        .await?
        .ok_or(BracketError::MatchNotFound(target))?;

    if m.team(slot).is_some() {
        return Err(BracketError::SlotOccupied {
            match_id: target,
            slot,
        });
    }

    m.set_team(slot, team_id);
    if m.status == MatchStatus::Pending && m.has_both_teams() {
        m.status = MatchStatus::Scheduled;
    }
    tx.update_match(&m).await?;

    log::debug!(
        "Team {} advanced into match {} ({})",
        team_id,
        m.match_number,
        slot.as_str()
    );
    Ok(m)
}

/// Mark the round complete if every match in it is. Returns the round when
/// this call completed it.
pub(crate) async fn refresh_round_completion(
    tx: &mut dyn BracketTransaction,
    round_id: RoundId,
) -> BracketResult<Option<TournamentRound>> {
    let Some(mut round) = tx.find_round(round_id).await? else {
        return Ok(None);
    };
    if round.is_complete {
        return Ok(None);
    }

    let matches = tx.list_round_matches(round_id).await?;
    if matches.is_empty() || !matches.iter().all(TournamentMatch::is_complete) {
        return Ok(None);
    }

    tx.set_round_complete(round_id, true).await?;
    round.is_complete = true;
    log::debug!("Round {} ({}) complete", round.name, round.bracket);
    Ok(Some(round))
}

/// Push a completed match's teams along its edges and refresh its round.
///
/// Returns the round completed by this match, if any.
pub(crate) async fn propagate(
    tx: &mut dyn BracketTransaction,
    completed: &TournamentMatch,
) -> BracketResult<Option<TournamentRound>> {
    let round = refresh_round_completion(tx, completed.round_id).await?;

    if let (Some(next), Some(slot), Some(winner)) =
        (completed.next_match_id, completed.next_slot, completed.winner_id)
    {
        fill_slot(tx, next, slot, winner).await?;
    }

    if let (Some(next), Some(slot), Some(loser)) = (
        completed.loser_match_id,
        completed.loser_slot,
        completed.loser_id(),
    ) {
        fill_slot(tx, next, slot, loser).await?;
    }

    Ok(round)
}

/// Complete any bye match still open in storage, advancing its sole team.
///
/// Generated byes are stored completed, so this normally finds nothing.
///
/// Repeats until a pass finds nothing left to resolve, so a bye whose team
/// only arrives through another bye is resolved too. Returns the rounds
/// completed along the way.
pub(crate) async fn resolve_byes(
    tx: &mut dyn BracketTransaction,
    tournament_id: TournamentId,
) -> BracketResult<Vec<TournamentRound>> {
    let mut completed_rounds = Vec::new();
    let mut resolved = 0usize;

    loop {
        let pending: Vec<TournamentMatch> = tx
            .list_matches(tournament_id)
            .await?
            .into_iter()
            .filter(|m| m.is_bye && !m.is_complete())
            .collect();

        let mut progressed = false;
        for mut m in pending {
            let Some(team) = m.home_team_id.or(m.away_team_id) else {
                continue;
            };
            m.winner_id = Some(team);
            m.status = MatchStatus::Completed;
            tx.update_match(&m).await?;

            if let Some(round) = propagate(tx, &m).await? {
                completed_rounds.push(round);
            }
            resolved += 1;
            progressed = true;
        }

        if !progressed {
            break;
        }
    }

    if resolved > 0 {
        log::debug!(
            "Resolved {} byes in tournament {}",
            resolved,
            tournament_id
        );
    }
    Ok(completed_rounds)
}
