//! PostgreSQL bracket store.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::repository::{
    BracketRepository, BracketTransaction, MatchRepository, RoundRepository, TeamRepository,
    TournamentRepository,
};
use super::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_default_timeout, with_timeout};
use crate::bracket::Slot;
use crate::tournament::{
    BracketError, BracketResult, MatchId, NewMatch, NewRound, NewTeam, NewTournament, RoundId,
    TeamId, Tournament, TournamentId, TournamentMatch, TournamentRound, TournamentStatus,
    TournamentTeam,
};

const TOURNAMENT_COLUMNS: &str = "id, name, format, status, has_consolation_bracket, random_byes, \
     max_teams, winner_id, runner_up_id, third_place_id, created_at, started_at, completed_at";

const TEAM_COLUMNS: &str = "id, tournament_id, external_team_ref, seed, final_placement";

const ROUND_COLUMNS: &str = "id, tournament_id, round_number, name, bracket, is_complete";

const MATCH_COLUMNS: &str = "id, tournament_id, round_id, match_number, bracket, home_team_id, \
     away_team_id, home_score, away_score, winner_id, status, next_match_id, next_slot, \
     loser_match_id, loser_slot, is_bye, played_at, notes";

fn utc(value: Option<NaiveDateTime>) -> Option<DateTime<Utc>> {
    value.map(|dt| dt.and_utc())
}

fn naive(value: Option<DateTime<Utc>>) -> Option<NaiveDateTime> {
    value.map(|dt| dt.naive_utc())
}

fn slot(row: &PgRow, column: &str) -> BracketResult<Option<Slot>> {
    Ok(row
        .get::<Option<String>, _>(column)
        .map(|s| s.parse())
        .transpose()?)
}

fn tournament_from_row(row: &PgRow) -> BracketResult<Tournament> {
    Ok(Tournament {
        id: row.get("id"),
        name: row.get("name"),
        format: row.get::<String, _>("format").parse()?,
        status: row.get::<String, _>("status").parse()?,
        has_consolation_bracket: row.get("has_consolation_bracket"),
        random_byes: row.get("random_byes"),
        max_teams: row.get::<Option<i32>, _>("max_teams").map(|v| v as u32),
        winner_id: row.get("winner_id"),
        runner_up_id: row.get("runner_up_id"),
        third_place_id: row.get("third_place_id"),
        created_at: row.get::<NaiveDateTime, _>("created_at").and_utc(),
        started_at: utc(row.get("started_at")),
        completed_at: utc(row.get("completed_at")),
    })
}

fn team_from_row(row: &PgRow) -> TournamentTeam {
    TournamentTeam {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        external_team_ref: row.get("external_team_ref"),
        seed: row.get::<i32, _>("seed") as u32,
        final_placement: row.get::<Option<i32>, _>("final_placement").map(|p| p as u32),
    }
}

fn round_from_row(row: &PgRow) -> BracketResult<TournamentRound> {
    Ok(TournamentRound {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        round_number: row.get::<i32, _>("round_number") as u32,
        name: row.get("name"),
        bracket: row.get::<String, _>("bracket").parse()?,
        is_complete: row.get("is_complete"),
    })
}

fn match_from_row(row: &PgRow) -> BracketResult<TournamentMatch> {
    Ok(TournamentMatch {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        round_id: row.get("round_id"),
        match_number: row.get::<i32, _>("match_number") as u32,
        bracket: row.get::<String, _>("bracket").parse()?,
        home_team_id: row.get("home_team_id"),
        away_team_id: row.get("away_team_id"),
        home_score: row.get("home_score"),
        away_score: row.get("away_score"),
        winner_id: row.get("winner_id"),
        status: row.get::<String, _>("status").parse()?,
        next_match_id: row.get("next_match_id"),
        next_slot: slot(row, "next_slot")?,
        loser_match_id: row.get("loser_match_id"),
        loser_slot: slot(row, "loser_slot")?,
        is_bye: row.get("is_bye"),
        played_at: utc(row.get("played_at")),
        notes: row.get("notes"),
    })
}

/// Bracket repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgBracketRepository {
    pool: PgPool,
}

impl PgBracketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BracketRepository for PgBracketRepository {
    async fn begin(&self) -> BracketResult<Box<dyn BracketTransaction>> {
        let tx = with_timeout(DEFAULT_TRANSACTION_TIMEOUT, self.pool.begin()).await?;
        Ok(Box::new(PgTransaction {
            tx,
            reseeded: Vec::new(),
        }))
    }
}

/// Open PostgreSQL transaction
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
    /// Teams whose seed changed; checked for duplicates before commit
    reseeded: Vec<TeamId>,
}

impl PgTransaction {
    async fn duplicate_seed(&mut self) -> BracketResult<Option<u32>> {
        if self.reseeded.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(
            r#"
            SELECT seed
            FROM tournament_teams
            WHERE tournament_id IN (SELECT tournament_id FROM tournament_teams WHERE id = ANY($1))
            GROUP BY tournament_id, seed
            HAVING COUNT(*) > 1
            ORDER BY seed
            LIMIT 1
            "#,
        )
        .bind(&self.reseeded)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|row| row.get::<i32, _>("seed") as u32))
    }
}

#[async_trait]
impl TournamentRepository for PgTransaction {
    async fn insert_tournament(&mut self, new: &NewTournament) -> BracketResult<Tournament> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO tournaments (name, format, status, has_consolation_bracket, random_byes, max_teams)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TOURNAMENT_COLUMNS}
            "#
        ))
        .bind(new.name.trim())
        .bind(new.format.as_str())
        .bind(TournamentStatus::Created.as_str())
        .bind(new.has_consolation_bracket)
        .bind(new.random_byes)
        .bind(new.max_teams.map(|v| v as i32))
        .fetch_one(&mut *self.tx)
        .await?;

        tournament_from_row(&row)
    }

    async fn find_tournament(&mut self, id: TournamentId) -> BracketResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn lock_tournament(&mut self, id: TournamentId) -> BracketResult<Option<Tournament>> {
        let query = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 FOR UPDATE");
        let row = with_timeout(
            DEFAULT_TRANSACTION_TIMEOUT,
            sqlx::query(&query).bind(id).fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn update_tournament(&mut self, tournament: &Tournament) -> BracketResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tournaments
            SET status = $1, winner_id = $2, runner_up_id = $3, third_place_id = $4,
                started_at = $5, completed_at = $6
            WHERE id = $7
            "#,
        )
        .bind(tournament.status.as_str())
        .bind(tournament.winner_id)
        .bind(tournament.runner_up_id)
        .bind(tournament.third_place_id)
        .bind(naive(tournament.started_at))
        .bind(naive(tournament.completed_at))
        .bind(tournament.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BracketError::TournamentNotFound(tournament.id));
        }
        Ok(())
    }
}

#[async_trait]
impl TeamRepository for PgTransaction {
    async fn insert_team(&mut self, new: &NewTeam) -> BracketResult<TournamentTeam> {
        let row = with_default_timeout(
            sqlx::query(&format!(
                r#"
                INSERT INTO tournament_teams (tournament_id, external_team_ref, seed)
                VALUES ($1, $2, $3)
                RETURNING {TEAM_COLUMNS}
                "#
            ))
            .bind(new.tournament_id)
            .bind(&new.external_team_ref)
            .bind(new.seed as i32)
            .fetch_one(&mut *self.tx),
        )
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                BracketError::TeamAlreadyRegistered(new.external_team_ref.clone())
            } else {
                BracketError::Timeout(e)
            }
        })?;

        Ok(team_from_row(&row))
    }

    async fn list_teams(
        &mut self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<TournamentTeam>> {
        let rows = sqlx::query(&format!(
            "SELECT {TEAM_COLUMNS} FROM tournament_teams WHERE tournament_id = $1 ORDER BY seed, id"
        ))
        .bind(tournament_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.iter().map(team_from_row).collect())
    }

    async fn delete_team(&mut self, team_id: TeamId) -> BracketResult<()> {
        sqlx::query("DELETE FROM tournament_teams WHERE id = $1")
            .bind(team_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_seeds(&mut self, seeds: &[(TeamId, u32)]) -> BracketResult<()> {
        for &(team_id, seed) in seeds {
            sqlx::query("UPDATE tournament_teams SET seed = $1 WHERE id = $2")
                .bind(seed as i32)
                .bind(team_id)
                .execute(&mut *self.tx)
                .await?;
            self.reseeded.push(team_id);
        }
        Ok(())
    }

    async fn set_final_placement(
        &mut self,
        team_id: TeamId,
        placement: u32,
    ) -> BracketResult<()> {
        sqlx::query("UPDATE tournament_teams SET final_placement = $1 WHERE id = $2")
            .bind(placement as i32)
            .bind(team_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RoundRepository for PgTransaction {
    async fn insert_round(&mut self, new: &NewRound) -> BracketResult<TournamentRound> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO tournament_rounds (tournament_id, round_number, name, bracket)
            VALUES ($1, $2, $3, $4)
            RETURNING {ROUND_COLUMNS}
            "#
        ))
        .bind(new.tournament_id)
        .bind(new.round_number as i32)
        .bind(&new.name)
        .bind(new.bracket.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        round_from_row(&row)
    }

    async fn list_rounds(
        &mut self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<TournamentRound>> {
        let rows = sqlx::query(&format!(
            "SELECT {ROUND_COLUMNS} FROM tournament_rounds WHERE tournament_id = $1"
        ))
        .bind(tournament_id)
        .fetch_all(&mut *self.tx)
        .await?;

        // Bracket order is the enum order, not the text order
        let mut rounds = rows
            .iter()
            .map(round_from_row)
            .collect::<BracketResult<Vec<_>>>()?;
        rounds.sort_by_key(|r| (r.bracket, r.round_number));
        Ok(rounds)
    }

    async fn find_round(&mut self, id: RoundId) -> BracketResult<Option<TournamentRound>> {
        let row = sqlx::query(&format!(
            "SELECT {ROUND_COLUMNS} FROM tournament_rounds WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(round_from_row).transpose()
    }

    async fn set_round_complete(&mut self, id: RoundId, is_complete: bool) -> BracketResult<()> {
        sqlx::query("UPDATE tournament_rounds SET is_complete = $1 WHERE id = $2")
            .bind(is_complete)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MatchRepository for PgTransaction {
    async fn insert_match(&mut self, new: &NewMatch) -> BracketResult<TournamentMatch> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO tournament_matches
                (tournament_id, round_id, match_number, bracket, home_team_id, away_team_id,
                 winner_id, status, is_bye)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {MATCH_COLUMNS}
            "#
        ))
        .bind(new.tournament_id)
        .bind(new.round_id)
        .bind(new.match_number as i32)
        .bind(new.bracket.as_str())
        .bind(new.home_team_id)
        .bind(new.away_team_id)
        .bind(new.winner_id)
        .bind(new.status.as_str())
        .bind(new.is_bye)
        .fetch_one(&mut *self.tx)
        .await?;

        match_from_row(&row)
    }

    async fn find_match(&mut self, id: MatchId) -> BracketResult<Option<TournamentMatch>> {
        let row = with_default_timeout(
            sqlx::query(&format!(
                "SELECT {MATCH_COLUMNS} FROM tournament_matches WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&mut *self.tx),
        )
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_matches(
        &mut self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<TournamentMatch>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM tournament_matches WHERE tournament_id = $1 ORDER BY match_number"
        ))
        .bind(tournament_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn list_round_matches(
        &mut self,
        round_id: RoundId,
    ) -> BracketResult<Vec<TournamentMatch>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM tournament_matches WHERE round_id = $1 ORDER BY match_number"
        ))
        .bind(round_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn update_match(&mut self, m: &TournamentMatch) -> BracketResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tournament_matches
            SET home_team_id = $1, away_team_id = $2, home_score = $3, away_score = $4,
                winner_id = $5, status = $6, next_match_id = $7, next_slot = $8,
                loser_match_id = $9, loser_slot = $10, played_at = $11, notes = $12
            WHERE id = $13
            "#,
        )
        .bind(m.home_team_id)
        .bind(m.away_team_id)
        .bind(m.home_score)
        .bind(m.away_score)
        .bind(m.winner_id)
        .bind(m.status.as_str())
        .bind(m.next_match_id)
        .bind(m.next_slot.map(|s| s.as_str()))
        .bind(m.loser_match_id)
        .bind(m.loser_slot.map(|s| s.as_str()))
        .bind(naive(m.played_at))
        .bind(&m.notes)
        .bind(m.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BracketError::MatchNotFound(m.id));
        }
        Ok(())
    }
}

#[async_trait]
impl BracketTransaction for PgTransaction {
    async fn commit(self: Box<Self>) -> BracketResult<()> {
        let mut this = *self;
        if let Some(seed) = this.duplicate_seed().await? {
            // Dropping the transaction rolls it back
            return Err(BracketError::SeedConflict(seed));
        }

        with_timeout(DEFAULT_TRANSACTION_TIMEOUT, this.tx.commit()).await?;
        Ok(())
    }
}
