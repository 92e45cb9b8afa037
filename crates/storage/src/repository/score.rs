use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::Result;
use crate::models::{ParticipantRef, ScoreRecord, ScoreRecordRow};

const SCORE_COLUMNS: &str =
    "record_id, participant, score, report_date, is_winner, position, created_at";

/// Repository for per-day score records of one guild
pub struct ScoreRepository<'a> {
    pool: &'a PgPool,
    guild_id: &'a str,
}

impl<'a> ScoreRepository<'a> {
    pub fn new(pool: &'a PgPool, guild_id: &'a str) -> Self {
        Self { pool, guild_id }
    }

    /// List the records reported for one day, in report order
    pub async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<ScoreRecord>> {
        let rows = sqlx::query_as::<_, ScoreRecordRow>(&format!(
            r#"
            SELECT {SCORE_COLUMNS}
            FROM score_records
            WHERE guild_id = $1 AND report_date = $2
            ORDER BY position
            "#
        ))
        .bind(self.guild_id)
        .bind(date)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ScoreRecord::from).collect())
    }

    /// List the records of an inclusive date range, oldest day first
    pub async fn list_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ScoreRecord>> {
        let rows = sqlx::query_as::<_, ScoreRecordRow>(&format!(
            r#"
            SELECT {SCORE_COLUMNS}
            FROM score_records
            WHERE guild_id = $1 AND report_date BETWEEN $2 AND $3
            ORDER BY report_date, position
            "#
        ))
        .bind(self.guild_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ScoreRecord::from).collect())
    }

    /// Distinct participant keys starting with `prefix`
    pub async fn participants_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        // starts_with() instead of LIKE: the unresolved prefix contains '_'
        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT participant
            FROM score_records
            WHERE guild_id = $1 AND starts_with(participant, $2)
            ORDER BY participant
            "#,
        )
        .bind(self.guild_id)
        .bind(prefix)
        .fetch_all(self.pool)
        .await?;

        Ok(keys)
    }

    /// Delete a day's records, returning what was removed
    pub async fn delete_for_date(
        &self,
        date: NaiveDate,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<ScoreRecord>> {
        let rows = sqlx::query_as::<_, ScoreRecordRow>(&format!(
            r#"
            DELETE FROM score_records
            WHERE guild_id = $1 AND report_date = $2
            RETURNING {SCORE_COLUMNS}
            "#
        ))
        .bind(self.guild_id)
        .bind(date)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows.into_iter().map(ScoreRecord::from).collect())
    }

    /// `position` is the record's index within its report day
    pub async fn insert(
        &self,
        record: &ScoreRecord,
        position: i32,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO score_records (guild_id, participant, score, report_date, is_winner, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(self.guild_id)
        .bind(record.participant.storage_key())
        .bind(i16::from(record.score))
        .bind(record.date)
        .bind(record.is_winner)
        .bind(position)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Point every record of `from` at `to`, returning the number of rows rewritten
    pub async fn rekey(
        &self,
        from: &ParticipantRef,
        to: &ParticipantRef,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE score_records
            SET participant = $3
            WHERE guild_id = $1 AND participant = $2
            "#,
        )
        .bind(self.guild_id)
        .bind(from.storage_key())
        .bind(to.storage_key())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}
