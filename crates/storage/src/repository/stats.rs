use sqlx::{PgPool, Postgres, Transaction};

use crate::error::Result;
use crate::models::{ParticipantRef, UserStats, UserStatsRow};

/// Repository for the aggregate statistics of one guild
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
    guild_id: &'a str,
}

impl<'a> StatsRepository<'a> {
    pub fn new(pool: &'a PgPool, guild_id: &'a str) -> Self {
        Self { pool, guild_id }
    }

    pub async fn find(&self, participant: &ParticipantRef) -> Result<Option<UserStats>> {
        let row = sqlx::query_as::<_, UserStatsRow>(
            r#"
            SELECT participant, total_score, games_played, wins
            FROM user_stats
            WHERE guild_id = $1 AND participant = $2
            "#,
        )
        .bind(self.guild_id)
        .bind(participant.storage_key())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.as_ref().map(UserStats::from))
    }

    pub async fn list(&self) -> Result<Vec<UserStatsRow>> {
        let rows = sqlx::query_as::<_, UserStatsRow>(
            r#"
            SELECT participant, total_score, games_played, wins
            FROM user_stats
            WHERE guild_id = $1
            ORDER BY participant
            "#,
        )
        .bind(self.guild_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn participants_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT participant
            FROM user_stats
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

    /// Add `delta` to the participant's counters, creating the row if needed.
    /// Negative counters are used to retract previously recorded scores.
    pub async fn apply_delta(
        &self,
        participant: &ParticipantRef,
        delta: &UserStats,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_stats (guild_id, participant, total_score, games_played, wins)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (guild_id, participant)
            DO UPDATE SET
                total_score = user_stats.total_score + EXCLUDED.total_score,
                games_played = user_stats.games_played + EXCLUDED.games_played,
                wins = user_stats.wins + EXCLUDED.wins,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(self.guild_id)
        .bind(participant.storage_key())
        .bind(delta.total_score)
        .bind(delta.games_played)
        .bind(delta.wins)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Remove and return a participant's counters
    pub async fn take(
        &self,
        participant: &ParticipantRef,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<UserStats>> {
        let row = sqlx::query_as::<_, UserStatsRow>(
            r#"
            DELETE FROM user_stats
            WHERE guild_id = $1 AND participant = $2
            RETURNING participant, total_score, games_played, wins
            "#,
        )
        .bind(self.guild_id)
        .bind(participant.storage_key())
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.as_ref().map(UserStats::from))
    }

    /// Drop rows left without any game after a retraction
    pub async fn delete_empty(&self, tx: &mut Transaction<'_, Postgres>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_stats WHERE guild_id = $1 AND games_played <= 0")
            .bind(self.guild_id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }
}
