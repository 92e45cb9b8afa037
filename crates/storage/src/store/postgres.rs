use std::collections::BTreeSet;

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::debug;

use super::ScoreStore;
use crate::error::{Result, StorageError};
use crate::models::{ParticipantRef, ScoreRecord, UserStats};
use crate::repository::score::ScoreRepository;
use crate::repository::stats::StatsRepository;
use crate::services::stats::fold_stats;

/// Postgres-backed store scoped to a single guild.
pub struct PgScoreStore {
    pool: PgPool,
    guild_id: String,
}

impl PgScoreStore {
    pub fn new(pool: PgPool, guild_id: impl Into<String>) -> Self {
        Self {
            pool,
            guild_id: guild_id.into(),
        }
    }

    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    fn scores(&self) -> ScoreRepository<'_> {
        ScoreRepository::new(&self.pool, &self.guild_id)
    }

    fn statistics(&self) -> StatsRepository<'_> {
        StatsRepository::new(&self.pool, &self.guild_id)
    }
}

#[async_trait::async_trait]
impl ScoreStore for PgScoreStore {
    async fn record_report(&self, date: NaiveDate, records: &[ScoreRecord]) -> Result<()> {
        if let Some(stray) = records.iter().find(|r| r.date != date) {
            return Err(StorageError::ConstraintViolation(format!(
                "record for {} dated {} in report of {}",
                stray.participant, stray.date, date
            )));
        }

        let scores = self.scores();
        let statistics = self.statistics();
        let mut tx = self.pool.begin().await?;

        let previous = scores.delete_for_date(date, &mut tx).await?;
        if !previous.is_empty() {
            debug!(
                "Replacing {} existing record(s) for {} in guild {}",
                previous.len(),
                date,
                self.guild_id
            );
        }
        for (participant, stats) in fold_stats(&previous) {
            statistics
                .apply_delta(&participant, &stats.negated(), &mut tx)
                .await?;
        }

        for (position, record) in records.iter().enumerate() {
            let position = i32::try_from(position).map_err(|_| {
                StorageError::ConstraintViolation(format!("too many records for {}", date))
            })?;
            scores.insert(record, position, &mut tx).await?;
        }
        for (participant, stats) in fold_stats(records) {
            statistics.apply_delta(&participant, &stats, &mut tx).await?;
        }

        statistics.delete_empty(&mut tx).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn scores_on(&self, date: NaiveDate) -> Result<Vec<ScoreRecord>> {
        self.scores().list_for_date(date).await
    }

    async fn scores_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ScoreRecord>> {
        self.scores().list_between(start, end).await
    }

    async fn stats(&self, participant: &ParticipantRef) -> Result<Option<UserStats>> {
        self.statistics().find(participant).await
    }

    async fn all_stats(&self) -> Result<Vec<(ParticipantRef, UserStats)>> {
        let rows = self.statistics().list().await?;

        Ok(rows
            .iter()
            .map(|row| {
                (
                    ParticipantRef::from_storage_key(&row.participant),
                    UserStats::from(row),
                )
            })
            .collect())
    }

    async fn participants_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: BTreeSet<String> = self
            .scores()
            .participants_with_prefix(prefix)
            .await?
            .into_iter()
            .collect();
        keys.extend(self.statistics().participants_with_prefix(prefix).await?);

        Ok(keys.into_iter().collect())
    }

    async fn rekey_participant(&self, from: &ParticipantRef, to: &ParticipantRef) -> Result<u64> {
        if from == to {
            return Ok(0);
        }

        let statistics = self.statistics();
        let mut tx = self.pool.begin().await?;

        let rewritten = self.scores().rekey(from, to, &mut tx).await?;
        if let Some(moved) = statistics.take(from, &mut tx).await? {
            statistics.apply_delta(to, &moved, &mut tx).await?;
        }

        tx.commit().await?;

        Ok(rewritten)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
