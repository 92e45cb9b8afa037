mod memory;
mod postgres;

pub use memory::{DataFiles, MemoryStore};
pub use postgres::PgScoreStore;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{ParticipantRef, ScoreRecord, UserStats};

/// The persistence collaborator behind ingestion, reporting and
/// re-resolution.
///
/// One store owns both the per-day score records and the per-participant
/// statistics so that changes touching both (recording a day, rekeying a
/// participant) are applied as a single unit.
#[async_trait::async_trait]
pub trait ScoreStore: Send + Sync {
    /// Store the records of one report day. Records already stored for that
    /// day are replaced and their contribution is removed from the
    /// statistics before the new records are added.
    async fn record_report(&self, date: NaiveDate, records: &[ScoreRecord]) -> Result<()>;

    async fn scores_on(&self, date: NaiveDate) -> Result<Vec<ScoreRecord>>;

    /// Records of the inclusive range, oldest day first.
    async fn scores_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ScoreRecord>>;

    async fn stats(&self, participant: &ParticipantRef) -> Result<Option<UserStats>>;

    async fn all_stats(&self) -> Result<Vec<(ParticipantRef, UserStats)>>;

    /// Distinct participant keys, across records and statistics, whose
    /// serialized form starts with `prefix`.
    async fn participants_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Move everything recorded under `from` to `to`. Statistics already held
    /// by `to` are merged. Returns the number of score records rewritten.
    async fn rekey_participant(&self, from: &ParticipantRef, to: &ParticipantRef) -> Result<u64>;

    fn name(&self) -> &'static str;
}
