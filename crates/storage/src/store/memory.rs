use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ScoreStore;
use crate::error::{Result, StorageError};
use crate::models::{ParticipantRef, ScoreRecord, UserStats};

/// Locations of the two JSON files backing a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct DataFiles {
    /// `{date: [record, ...]}`
    pub wordle_data: PathBuf,
    /// `{participant: {total_score, games_played, wins}}`
    pub user_stats: PathBuf,
    pub auto_save: bool,
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    scores: BTreeMap<NaiveDate, Vec<ScoreRecord>>,
    stats: BTreeMap<String, UserStats>,
}

/// Store kept in process memory, optionally mirrored to JSON files.
///
/// Both maps live behind one lock. Mutations are applied to a copy of the
/// ledger, which replaces the live one only once the files are written, so a
/// failed write leaves memory and disk as they were.
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
    files: Option<DataFiles>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            files: None,
        }
    }

    /// Load the data files, starting empty when they do not exist yet
    pub async fn open(files: DataFiles) -> Result<Self> {
        let scores: BTreeMap<NaiveDate, Vec<ScoreRecord>> =
            read_json_or_default(&files.wordle_data).await?;
        let stats: BTreeMap<String, UserStats> = read_json_or_default(&files.user_stats).await?;
        let stats = normalize_keys(stats);

        info!(
            "Loaded {} report day(s) and {} participant(s) from {}",
            scores.len(),
            stats.len(),
            files.wordle_data.display()
        );

        Ok(Self {
            ledger: Mutex::new(Ledger { scores, stats }),
            files: Some(files),
        })
    }

    /// Write both data files regardless of `auto_save`
    pub async fn save(&self) -> Result<()> {
        let ledger = self.ledger.lock().await;
        match &self.files {
            Some(files) => write_files(files, &ledger, None).await,
            None => Ok(()),
        }
    }

    /// Persist `next` when `auto_save` is on, then make it the live ledger
    async fn commit(&self, live: &mut Ledger, next: Ledger) -> Result<()> {
        if let Some(files) = self.files.as_ref().filter(|f| f.auto_save) {
            write_files(files, &next, Some(live)).await?;
        }
        *live = next;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} does not exist yet, starting empty", path.display());
            Ok(T::default())
        }
        Err(e) => Err(StorageError::Io(e)),
    }
}

/// Rewrite stats keys into their canonical storage form. Older files key
/// unresolved participants by the bare name.
fn normalize_keys(stats: BTreeMap<String, UserStats>) -> BTreeMap<String, UserStats> {
    let mut normalized: BTreeMap<String, UserStats> = BTreeMap::new();
    for (key, counters) in stats {
        normalized
            .entry(ParticipantRef::from_storage_key(&key).storage_key())
            .or_default()
            .merge(&counters);
    }
    normalized
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    PathBuf::from(staged)
}

async fn discard(paths: &[&Path]) {
    for path in paths {
        let _ = tokio::fs::remove_file(path).await;
    }
}

/// Stage both files next to their targets, then rename them into place.
/// When the stats rename fails after the scores file was replaced, the
/// scores file is rewritten from `previous`.
async fn write_files(files: &DataFiles, ledger: &Ledger, previous: Option<&Ledger>) -> Result<()> {
    let scores = serde_json::to_string_pretty(&ledger.scores)?;
    let stats = serde_json::to_string_pretty(&ledger.stats)?;

    let scores_tmp = staging_path(&files.wordle_data);
    let stats_tmp = staging_path(&files.user_stats);

    let staged = match tokio::fs::write(&scores_tmp, scores).await {
        Ok(()) => tokio::fs::write(&stats_tmp, stats).await,
        Err(e) => Err(e),
    };
    if let Err(e) = staged {
        discard(&[&scores_tmp, &stats_tmp]).await;
        return Err(e.into());
    }

    if let Err(e) = tokio::fs::rename(&scores_tmp, &files.wordle_data).await {
        discard(&[&scores_tmp, &stats_tmp]).await;
        return Err(e.into());
    }

    if let Err(e) = tokio::fs::rename(&stats_tmp, &files.user_stats).await {
        discard(&[&stats_tmp]).await;
        if let Some(previous) = previous {
            restore_scores(&files.wordle_data, previous).await;
        }
        return Err(e.into());
    }

    Ok(())
}

async fn restore_scores(path: &Path, previous: &Ledger) {
    let restored = match serde_json::to_string_pretty(&previous.scores) {
        Ok(content) => tokio::fs::write(path, content).await.map_err(StorageError::from),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = restored {
        warn!("Could not restore {}: {}", path.display(), e);
    }
}

fn apply(stats: &mut BTreeMap<String, UserStats>, key: String, delta: &UserStats) {
    let entry = stats.entry(key.clone()).or_default();
    entry.merge(delta);
    if entry.is_empty() {
        stats.remove(&key);
    }
}

#[async_trait::async_trait]
impl ScoreStore for MemoryStore {
    async fn record_report(&self, date: NaiveDate, records: &[ScoreRecord]) -> Result<()> {
        if let Some(stray) = records.iter().find(|r| r.date != date) {
            return Err(StorageError::ConstraintViolation(format!(
                "record for {} dated {} in report of {}",
                stray.participant, stray.date, date
            )));
        }

        let mut ledger = self.ledger.lock().await;
        let mut next = ledger.clone();

        if let Some(previous) = next.scores.remove(&date) {
            debug!("Replacing {} existing record(s) for {}", previous.len(), date);
            for record in &previous {
                let mut delta = UserStats::default();
                delta.retract(record);
                apply(&mut next.stats, record.participant.storage_key(), &delta);
            }
        }

        for record in records {
            next.stats
                .entry(record.participant.storage_key())
                .or_default()
                .record(record);
        }
        next.scores.insert(date, records.to_vec());

        self.commit(&mut ledger, next).await
    }

    async fn scores_on(&self, date: NaiveDate) -> Result<Vec<ScoreRecord>> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.scores.get(&date).cloned().unwrap_or_default())
    }

    async fn scores_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ScoreRecord>> {
        if start > end {
            return Ok(Vec::new());
        }

        let ledger = self.ledger.lock().await;
        Ok(ledger
            .scores
            .range(start..=end)
            .flat_map(|(_, records)| records.iter().cloned())
            .collect())
    }

    async fn stats(&self, participant: &ParticipantRef) -> Result<Option<UserStats>> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.stats.get(&participant.storage_key()).copied())
    }

    async fn all_stats(&self) -> Result<Vec<(ParticipantRef, UserStats)>> {
        let ledger = self.ledger.lock().await;
        Ok(ledger
            .stats
            .iter()
            .map(|(key, stats)| (ParticipantRef::from_storage_key(key), *stats))
            .collect())
    }

    async fn participants_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let ledger = self.ledger.lock().await;

        let mut keys: BTreeSet<String> = ledger
            .scores
            .values()
            .flatten()
            .map(|r| r.participant.storage_key())
            .filter(|key| key.starts_with(prefix))
            .collect();
        keys.extend(
            ledger
                .stats
                .keys()
                .filter(|key| key.starts_with(prefix))
                .cloned(),
        );

        Ok(keys.into_iter().collect())
    }

    async fn rekey_participant(&self, from: &ParticipantRef, to: &ParticipantRef) -> Result<u64> {
        if from == to {
            return Ok(0);
        }

        let mut ledger = self.ledger.lock().await;
        let mut next = ledger.clone();

        let mut rewritten = 0u64;
        for record in next.scores.values_mut().flatten() {
            if &record.participant == from {
                record.participant = to.clone();
                rewritten += 1;
            }
        }

        if let Some(moved) = next.stats.remove(&from.storage_key()) {
            next.stats.entry(to.storage_key()).or_default().merge(&moved);
        }

        self.commit(&mut ledger, next).await?;

        Ok(rewritten)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
