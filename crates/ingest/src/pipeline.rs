use chrono::NaiveDate;
use storage::ScoreStore;
use tracing::info;

use crate::Result;
use crate::directory::Directory;
use crate::parser::{ScoreReport, parse_report};

/// Parse a message and persist its scores in one step.
///
/// Messages that are not streak reports leave the store untouched and yield
/// `Ok(None)`.
pub async fn ingest_message<S>(
    text: &str,
    today: NaiveDate,
    directory: &Directory,
    store: &S,
) -> Result<Option<ScoreReport>>
where
    S: ScoreStore + ?Sized,
{
    let Some(report) = parse_report(text, today, directory) else {
        return Ok(None);
    };

    store.record_report(report.date, &report.records).await?;

    let unresolved = report
        .records
        .iter()
        .filter(|r| r.participant.is_unresolved())
        .count();
    info!(
        "Recorded {} score(s) for {} in {} store ({} unresolved)",
        report.records.len(),
        report.date,
        store.name(),
        unresolved
    );

    Ok(Some(report))
}
