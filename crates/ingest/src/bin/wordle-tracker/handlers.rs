use chrono::NaiveDate;
use ingest::{Directory, display_name, ingest_message, reresolve_all, resolve};
use std::path::PathBuf;
use storage::ScoreStore;
use storage::dto::stats::Trend;
use storage::models::ParticipantRef;
use storage::services::stats;
use tokio::io::AsyncReadExt;

use crate::Backend;

const LEADERBOARD_SIZE: usize = 10;

pub async fn handle_ingest(
    file: Option<PathBuf>,
    today: NaiveDate,
    directory: &Directory,
    backend: &Backend,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = match file {
        Some(path) => {
            tracing::debug!("Reading message from {}", path.display());
            tokio::fs::read_to_string(&path).await?
        }
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            text
        }
    };

    match ingest_message(&text, today, directory, backend.store()).await? {
        Some(report) => {
            tracing::info!(
                "✓ Recorded {} score(s) for {}",
                report.records.len(),
                report.date
            );
            backend.report_unsaved();
        }
        None => tracing::info!("Not a streak report, nothing recorded"),
    }

    Ok(())
}

pub async fn handle_reresolve(
    directory: &Directory,
    backend: &Backend,
) -> Result<(), Box<dyn std::error::Error>> {
    if directory.is_empty() {
        tracing::warn!("Directory is empty, pass --members to resolve participants");
        return Ok(());
    }

    let upgraded = reresolve_all(directory, backend.store()).await?;
    tracing::info!("✓ Resolved {} participant(s)", upgraded);
    if upgraded > 0 {
        backend.report_unsaved();
    }

    Ok(())
}

pub async fn handle_stats(
    user: Option<String>,
    directory: &Directory,
    store: &dyn ScoreStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(user) = user else {
        return print_leaderboard(directory, store).await;
    };

    let mut found = None;
    for candidate in [resolve(directory, &user), ParticipantRef::from_storage_key(&user)] {
        if let Some(user_stats) = store.stats(&candidate).await? {
            found = Some((candidate, user_stats));
            break;
        }
    }

    match found {
        Some((participant, user_stats)) => {
            tracing::info!("Stats for {}:", display_name(directory, &participant));
            tracing::info!("  Games played: {}", user_stats.games_played);
            tracing::info!("  Average score: {:.2}", user_stats.average());
            tracing::info!(
                "  Wins: {} ({:.1}%)",
                user_stats.wins,
                user_stats.win_rate()
            );
        }
        None => tracing::warn!("No statistics for '{}'", user),
    }

    Ok(())
}

async fn print_leaderboard(
    directory: &Directory,
    store: &dyn ScoreStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let all_stats = store.all_stats().await?;
    if all_stats.is_empty() {
        tracing::info!("No games recorded yet");
        return Ok(());
    }

    tracing::info!("Leaderboard (by average score):");
    for entry in stats::leaderboard(&all_stats, LEADERBOARD_SIZE) {
        tracing::info!(
            "  {}. {}: {:.2} avg ({} games, {:.1}% wins)",
            entry.rank,
            display_name(directory, &entry.participant),
            entry.average,
            entry.games_played,
            entry.win_rate
        );
    }

    Ok(())
}

pub async fn handle_daily(
    date: NaiveDate,
    directory: &Directory,
    store: &dyn ScoreStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = store.scores_on(date).await?;
    let Some(daily) = stats::daily_stats(&records) else {
        tracing::info!("No scores recorded for {}", date);
        return Ok(());
    };

    tracing::info!("Results for {}:", date);
    tracing::info!("  Players: {}", daily.total_players);
    tracing::info!("  Average: {:.2}", daily.average);
    tracing::info!("  Median: {:.1}", daily.median);
    tracing::info!("  Best: {}/6, worst: {}/6", daily.best_score, daily.worst_score);

    for bucket in stats::score_breakdown(&records) {
        let names: Vec<String> = bucket
            .participants
            .iter()
            .map(|p| display_name(directory, p))
            .collect();
        let crown = if bucket.has_winner { "👑 " } else { "" };
        tracing::info!("  {}{}/6: {}", crown, bucket.score, names.join(", "));
    }

    Ok(())
}

pub async fn handle_relative(
    date: NaiveDate,
    directory: &Directory,
    store: &dyn ScoreStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = store.scores_on(date).await?;
    if records.is_empty() {
        tracing::info!("No scores recorded for {}", date);
        return Ok(());
    }

    let all_stats = store.all_stats().await?;
    tracing::info!("Relative performance for {}:", date);
    for entry in stats::relative_performance(&records, &all_stats) {
        tracing::info!(
            "  {}: {}/6 ({:+.2} vs day, {:+.2} vs personal avg)",
            display_name(directory, &entry.participant),
            entry.score,
            entry.vs_daily,
            entry.vs_personal
        );
    }

    Ok(())
}

pub async fn handle_recent(
    days: u32,
    today: NaiveDate,
    directory: &Directory,
    store: &dyn ScoreStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let (start, end) = stats::recent_window(today, days)
        .ok_or_else(|| format!("Cannot build a {} day window before {}", days, today))?;

    let records = store.scores_between(start, end).await?;
    let trends = stats::recent_trends(&records);
    if trends.is_empty() {
        tracing::info!("Not enough games between {} and {}", start, end);
        return Ok(());
    }

    tracing::info!("Recent performance ({} to {}):", start, end);
    for entry in trends {
        let label = match entry.trend {
            Trend::Falling => "improving",
            Trend::Rising => "declining",
            Trend::Steady => "steady",
        };
        tracing::info!(
            "  {}: last {:.2} vs {:.2} over {} games ({})",
            display_name(directory, &entry.participant),
            entry.recent_average,
            entry.overall_average,
            entry.games,
            label
        );
    }

    Ok(())
}
