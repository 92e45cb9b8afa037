use std::collections::HashMap;

use chrono::{Days, NaiveDate};

use crate::dto::stats::{
    DailyStats, LeaderboardEntry, RelativeEntry, ScoreBucket, Trend, TrendEntry,
};
use crate::models::{ParticipantRef, ScoreRecord, UserStats};

const RECENT_GAMES: usize = 3;

/// Fold records into per-participant counters, in order of first appearance
pub fn fold_stats(records: &[ScoreRecord]) -> Vec<(ParticipantRef, UserStats)> {
    let mut index: HashMap<&ParticipantRef, usize> = HashMap::new();
    let mut folded: Vec<(ParticipantRef, UserStats)> = Vec::new();

    for record in records {
        let slot = *index.entry(&record.participant).or_insert_with(|| {
            folded.push((record.participant.clone(), UserStats::default()));
            folded.len() - 1
        });
        folded[slot].1.record(record);
    }

    folded
}

pub fn daily_stats(records: &[ScoreRecord]) -> Option<DailyStats> {
    let mut scores: Vec<u8> = records.iter().map(|r| r.score).collect();
    if scores.is_empty() {
        return None;
    }
    scores.sort_unstable();

    let count = scores.len();
    let sum: u32 = scores.iter().map(|&s| u32::from(s)).sum();
    let median = if count % 2 == 1 {
        f64::from(scores[count / 2])
    } else {
        (f64::from(scores[count / 2 - 1]) + f64::from(scores[count / 2])) / 2.0
    };

    Some(DailyStats {
        average: f64::from(sum) / count as f64,
        median,
        best_score: scores[0],
        worst_score: scores[count - 1],
        total_players: count,
    })
}

/// Group a day's participants by score, best score first
pub fn score_breakdown(records: &[ScoreRecord]) -> Vec<ScoreBucket> {
    let mut buckets: Vec<ScoreBucket> = Vec::new();

    for record in records {
        match buckets.iter_mut().find(|b| b.score == record.score) {
            Some(bucket) => {
                bucket.participants.push(record.participant.clone());
                bucket.has_winner |= record.is_winner;
            }
            None => buckets.push(ScoreBucket {
                score: record.score,
                participants: vec![record.participant.clone()],
                has_winner: record.is_winner,
            }),
        }
    }

    buckets.sort_by_key(|b| b.score);
    buckets
}

/// Rank participants by average score, lowest (best) first. Ties keep the
/// order of `stats`.
pub fn leaderboard(stats: &[(ParticipantRef, UserStats)], limit: usize) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&(ParticipantRef, UserStats)> = stats.iter().collect();
    ranked.sort_by(|a, b| a.1.average().total_cmp(&b.1.average()));

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, (participant, stats))| LeaderboardEntry {
            rank: idx + 1,
            participant: participant.clone(),
            average: stats.average(),
            games_played: stats.games_played,
            win_rate: stats.win_rate(),
        })
        .collect()
}

/// Compare each score of a day with the day's average and with the
/// participant's overall average. Best relative result first.
pub fn relative_performance(
    records: &[ScoreRecord],
    stats: &[(ParticipantRef, UserStats)],
) -> Vec<RelativeEntry> {
    let Some(daily) = daily_stats(records) else {
        return Vec::new();
    };
    let personal: HashMap<&ParticipantRef, f64> =
        stats.iter().map(|(p, s)| (p, s.average())).collect();

    let mut entries: Vec<RelativeEntry> = records
        .iter()
        .map(|record| {
            let score = f64::from(record.score);
            let personal_average = personal.get(&record.participant).copied().unwrap_or(0.0);
            RelativeEntry {
                participant: record.participant.clone(),
                score: record.score,
                vs_daily: score - daily.average,
                vs_personal: score - personal_average,
            }
        })
        .collect();

    entries.sort_by(|a, b| a.vs_daily.total_cmp(&b.vs_daily));
    entries
}

/// Inclusive date range covering the `days` report days before `today`
pub fn recent_window(today: NaiveDate, days: u32) -> Option<(NaiveDate, NaiveDate)> {
    if days == 0 {
        return None;
    }
    let start = today.checked_sub_days(Days::new(u64::from(days)))?;
    let end = today.pred_opt()?;
    Some((start, end))
}

/// Per-participant trend over records ordered oldest first. Participants
/// with a single game in the window are left out.
pub fn recent_trends(records: &[ScoreRecord]) -> Vec<TrendEntry> {
    let mut index: HashMap<&ParticipantRef, usize> = HashMap::new();
    let mut games: Vec<(&ParticipantRef, Vec<u8>)> = Vec::new();

    for record in records {
        let slot = *index.entry(&record.participant).or_insert_with(|| {
            games.push((&record.participant, Vec::new()));
            games.len() - 1
        });
        games[slot].1.push(record.score);
    }

    games
        .into_iter()
        .filter(|(_, scores)| scores.len() >= 2)
        .map(|(participant, scores)| {
            let recent = &scores[scores.len().saturating_sub(RECENT_GAMES)..];
            let recent_average = mean(recent);
            let overall_average = mean(&scores);
            let trend = if recent_average > overall_average {
                Trend::Rising
            } else if recent_average < overall_average {
                Trend::Falling
            } else {
                Trend::Steady
            };

            TrendEntry {
                participant: participant.clone(),
                games: scores.len(),
                recent_average,
                overall_average,
                trend,
            }
        })
        .collect()
}

fn mean(scores: &[u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64
}
