use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ScoreRecord;

/// Cumulative per-participant counters. Always equal to the fold of the
/// participant's stored score records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_score: i64,
    pub games_played: i64,
    pub wins: i64,
}

impl UserStats {
    pub fn record(&mut self, record: &ScoreRecord) {
        self.total_score += i64::from(record.score);
        self.games_played += 1;
        if record.is_winner {
            self.wins += 1;
        }
    }

    /// Reverses a previous [`UserStats::record`] of the same record.
    pub fn retract(&mut self, record: &ScoreRecord) {
        self.total_score -= i64::from(record.score);
        self.games_played -= 1;
        if record.is_winner {
            self.wins -= 1;
        }
    }

    pub fn merge(&mut self, other: &UserStats) {
        self.total_score += other.total_score;
        self.games_played += other.games_played;
        self.wins += other.wins;
    }

    pub fn negated(&self) -> UserStats {
        UserStats {
            total_score: -self.total_score,
            games_played: -self.games_played,
            wins: -self.wins,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.games_played <= 0
    }

    pub fn average(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.total_score as f64 / self.games_played as f64
    }

    /// Percentage of games won.
    pub fn win_rate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.wins as f64 / self.games_played as f64 * 100.0
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserStatsRow {
    pub participant: String,
    pub total_score: i64,
    pub games_played: i64,
    pub wins: i64,
}

impl From<&UserStatsRow> for UserStats {
    fn from(row: &UserStatsRow) -> Self {
        Self {
            total_score: row.total_score,
            games_played: row.games_played,
            wins: row.wins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParticipantRef;
    use chrono::NaiveDate;

    fn record(score: u8, is_winner: bool) -> ScoreRecord {
        ScoreRecord::new(
            ParticipantRef::identified("111"),
            score,
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            is_winner,
        )
    }

    #[test]
    fn test_record_updates_counters() {
        let mut stats = UserStats::default();
        stats.record(&record(3, true));
        stats.record(&record(5, false));

        assert_eq!(
            stats,
            UserStats {
                total_score: 8,
                games_played: 2,
                wins: 1
            }
        );
        assert_eq!(stats.average(), 4.0);
        assert_eq!(stats.win_rate(), 50.0);
    }

    #[test]
    fn test_retract_reverses_record() {
        let mut stats = UserStats::default();
        stats.record(&record(4, false));
        stats.record(&record(2, true));
        stats.retract(&record(2, true));

        assert_eq!(stats.total_score, 4);
        assert_eq!(stats.games_played, 1);
        assert_eq!(stats.wins, 0);
    }

    #[test]
    fn test_empty_stats_average_is_zero() {
        let stats = UserStats::default();
        assert!(stats.is_empty());
        assert_eq!(stats.average(), 0.0);
        assert_eq!(stats.win_rate(), 0.0);
    }

    #[test]
    fn test_merge_adds_counters() {
        let mut stats = UserStats {
            total_score: 7,
            games_played: 2,
            wins: 1,
        };
        stats.merge(&UserStats {
            total_score: 5,
            games_played: 1,
            wins: 0,
        });

        assert_eq!(stats.total_score, 12);
        assert_eq!(stats.games_played, 3);
        assert_eq!(stats.wins, 1);
    }
}
