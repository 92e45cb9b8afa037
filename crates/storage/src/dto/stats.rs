use serde::Serialize;

use crate::models::ParticipantRef;

/// Summary of one report day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub average: f64,
    pub median: f64,
    pub best_score: u8,
    pub worst_score: u8,
    pub total_players: usize,
}

/// Participants of one day grouped under the score they achieved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBucket {
    pub score: u8,
    pub participants: Vec<ParticipantRef>,
    pub has_winner: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub participant: ParticipantRef,
    pub average: f64,
    pub games_played: i64,
    pub win_rate: f64,
}

/// A day's score compared with the day's average and the participant's own
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelativeEntry {
    pub participant: ParticipantRef,
    pub score: u8,
    pub vs_daily: f64,
    pub vs_personal: f64,
}

/// Direction of the recent average against the window average. Scores go
/// down as a player improves, so `Falling` is the good direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Steady,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendEntry {
    pub participant: ParticipantRef,
    pub games: usize,
    /// Average of the last three games of the window
    pub recent_average: f64,
    pub overall_average: f64,
    pub trend: Trend,
}
