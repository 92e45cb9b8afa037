use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::ParticipantRef;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 6;

/// One participant's result for one reported day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    // Older data files stored the participant under `user`.
    #[serde(alias = "user")]
    pub participant: ParticipantRef,
    pub score: u8,
    pub date: NaiveDate,
    #[serde(default)]
    pub is_winner: bool,
}

impl ScoreRecord {
    pub fn new(participant: ParticipantRef, score: u8, date: NaiveDate, is_winner: bool) -> Self {
        Self {
            participant,
            score,
            date,
            is_winner,
        }
    }

    pub fn is_valid_score(score: u8) -> bool {
        (MIN_SCORE..=MAX_SCORE).contains(&score)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ScoreRecordRow {
    pub record_id: Uuid,
    pub participant: String,
    pub score: i16,
    pub report_date: NaiveDate,
    pub is_winner: bool,
    pub position: i32,
    pub created_at: NaiveDateTime,
}

impl From<ScoreRecordRow> for ScoreRecord {
    fn from(row: ScoreRecordRow) -> Self {
        Self {
            participant: ParticipantRef::from_storage_key(&row.participant),
            // The column carries a CHECK (score BETWEEN 1 AND 6).
            score: row.score.clamp(MIN_SCORE as i16, MAX_SCORE as i16) as u8,
            date: row.report_date,
            is_winner: row.is_winner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_range() {
        assert!(!ScoreRecord::is_valid_score(0));
        assert!(ScoreRecord::is_valid_score(1));
        assert!(ScoreRecord::is_valid_score(6));
        assert!(!ScoreRecord::is_valid_score(7));
    }

    #[test]
    fn test_deserialize_legacy_user_field() {
        let json = r#"{"user": "unresolved_bela", "score": 3, "date": "2025-06-01", "is_winner": true}"#;
        let record: ScoreRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.participant, ParticipantRef::unresolved("bela"));
        assert_eq!(record.score, 3);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert!(record.is_winner);
    }

    #[test]
    fn test_serialize_date_as_iso() {
        let record = ScoreRecord::new(
            ParticipantRef::identified("111"),
            4,
            NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(),
            false,
        );
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["date"], "2025-01-09");
        assert_eq!(value["participant"], "111");
    }
}
