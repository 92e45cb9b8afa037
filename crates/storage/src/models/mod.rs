mod participant;
mod score_record;
mod user_stats;

pub use participant::{ParticipantRef, UNRESOLVED_PREFIX, is_platform_id};
pub use score_record::{MAX_SCORE, MIN_SCORE, ScoreRecord, ScoreRecordRow};
pub use user_stats::{UserStats, UserStatsRow};
