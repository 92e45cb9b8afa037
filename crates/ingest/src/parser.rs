use std::ops::Range;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use storage::models::{ParticipantRef, ScoreRecord};
use tracing::{debug, info, warn};

use crate::directory::Directory;
use crate::resolver::resolve;
use crate::{IngestError, Result};

lazy_static! {
    static ref STREAK_PATTERN: Regex =
        Regex::new(r"Your group is on a (\d+) day streak!").expect("valid streak pattern");
    static ref SCORE_LINE_PATTERN: Regex =
        Regex::new(r"(👑\s*)?(\d+)/6:\s*(.+)").expect("valid score line pattern");
    static ref PLATFORM_MENTION_PATTERN: Regex =
        Regex::new(r"<@!?([0-9]+)>").expect("valid platform mention pattern");
    static ref BARE_MENTION_PATTERN: Regex =
        Regex::new(r"@(\w+)").expect("valid bare mention pattern");
}

/// Scores extracted from one streak message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    /// Day the scores belong to: the day before the message was read
    pub date: NaiveDate,
    /// Streak length announced by the message, if it fits in a `u32`
    pub streak_days: Option<u32>,
    pub records: Vec<ScoreRecord>,
}

/// Extract the scores of a daily streak message.
///
/// Returns `None` when the text is not a streak report, or when it is one but
/// no line carries a score. Lines whose score cannot be read are skipped.
pub fn parse_report(text: &str, today: NaiveDate, directory: &Directory) -> Option<ScoreReport> {
    let streak = STREAK_PATTERN.captures(text)?;
    let streak_days = streak.get(1).and_then(|m| m.as_str().parse::<u32>().ok());

    let Some(date) = today.pred_opt() else {
        warn!("No calendar day before {}", today);
        return None;
    };

    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        match parse_score_line(line, date, directory) {
            Ok(Some(mut line_records)) => records.append(&mut line_records),
            Ok(None) => {}
            Err(e) => warn!("Skipping line {}: {}", idx + 1, e),
        }
    }

    if records.is_empty() {
        warn!("Streak message for {} has no score lines", date);
        return None;
    }

    info!(
        "Parsed {} score(s) for {} (streak: {:?} days)",
        records.len(),
        date,
        streak_days
    );

    Some(ScoreReport {
        date,
        streak_days,
        records,
    })
}

/// Same as [`parse_report`] with today's local date
pub fn parse_report_now(text: &str, directory: &Directory) -> Option<ScoreReport> {
    parse_report(text, chrono::Local::now().date_naive(), directory)
}

/// `Ok(None)` for lines that are not score lines.
fn parse_score_line(
    line: &str,
    date: NaiveDate,
    directory: &Directory,
) -> Result<Option<Vec<ScoreRecord>>> {
    let Some(caps) = SCORE_LINE_PATTERN.captures(line) else {
        return Ok(None);
    };

    let is_winner = caps.get(1).is_some();
    let numerator = caps.get(2).map_or("", |m| m.as_str());
    let score = numerator
        .parse::<u8>()
        .ok()
        .filter(|s| ScoreRecord::is_valid_score(*s))
        .ok_or_else(|| IngestError::FormatError(format!("'{}/6' is not a score", numerator)))?;
    let segment = caps.get(3).map_or("", |m| m.as_str().trim());

    let records: Vec<ScoreRecord> = extract_mentions(segment, directory)
        .into_iter()
        .map(|participant| ScoreRecord::new(participant, score, date, is_winner))
        .collect();

    debug!(
        "Score line {}/6 (winner: {}): {} participant(s)",
        score,
        is_winner,
        records.len()
    );

    Ok(Some(records))
}

/// Participants mentioned in the trailing segment of a score line, platform
/// mentions first. Bare `@name` matches inside an already consumed platform
/// mention are ignored, and each participant is listed once.
fn extract_mentions(segment: &str, directory: &Directory) -> Vec<ParticipantRef> {
    let mut participants: Vec<ParticipantRef> = Vec::new();
    let mut consumed: Vec<Range<usize>> = Vec::new();

    for caps in PLATFORM_MENTION_PATTERN.captures_iter(segment) {
        let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        consumed.push(whole.range());
        push_unique(&mut participants, ParticipantRef::identified(id.as_str()));
    }

    for caps in BARE_MENTION_PATTERN.captures_iter(segment) {
        let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let span = whole.range();
        if consumed.iter().any(|c| c.start < span.end && span.start < c.end) {
            continue;
        }
        push_unique(&mut participants, resolve(directory, token.as_str()));
    }

    participants
}

fn push_unique(participants: &mut Vec<ParticipantRef>, participant: ParticipantRef) {
    if participants.contains(&participant) {
        debug!("{} already mentioned on this line", participant);
        return;
    }
    participants.push(participant);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectoryMember;

    const REPORT: &str = "Your group is on a 20 day streak! 👑 3/6: @bela\n4/6: @diego @lily\n5/6: @JoshK318 @NICO";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
    }

    fn yesterday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 14).unwrap()
    }

    #[test]
    fn test_not_a_report_without_streak_phrase() {
        let dir = Directory::empty();
        assert!(parse_report("👑 3/6: @bela\n4/6: @diego", today(), &dir).is_none());
        assert!(parse_report("good morning", today(), &dir).is_none());
        assert!(parse_report("", today(), &dir).is_none());
    }

    #[test]
    fn test_streak_without_score_lines_is_not_applicable() {
        let text = "Your group is on a 3 day streak! 🔥 Here are yesterday's results:\nnobody played";
        assert!(parse_report(text, today(), &Directory::empty()).is_none());
    }

    #[test]
    fn test_report_with_empty_directory() {
        let report = parse_report(REPORT, today(), &Directory::empty()).unwrap();

        assert_eq!(report.streak_days, Some(20));
        assert_eq!(report.date, yesterday());
        assert_eq!(report.records.len(), 5);
        assert!(report.records.iter().all(|r| r.date == yesterday()));
        assert!(report.records.iter().all(|r| r.participant.is_unresolved()));

        let bela = &report.records[0];
        assert_eq!(bela.participant, ParticipantRef::unresolved("bela"));
        assert_eq!(bela.score, 3);
        assert!(bela.is_winner);

        let scores: Vec<(String, u8, bool)> = report.records[1..]
            .iter()
            .map(|r| (r.participant.guess().unwrap().to_string(), r.score, r.is_winner))
            .collect();
        assert_eq!(
            scores,
            vec![
                ("diego".to_string(), 4, false),
                ("lily".to_string(), 4, false),
                ("JoshK318".to_string(), 5, false),
                ("NICO".to_string(), 5, false),
            ]
        );
    }

    #[test]
    fn test_bare_mention_resolves_through_directory() {
        let dir = Directory::new(vec![DirectoryMember::new("111", "bela", "bela")]);
        let report = parse_report(REPORT, today(), &dir).unwrap();

        assert_eq!(report.records[0].participant, ParticipantRef::identified("111"));
        assert!(report.records[1..].iter().all(|r| r.participant.is_unresolved()));
    }

    #[test]
    fn test_platform_mentions_and_mixed_lines() {
        let dir = Directory::new(vec![
            DirectoryMember::new("555666777", "diego", "diego"),
            DirectoryMember::new("111222333", "bela", "bela"),
        ]);
        let text = "Your group is on a 23 day streak! 🔥 Here are yesterday's results:\n\
                    👑 3/6: <@123456789> <@!987654321>\n\
                    5/6: @diego @brinka @bela\n\
                    6/6: @DiegoK318";
        let report = parse_report(text, today(), &dir).unwrap();

        let participants: Vec<String> = report
            .records
            .iter()
            .map(|r| r.participant.storage_key())
            .collect();
        assert_eq!(
            participants,
            vec![
                "123456789",
                "987654321",
                "555666777",
                "unresolved_brinka",
                "111222333",
                "unresolved_DiegoK318",
            ]
        );
        assert!(report.records[0].is_winner && report.records[1].is_winner);
        assert!(!report.records[2].is_winner);
        assert_eq!(report.records[5].score, 6);
    }

    #[test]
    fn test_same_human_in_both_syntaxes_counts_once() {
        let dir = Directory::new(vec![DirectoryMember::new("111", "bela", "bela")]);
        let text = "Your group is on a 4 day streak!\n4/6: <@111> @bela";
        let report = parse_report(text, today(), &dir).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].participant, ParticipantRef::identified("111"));
    }

    #[test]
    fn test_different_humans_in_both_syntaxes_are_kept() {
        let dir = Directory::new(vec![DirectoryMember::new("111", "bela", "bela")]);
        let text = "Your group is on a 4 day streak!\n4/6: <@222> @bela";
        let report = parse_report(text, today(), &dir).unwrap();

        assert_eq!(report.records.len(), 2);
    }

    #[test]
    fn test_platform_mention_digits_are_not_read_as_bare_names() {
        let text = "Your group is on a 4 day streak!\n2/6: <@123456789>";
        let report = parse_report(text, today(), &Directory::empty()).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(
            report.records[0].participant,
            ParticipantRef::identified("123456789")
        );
    }

    #[test]
    fn test_out_of_range_score_line_is_skipped() {
        let text = "Your group is on a 9 day streak!\n9/6: @ghost\n300/6: @overflow\n4/6: @lily";
        let report = parse_report(text, today(), &Directory::empty()).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].participant, ParticipantRef::unresolved("lily"));
    }

    #[test]
    fn test_failed_games_are_not_score_lines() {
        let text = "Your group is on a 9 day streak!\nX/6: @lily\n5/6: @bela";
        let report = parse_report(text, today(), &Directory::empty()).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].score, 5);
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "Your group is on a 2 day streak!\r\n👑 2/6: @bela\r\n3/6: @lily\r\n";
        let report = parse_report(text, today(), &Directory::empty()).unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[1].participant, ParticipantRef::unresolved("lily"));
    }

    #[test]
    fn test_report_date_crosses_month_boundary() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let report = parse_report(REPORT, today, &Directory::empty()).unwrap();

        assert_eq!(report.date, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn test_platform_mentions_only_take_ascii_digits() {
        let text = "Your group is on a 4 day streak!\n3/6: <@١٢٣> <@456>";
        let report = parse_report(text, today(), &Directory::empty()).unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].participant, ParticipantRef::identified("456"));
        assert_eq!(report.records[1].participant, ParticipantRef::unresolved("١٢٣"));
    }
}
