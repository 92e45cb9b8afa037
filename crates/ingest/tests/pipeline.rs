use chrono::NaiveDate;
use ingest::{Directory, DirectoryMember, display_name, ingest_message, reresolve_all};
use storage::models::ParticipantRef;
use storage::services::stats;
use storage::{DataFiles, MemoryStore, ScoreStore};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
}

#[tokio::test]
async fn test_unresolved_scores_are_merged_after_reresolve() {
    let store = MemoryStore::new();

    // Nobody is known yet
    let first = "Your group is on a 20 day streak! 👑 3/6: @bela\n4/6: @diego @lily";
    let report = ingest_message(first, day(11), &Directory::empty(), &store)
        .await
        .unwrap()
        .unwrap();
    assert!(report.records.iter().all(|r| r.participant.is_unresolved()));

    // Bela has joined the directory by the next report
    let directory = Directory::new(vec![
        DirectoryMember::new("111", "bela", "Bela"),
        DirectoryMember::new("222", "diego", "Diego").with_global_alias("DiegoK318"),
    ]);
    let second = "Your group is on a 21 day streak!\n👑 2/6: <@222>\n5/6: @bela";
    ingest_message(second, day(12), &directory, &store)
        .await
        .unwrap()
        .unwrap();

    let upgraded = reresolve_all(&directory, &store).await.unwrap();
    assert_eq!(upgraded, 2);

    let bela = store
        .stats(&ParticipantRef::identified("111"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bela.games_played, 2);
    assert_eq!(bela.total_score, 8);
    assert_eq!(bela.wins, 1);

    let diego = store
        .stats(&ParticipantRef::identified("222"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(diego.games_played, 2);
    assert_eq!(diego.wins, 1);

    let all_stats = store.all_stats().await.unwrap();
    let board = stats::leaderboard(&all_stats, 10);
    let names: Vec<String> = board
        .iter()
        .map(|e| display_name(&directory, &e.participant))
        .collect();
    assert_eq!(names, vec!["Diego", "Bela", "lily"]);
}

#[tokio::test]
async fn test_stats_survive_reopening_data_files() {
    let dir = std::env::temp_dir().join(format!("wordle-tracker-it-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let files = DataFiles {
        wordle_data: dir.join("wordle_data.json"),
        user_stats: dir.join("user_stats.json"),
        auto_save: true,
    };

    {
        let store = MemoryStore::open(files.clone()).await.unwrap();
        let text = "Your group is on a 2 day streak!\n👑 3/6: @bela\n6/6: @lily";
        ingest_message(text, day(20), &Directory::empty(), &store)
            .await
            .unwrap();
    }

    let store = MemoryStore::open(files).await.unwrap();
    let records = store.scores_on(day(19)).await.unwrap();
    let daily = stats::daily_stats(&records).unwrap();
    assert_eq!(daily.total_players, 2);
    assert_eq!(daily.best_score, 3);
    assert_eq!(daily.worst_score, 6);

    tokio::fs::remove_dir_all(&dir).await.ok();
}

#[tokio::test]
async fn test_legacy_data_files_can_be_reresolved() {
    let dir = std::env::temp_dir().join(format!("wordle-tracker-legacy-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let files = DataFiles {
        wordle_data: dir.join("wordle_data.json"),
        user_stats: dir.join("user_stats.json"),
        auto_save: true,
    };
    tokio::fs::write(
        &files.wordle_data,
        r#"{"2025-06-01": [{"user": "bela", "score": 3, "date": "2025-06-01", "is_winner": true}]}"#,
    )
    .await
    .unwrap();
    tokio::fs::write(
        &files.user_stats,
        r#"{"bela": {"total_score": 3, "games_played": 1, "wins": 1}}"#,
    )
    .await
    .unwrap();

    let store = MemoryStore::open(files).await.unwrap();
    let directory = Directory::new(vec![DirectoryMember::new("111", "bela", "Bela")]);

    assert_eq!(reresolve_all(&directory, &store).await.unwrap(), 1);

    let all_stats = store.all_stats().await.unwrap();
    assert_eq!(all_stats.len(), 1);
    assert_eq!(all_stats[0].0, ParticipantRef::identified("111"));
    assert_eq!(display_name(&directory, &all_stats[0].0), "Bela");

    tokio::fs::remove_dir_all(&dir).await.ok();
}
