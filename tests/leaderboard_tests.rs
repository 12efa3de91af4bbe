/// Leaderboard integration tests: capacity, rankings, exports, snapshots.

use cosmic_excuse::core::leaderboard::{Leaderboard, LeaderboardFormat};
use cosmic_excuse::core::pipeline::ExcuseGenerator;
use cosmic_excuse::schema::severity::SeverityTier;

fn scores(board: &Leaderboard) -> Vec<u32> {
    let mut s: Vec<u32> = board.entries().iter().map(|e| e.quality_score).collect();
    s.sort_unstable();
    s
}

#[test]
fn capacity_keeps_highest_scores() {
    let orders: [[u32; 5]; 3] = [[10, 90, 50, 20, 80], [90, 80, 50, 20, 10], [10, 20, 50, 80, 90]];
    for order in orders {
        let mut board = Leaderboard::new(3);
        for (i, score) in order.iter().enumerate() {
            board.add(&format!("excuse {}", i), *score, SeverityTier::Medium, "ai", "en");
        }
        assert_eq!(board.len(), 3);
        assert_eq!(scores(&board), vec![50, 80, 90], "order {:?}", order);
    }
}

#[test]
fn rankings() {
    let mut board = Leaderboard::new(10);
    board.add("alpha", 30, SeverityTier::Mild, "quantum", "en");
    board.add("beta", 70, SeverityTier::Severe, "cosmic", "en");
    board.add("gamma", 50, SeverityTier::Severe, "quantum", "bn");

    for _ in 0..3 {
        assert!(board.vote("alpha", true));
    }
    assert!(board.vote("gamma", true));
    assert!(board.vote("gamma", false));
    assert!(board.vote("beta", false));
    assert!(!board.vote("delta", true));

    let texts = |v: Vec<&cosmic_excuse::core::leaderboard::LeaderboardEntry>| {
        v.iter().map(|e| e.excuse_text.clone()).collect::<Vec<_>>()
    };

    assert_eq!(texts(board.top_by_quality(2)), vec!["beta", "gamma"]);
    assert_eq!(texts(board.top_by_votes(3)), vec!["alpha", "gamma", "beta"]);
    assert_eq!(texts(board.most_controversial(1)), vec!["gamma"]);
    assert_eq!(texts(board.by_category("quantum", 10)), vec!["gamma", "alpha"]);
    assert_eq!(texts(board.by_severity(SeverityTier::Severe, 10)), vec!["beta", "gamma"]);
    assert_eq!(board.recent(1).len(), 1);
}

#[test]
fn quality_ties_follow_insertion_order() {
    let mut board = Leaderboard::new(10);
    for name in ["one", "two", "three"] {
        board.add(name, 40, SeverityTier::Mild, "ai", "en");
    }
    let top: Vec<&str> = board
        .top_by_quality(3)
        .iter()
        .map(|e| e.excuse_text.as_str())
        .collect();
    assert_eq!(top, vec!["one", "two", "three"]);
}

#[test]
fn stats_aggregate_entries() {
    let mut board = Leaderboard::default();
    assert_eq!(board.stats().total_excuses, 0);
    assert!(board.stats().best_excuse.is_none());

    board.add("a", 20, SeverityTier::Mild, "ai", "en");
    board.add("b", 80, SeverityTier::Severe, "ai", "bn");
    board.add("c", 80, SeverityTier::Severe, "blame", "en");
    board.vote("a", true);
    board.vote("b", false);

    let stats = board.stats();
    assert_eq!(stats.total_excuses, 3);
    assert_eq!(stats.average_quality, 60.0);
    assert_eq!(stats.categories["ai"], 2);
    assert_eq!(stats.severities["severe"], 2);
    assert_eq!(stats.languages["en"], 2);
    assert_eq!(stats.best_excuse.as_deref(), Some("b"));
    assert_eq!(stats.best_score, Some(80));
    assert_eq!(stats.worst_excuse.as_deref(), Some("a"));
    assert_eq!(stats.total_upvotes, 1);
    assert_eq!(stats.total_downvotes, 1);
}

#[test]
fn exports() {
    let mut board = Leaderboard::new(5);
    board.add("Solar flare, obviously", 90, SeverityTier::Severe, "cosmic", "en");
    board.add("Mercury in retrograde", 40, SeverityTier::Mild, "blame", "en");

    let csv = board.export(LeaderboardFormat::Csv).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Excuse,Score,Severity,Category,Language,Upvotes,Downvotes,Timestamp")
    );
    assert!(lines.next().unwrap().starts_with("\"Solar flare, obviously\",90,severe,cosmic,en,0,0,"));

    let md = board.export(LeaderboardFormat::Markdown).unwrap();
    assert!(md.starts_with("# Excuse Leaderboard"));
    assert!(md.contains("1. **Score 90**: Solar flare, obviously"));
    assert!(md.contains("- Total Excuses: 2"));
    assert!(md.contains("- Average Quality: 65.0"));

    let json = board.export(LeaderboardFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 2);

    assert!("xml".parse::<LeaderboardFormat>().is_err());
}

#[test]
fn snapshot_round_trip_preserves_ties() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("leaderboard.json");

    let mut board = Leaderboard::new(3);
    for name in ["first", "second", "third"] {
        board.add(name, 60, SeverityTier::Medium, "ai", "en");
    }
    board.vote("second", true);
    board.save(&path).unwrap();

    let mut restored = Leaderboard::try_load(&path).unwrap();
    assert_eq!(restored.max_size(), 3);
    assert_eq!(restored.entries(), board.entries());

    // A new equal-score entry is the one evicted, as before the restore.
    restored.add("fourth", 60, SeverityTier::Medium, "ai", "en");
    let names: Vec<&str> = restored.entries().iter().map(|e| e.excuse_text.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[test]
fn unreadable_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leaderboard.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Leaderboard::try_load(&path).is_err());
    let board = Leaderboard::load_or_default(&path, 7);
    assert!(board.is_empty());
    assert_eq!(board.max_size(), 7);

    let missing = Leaderboard::load_or_default(&dir.path().join("absent.json"), 5);
    assert!(missing.is_empty());
}

#[test]
fn add_generated_excuse() {
    let generator = ExcuseGenerator::new("en").unwrap();
    let excuse = generator.generate("CRASH!!!", None, None).unwrap();

    let mut board = Leaderboard::default();
    board.add_excuse(&excuse);
    let entry = &board.entries()[0];
    assert_eq!(entry.excuse_text, excuse.text);
    assert_eq!(entry.quality_score, excuse.quality_score);
    assert_eq!(entry.severity, SeverityTier::Severe);
    assert_eq!(entry.metadata.as_ref(), Some(&excuse.metadata));
}
