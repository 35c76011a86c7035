use std::path::Path;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

use promo_agent::config::BotConfig;
use promo_agent::models::{ActionKind, Post};
use promo_agent::scheduler::{ActionScheduler, Decision, RejectReason};
use promo_agent::store::StateStore;

fn config(dir: &Path) -> BotConfig {
    BotConfig {
        tweet_interval_hours: 1..=1,
        reply_interval_minutes: 30..=30,
        daily_follow_limit: 2,
        min_likes_threshold: 10,
        state_path: dir.join("bot_state.json"),
        content_dir: PathBuf::from("."),
        ..BotConfig::default()
    }
}

fn scheduler(dir: &TempDir) -> ActionScheduler {
    let cfg = config(dir.path());
    let store = StateStore::new(&cfg.state_path);
    ActionScheduler::new(cfg, store).expect("scheduler")
}

fn post(id: &str, author: &str, likes: u32, created_at: DateTime<Utc>) -> Post {
    Post {
        id: id.to_string(),
        author_id: author.to_string(),
        text: format!("post {id}"),
        like_count: likes,
        created_at,
    }
}

#[test]
fn replied_targets_stay_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut scheduler = scheduler(&dir);
    let now = Utc::now();

    assert_eq!(
        scheduler.can_execute(ActionKind::Reply, Some("t1"), now),
        Decision::Allowed
    );
    scheduler
        .record_action(ActionKind::Reply, Some("t1"), "nice post", now)
        .expect("record");

    // Permanent for that target, even a month later.
    let much_later = now + Duration::days(29);
    assert_eq!(
        scheduler.can_execute(ActionKind::Reply, Some("t1"), much_later),
        Decision::Rejected(RejectReason::AlreadyActioned)
    );
}

#[test]
fn dedup_is_tracked_per_kind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut scheduler = scheduler(&dir);
    let now = Utc::now();

    scheduler
        .record_action(ActionKind::Follow, Some("u1"), "", now)
        .expect("record");

    assert_eq!(
        scheduler.can_execute(ActionKind::Follow, Some("u1"), now),
        Decision::Rejected(RejectReason::AlreadyActioned)
    );
    // A DM to the same user is a different action kind and still open.
    assert_eq!(
        scheduler.can_execute(ActionKind::DirectMessage, Some("u1"), now),
        Decision::Allowed
    );
}

#[test]
fn tweets_are_paced_by_the_minimum_interval() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut scheduler = scheduler(&dir);
    let now = Utc::now();

    assert_eq!(scheduler.can_execute(ActionKind::Tweet, None, now), Decision::Allowed);
    scheduler
        .record_action(ActionKind::Tweet, None, "launch day", now)
        .expect("record");

    match scheduler.can_execute(ActionKind::Tweet, None, now + Duration::minutes(10)) {
        Decision::Rejected(RejectReason::TooSoon { wait }) => {
            assert_eq!(wait, Duration::minutes(50));
        }
        other => panic!("expected TooSoon, got {other:?}"),
    }

    assert_eq!(
        scheduler.can_execute(ActionKind::Tweet, None, now + Duration::minutes(61)),
        Decision::Allowed
    );
}

#[test]
fn follow_quota_exhausts_and_resets_with_the_window() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut scheduler = scheduler(&dir);
    let now = Utc::now();

    scheduler
        .record_action(ActionKind::Follow, Some("u1"), "", now)
        .expect("record u1");
    scheduler
        .record_action(ActionKind::Follow, Some("u2"), "", now)
        .expect("record u2");

    assert_eq!(
        scheduler.can_execute(ActionKind::Follow, Some("u3"), now),
        Decision::Rejected(RejectReason::QuotaExceeded)
    );

    // Once the 24h window has elapsed the counter starts over.
    assert_eq!(
        scheduler.can_execute(ActionKind::Follow, Some("u3"), now + Duration::hours(24)),
        Decision::Allowed
    );
}

#[test]
fn state_survives_a_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let now = Utc::now();
    {
        let mut scheduler = scheduler(&dir);
        scheduler
            .record_action(ActionKind::Tweet, None, "launch day", now)
            .expect("record tweet");
        scheduler
            .record_action(ActionKind::Reply, Some("t1"), "nice post", now)
            .expect("record reply");
        scheduler
            .record_action(ActionKind::Follow, Some("u1"), "", now)
            .expect("record follow");
    }

    let cfg = config(dir.path());
    let state = StateStore::new(&cfg.state_path).load().expect("reload");
    assert_eq!(state.records.len(), 3);
    assert!(state.already_actioned(ActionKind::Reply, "t1"));
    assert!(state.already_actioned(ActionKind::Follow, "u1"));
    assert_eq!(
        state.quotas.get(&ActionKind::Tweet).map(|q| q.count),
        Some(1)
    );

    // And a fresh scheduler over the same store enforces the same dedup.
    let mut scheduler = scheduler(&dir);
    assert_eq!(
        scheduler.can_execute(ActionKind::Reply, Some("t1"), now),
        Decision::Rejected(RejectReason::AlreadyActioned)
    );
}

#[test]
fn record_timestamps_never_go_backwards() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut scheduler = scheduler(&dir);
    let now = Utc::now();

    scheduler
        .record_action(ActionKind::Follow, Some("u1"), "", now)
        .expect("record");
    // A clock that jumped back must not produce an out-of-order log.
    scheduler
        .record_action(ActionKind::Follow, Some("u2"), "", now - Duration::minutes(5))
        .expect("record");

    let cfg = config(dir.path());
    let state = StateStore::new(&cfg.state_path).load().expect("reload");
    assert!(state.records[1].timestamp >= state.records[0].timestamp);
}

#[test]
fn candidates_are_filtered_and_ranked_by_engagement() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut scheduler = scheduler(&dir);
    let now = Utc::now();

    let posts = vec![
        post("p5", "a1", 5, now),
        post("p20", "a2", 20, now),
        post("p15", "a3", 15, now),
    ];
    let selected = scheduler.select_candidates(&posts);
    let likes: Vec<u32> = selected.iter().map(|p| p.like_count).collect();
    assert_eq!(likes, vec![20, 15]);

    // Already-replied posts drop out entirely.
    scheduler
        .record_action(ActionKind::Reply, Some("p20"), "nice post", now)
        .expect("record");
    let selected = scheduler.select_candidates(&posts);
    let ids: Vec<&str> = selected.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p15"]);
}

#[test]
fn engagement_ties_go_to_the_newer_post() {
    let dir = tempfile::tempdir().expect("tempdir");
    let scheduler = scheduler(&dir);
    let now = Utc::now();

    let posts = vec![
        post("older", "a1", 15, now - Duration::hours(2)),
        post("newer", "a2", 15, now),
    ];
    let selected = scheduler.select_candidates(&posts);
    let ids: Vec<&str> = selected.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["newer", "older"]);
}

#[test]
fn failed_persistence_surfaces_as_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    // The state path's parent is a regular file, so the save must fail.
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, b"not a directory").expect("write blocker");

    let cfg = BotConfig {
        state_path: blocker.join("bot_state.json"),
        ..config(dir.path())
    };
    let store = StateStore::new(&cfg.state_path);
    let mut scheduler = ActionScheduler::new(cfg, store).expect("scheduler");

    let result = scheduler.record_action(ActionKind::Follow, Some("u1"), "", Utc::now());
    assert!(result.is_err());
}
