use super::common::*;
use crate::workflows::reviews::awards::{AwardError, AwardEvaluator};
use crate::workflows::reviews::catalog::{CatalogError, CatalogStore};
use crate::workflows::reviews::domain::{AchievementId, BadgeId, PointKind, User, UserId};
use crate::workflows::reviews::memory::{MemoryCatalog, MemoryUserStore};
use crate::workflows::reviews::repository::UserRepository;
use std::sync::Arc;

fn evaluator_with(
    catalog: MemoryCatalog,
    people: &[&str],
) -> (
    AwardEvaluator<MemoryUserStore, MemoryCatalog>,
    Arc<MemoryUserStore>,
) {
    let users = Arc::new(MemoryUserStore::default());
    for id in people {
        users.insert(user(id)).expect("user inserts");
    }
    (
        AwardEvaluator::new(users.clone(), Arc::new(catalog)),
        users,
    )
}

fn credit(users: &MemoryUserStore, id: &str, kind: PointKind, delta: f64) -> User {
    users
        .increment_points(&UserId::new(id), kind, delta)
        .expect("increment applies")
}

fn achievement_ids(user: &User) -> Vec<&str> {
    user.achievements
        .iter()
        .map(|grant| grant.achievement_id.as_str())
        .collect()
}

fn badge_ids(user: &User) -> Vec<&str> {
    user.badges.iter().map(|grant| grant.badge_id.as_str()).collect()
}

#[test]
fn grants_once_when_counter_lands_on_threshold() {
    let (evaluator, users) = evaluator_with(standard_catalog(), &["ana"]);
    for _ in 0..4 {
        credit(&users, "ana", PointKind::Sending, 1.0);
    }
    let before = fetch_user(users.as_ref(), "ana");

    let at_five = credit(&users, "ana", PointKind::Sending, 1.0);
    let outcome = evaluator
        .evaluate_and_grant(&at_five, PointKind::Sending)
        .expect("evaluation succeeds");

    assert_eq!(outcome.granted.achievements.len(), 1);
    assert_eq!(outcome.granted.badges.len(), 1);
    assert_eq!(
        outcome.user.achievements.len(),
        before.achievements.len() + 1
    );
    assert!(outcome.user.has_achievement(&AchievementId::new("ach-five-sent")));
    assert!(outcome.user.has_badge(&BadgeId::new("prolific")));

    let at_six = credit(&users, "ana", PointKind::Sending, 1.0);
    let outcome = evaluator
        .evaluate_and_grant(&at_six, PointKind::Sending)
        .expect("evaluation succeeds");
    assert!(outcome.granted.is_empty());
    assert_eq!(achievement_ids(&outcome.user), vec!["ach-five-sent"]);
}

#[test]
fn shared_badge_is_granted_once_across_achievements() {
    let catalog = MemoryCatalog::default();
    catalog.insert_badge(badge("streak", 0)).expect("badge inserts");
    catalog
        .insert_achievement(achievement("ach-one", 1.0, 0.0, "streak", 1))
        .expect("achievement inserts");
    catalog
        .insert_achievement(achievement("ach-two", 2.0, 0.0, "streak", 2))
        .expect("achievement inserts");
    let (evaluator, users) = evaluator_with(catalog, &["ana"]);

    for _ in 0..2 {
        let credited = credit(&users, "ana", PointKind::Sending, 1.0);
        evaluator
            .evaluate_and_grant(&credited, PointKind::Sending)
            .expect("evaluation succeeds");
    }

    let stored = fetch_user(users.as_ref(), "ana");
    assert_eq!(achievement_ids(&stored), vec!["ach-one", "ach-two"]);
    assert_eq!(badge_ids(&stored), vec!["streak"]);
    assert_unique_grants(&stored);
}

#[test]
fn simultaneous_matches_share_a_badge_in_creation_order() {
    let catalog = MemoryCatalog::default();
    catalog.insert_badge(badge("twin", 0)).expect("badge inserts");
    // Inserted newest first; evaluation still walks creation order.
    catalog
        .insert_achievement(achievement("ach-late", 1.0, 0.0, "twin", 20))
        .expect("achievement inserts");
    catalog
        .insert_achievement(achievement("ach-early", 1.0, 0.0, "twin", 5))
        .expect("achievement inserts");
    let (evaluator, users) = evaluator_with(catalog, &["ana"]);

    let credited = credit(&users, "ana", PointKind::Sending, 1.0);
    let outcome = evaluator
        .evaluate_and_grant(&credited, PointKind::Sending)
        .expect("evaluation succeeds");

    assert_eq!(achievement_ids(&outcome.user), vec!["ach-early", "ach-late"]);
    assert_eq!(badge_ids(&outcome.user), vec!["twin"]);
}

#[test]
fn thresholds_skipped_by_increments_never_fire() {
    let catalog = MemoryCatalog::default();
    catalog.insert_badge(badge("odd", 0)).expect("badge inserts");
    catalog
        .insert_achievement(achievement("ach-odd", 0.0, 0.75, "odd", 1))
        .expect("achievement inserts");
    let (evaluator, users) = evaluator_with(catalog, &["bo"]);

    for _ in 0..4 {
        let credited = credit(&users, "bo", PointKind::Receiving, 0.5);
        let outcome = evaluator
            .evaluate_and_grant(&credited, PointKind::Receiving)
            .expect("evaluation succeeds");
        assert!(outcome.granted.is_empty());
    }
    assert!(fetch_user(users.as_ref(), "bo").achievements.is_empty());
}

#[test]
fn thresholds_only_apply_to_their_own_counter() {
    let (evaluator, users) = evaluator_with(standard_catalog(), &["bo"]);

    // Receiving 1.0 equals the sending threshold of ach-first-sent but must not match it.
    credit(&users, "bo", PointKind::Receiving, 0.5);
    let credited = credit(&users, "bo", PointKind::Receiving, 0.5);
    let outcome = evaluator
        .evaluate_and_grant(&credited, PointKind::Receiving)
        .expect("evaluation succeeds");

    assert!(outcome.granted.is_empty());
}

#[test]
fn missing_badge_still_records_the_achievement() {
    let catalog = MemoryCatalog::default();
    catalog
        .insert_achievement(achievement("ach-orphan", 1.0, 0.0, "gone", 1))
        .expect("achievement inserts");
    let (evaluator, users) = evaluator_with(catalog, &["ana"]);

    let credited = credit(&users, "ana", PointKind::Sending, 1.0);
    let outcome = evaluator
        .evaluate_and_grant(&credited, PointKind::Sending)
        .expect("evaluation succeeds");

    assert_eq!(achievement_ids(&outcome.user), vec!["ach-orphan"]);
    assert!(outcome.user.badges.is_empty());
}

#[test]
fn stale_snapshots_do_not_duplicate_grants() {
    let (evaluator, users) = evaluator_with(standard_catalog(), &["ana"]);
    let credited = credit(&users, "ana", PointKind::Sending, 1.0);

    // Two racing evaluations built from the same pre-award snapshot.
    evaluator
        .evaluate_and_grant(&credited, PointKind::Sending)
        .expect("first evaluation succeeds");
    evaluator
        .evaluate_and_grant(&credited, PointKind::Sending)
        .expect("second evaluation succeeds");

    let stored = fetch_user(users.as_ref(), "ana");
    assert_eq!(achievement_ids(&stored), vec!["ach-first-sent"]);
    assert_eq!(badge_ids(&stored), vec!["first-sent"]);
}

#[test]
fn catalog_failure_aborts_without_touching_the_user() {
    let users = Arc::new(MemoryUserStore::default());
    users.insert(user("ana")).expect("user inserts");
    let evaluator = AwardEvaluator::new(users.clone(), Arc::new(OfflineCatalog));

    let credited = credit(&users, "ana", PointKind::Sending, 1.0);
    match evaluator.evaluate_and_grant(&credited, PointKind::Sending) {
        Err(error @ AwardError::Catalog(CatalogError::Unavailable(_))) => {
            assert_eq!(error.to_string(), "catalog unavailable: catalog offline");
        }
        other => panic!("expected catalog failure, got {other:?}"),
    }

    let stored = fetch_user(users.as_ref(), "ana");
    assert_eq!(stored.sending_review_points, 1.0);
    assert!(stored.achievements.is_empty());
}

#[test]
fn pending_grants_is_read_only() {
    let (evaluator, users) = evaluator_with(standard_catalog(), &["ana"]);
    let credited = credit(&users, "ana", PointKind::Sending, 1.0);

    let batch = evaluator
        .pending_grants(&credited, PointKind::Sending, epoch())
        .expect("evaluation succeeds");

    assert_eq!(batch.achievements.len(), 1);
    assert_eq!(batch.achievements[0].earned_date, epoch());
    assert!(fetch_user(users.as_ref(), "ana").achievements.is_empty());
}
