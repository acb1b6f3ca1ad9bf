use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::reviews::catalog::{
    AchievementCatalog, CatalogError, CatalogService, CatalogStore,
};
use crate::workflows::reviews::domain::{
    Achievement, AchievementId, Badge, BadgeId, PointKind, User, UserId,
};
use crate::workflows::reviews::identity::TokenIdentity;
use crate::workflows::reviews::memory::{MemoryCatalog, MemoryReviewStore, MemoryUserStore};
use crate::workflows::reviews::repository::{AwardBatch, RepositoryError, UserRepository};
use crate::workflows::reviews::router::{review_router, ReviewApi};
use crate::workflows::reviews::service::ReviewService;

pub(super) fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn user(id: &str) -> User {
    let mut user = User::new(
        UserId::new(id),
        format!("User {id}"),
        format!("{id}@example.com"),
        id,
    );
    user.avatar = Some(format!("/avatars/{id}.png"));
    user
}

pub(super) fn badge(id: &str, minutes: i64) -> Badge {
    Badge {
        id: BadgeId::new(id),
        name: format!("Badge {id}"),
        description: format!("Awarded for {id}"),
        icon: format!("/icons/{id}.png"),
        created_at: epoch() + Duration::minutes(minutes),
    }
}

pub(super) fn achievement(
    id: &str,
    sending: f64,
    receiving: f64,
    badge: &str,
    minutes: i64,
) -> Achievement {
    Achievement {
        id: AchievementId::new(id),
        name: format!("Achievement {id}"),
        description: format!("Reach the {id} threshold"),
        sending_review_points: sending,
        receiving_review_points: receiving,
        badge: BadgeId::new(badge),
        created_at: epoch() + Duration::minutes(minutes),
    }
}

/// Catalog with first-review rules for both counters and a five-review sending rule.
pub(super) fn standard_catalog() -> MemoryCatalog {
    let catalog = MemoryCatalog::default();
    for entry in [badge("first-sent", 0), badge("first-received", 1), badge("prolific", 2)] {
        catalog.insert_badge(entry).expect("badge inserts");
    }
    for entry in [
        achievement("ach-first-sent", 1.0, 0.0, "first-sent", 10),
        achievement("ach-first-received", 0.0, 0.5, "first-received", 11),
        achievement("ach-five-sent", 5.0, 0.0, "prolific", 12),
    ] {
        catalog.insert_achievement(entry).expect("achievement inserts");
    }
    catalog
}

pub(super) struct Harness<U = MemoryUserStore, C = MemoryCatalog> {
    pub(super) users: Arc<U>,
    pub(super) reviews: Arc<MemoryReviewStore>,
    pub(super) catalog: Arc<C>,
    pub(super) service: ReviewService<U, MemoryReviewStore, C>,
}

pub(super) fn harness_with<U, C>(users: U, catalog: C, people: &[&str]) -> Harness<U, C>
where
    U: UserRepository + 'static,
    C: AchievementCatalog + 'static,
{
    let users = Arc::new(users);
    for id in people {
        users.insert(user(id)).expect("user inserts");
    }
    let reviews = Arc::new(MemoryReviewStore::default());
    let catalog = Arc::new(catalog);
    let service = ReviewService::new(users.clone(), reviews.clone(), catalog.clone());
    Harness {
        users,
        reviews,
        catalog,
        service,
    }
}

pub(super) fn harness(people: &[&str]) -> Harness {
    harness_with(MemoryUserStore::default(), standard_catalog(), people)
}

pub(super) fn fetch_user<U: UserRepository>(users: &U, id: &str) -> User {
    users
        .fetch(&UserId::new(id))
        .expect("fetch succeeds")
        .expect("user present")
}

pub(super) fn assert_total_invariant(user: &User) {
    assert_eq!(
        user.total_points,
        user.sending_review_points + user.receiving_review_points,
        "total points drifted for {}",
        user.id
    );
}

pub(super) fn assert_unique_grants(user: &User) {
    let mut achievements: Vec<_> = user.achievements.iter().map(|g| &g.achievement_id).collect();
    achievements.sort();
    achievements.dedup();
    assert_eq!(achievements.len(), user.achievements.len(), "duplicate achievement grant");

    let mut badges: Vec<_> = user.badges.iter().map(|g| &g.badge_id).collect();
    badges.sort();
    badges.dedup();
    assert_eq!(badges.len(), user.badges.len(), "duplicate badge grant");
}

/// User store that refuses counter updates for one user.
#[derive(Default)]
pub(super) struct FlakyUserStore {
    pub(super) inner: MemoryUserStore,
    pub(super) fail_increment_for: Option<UserId>,
}

impl UserRepository for FlakyUserStore {
    fn insert(&self, user: User) -> Result<User, RepositoryError> {
        self.inner.insert(user)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn increment_points(
        &self,
        id: &UserId,
        kind: PointKind,
        delta: f64,
    ) -> Result<User, RepositoryError> {
        if self.fail_increment_for.as_ref() == Some(id) {
            return Err(RepositoryError::Unavailable("write rejected".to_string()));
        }
        self.inner.increment_points(id, kind, delta)
    }

    fn record_awards(&self, id: &UserId, batch: &AwardBatch) -> Result<User, RepositoryError> {
        self.inner.record_awards(id, batch)
    }

    fn by_total_points(&self) -> Result<Vec<User>, RepositoryError> {
        self.inner.by_total_points()
    }
}

/// User store whose reads start failing once `reads_left` successful fetches are spent.
pub(super) struct FadingReadStore {
    pub(super) inner: MemoryUserStore,
    pub(super) reads_left: AtomicUsize,
}

impl FadingReadStore {
    pub(super) fn new(reads: usize) -> Self {
        Self {
            inner: MemoryUserStore::default(),
            reads_left: AtomicUsize::new(reads),
        }
    }
}

impl UserRepository for FadingReadStore {
    fn insert(&self, user: User) -> Result<User, RepositoryError> {
        self.inner.insert(user)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let spent = self
            .reads_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        if spent.is_err() {
            return Err(RepositoryError::Unavailable("read rejected".to_string()));
        }
        self.inner.fetch(id)
    }

    fn increment_points(
        &self,
        id: &UserId,
        kind: PointKind,
        delta: f64,
    ) -> Result<User, RepositoryError> {
        self.inner.increment_points(id, kind, delta)
    }

    fn record_awards(&self, id: &UserId, batch: &AwardBatch) -> Result<User, RepositoryError> {
        self.inner.record_awards(id, batch)
    }

    fn by_total_points(&self) -> Result<Vec<User>, RepositoryError> {
        self.inner.by_total_points()
    }
}

/// Catalog whose achievement listing is offline.
pub(super) struct OfflineCatalog;

impl AchievementCatalog for OfflineCatalog {
    fn achievements(&self) -> Result<Vec<Achievement>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".to_string()))
    }

    fn achievement(&self, _id: &AchievementId) -> Result<Option<Achievement>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".to_string()))
    }

    fn badge(&self, _id: &BadgeId) -> Result<Option<Badge>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".to_string()))
    }

    fn badges(&self) -> Result<Vec<Badge>, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".to_string()))
    }
}

pub(super) const ANA_TOKEN: &str = "token-ana";
pub(super) const BO_TOKEN: &str = "token-bo";

/// Handler state over the harness stores with sessions for `ana` and `bo`.
pub(super) fn api_for<U>(
    harness: Harness<U, MemoryCatalog>,
) -> ReviewApi<U, MemoryReviewStore, MemoryCatalog>
where
    U: UserRepository + 'static,
{
    let identity = TokenIdentity::default();
    identity
        .issue(ANA_TOKEN, UserId::new("ana"))
        .expect("session issued");
    identity
        .issue(BO_TOKEN, UserId::new("bo"))
        .expect("session issued");

    ReviewApi {
        reviews: Arc::new(harness.service),
        catalog: Arc::new(CatalogService::new(harness.catalog)),
        identity: Arc::new(identity),
    }
}

pub(super) fn router_for<U>(harness: Harness<U, MemoryCatalog>) -> axum::Router
where
    U: UserRepository + 'static,
{
    review_router(api_for(harness))
}

pub(super) fn router_with_people(people: &[&str]) -> (axum::Router, Arc<MemoryUserStore>) {
    let harness = harness(people);
    let users = harness.users.clone();
    (router_for(harness), users)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
