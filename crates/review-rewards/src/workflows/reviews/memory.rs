//! Process-local stores used by the API binary and by tests.
//!
//! Every operation holds the store mutex for its whole read-modify-write, which gives the
//! per-document atomicity the workflow relies on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::catalog::{AchievementCatalog, CatalogError, CatalogStore};
use super::domain::{
    Achievement, AchievementId, Badge, BadgeId, CommentId, PointKind, Review, ReviewComment,
    ReviewId, ReviewLike, User, UserId,
};
use super::repository::{
    AwardBatch, RepositoryError, ReviewEditError, ReviewRepository, UserRepository,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} mutex poisoned")))
}

#[derive(Default, Clone)]
pub struct MemoryUserStore {
    users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl MemoryUserStore {
    /// Drop a user document; returns whether it existed.
    pub fn remove(&self, id: &UserId) -> Result<bool, RepositoryError> {
        Ok(lock(&self.users, "user store")?.remove(id).is_some())
    }
}

impl UserRepository for MemoryUserStore {
    fn insert(&self, mut user: User) -> Result<User, RepositoryError> {
        let mut guard = lock(&self.users, "user store")?;
        if guard.contains_key(&user.id) {
            return Err(RepositoryError::Conflict(format!("user id {}", user.id)));
        }
        if guard
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(RepositoryError::Conflict(format!("email {}", user.email)));
        }
        if guard.values().any(|existing| existing.username == user.username) {
            return Err(RepositoryError::Conflict(format!(
                "username {}",
                user.username
            )));
        }
        user.recompute_total();
        guard.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(lock(&self.users, "user store")?.get(id).cloned())
    }

    fn increment_points(
        &self,
        id: &UserId,
        kind: PointKind,
        delta: f64,
    ) -> Result<User, RepositoryError> {
        let mut guard = lock(&self.users, "user store")?;
        let user = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        user.credit(kind, delta);
        Ok(user.clone())
    }

    fn record_awards(&self, id: &UserId, batch: &AwardBatch) -> Result<User, RepositoryError> {
        let mut guard = lock(&self.users, "user store")?;
        let user = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        for grant in &batch.achievements {
            if !user.has_achievement(&grant.achievement_id) {
                user.achievements.push(grant.clone());
            }
        }
        for grant in &batch.badges {
            if !user.has_badge(&grant.badge_id) {
                user.badges.push(grant.clone());
            }
        }
        Ok(user.clone())
    }

    fn by_total_points(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = lock(&self.users, "user store")?.values().cloned().collect();
        users.sort_by(|a, b| {
            b.total_points
                .total_cmp(&a.total_points)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(users)
    }
}

#[derive(Default, Clone)]
pub struct MemoryReviewStore {
    reviews: Arc<Mutex<HashMap<ReviewId, Review>>>,
}

impl MemoryReviewStore {
    /// Run `apply` against one review while the store lock is held.
    fn edit<T>(
        &self,
        id: &ReviewId,
        apply: impl FnOnce(&mut Review) -> Result<T, ReviewEditError>,
    ) -> Result<T, ReviewEditError> {
        let mut guard = lock(&self.reviews, "review store")?;
        let review = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        apply(review)
    }
}

impl ReviewRepository for MemoryReviewStore {
    fn insert(&self, review: Review) -> Result<Review, RepositoryError> {
        let mut guard = lock(&self.reviews, "review store")?;
        if guard.contains_key(&review.id) {
            return Err(RepositoryError::Conflict(format!("review {}", review.id)));
        }
        guard.insert(review.id.clone(), review.clone());
        Ok(review)
    }

    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        Ok(lock(&self.reviews, "review store")?.get(id).cloned())
    }

    fn add_like(&self, id: &ReviewId, user: &UserId) -> Result<Vec<ReviewLike>, ReviewEditError> {
        self.edit(id, |review| {
            if review.liked_by(user) {
                return Err(ReviewEditError::AlreadyLiked);
            }
            review.likes.insert(0, ReviewLike { user: user.clone() });
            Ok(review.likes.clone())
        })
    }

    fn remove_like(
        &self,
        id: &ReviewId,
        user: &UserId,
    ) -> Result<Vec<ReviewLike>, ReviewEditError> {
        self.edit(id, |review| {
            if !review.liked_by(user) {
                return Err(ReviewEditError::NotLiked);
            }
            review.likes.retain(|like| &like.user != user);
            Ok(review.likes.clone())
        })
    }

    fn push_comment(
        &self,
        id: &ReviewId,
        comment: ReviewComment,
    ) -> Result<Vec<ReviewComment>, ReviewEditError> {
        self.edit(id, |review| {
            review.review_comments.insert(0, comment);
            Ok(review.review_comments.clone())
        })
    }

    fn remove_comment(
        &self,
        id: &ReviewId,
        comment: &CommentId,
        caller: &UserId,
    ) -> Result<Vec<ReviewComment>, ReviewEditError> {
        self.edit(id, |review| {
            let position = review
                .review_comments
                .iter()
                .position(|existing| &existing.id == comment)
                .ok_or(ReviewEditError::CommentNotFound)?;
            if &review.review_comments[position].user != caller {
                return Err(ReviewEditError::NotCommentAuthor);
            }
            review.review_comments.remove(position);
            Ok(review.review_comments.clone())
        })
    }

    fn list(&self) -> Result<Vec<Review>, RepositoryError> {
        let mut reviews: Vec<Review> = lock(&self.reviews, "review store")?
            .values()
            .cloned()
            .collect();
        reviews.sort_by(|a, b| {
            b.review_date
                .cmp(&a.review_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(reviews)
    }
}

#[derive(Default)]
struct CatalogState {
    badges: Vec<Badge>,
    achievements: Vec<Achievement>,
}

/// Catalog kept in insertion order.
#[derive(Default, Clone)]
pub struct MemoryCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl MemoryCatalog {
    fn state(&self) -> Result<MutexGuard<'_, CatalogState>, CatalogError> {
        self.state
            .lock()
            .map_err(|_| CatalogError::Unavailable("catalog mutex poisoned".to_string()))
    }

    /// Delete an achievement; existing grants keep pointing at the removed id.
    pub fn remove_achievement(&self, id: &AchievementId) -> Result<bool, CatalogError> {
        let mut state = self.state()?;
        let before = state.achievements.len();
        state.achievements.retain(|achievement| &achievement.id != id);
        Ok(state.achievements.len() != before)
    }
}

impl AchievementCatalog for MemoryCatalog {
    fn achievements(&self) -> Result<Vec<Achievement>, CatalogError> {
        Ok(self.state()?.achievements.clone())
    }

    fn achievement(&self, id: &AchievementId) -> Result<Option<Achievement>, CatalogError> {
        Ok(self
            .state()?
            .achievements
            .iter()
            .find(|achievement| &achievement.id == id)
            .cloned())
    }

    fn badge(&self, id: &BadgeId) -> Result<Option<Badge>, CatalogError> {
        Ok(self
            .state()?
            .badges
            .iter()
            .find(|badge| &badge.id == id)
            .cloned())
    }

    fn badges(&self) -> Result<Vec<Badge>, CatalogError> {
        Ok(self.state()?.badges.clone())
    }
}

impl CatalogStore for MemoryCatalog {
    fn insert_badge(&self, badge: Badge) -> Result<Badge, CatalogError> {
        let mut state = self.state()?;
        if state.badges.iter().any(|existing| existing.name == badge.name) {
            return Err(CatalogError::DuplicateName {
                kind: "badge",
                name: badge.name,
            });
        }
        state.badges.push(badge.clone());
        Ok(badge)
    }

    fn insert_achievement(&self, achievement: Achievement) -> Result<Achievement, CatalogError> {
        let mut state = self.state()?;
        if state
            .achievements
            .iter()
            .any(|existing| existing.name == achievement.name)
        {
            return Err(CatalogError::DuplicateName {
                kind: "achievement",
                name: achievement.name,
            });
        }
        state.achievements.push(achievement.clone());
        Ok(achievement)
    }
}
