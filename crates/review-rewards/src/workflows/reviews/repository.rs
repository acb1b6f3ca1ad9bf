use serde::Serialize;

use super::domain::{
    AchievementGrant, BadgeGrant, CommentId, PointKind, Review, ReviewComment, ReviewId,
    ReviewLike, User, UserId,
};

/// Grants computed by one evaluation pass, committed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwardBatch {
    pub achievements: Vec<AchievementGrant>,
    pub badges: Vec<BadgeGrant>,
}

impl AwardBatch {
    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty() && self.badges.is_empty()
    }
}

/// User document storage.
///
/// Counter and award updates are single-document atomic operations so that concurrent
/// submissions touching the same user cannot lose increments or duplicate grants.
pub trait UserRepository: Send + Sync {
    /// Insert a new user; email and username must be unique.
    fn insert(&self, user: User) -> Result<User, RepositoryError>;
    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    /// Atomically add `delta` to one counter, recompute the total and return the new state.
    fn increment_points(
        &self,
        id: &UserId,
        kind: PointKind,
        delta: f64,
    ) -> Result<User, RepositoryError>;
    /// Atomically append the grants whose ids the user does not already hold.
    fn record_awards(&self, id: &UserId, batch: &AwardBatch) -> Result<User, RepositoryError>;
    /// All users ordered by total points descending, ties by id.
    fn by_total_points(&self) -> Result<Vec<User>, RepositoryError>;
}

/// Review document storage.
///
/// Likes and comments are edited in place: each edit checks its precondition and applies
/// the change as one atomic operation on the review document.
pub trait ReviewRepository: Send + Sync {
    fn insert(&self, review: Review) -> Result<Review, RepositoryError>;
    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
    /// Prepend a like by `user` unless one already exists; returns the likes after the edit.
    fn add_like(&self, id: &ReviewId, user: &UserId) -> Result<Vec<ReviewLike>, ReviewEditError>;
    fn remove_like(&self, id: &ReviewId, user: &UserId) -> Result<Vec<ReviewLike>, ReviewEditError>;
    /// Prepend a comment; returns the comments after the edit.
    fn push_comment(
        &self,
        id: &ReviewId,
        comment: ReviewComment,
    ) -> Result<Vec<ReviewComment>, ReviewEditError>;
    /// Remove `comment` when `caller` wrote it.
    fn remove_comment(
        &self,
        id: &ReviewId,
        comment: &CommentId,
        caller: &UserId,
    ) -> Result<Vec<ReviewComment>, ReviewEditError>;
    /// All reviews, newest first.
    fn list(&self) -> Result<Vec<Review>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Rejected or failed edit of a review's likes or comments.
#[derive(Debug, thiserror::Error)]
pub enum ReviewEditError {
    #[error("Review already liked")]
    AlreadyLiked,
    #[error("Review has not yet been liked")]
    NotLiked,
    #[error("Comment not found")]
    CommentNotFound,
    #[error("User not authorized to delete this comment")]
    NotCommentAuthor,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Row of the public leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: UserId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub total_points: f64,
}

impl From<&User> for LeaderboardEntry {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            total_points: user.total_points,
        }
    }
}
