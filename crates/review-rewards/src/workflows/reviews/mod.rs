//! Peer reviews and the point, achievement and badge rewards they drive.
//!
//! A submission stores the review, credits the reviewer's sending counter, evaluates the
//! reviewer's awards, then does the same for the reviewee's receiving counter. Counter and
//! award writes go through atomic store operations so concurrent submissions cannot lose
//! points or duplicate grants. Likes and comments are edited in place by the review store
//! for the same reason.

pub mod awards;
pub mod catalog;
pub mod domain;
pub mod identity;
pub mod ledger;
pub mod memory;
pub mod repository;
pub mod router;
pub mod seed;
pub mod service;

#[cfg(test)]
mod tests;

pub use awards::{AwardError, AwardEvaluator, AwardOutcome};
pub use catalog::{
    AchievementCatalog, AchievementView, CatalogError, CatalogService, CatalogStore,
    NewAchievement, NewBadge,
};
pub use domain::{
    Achievement, AchievementGrant, AchievementId, Badge, BadgeGrant, BadgeId, CommentId,
    PointKind, Review, ReviewComment, ReviewId, ReviewLike, ReviewRole, User, UserId,
};
pub use identity::{IdentityError, IdentityProvider, TokenIdentity, AUTH_HEADER};
pub use ledger::PointLedger;
pub use memory::{MemoryCatalog, MemoryReviewStore, MemoryUserStore};
pub use repository::{
    AwardBatch, LeaderboardEntry, RepositoryError, ReviewEditError, ReviewRepository,
    UserRepository,
};
pub use router::{review_router, ReviewApi};
pub use seed::{SeedAchievement, SeedBadge, SeedError, SeedFixture, SeedSummary, SeedUser};
pub use service::{
    EarnedAchievement, EarnedBadge, ReviewService, ReviewServiceError, SubmissionOutcome,
    SubmissionStage,
};
