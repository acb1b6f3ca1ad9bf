use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::awards::{AwardError, AwardEvaluator};
use super::catalog::{AchievementCatalog, CatalogError};
use super::domain::{
    AchievementId, BadgeId, CommentId, Review, ReviewComment, ReviewId, ReviewLike, ReviewRole,
    User, UserId,
};
use super::ledger::PointLedger;
use super::repository::{
    LeaderboardEntry, RepositoryError, ReviewEditError, ReviewRepository, UserRepository,
};

static REVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static COMMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_review_id() -> ReviewId {
    let id = REVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReviewId(format!("rev-{id:06}"))
}

fn next_comment_id() -> CommentId {
    let id = COMMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CommentId(format!("cmt-{id:06}"))
}

/// Point reached by a submission before a later step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStage {
    /// The review is stored; neither party has been credited.
    ReviewStored,
    /// The review is stored and the reviewer is fully settled; the reviewee is not.
    ReviewerSettled,
    /// Both parties are settled; reloading them for the response failed.
    Settled,
}

impl SubmissionStage {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStage::ReviewStored => "review_stored",
            SubmissionStage::ReviewerSettled => "reviewer_settled",
            SubmissionStage::Settled => "settled",
        }
    }
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Created review plus the reloaded state of both parties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionOutcome {
    pub review: Review,
    pub reviewer: User,
    pub reviewee: User,
}

/// Achievement grant resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedAchievement {
    pub achievement_id: AchievementId,
    pub name: String,
    pub description: String,
    pub earned_date: DateTime<Utc>,
}

/// Badge grant resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedBadge {
    pub badge_id: BadgeId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub earned_date: DateTime<Utc>,
}

/// Error raised by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("persistence failure: {0}")]
    Persistence(#[from] RepositoryError),
    #[error("award evaluation failed: {0}")]
    Award(#[from] AwardError),
    #[error("catalog failure: {0}")]
    Catalog(#[from] CatalogError),
    #[error("review {review_id} was saved but the submission stopped after {stage}: {source}")]
    PartiallyApplied {
        review_id: ReviewId,
        stage: SubmissionStage,
        source: Box<ReviewServiceError>,
    },
}

/// Review workflow: submission with point and award settlement, plus likes and comments.
pub struct ReviewService<U, R, C> {
    users: Arc<U>,
    reviews: Arc<R>,
    catalog: Arc<C>,
    ledger: PointLedger<U>,
    evaluator: AwardEvaluator<U, C>,
}

fn parse_user_id(raw: &str) -> Result<UserId, ReviewServiceError> {
    UserId::parse(raw)
        .ok_or_else(|| ReviewServiceError::Validation(format!("malformed user id '{raw}'")))
}

fn parse_review_id(raw: &str) -> Result<ReviewId, ReviewServiceError> {
    ReviewId::parse(raw)
        .ok_or_else(|| ReviewServiceError::Validation(format!("malformed review id '{raw}'")))
}

fn required_text(raw: &str, message: &str) -> Result<String, ReviewServiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ReviewServiceError::Validation(message.to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

impl<U, R, C> ReviewService<U, R, C>
where
    U: UserRepository + 'static,
    R: ReviewRepository + 'static,
    C: AchievementCatalog + 'static,
{
    pub fn new(users: Arc<U>, reviews: Arc<R>, catalog: Arc<C>) -> Self {
        let ledger = PointLedger::new(users.clone());
        let evaluator = AwardEvaluator::new(users.clone(), catalog.clone());
        Self {
            users,
            reviews,
            catalog,
            ledger,
            evaluator,
        }
    }

    /// Store a review from `reviewer` about `reviewee`, then credit and evaluate both parties.
    ///
    /// The reviewer is settled completely before the reviewee. Steps are committed
    /// independently; a failure after the review is stored is reported as
    /// [`ReviewServiceError::PartiallyApplied`] and nothing is rolled back.
    pub fn submit_review(
        &self,
        reviewer: &UserId,
        reviewee: &str,
        text: &str,
    ) -> Result<SubmissionOutcome, ReviewServiceError> {
        let text = required_text(text, "Review is required")?;
        let reviewee_id = parse_user_id(reviewee)?;

        let reviewee = self
            .users
            .fetch(&reviewee_id)?
            .ok_or_else(|| ReviewServiceError::NotFound("Reviewee user not found".to_string()))?;
        let reviewer = self
            .users
            .fetch(reviewer)?
            .ok_or_else(|| ReviewServiceError::NotFound("Reviewer user not found".to_string()))?;

        let review = Review::new(next_review_id(), &reviewer, &reviewee, text, Utc::now());
        let review = self.reviews.insert(review)?;
        tracing::info!(
            review = %review.id,
            reviewer = %reviewer.id,
            reviewee = %reviewee.id,
            "review stored"
        );

        self.settle(&reviewer.id, ReviewRole::Reviewer)
            .map_err(|err| partial(&review.id, SubmissionStage::ReviewStored, err))?;
        self.settle(&reviewee.id, ReviewRole::Reviewee)
            .map_err(|err| partial(&review.id, SubmissionStage::ReviewerSettled, err))?;

        let reviewer = self
            .reload(&reviewer.id)
            .map_err(|err| partial(&review.id, SubmissionStage::Settled, err))?;
        let reviewee = self
            .reload(&reviewee.id)
            .map_err(|err| partial(&review.id, SubmissionStage::Settled, err))?;

        Ok(SubmissionOutcome {
            review,
            reviewer,
            reviewee,
        })
    }

    /// Credit one party and evaluate awards against the credited snapshot.
    fn settle(&self, user: &UserId, role: ReviewRole) -> Result<User, ReviewServiceError> {
        let credited = self.ledger.apply_review_points(user, role)?;
        let outcome = self.evaluator.evaluate_and_grant(&credited, role.kind())?;
        Ok(outcome.user)
    }

    fn reload(&self, user: &UserId) -> Result<User, ReviewServiceError> {
        self.users
            .fetch(user)?
            .ok_or_else(|| ReviewServiceError::NotFound(format!("User {user} not found")))
    }

    pub fn get_review(&self, review: &str) -> Result<Review, ReviewServiceError> {
        let id = parse_review_id(review)?;
        self.reviews
            .fetch(&id)?
            .ok_or_else(|| ReviewServiceError::NotFound("Review not found".to_string()))
    }

    /// All reviews, newest first.
    pub fn list_reviews(&self) -> Result<Vec<Review>, ReviewServiceError> {
        Ok(self.reviews.list()?)
    }

    /// Reviews written about `user`, newest first.
    pub fn reviews_received(&self, user: &UserId) -> Result<Vec<Review>, ReviewServiceError> {
        Ok(self
            .reviews
            .list()?
            .into_iter()
            .filter(|review| &review.user == user)
            .collect())
    }

    /// Reviews written by `user`, matched on the reviewer email recorded with each review.
    pub fn reviews_added(&self, user: &UserId) -> Result<Vec<Review>, ReviewServiceError> {
        let author = self.reload(user)?;
        Ok(self
            .reviews
            .list()?
            .into_iter()
            .filter(|review| review.reviewer_email == author.email)
            .collect())
    }

    pub fn like(&self, review: &str, user: &UserId) -> Result<Vec<ReviewLike>, ReviewServiceError> {
        let id = parse_review_id(review)?;
        self.reviews.add_like(&id, user).map_err(edit_error)
    }

    pub fn unlike(
        &self,
        review: &str,
        user: &UserId,
    ) -> Result<Vec<ReviewLike>, ReviewServiceError> {
        let id = parse_review_id(review)?;
        self.reviews.remove_like(&id, user).map_err(edit_error)
    }

    pub fn add_comment(
        &self,
        review: &str,
        author: &UserId,
        text: &str,
    ) -> Result<Vec<ReviewComment>, ReviewServiceError> {
        let text = required_text(text, "Comment text is required")?;
        let id = parse_review_id(review)?;
        let author = self.reload(author)?;

        let comment = ReviewComment {
            id: next_comment_id(),
            user: author.id,
            text,
            name: author.name,
            avatar: author.avatar,
            date: Utc::now(),
        };
        self.reviews.push_comment(&id, comment).map_err(edit_error)
    }

    /// Remove a comment; only its author may do so.
    pub fn delete_comment(
        &self,
        review: &str,
        comment: &str,
        caller: &UserId,
    ) -> Result<Vec<ReviewComment>, ReviewServiceError> {
        let id = parse_review_id(review)?;
        let comment = CommentId::parse(comment)
            .ok_or_else(|| ReviewServiceError::NotFound("Comment not found".to_string()))?;
        self.reviews
            .remove_comment(&id, &comment, caller)
            .map_err(edit_error)
    }

    /// Users by total points descending; ties keep a stable id order.
    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ReviewServiceError> {
        Ok(self
            .users
            .by_total_points()?
            .iter()
            .map(LeaderboardEntry::from)
            .collect())
    }

    pub fn user(&self, user: &str) -> Result<User, ReviewServiceError> {
        let id = parse_user_id(user)?;
        self.reload(&id)
    }

    pub fn user_achievements(
        &self,
        user: &str,
    ) -> Result<Vec<EarnedAchievement>, ReviewServiceError> {
        let user = self.user(user)?;
        user.achievements
            .into_iter()
            .map(|grant| -> Result<EarnedAchievement, ReviewServiceError> {
                let entry = self.catalog.achievement(&grant.achievement_id)?;
                Ok(match entry {
                    Some(achievement) => EarnedAchievement {
                        achievement_id: grant.achievement_id,
                        name: achievement.name,
                        description: achievement.description,
                        earned_date: grant.earned_date,
                    },
                    None => EarnedAchievement {
                        achievement_id: grant.achievement_id,
                        name: "Unknown Achievement".to_string(),
                        description: "No description".to_string(),
                        earned_date: grant.earned_date,
                    },
                })
            })
            .collect()
    }

    pub fn user_badges(&self, user: &str) -> Result<Vec<EarnedBadge>, ReviewServiceError> {
        let user = self.user(user)?;
        user.badges
            .into_iter()
            .map(|grant| -> Result<EarnedBadge, ReviewServiceError> {
                let entry = self.catalog.badge(&grant.badge_id)?;
                Ok(match entry {
                    Some(badge) => EarnedBadge {
                        badge_id: grant.badge_id,
                        name: badge.name,
                        description: badge.description,
                        icon: badge.icon,
                        earned_date: grant.earned_date,
                    },
                    None => EarnedBadge {
                        badge_id: grant.badge_id,
                        name: "Unknown Badge".to_string(),
                        description: "No description".to_string(),
                        icon: "No icon".to_string(),
                        earned_date: grant.earned_date,
                    },
                })
            })
            .collect()
    }
}

fn edit_error(err: ReviewEditError) -> ReviewServiceError {
    match err {
        ReviewEditError::AlreadyLiked | ReviewEditError::NotLiked => {
            ReviewServiceError::Validation(err.to_string())
        }
        ReviewEditError::CommentNotFound => ReviewServiceError::NotFound(err.to_string()),
        ReviewEditError::NotCommentAuthor => ReviewServiceError::Unauthorized(err.to_string()),
        ReviewEditError::Repository(RepositoryError::NotFound) => {
            ReviewServiceError::NotFound("Review not found".to_string())
        }
        ReviewEditError::Repository(err) => ReviewServiceError::Persistence(err),
    }
}

fn partial(
    review_id: &ReviewId,
    stage: SubmissionStage,
    source: ReviewServiceError,
) -> ReviewServiceError {
    tracing::warn!(
        review = %review_id,
        stage = stage.label(),
        error = %source,
        "review submission partially applied"
    );
    ReviewServiceError::PartiallyApplied {
        review_id: review_id.clone(),
        stage,
        source: Box::new(source),
    }
}
