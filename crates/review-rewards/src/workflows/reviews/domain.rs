use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAX_ID_LEN: usize = 64;

/// Checks the shape shared by every document identifier.
pub fn is_well_formed_id(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_ID_LEN
        && raw
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Parse a caller supplied identifier, rejecting malformed input.
            pub fn parse(raw: &str) -> Option<Self> {
                let trimmed = raw.trim();
                is_well_formed_id(trimmed).then(|| Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

document_id!(
    /// Identifier of a registered user.
    UserId
);
document_id!(
    /// Identifier of a persisted review.
    ReviewId
);
document_id!(CommentId);
document_id!(
    /// Identifier of an achievement in the catalog.
    AchievementId
);
document_id!(
    /// Identifier of a badge in the catalog.
    BadgeId
);

/// Which of the two review counters a rule or update refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Sending,
    Receiving,
}

impl PointKind {
    pub const fn label(self) -> &'static str {
        match self {
            PointKind::Sending => "sending",
            PointKind::Receiving => "receiving",
        }
    }
}

/// Part a user plays in a single review submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewRole {
    Reviewer,
    Reviewee,
}

impl ReviewRole {
    /// Counter touched when a user takes this role.
    pub const fn kind(self) -> PointKind {
        match self {
            ReviewRole::Reviewer => PointKind::Sending,
            ReviewRole::Reviewee => PointKind::Receiving,
        }
    }

    /// Points credited per review for this role.
    pub const fn delta(self) -> f64 {
        match self {
            ReviewRole::Reviewer => 1.0,
            ReviewRole::Reviewee => 0.5,
        }
    }
}

/// Record of an achievement earned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementGrant {
    pub achievement_id: AchievementId,
    pub earned_date: DateTime<Utc>,
}

/// Record of a badge earned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeGrant {
    pub badge_id: BadgeId,
    pub earned_date: DateTime<Utc>,
}

/// Registered user with review counters and earned rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub sending_review_points: f64,
    #[serde(default)]
    pub receiving_review_points: f64,
    #[serde(default)]
    pub total_points: f64,
    #[serde(default)]
    pub achievements: Vec<AchievementGrant>,
    #[serde(default)]
    pub badges: Vec<BadgeGrant>,
}

impl User {
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            username: username.into(),
            avatar: None,
            sending_review_points: 0.0,
            receiving_review_points: 0.0,
            total_points: 0.0,
            achievements: Vec::new(),
            badges: Vec::new(),
        }
    }

    pub fn points(&self, kind: PointKind) -> f64 {
        match kind {
            PointKind::Sending => self.sending_review_points,
            PointKind::Receiving => self.receiving_review_points,
        }
    }

    /// Add `delta` to one counter and re-derive the total.
    pub fn credit(&mut self, kind: PointKind, delta: f64) {
        match kind {
            PointKind::Sending => self.sending_review_points += delta,
            PointKind::Receiving => self.receiving_review_points += delta,
        }
        self.recompute_total();
    }

    pub fn recompute_total(&mut self) {
        self.total_points = self.sending_review_points + self.receiving_review_points;
    }

    pub fn has_achievement(&self, id: &AchievementId) -> bool {
        self.achievements
            .iter()
            .any(|grant| &grant.achievement_id == id)
    }

    pub fn has_badge(&self, id: &BadgeId) -> bool {
        self.badges.iter().any(|grant| &grant.badge_id == id)
    }
}

/// Visual reward granted through achievements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

/// Point threshold rule linked to exactly one badge.
///
/// The same record carries a threshold for each counter; which one applies depends on the
/// counter being evaluated. A zero threshold never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: AchievementId,
    pub name: String,
    pub description: String,
    pub sending_review_points: f64,
    pub receiving_review_points: f64,
    pub badge: BadgeId,
    pub created_at: DateTime<Utc>,
}

impl Achievement {
    pub fn threshold(&self, kind: PointKind) -> f64 {
        match kind {
            PointKind::Sending => self.sending_review_points,
            PointKind::Receiving => self.receiving_review_points,
        }
    }

    /// Exact landing on a non-zero threshold; counters that skip past it do not qualify.
    #[allow(clippy::float_cmp)]
    pub fn matches(&self, kind: PointKind, points: f64) -> bool {
        let threshold = self.threshold(kind);
        threshold > 0.0 && threshold == points
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewLike {
    pub user: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewComment {
    pub id: CommentId,
    pub user: UserId,
    pub text: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub date: DateTime<Utc>,
}

/// Peer review left by one user for another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    /// The reviewee.
    pub user: UserId,
    pub review_text: String,
    pub reviewer_id: UserId,
    pub reviewer_name: String,
    pub reviewer_email: String,
    #[serde(default)]
    pub reviewer_avatar: Option<String>,
    pub review_date: DateTime<Utc>,
    #[serde(default)]
    pub likes: Vec<ReviewLike>,
    #[serde(default)]
    pub review_comments: Vec<ReviewComment>,
}

impl Review {
    pub fn new(
        id: ReviewId,
        reviewer: &User,
        reviewee: &User,
        text: impl Into<String>,
        review_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user: reviewee.id.clone(),
            review_text: text.into(),
            reviewer_id: reviewer.id.clone(),
            reviewer_name: reviewer.name.clone(),
            reviewer_email: reviewer.email.clone(),
            reviewer_avatar: reviewer.avatar.clone(),
            review_date,
            likes: Vec::new(),
            review_comments: Vec::new(),
        }
    }

    pub fn liked_by(&self, user: &UserId) -> bool {
        self.likes.iter().any(|like| &like.user == user)
    }
}
