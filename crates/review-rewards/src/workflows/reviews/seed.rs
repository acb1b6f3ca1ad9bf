use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use super::catalog::{CatalogError, CatalogService, CatalogStore, NewAchievement, NewBadge};
use super::domain::{BadgeId, User, UserId};
use super::identity::{IdentityError, TokenIdentity};
use super::repository::{RepositoryError, UserRepository};

/// Badges, achievements and users loaded at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFixture {
    #[serde(default)]
    pub badges: Vec<SeedBadge>,
    #[serde(default)]
    pub achievements: Vec<SeedAchievement>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

/// Badge entry; `key` is only used to link achievements inside the fixture.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedBadge {
    pub key: String,
    pub name: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAchievement {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub sending_review_points: f64,
    #[serde(default)]
    pub receiving_review_points: f64,
    pub badge: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Counts of records created by [`SeedFixture::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub badges: usize,
    pub achievements: usize,
    pub users: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("achievement '{achievement}' references unknown badge key '{key}'")]
    UnknownBadgeKey { achievement: String, key: String },
    #[error("malformed user id '{0}'")]
    InvalidUserId(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl SeedFixture {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SeedError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Built-in catalog: first review, five and ten review milestones for both counters.
    pub fn standard() -> Self {
        let badge = |key: &str, name: &str, description: &str, icon: &str| SeedBadge {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
        };
        let achievement =
            |name: &str, description: &str, sending: f64, receiving: f64, badge: &str| {
                SeedAchievement {
                    name: name.to_string(),
                    description: description.to_string(),
                    sending_review_points: sending,
                    receiving_review_points: receiving,
                    badge: badge.to_string(),
                }
            };

        Self {
            badges: vec![
                badge("first-sent", "First Review", "First review sent", "/icons/first-sent.png"),
                badge(
                    "first-received",
                    "First Received Review",
                    "First review received",
                    "/icons/first-received.png",
                ),
                badge("reviewer", "Seasoned Reviewer", "Sent many reviews", "/icons/reviewer.png"),
                badge("reviewed", "Well Reviewed", "Received many reviews", "/icons/reviewed.png"),
            ],
            achievements: vec![
                achievement("First Review Sent", "Sent your first review", 1.0, 0.0, "first-sent"),
                achievement(
                    "First Review Received",
                    "Received your first review",
                    0.0,
                    0.5,
                    "first-received",
                ),
                achievement("Sent 5 Reviews", "Sent 5 reviews", 5.0, 0.0, "reviewer"),
                achievement("Received 5 Reviews", "Received 5 reviews", 0.0, 2.5, "reviewed"),
                achievement("Sent 10 Reviews", "Sent 10 reviews", 10.0, 0.0, "reviewer"),
                achievement("Received 10 Reviews", "Received 10 reviews", 0.0, 5.0, "reviewed"),
            ],
            users: Vec::new(),
        }
    }

    /// Create every badge, achievement and user, issuing session tokens where given.
    pub fn apply<C, U>(
        &self,
        catalog: &CatalogService<C>,
        users: &U,
        identity: &TokenIdentity,
    ) -> Result<SeedSummary, SeedError>
    where
        C: CatalogStore + 'static,
        U: UserRepository,
    {
        let mut summary = SeedSummary::default();
        let mut badge_ids: HashMap<&str, BadgeId> = HashMap::new();

        for badge in &self.badges {
            let stored = catalog.create_badge(NewBadge {
                name: badge.name.clone(),
                description: badge.description.clone(),
                icon: badge.icon.clone(),
            })?;
            badge_ids.insert(badge.key.as_str(), stored.id);
            summary.badges += 1;
        }

        for achievement in &self.achievements {
            let badge = badge_ids
                .get(achievement.badge.as_str())
                .cloned()
                .ok_or_else(|| SeedError::UnknownBadgeKey {
                    achievement: achievement.name.clone(),
                    key: achievement.badge.clone(),
                })?;
            catalog.create_achievement(NewAchievement {
                name: achievement.name.clone(),
                description: achievement.description.clone(),
                sending_review_points: achievement.sending_review_points,
                receiving_review_points: achievement.receiving_review_points,
                badge,
            })?;
            summary.achievements += 1;
        }

        for seed in &self.users {
            let id = UserId::parse(&seed.id)
                .ok_or_else(|| SeedError::InvalidUserId(seed.id.clone()))?;
            let mut user = User::new(id, &seed.name, &seed.email, &seed.username);
            user.avatar = seed.avatar.clone();
            let stored = users.insert(user)?;
            if let Some(token) = &seed.token {
                identity.issue(token.clone(), stored.id.clone())?;
            }
            summary.users += 1;
        }

        tracing::info!(
            badges = summary.badges,
            achievements = summary.achievements,
            users = summary.users,
            "seed fixture applied"
        );
        Ok(summary)
    }
}
