use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Achievement, AchievementId, Badge, BadgeId};

/// Read-only view of the achievement catalog consumed by the award evaluator.
pub trait AchievementCatalog: Send + Sync {
    fn achievements(&self) -> Result<Vec<Achievement>, CatalogError>;
    fn achievement(&self, id: &AchievementId) -> Result<Option<Achievement>, CatalogError>;
    fn badge(&self, id: &BadgeId) -> Result<Option<Badge>, CatalogError>;
    fn badges(&self) -> Result<Vec<Badge>, CatalogError>;
}

/// Administrative writes; implementations enforce unique names.
pub trait CatalogStore: AchievementCatalog {
    fn insert_badge(&self, badge: Badge) -> Result<Badge, CatalogError>;
    fn insert_achievement(&self, achievement: Achievement) -> Result<Achievement, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{kind} named '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },
    #[error("badge {0} does not exist")]
    UnknownBadge(BadgeId),
    #[error("{0}")]
    Invalid(String),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Payload for creating a badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBadge {
    pub name: String,
    pub description: String,
    pub icon: String,
}

/// Payload for creating an achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAchievement {
    pub name: String,
    pub description: String,
    pub sending_review_points: f64,
    pub receiving_review_points: f64,
    pub badge: BadgeId,
}

fn required(value: &str, message: &str) -> Result<String, CatalogError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CatalogError::Invalid(message.to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

fn threshold(value: f64, message: &str) -> Result<f64, CatalogError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CatalogError::Invalid(message.to_string()))
    }
}

impl NewBadge {
    pub fn into_badge(self, id: BadgeId, created_at: DateTime<Utc>) -> Result<Badge, CatalogError> {
        Ok(Badge {
            id,
            name: required(&self.name, "Badge name is required")?,
            description: required(&self.description, "Badge description is required")?,
            icon: required(&self.icon, "Badge icon is required")?,
            created_at,
        })
    }
}

impl NewAchievement {
    pub fn into_achievement(
        self,
        id: AchievementId,
        created_at: DateTime<Utc>,
    ) -> Result<Achievement, CatalogError> {
        Ok(Achievement {
            id,
            name: required(&self.name, "Achievement name is required")?,
            description: required(&self.description, "Achievement description is required")?,
            sending_review_points: threshold(
                self.sending_review_points,
                "Sending Review Points must be a non-negative number",
            )?,
            receiving_review_points: threshold(
                self.receiving_review_points,
                "Receiving Review Points must be a non-negative number",
            )?,
            badge: self.badge,
            created_at,
        })
    }
}

/// Achievement with its badge resolved, as listed by the catalog endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub badge_detail: Option<Badge>,
}

static BADGE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ACHIEVEMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_badge_id() -> BadgeId {
    let id = BADGE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BadgeId(format!("badge-{id:06}"))
}

fn next_achievement_id() -> AchievementId {
    let id = ACHIEVEMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AchievementId(format!("ach-{id:06}"))
}

/// Administrative facade over the catalog store.
pub struct CatalogService<C> {
    store: Arc<C>,
}

impl<C> CatalogService<C>
where
    C: CatalogStore + 'static,
{
    pub fn new(store: Arc<C>) -> Self {
        Self { store }
    }

    pub fn create_badge(&self, payload: NewBadge) -> Result<Badge, CatalogError> {
        let badge = payload.into_badge(next_badge_id(), Utc::now())?;
        let stored = self.store.insert_badge(badge)?;
        tracing::info!(badge = %stored.id, name = %stored.name, "badge created");
        Ok(stored)
    }

    pub fn create_achievement(&self, payload: NewAchievement) -> Result<Achievement, CatalogError> {
        let achievement = payload.into_achievement(next_achievement_id(), Utc::now())?;
        if self.store.badge(&achievement.badge)?.is_none() {
            return Err(CatalogError::UnknownBadge(achievement.badge));
        }
        let stored = self.store.insert_achievement(achievement)?;
        tracing::info!(
            achievement = %stored.id,
            badge = %stored.badge,
            sending = stored.sending_review_points,
            receiving = stored.receiving_review_points,
            "achievement created"
        );
        Ok(stored)
    }

    pub fn list_achievements(&self) -> Result<Vec<AchievementView>, CatalogError> {
        self.store
            .achievements()?
            .into_iter()
            .map(|achievement| -> Result<AchievementView, CatalogError> {
                let badge_detail = self.store.badge(&achievement.badge)?;
                Ok(AchievementView {
                    achievement,
                    badge_detail,
                })
            })
            .collect()
    }

    /// Badges, newest first.
    pub fn list_badges(&self) -> Result<Vec<Badge>, CatalogError> {
        let mut badges = self.store.badges()?;
        badges.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(badges)
    }
}
