use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::catalog::{AchievementCatalog, CatalogError};
use super::domain::{AchievementGrant, BadgeGrant, PointKind, User};
use super::repository::{AwardBatch, RepositoryError, UserRepository};

/// Result of one evaluation pass for a single user.
#[derive(Debug, Clone, PartialEq)]
pub struct AwardOutcome {
    pub granted: AwardBatch,
    pub user: User,
}

#[derive(Debug, thiserror::Error)]
pub enum AwardError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Matches a user's counters against the catalog and grants new achievements and badges.
pub struct AwardEvaluator<U, C> {
    users: Arc<U>,
    catalog: Arc<C>,
}

impl<U, C> AwardEvaluator<U, C>
where
    U: UserRepository + 'static,
    C: AchievementCatalog + 'static,
{
    pub fn new(users: Arc<U>, catalog: Arc<C>) -> Self {
        Self { users, catalog }
    }

    pub fn evaluate_and_grant(
        &self,
        user: &User,
        kind: PointKind,
    ) -> Result<AwardOutcome, AwardError> {
        self.evaluate_at(user, kind, Utc::now())
    }

    /// Evaluate `user` as of `now`; the snapshot must already carry the counter update.
    pub fn evaluate_at(
        &self,
        user: &User,
        kind: PointKind,
        now: DateTime<Utc>,
    ) -> Result<AwardOutcome, AwardError> {
        let granted = self.pending_grants(user, kind, now)?;

        if granted.is_empty() {
            return Ok(AwardOutcome {
                granted,
                user: user.clone(),
            });
        }

        let stored = self.users.record_awards(&user.id, &granted)?;
        let achievements: Vec<&str> = granted
            .achievements
            .iter()
            .map(|grant| grant.achievement_id.as_str())
            .collect();
        let badges: Vec<&str> = granted
            .badges
            .iter()
            .map(|grant| grant.badge_id.as_str())
            .collect();
        tracing::info!(
            user = %stored.id,
            kind = kind.label(),
            ?achievements,
            ?badges,
            "awards granted"
        );

        Ok(AwardOutcome {
            granted,
            user: stored,
        })
    }

    /// Compute the grants `user` qualifies for without writing anything.
    pub fn pending_grants(
        &self,
        user: &User,
        kind: PointKind,
        now: DateTime<Utc>,
    ) -> Result<AwardBatch, AwardError> {
        let mut catalog = self.catalog.achievements()?;
        catalog.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let points = user.points(kind);
        let mut held_achievements: BTreeSet<_> = user
            .achievements
            .iter()
            .map(|grant| grant.achievement_id.clone())
            .collect();
        let mut held_badges: BTreeSet<_> = user
            .badges
            .iter()
            .map(|grant| grant.badge_id.clone())
            .collect();

        let mut batch = AwardBatch::default();
        for achievement in catalog {
            if !achievement.matches(kind, points) {
                continue;
            }
            if !held_achievements.insert(achievement.id.clone()) {
                continue;
            }
            batch.achievements.push(AchievementGrant {
                achievement_id: achievement.id.clone(),
                earned_date: now,
            });

            match self.catalog.badge(&achievement.badge)? {
                Some(badge) if held_badges.insert(badge.id.clone()) => {
                    batch.badges.push(BadgeGrant {
                        badge_id: badge.id,
                        earned_date: now,
                    });
                }
                Some(_) => {}
                None => tracing::warn!(
                    achievement = %achievement.id,
                    badge = %achievement.badge,
                    "achievement links a missing badge"
                ),
            }
        }

        Ok(batch)
    }
}
