use std::sync::Arc;

use super::domain::{ReviewRole, User, UserId};
use super::repository::{RepositoryError, UserRepository};

/// Credits review points to users through the store's atomic increment.
pub struct PointLedger<U> {
    users: Arc<U>,
}

impl<U> PointLedger<U>
where
    U: UserRepository + 'static,
{
    pub fn new(users: Arc<U>) -> Self {
        Self { users }
    }

    /// Credit one review to `user` in the given role and return the committed snapshot.
    ///
    /// Fails with [`RepositoryError::NotFound`] when the user disappeared before the write.
    pub fn apply_review_points(
        &self,
        user: &UserId,
        role: ReviewRole,
    ) -> Result<User, RepositoryError> {
        let updated = self
            .users
            .increment_points(user, role.kind(), role.delta())?;
        tracing::debug!(
            user = %updated.id,
            kind = role.kind().label(),
            sending = updated.sending_review_points,
            receiving = updated.receiving_review_points,
            total = updated.total_points,
            "review points applied"
        );
        Ok(updated)
    }
}
