use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::domain::UserId;

/// Header carrying the caller's session token.
pub const AUTH_HEADER: &str = "x-auth-token";

/// Resolves a request credential to the authenticated user.
pub trait IdentityProvider: Send + Sync {
    fn identify(&self, credential: &str) -> Result<UserId, IdentityError>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("No token, authorization denied")]
    MissingCredential,
    #[error("Token is not valid")]
    InvalidCredential,
    #[error("session table unavailable: {0}")]
    Unavailable(String),
}

/// Token table populated at startup from seed data.
#[derive(Default, Clone)]
pub struct TokenIdentity {
    sessions: Arc<RwLock<HashMap<String, UserId>>>,
}

impl TokenIdentity {
    pub fn issue(&self, token: impl Into<String>, user: UserId) -> Result<(), IdentityError> {
        self.sessions
            .write()
            .map_err(|err| IdentityError::Unavailable(err.to_string()))?
            .insert(token.into(), user);
        Ok(())
    }
}

impl IdentityProvider for TokenIdentity {
    fn identify(&self, credential: &str) -> Result<UserId, IdentityError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(IdentityError::MissingCredential);
        }
        self.sessions
            .read()
            .map_err(|err| IdentityError::Unavailable(err.to_string()))?
            .get(credential)
            .cloned()
            .ok_or(IdentityError::InvalidCredential)
    }
}
