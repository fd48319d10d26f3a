use std::sync::Arc;

use chrono::Utc;

use super::{SessionToken, TokenHasher};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::User;

/// Turns bearer tokens into users.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn Store>,
    hasher: Arc<TokenHasher>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            hasher: Arc::new(TokenHasher::default()),
        }
    }

    /// Validates a raw token and returns its user with role attached.
    pub fn validate(&self, raw_token: &str) -> Result<User> {
        let presented = SessionToken::parse(raw_token)?;

        let token = self
            .store
            .get_token_by_lookup(presented.lookup())?
            .ok_or(Error::Unauthorized)?;

        if !self.hasher.matches(&presented, &token)? {
            return Err(Error::Unauthorized);
        }

        if token.expires_at.is_some_and(|at| at < Utc::now()) {
            return Err(Error::TokenExpired);
        }

        let user = self
            .store
            .get_user(token.user_id)?
            .ok_or(Error::Unauthorized)?;

        if let Err(e) = self.store.update_token_last_used(&token.id) {
            tracing::warn!("Failed to update token last_used_at: {e}");
        }

        Ok(user)
    }

    /// Creates and stores a new token for `user`, returning the raw value.
    /// The raw token is never stored and cannot be recovered later.
    pub fn issue(&self, user: &User) -> Result<String> {
        let session = SessionToken::random();
        let token = self.hasher.record_for(user, &session)?;
        self.store.create_token(&token)?;

        tracing::info!(user = %user.name, token_id = %token.id, "issued token");
        Ok(session.as_str().to_string())
    }
}

/// Extracts a bearer token from an Authorization header value.
/// Returns None if no header is present.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Result<Option<String>> {
    let Some(header) = auth_header else {
        return Ok(None);
    };

    header
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim().to_string()))
        .ok_or(Error::Unauthorized)
}
