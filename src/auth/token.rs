use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use chrono::Utc;
use rand::RngCore;

use crate::error::{Error, Result};
use crate::types::{Token, User};

const PREFIX: &str = "filekeep_";
const LOOKUP_BYTES: usize = 4;
const SECRET_BYTES: usize = 12;

/// A bearer token as handed out: `filekeep_<lookup>_<secret>`, both parts
/// lowercase hex. Only the lookup part is stored in clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    raw: String,
}

impl SessionToken {
    #[must_use]
    pub fn random() -> Self {
        Self {
            raw: format!(
                "{PREFIX}{}_{}",
                random_hex(LOOKUP_BYTES),
                random_hex(SECRET_BYTES)
            ),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let rest = raw.strip_prefix(PREFIX).ok_or(Error::InvalidTokenFormat)?;
        let (lookup, secret) = rest.split_once('_').ok_or(Error::InvalidTokenFormat)?;

        if !is_hex_of(lookup, LOOKUP_BYTES) || !is_hex_of(secret, SECRET_BYTES) {
            return Err(Error::InvalidTokenFormat);
        }
        Ok(Self {
            raw: raw.to_string(),
        })
    }

    #[must_use]
    pub fn lookup(&self) -> &str {
        &self.raw[PREFIX.len()..PREFIX.len() + LOOKUP_BYTES * 2]
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Hashes session tokens with argon2id for storage and checks presented
/// tokens against stored hashes.
#[derive(Default)]
pub struct TokenHasher {
    argon2: Argon2<'static>,
}

impl TokenHasher {
    /// Builds the stored record for `token`, owned by `user`.
    pub fn record_for(&self, user: &User, token: &SessionToken) -> Result<Token> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(token.as_str().as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("failed to hash token: {e}")))?;

        Ok(Token {
            id: uuid::Uuid::new_v4().to_string(),
            token_hash: hash.to_string(),
            token_lookup: token.lookup().to_string(),
            user_id: user.id,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        })
    }

    pub fn matches(&self, token: &SessionToken, stored: &Token) -> Result<bool> {
        let hash = PasswordHash::new(&stored.token_hash)
            .map_err(|e| Error::Internal(format!("invalid hash for token {}: {e}", stored.id)))?;

        match self.argon2.verify_password(token.as_str().as_bytes(), &hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Internal(format!("failed to verify token: {e}"))),
        }
    }
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_hex_of(part: &str, bytes: usize) -> bool {
    part.len() == bytes * 2
        && part
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
