use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::content::{LOCAL_ID_LEN, is_valid_local_id};
use crate::error::{Error, Result};
use crate::store::Store;

/// Attempts made before giving up on a random identifier.
pub const MAX_ATTEMPTS: u32 = 5;

pub const SLUG_LEN: usize = 25;

pub const RANDOM_NAME_LEN: usize = 20;

const LOCAL_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates collision-free local storage ids and public slugs.
#[derive(Clone)]
pub struct IdentifierAllocator {
    store: Arc<dyn Store>,
}

impl IdentifierAllocator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn allocate_local_id(&self) -> Result<String> {
        allocate_with(random_local_id, |id| self.store.local_name_exists(id))
    }

    /// Returns `requested` verbatim if it is free or already bound to
    /// `file_id`; a slug held by another file is a Conflict. Without a
    /// request a random slug is drawn.
    pub fn allocate_public_slug(&self, requested: Option<&str>, file_id: i64) -> Result<String> {
        let taken_by_other = |slug: &str| -> Result<bool> {
            Ok(self
                .store
                .get_file_by_slug(slug)?
                .is_some_and(|f| f.id != file_id))
        };

        match requested {
            Some(slug) if !slug.is_empty() => {
                if taken_by_other(slug)? {
                    return Err(Error::conflict("public name already in use"));
                }
                Ok(slug.to_string())
            }
            _ => allocate_with(|| random_alphanumeric(SLUG_LEN), taken_by_other),
        }
    }
}

/// Draws candidates until `exists` reports a free one, at most
/// [`MAX_ATTEMPTS`] times.
pub fn allocate_with<G, F>(mut generate: G, mut exists: F) -> Result<String>
where
    G: FnMut() -> String,
    F: FnMut(&str) -> Result<bool>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = generate();
        if !exists(&candidate)? {
            return Ok(candidate);
        }
        tracing::warn!(attempt, "identifier collision");
    }

    tracing::error!(attempts = MAX_ATTEMPTS, "identifier allocation exhausted");
    Err(Error::AllocationExhausted(MAX_ATTEMPTS))
}

#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Local ids are lowercase so they map safely onto case-insensitive
/// filesystems.
#[must_use]
pub fn random_local_id() -> String {
    let mut rng = rand::thread_rng();
    let id: String = (0..LOCAL_ID_LEN)
        .map(|_| LOCAL_ID_CHARSET[rng.gen_range(0..LOCAL_ID_CHARSET.len())] as char)
        .collect();
    debug_assert!(is_valid_local_id(&id));
    id
}
