use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Namespace, User};

/// Looks up and creates namespaces. The shared default namespace is named
/// by configuration and injected at construction.
#[derive(Clone)]
pub struct NamespaceRegistry {
    store: Arc<dyn Store>,
    default_name: String,
}

impl NamespaceRegistry {
    pub fn new(store: Arc<dyn Store>, default_name: impl Into<String>) -> Self {
        Self {
            store,
            default_name: default_name.into(),
        }
    }

    #[must_use]
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Returns the default namespace, creating it if it does not exist yet.
    pub fn ensure_default(&self) -> Result<Namespace> {
        if let Some(ns) = self.store.get_default_namespace(&self.default_name)? {
            return Ok(ns);
        }

        match self.store.create_namespace(&self.default_name, None) {
            Ok(ns) => {
                tracing::info!(name = %ns.name, "created default namespace");
                Ok(ns)
            }
            Err(Error::AlreadyExists) => self
                .store
                .get_default_namespace(&self.default_name)?
                .ok_or_else(|| Error::Internal("default namespace vanished".to_string())),
            Err(e) => Err(e),
        }
    }

    /// Resolves `name` for `user`: empty means the default namespace, then
    /// the user's own namespace, then a single foreign one.
    pub fn resolve(&self, name: &str, user: &User) -> Result<Namespace> {
        if name.is_empty() {
            return self.ensure_default();
        }

        if let Some(ns) = self.store.get_user_namespace(user.id, name)? {
            return Ok(ns);
        }

        let candidates = self.store.find_namespaces_by_name(name)?;
        if let Some(shared) = candidates.iter().find(|ns| ns.is_default()) {
            return Ok(shared.clone());
        }

        match candidates.len() {
            0 => Err(Error::not_found(format!("namespace '{name}' not found"))),
            1 => Ok(candidates.into_iter().next().ok_or_else(|| {
                Error::Internal("namespace candidate vanished".to_string())
            })?),
            _ => Err(Error::conflict(format!(
                "multiple namespaces named '{name}'"
            ))),
        }
    }

    /// Like [`resolve`](Self::resolve), but creates a namespace owned by
    /// `user` when nothing matches.
    pub fn resolve_or_create(&self, name: &str, user: &User) -> Result<Namespace> {
        match self.resolve(name, user) {
            Err(Error::NotFound(_)) => {}
            other => return other,
        }

        match self.store.create_namespace(name, Some(user.id)) {
            Ok(ns) => {
                tracing::info!(namespace = %ns.name, user = %user.name, "created namespace");
                Ok(ns)
            }
            Err(Error::AlreadyExists) => self
                .store
                .get_user_namespace(user.id, name)?
                .ok_or_else(|| Error::Internal("namespace vanished after conflict".to_string())),
            Err(e) => Err(e),
        }
    }

    pub fn get(&self, id: i64) -> Result<Namespace> {
        self.store
            .get_namespace(id)?
            .ok_or_else(|| Error::not_found("namespace not found"))
    }

    #[must_use]
    pub fn is_owned_by(&self, namespace: &Namespace, user: &User) -> bool {
        namespace.is_owned_by(user)
    }

    pub fn list(&self, user: &User) -> Result<Vec<Namespace>> {
        self.store.list_user_namespaces(user.id)
    }

    pub fn create(&self, name: &str, user: &User) -> Result<Namespace> {
        if name == self.default_name {
            return Err(Error::conflict(format!("namespace '{name}' already exists")));
        }

        match self.store.create_namespace(name, Some(user.id)) {
            Ok(ns) => {
                tracing::info!(namespace = %ns.name, user = %user.name, "created namespace");
                Ok(ns)
            }
            Err(Error::AlreadyExists) => {
                Err(Error::conflict(format!("namespace '{name}' already exists")))
            }
            Err(e) => Err(e),
        }
    }
}
