use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Attribute, AttributeKind, Namespace, User};

/// Resolves tag and group names within a namespace to stored attributes.
#[derive(Clone)]
pub struct AttributeCatalog {
    store: Arc<dyn Store>,
}

impl AttributeCatalog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Returns one attribute per distinct name, creating missing ones owned
    /// by `user`. The result is ordered by name.
    pub fn resolve_or_create(
        &self,
        kind: AttributeKind,
        names: &[String],
        namespace: &Namespace,
        user: &User,
    ) -> Result<Vec<Attribute>> {
        let names: BTreeSet<&str> = names.iter().map(String::as_str).collect();
        let mut resolved = Vec::with_capacity(names.len());

        for name in names {
            resolved.push(self.resolve_one(kind, name, namespace, user)?);
        }
        Ok(resolved)
    }

    fn resolve_one(
        &self,
        kind: AttributeKind,
        name: &str,
        namespace: &Namespace,
        user: &User,
    ) -> Result<Attribute> {
        if let Some(existing) = self.store.get_attribute(kind, namespace.id, name)? {
            return Ok(existing);
        }

        match self
            .store
            .create_attribute(kind, namespace.id, name, user.id)
        {
            Ok(created) => {
                tracing::debug!(%kind, name, namespace = %namespace.name, "created attribute");
                Ok(created)
            }
            // Lost a race with a concurrent insert of the same name.
            Err(Error::AlreadyExists) => self
                .store
                .get_attribute(kind, namespace.id, name)?
                .ok_or_else(|| {
                    Error::Internal(format!("{kind} '{name}' vanished after conflict"))
                }),
            Err(e) => Err(e),
        }
    }

    /// Looks up existing attributes only; unknown names are skipped.
    pub fn filter_by_names(
        &self,
        kind: AttributeKind,
        names: &[String],
        namespace: &Namespace,
    ) -> Result<Vec<Attribute>> {
        let names: BTreeSet<&str> = names.iter().map(String::as_str).collect();
        let mut found = Vec::new();

        for name in names {
            if let Some(attribute) = self.store.get_attribute(kind, namespace.id, name)? {
                found.push(attribute);
            }
        }
        Ok(found)
    }

    pub fn list(&self, kind: AttributeKind, namespace: &Namespace) -> Result<Vec<Attribute>> {
        self.store.list_attributes(kind, namespace.id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::engine::testing::{Fixture, StaleAttributeLookups};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_repeated_names_create_one_row() {
        let fx = Fixture::new();
        let catalog = AttributeCatalog::new(fx.store.clone());
        let alice = fx.user("alice");
        let ns = fx.default_namespace();

        let first = catalog
            .resolve_or_create(AttributeKind::Tag, &names(&["x", "y", "x"]), &ns, &alice)
            .unwrap();
        assert_eq!(first.len(), 2);

        let second = catalog
            .resolve_or_create(AttributeKind::Tag, &names(&["y", "x"]), &ns, &alice)
            .unwrap();
        assert_eq!(
            first.iter().map(|a| a.id).collect::<Vec<_>>(),
            second.iter().map(|a| a.id).collect::<Vec<_>>()
        );
        assert_eq!(catalog.list(AttributeKind::Tag, &ns).unwrap().len(), 2);
        assert!(catalog.list(AttributeKind::Group, &ns).unwrap().is_empty());
    }

    #[test]
    fn test_lost_insert_race_returns_existing_row() {
        let fx = Fixture::new();
        let alice = fx.user("alice");
        let ns = fx.default_namespace();
        let existing = fx
            .store
            .create_attribute(AttributeKind::Group, ns.id, "g", alice.id)
            .unwrap();

        let store = Arc::new(StaleAttributeLookups {
            inner: fx.sqlite.clone(),
            misses: AtomicUsize::new(1),
        });
        let catalog = AttributeCatalog::new(store.clone());

        let resolved = catalog
            .resolve_or_create(AttributeKind::Group, &names(&["g"]), &ns, &alice)
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, existing.id);
        assert_eq!(store.misses.load(Ordering::SeqCst), 0);
        assert_eq!(catalog.list(AttributeKind::Group, &ns).unwrap().len(), 1);
    }

    #[test]
    fn test_filter_by_names_skips_unknown() {
        let fx = Fixture::new();
        let catalog = AttributeCatalog::new(fx.store.clone());
        let alice = fx.user("alice");
        let ns = fx.default_namespace();

        catalog
            .resolve_or_create(AttributeKind::Tag, &names(&["x"]), &ns, &alice)
            .unwrap();

        let found = catalog
            .filter_by_names(AttributeKind::Tag, &names(&["x", "nope"]), &ns)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(catalog
            .filter_by_names(AttributeKind::Tag, &names(&["nope"]), &ns)
            .unwrap()
            .is_empty());
    }
}
