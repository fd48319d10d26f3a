//! The file and attribute engine.
//!
//! Components are small cloneable services sharing one [`Store`]. The
//! [`Engine`] facade wires them together and exposes the operations the
//! transport layer calls.

pub mod allocator;
mod catalog;
mod ingest;
mod lifecycle;
mod namespace;
mod policy;
mod update;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::File as FsFile;
use tokio::io::BufReader;

pub use allocator::IdentifierAllocator;
pub use catalog::AttributeCatalog;
pub use ingest::{IngestionPipeline, UploadDraft, UploadSource};
pub use lifecycle::{FileDraft, FileManager, ListFilter, PublishOutcome};
pub use namespace::NamespaceRegistry;
pub use policy::{AccessPolicy, UploadKind};
pub use update::{FileTarget, UpdateAction, UpdateOrchestrator, UpdateOutcome, UpdateRequest};

use crate::content::{ContentStore, Fetcher};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Attribute, AttributeKind, File, Namespace, User};

/// A list request: where to look, what to match and how much to return.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub namespace: String,
    pub filter: ListFilter,
    pub verbose: u8,
}

/// A listed file. Verbosity decides which optional fields are filled in,
/// never which files are listed.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl FileSummary {
    #[must_use]
    pub fn new(file: &File, namespace: &Namespace, verbose: u8) -> Self {
        let mut summary = Self {
            id: file.id,
            name: file.name.clone(),
            size_bytes: None,
            content_type: None,
            is_public: None,
            public_slug: None,
            created_at: None,
            updated_at: None,
            tags: None,
            groups: None,
            namespace: None,
        };

        if verbose >= 1 {
            summary.size_bytes = Some(file.size_bytes);
            summary.content_type = Some(file.content_type.clone());
            summary.is_public = Some(file.is_public);
            summary.public_slug = file.public_slug.clone();
            summary.created_at = Some(file.created_at);
            summary.updated_at = Some(file.updated_at);
        }
        if verbose >= 2 {
            summary.tags = Some(file.attribute_names(AttributeKind::Tag));
            summary.groups = Some(file.attribute_names(AttributeKind::Group));
        }
        if verbose >= 3 {
            summary.namespace = Some(namespace.name.clone());
        }
        summary
    }
}

/// An open public file, ready to stream.
pub struct PublicContent {
    pub reader: BufReader<FsFile>,
    pub size: u64,
    pub content_type: String,
    pub name: String,
}

#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    content: Arc<ContentStore>,
    registry: NamespaceRegistry,
    catalog: AttributeCatalog,
    policy: AccessPolicy,
    files: FileManager,
    ingest: IngestionPipeline,
    updates: UpdateOrchestrator,
}

impl Engine {
    /// Builds the engine and makes sure the default namespace exists.
    pub fn new(
        store: Arc<dyn Store>,
        content: Arc<ContentStore>,
        fetcher: Fetcher,
        default_namespace: &str,
    ) -> Result<Self> {
        let registry = NamespaceRegistry::new(store.clone(), default_namespace);
        registry.ensure_default()?;

        let catalog = AttributeCatalog::new(store.clone());
        let allocator = IdentifierAllocator::new(store.clone());
        let policy = AccessPolicy;
        let files = FileManager::new(
            store.clone(),
            content.clone(),
            catalog.clone(),
            allocator.clone(),
        );
        let ingest = IngestionPipeline::new(
            registry.clone(),
            files.clone(),
            allocator,
            policy,
            content.clone(),
            fetcher,
        );
        let updates = UpdateOrchestrator::new(registry.clone(), files.clone(), policy);

        Ok(Self {
            store,
            content,
            registry,
            catalog,
            policy,
            files,
            ingest,
            updates,
        })
    }

    pub async fn upload(&self, draft: UploadDraft, user: &User) -> Result<File> {
        self.ingest.ingest(draft, user).await
    }

    /// Lists files of a namespace. In a namespace the user owns (including
    /// the default one) only their own uploads are listed.
    pub fn list(&self, query: &ListQuery, user: &User) -> Result<Vec<FileSummary>> {
        let namespace = self.registry.resolve(&query.namespace, user)?;
        self.policy.check_read(&namespace, user)?;

        let owner = if self.registry.is_owned_by(&namespace, user) {
            Some(user.id)
        } else {
            None
        };

        let files = self.files.list_matching(&namespace, owner, &query.filter)?;
        Ok(files
            .iter()
            .map(|f| FileSummary::new(f, &namespace, query.verbose))
            .collect())
    }

    pub async fn update(
        &self,
        target: &FileTarget,
        action: UpdateAction,
        request: &UpdateRequest,
        user: &User,
    ) -> Result<UpdateOutcome> {
        self.updates.apply(target, action, request, user).await
    }

    pub fn publish(
        &self,
        target: &FileTarget,
        slug: Option<&str>,
        user: &User,
    ) -> Result<PublishOutcome> {
        let mut file = self.updates.resolve_target(target, user)?;
        self.files.publish(&mut file, slug)
    }

    pub async fn fetch_public(&self, slug: &str) -> Result<PublicContent> {
        let file = self
            .store
            .get_file_by_slug(slug)?
            .filter(|f| f.is_public)
            .ok_or_else(|| Error::not_found("file not found"))?;

        let (reader, size) = self.content.open(&file.local_name).await.map_err(|e| {
            tracing::error!(file_id = file.id, error = %e, "public file has no content");
            e
        })?;

        Ok(PublicContent {
            reader,
            size,
            content_type: file.content_type,
            name: file.name,
        })
    }

    pub fn list_namespaces(&self, user: &User) -> Result<Vec<Namespace>> {
        self.registry.list(user)
    }

    pub fn create_namespace(&self, name: &str, user: &User) -> Result<Namespace> {
        self.registry.create(name, user)
    }

    pub fn list_attributes(
        &self,
        kind: AttributeKind,
        namespace: &str,
        user: &User,
    ) -> Result<Vec<Attribute>> {
        let namespace = self.registry.resolve(namespace, user)?;
        self.policy.check_read(&namespace, user)?;
        self.catalog.list(kind, &namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::Fixture;
    use crate::types::Capability;
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    fn upload(name: &str, data: &[u8], tags: &[&str]) -> UploadDraft {
        UploadDraft {
            name: name.to_string(),
            namespace: "default".to_string(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            groups: Vec::new(),
            content_type: None,
            source: UploadSource::Bytes {
                data: data.to_vec(),
                checksum: hex::encode(Sha256::digest(data)),
            },
        }
    }

    #[tokio::test]
    async fn test_upload_then_list_by_tag() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let alice = fx.user("alice");

        let file = engine.upload(upload("a.txt", b"abc", &["x", "y"]), &alice).await.unwrap();
        assert!(file.id > 0);
        engine.upload(upload("other.txt", b"def", &["z"]), &alice).await.unwrap();

        let query = ListQuery {
            namespace: "default".to_string(),
            filter: ListFilter {
                tags: vec!["x".to_string()],
                ..ListFilter::default()
            },
            verbose: 2,
        };
        let listed = engine.list(&query, &alice).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "a.txt");
        assert_eq!(
            listed[0].tags.as_deref(),
            Some(&["x".to_string(), "y".to_string()][..])
        );
        assert!(listed[0].namespace.is_none());
    }

    #[tokio::test]
    async fn test_verbosity_does_not_change_matches() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let alice = fx.user("alice");
        engine.upload(upload("a.txt", b"abc", &[]), &alice).await.unwrap();

        for verbose in 0..=3 {
            let query = ListQuery {
                verbose,
                ..ListQuery::default()
            };
            let listed = engine.list(&query, &alice).unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].size_bytes.is_some(), verbose >= 1);
            assert_eq!(listed[0].tags.is_some(), verbose >= 2);
            assert_eq!(listed[0].namespace.is_some(), verbose >= 3);
        }
    }

    #[tokio::test]
    async fn test_users_only_see_own_files_in_default() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let alice = fx.user("alice");
        let bob = fx.user("bob");
        engine.upload(upload("a.txt", b"abc", &[]), &alice).await.unwrap();

        assert!(engine.list(&ListQuery::default(), &bob).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_listing_needs_capability() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let alice = fx.user("alice");
        let bob = fx.user("bob");
        let admin = fx.user_with_role("root", "admin", Capability::ALL, None);

        let mut draft = upload("a.txt", b"abc", &[]);
        draft.namespace = "alices".to_string();
        engine.upload(draft, &alice).await.unwrap();

        let query = ListQuery {
            namespace: "alices".to_string(),
            ..ListQuery::default()
        };
        assert!(matches!(
            engine.list(&query, &bob),
            Err(Error::PermissionDenied(_))
        ));
        assert_eq!(engine.list(&query, &admin).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_and_fetch_public() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let alice = fx.user("alice");
        engine.upload(upload("a.txt", b"hello", &[]), &alice).await.unwrap();
        engine.upload(upload("b.txt", b"other", &[]), &alice).await.unwrap();

        let target = FileTarget {
            name: "a.txt".to_string(),
            ..FileTarget::default()
        };
        let outcome = engine.publish(&target, Some("abc"), &alice).unwrap();
        assert!(!outcome.conflict);

        let mut public = engine.fetch_public("abc").await.unwrap();
        assert_eq!(public.size, 5);
        assert_eq!(public.content_type, "text/plain");
        let mut body = Vec::new();
        public.reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"hello");

        let other = FileTarget {
            name: "b.txt".to_string(),
            ..FileTarget::default()
        };
        assert!(engine.publish(&other, Some("abc"), &alice).unwrap().conflict);
        assert!(matches!(
            engine.fetch_public("missing").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_attributes() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let alice = fx.user("alice");
        engine.upload(upload("a.txt", b"abc", &["x", "y"]), &alice).await.unwrap();

        let tags = engine.list_attributes(AttributeKind::Tag, "", &alice).unwrap();
        assert_eq!(tags.len(), 2);
        assert!(engine
            .list_attributes(AttributeKind::Group, "", &alice)
            .unwrap()
            .is_empty());
    }
}
