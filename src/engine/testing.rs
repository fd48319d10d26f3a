use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tempfile::TempDir;

use super::*;
use crate::store::{FileQuery, SqliteStore};
use crate::types::{Capability, NewFile, Role, Token};

pub(crate) struct Fixture {
    pub temp: TempDir,
    pub sqlite: Arc<SqliteStore>,
    pub store: Arc<dyn Store>,
    pub content: Arc<ContentStore>,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let sqlite = Arc::new(SqliteStore::new(temp.path().join("test.db")).unwrap());
        sqlite.initialize().unwrap();
        let store: Arc<dyn Store> = sqlite.clone();
        let content = Arc::new(ContentStore::new(temp.path()));

        NamespaceRegistry::new(store.clone(), "default")
            .ensure_default()
            .unwrap();

        Self {
            temp,
            sqlite,
            store,
            content,
        }
    }

    pub fn user(&self, name: &str) -> User {
        self.user_with_role(
            name,
            "user",
            Capability::UPLOAD_FILES.union(Capability::UPLOAD_URLS),
            None,
        )
    }

    pub fn user_with_role(
        &self,
        name: &str,
        role: &str,
        capabilities: Capability,
        max_upload_bytes: Option<i64>,
    ) -> User {
        let role_id = match self.store.get_role_by_name(role).unwrap() {
            Some(existing) => existing.id,
            None => self
                .store
                .create_role(&Role {
                    id: 0,
                    name: role.to_string(),
                    capabilities,
                    max_upload_bytes,
                    max_url_content_bytes: None,
                })
                .unwrap(),
        };
        self.store.create_user(name, role_id).unwrap()
    }

    pub fn default_namespace(&self) -> Namespace {
        self.store.get_default_namespace("default").unwrap().unwrap()
    }

    /// Inserts a private file row in the default namespace, without content.
    pub fn file(&self, owner: &User, name: &str) -> File {
        let new_file = NewFile {
            name: name.to_string(),
            local_name: allocator::random_local_id(),
            owner_user_id: owner.id,
            namespace_id: self.default_namespace().id,
            size_bytes: 0,
            content_type: "text/plain".to_string(),
        };
        self.store.create_file(&new_file, &[]).unwrap()
    }

    pub fn file_manager(&self) -> FileManager {
        FileManager::new(
            self.store.clone(),
            self.content.clone(),
            AttributeCatalog::new(self.store.clone()),
            IdentifierAllocator::new(self.store.clone()),
        )
    }

    pub fn pipeline(&self) -> IngestionPipeline {
        IngestionPipeline::new(
            NamespaceRegistry::new(self.store.clone(), "default"),
            self.file_manager(),
            IdentifierAllocator::new(self.store.clone()),
            AccessPolicy,
            self.content.clone(),
            Fetcher::new(Duration::from_secs(5)).unwrap(),
        )
    }

    pub fn orchestrator(&self) -> UpdateOrchestrator {
        UpdateOrchestrator::new(
            NamespaceRegistry::new(self.store.clone(), "default"),
            self.file_manager(),
            AccessPolicy,
        )
    }

    pub fn engine(&self) -> Engine {
        Engine::new(
            self.store.clone(),
            self.content.clone(),
            Fetcher::new(Duration::from_secs(5)).unwrap(),
            "default",
        )
        .unwrap()
    }
}

/// Delegates to SQLite, but the next `misses` attribute lookups report
/// nothing, as if another writer inserted the row after the lookup ran.
pub(crate) struct StaleAttributeLookups {
    pub inner: Arc<SqliteStore>,
    pub misses: AtomicUsize,
}

impl Store for StaleAttributeLookups {
    fn initialize(&self) -> Result<()> {
        self.inner.initialize()
    }
    fn create_role(&self, role: &Role) -> Result<i64> {
        self.inner.create_role(role)
    }
    fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        self.inner.get_role_by_name(name)
    }
    fn create_user(&self, name: &str, role_id: i64) -> Result<User> {
        self.inner.create_user(name, role_id)
    }
    fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.inner.get_user(id)
    }
    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.inner.get_user_by_name(name)
    }
    fn has_users(&self) -> Result<bool> {
        self.inner.has_users()
    }
    fn create_token(&self, token: &Token) -> Result<()> {
        self.inner.create_token(token)
    }
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        self.inner.get_token_by_lookup(lookup)
    }
    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.inner.update_token_last_used(id)
    }
    fn create_namespace(&self, name: &str, owner_user_id: Option<i64>) -> Result<Namespace> {
        self.inner.create_namespace(name, owner_user_id)
    }
    fn get_namespace(&self, id: i64) -> Result<Option<Namespace>> {
        self.inner.get_namespace(id)
    }
    fn get_default_namespace(&self, name: &str) -> Result<Option<Namespace>> {
        self.inner.get_default_namespace(name)
    }
    fn get_user_namespace(&self, owner_user_id: i64, name: &str) -> Result<Option<Namespace>> {
        self.inner.get_user_namespace(owner_user_id, name)
    }
    fn find_namespaces_by_name(&self, name: &str) -> Result<Vec<Namespace>> {
        self.inner.find_namespaces_by_name(name)
    }
    fn list_user_namespaces(&self, owner_user_id: i64) -> Result<Vec<Namespace>> {
        self.inner.list_user_namespaces(owner_user_id)
    }
    fn create_attribute(
        &self,
        kind: AttributeKind,
        namespace_id: i64,
        name: &str,
        owner_user_id: i64,
    ) -> Result<Attribute> {
        self.inner
            .create_attribute(kind, namespace_id, name, owner_user_id)
    }
    fn get_attribute(
        &self,
        kind: AttributeKind,
        namespace_id: i64,
        name: &str,
    ) -> Result<Option<Attribute>> {
        let stale = self
            .misses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        self.inner.get_attribute(kind, namespace_id, name)
    }
    fn list_attributes(&self, kind: AttributeKind, namespace_id: i64) -> Result<Vec<Attribute>> {
        self.inner.list_attributes(kind, namespace_id)
    }
    fn create_file(&self, file: &NewFile, attribute_ids: &[i64]) -> Result<File> {
        self.inner.create_file(file, attribute_ids)
    }
    fn get_file(&self, id: i64) -> Result<Option<File>> {
        self.inner.get_file(id)
    }
    fn find_files(&self, query: &FileQuery<'_>) -> Result<Vec<File>> {
        self.inner.find_files(query)
    }
    fn count_files(&self, query: &FileQuery<'_>) -> Result<i64> {
        self.inner.count_files(query)
    }
    fn list_files(
        &self,
        namespace_id: i64,
        owner_user_id: Option<i64>,
        name_contains: Option<&str>,
    ) -> Result<Vec<File>> {
        self.inner
            .list_files(namespace_id, owner_user_id, name_contains)
    }
    fn update_file(&self, file: &File) -> Result<()> {
        self.inner.update_file(file)
    }
    fn set_file_attributes(&self, file_id: i64, kind: AttributeKind, ids: &[i64]) -> Result<()> {
        self.inner.set_file_attributes(file_id, kind, ids)
    }
    fn move_file(&self, file_id: i64, namespace_id: i64, attribute_ids: &[i64]) -> Result<()> {
        self.inner.move_file(file_id, namespace_id, attribute_ids)
    }
    fn soft_delete_file(&self, id: i64) -> Result<bool> {
        self.inner.soft_delete_file(id)
    }
    fn local_name_exists(&self, local_name: &str) -> Result<bool> {
        self.inner.local_name_exists(local_name)
    }
    fn get_file_by_slug(&self, slug: &str) -> Result<Option<File>> {
        self.inner.get_file_by_slug(slug)
    }
}
