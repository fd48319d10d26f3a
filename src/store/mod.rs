mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Addresses live files by name inside one namespace and uploader,
/// optionally narrowed to a single id.
#[derive(Debug, Clone)]
pub struct FileQuery<'a> {
    pub name: &'a str,
    pub namespace_id: i64,
    pub owner_user_id: i64,
    pub id: Option<i64>,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Role operations
    fn create_role(&self, role: &Role) -> Result<i64>;
    fn get_role_by_name(&self, name: &str) -> Result<Option<Role>>;

    // User operations
    fn create_user(&self, name: &str, role_id: i64) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_name(&self, name: &str) -> Result<Option<User>>;
    fn has_users(&self) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Namespace operations
    fn create_namespace(&self, name: &str, owner_user_id: Option<i64>) -> Result<Namespace>;
    fn get_namespace(&self, id: i64) -> Result<Option<Namespace>>;
    fn get_default_namespace(&self, name: &str) -> Result<Option<Namespace>>;
    fn get_user_namespace(&self, owner_user_id: i64, name: &str) -> Result<Option<Namespace>>;
    fn find_namespaces_by_name(&self, name: &str) -> Result<Vec<Namespace>>;
    fn list_user_namespaces(&self, owner_user_id: i64) -> Result<Vec<Namespace>>;

    // Tag/group operations
    fn create_attribute(
        &self,
        kind: AttributeKind,
        namespace_id: i64,
        name: &str,
        owner_user_id: i64,
    ) -> Result<Attribute>;
    fn get_attribute(
        &self,
        kind: AttributeKind,
        namespace_id: i64,
        name: &str,
    ) -> Result<Option<Attribute>>;
    fn list_attributes(&self, kind: AttributeKind, namespace_id: i64) -> Result<Vec<Attribute>>;

    // File operations
    fn create_file(&self, file: &NewFile, attribute_ids: &[i64]) -> Result<File>;
    fn get_file(&self, id: i64) -> Result<Option<File>>;
    fn find_files(&self, query: &FileQuery<'_>) -> Result<Vec<File>>;
    fn count_files(&self, query: &FileQuery<'_>) -> Result<i64>;
    fn list_files(
        &self,
        namespace_id: i64,
        owner_user_id: Option<i64>,
        name_contains: Option<&str>,
    ) -> Result<Vec<File>>;
    fn update_file(&self, file: &File) -> Result<()>;
    fn set_file_attributes(&self, file_id: i64, kind: AttributeKind, ids: &[i64]) -> Result<()>;
    fn move_file(&self, file_id: i64, namespace_id: i64, attribute_ids: &[i64]) -> Result<()>;
    fn soft_delete_file(&self, id: i64) -> Result<bool>;
    fn local_name_exists(&self, local_name: &str) -> Result<bool>;
    fn get_file_by_slug(&self, slug: &str) -> Result<Option<File>>;
}
