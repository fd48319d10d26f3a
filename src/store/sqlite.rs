use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::schema::SCHEMA;
use super::{FileQuery, Store};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

const USER_COLUMNS: &str = "u.id, u.name, u.created_at, r.id, r.name, r.capabilities, r.max_upload_bytes, r.max_url_content_bytes";

const NAMESPACE_COLUMNS: &str = "id, name, owner_user_id, created_at";

const ATTRIBUTE_COLUMNS: &str = "a.id, a.kind, a.name, a.namespace_id, a.owner_user_id, a.created_at";

const FILE_COLUMNS: &str = "id, name, local_name, owner_user_id, namespace_id, size_bytes, content_type, \
     is_public, public_slug, created_at, updated_at, deleted_at";

fn role_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Role> {
    Ok(Role {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        capabilities: Capability::from(row.get::<_, i64>(offset + 2)?),
        max_upload_bytes: row.get(offset + 3)?,
        max_url_content_bytes: row.get(offset + 4)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
        role: role_from_row(row, 3)?,
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
    })
}

fn namespace_from_row(row: &Row<'_>) -> rusqlite::Result<Namespace> {
    Ok(Namespace {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_user_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn attribute_from_row(row: &Row<'_>) -> rusqlite::Result<Attribute> {
    let kind: String = row.get(1)?;
    Ok(Attribute {
        id: row.get(0)?,
        kind: AttributeKind::parse(&kind).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(1, "kind".to_string(), rusqlite::types::Type::Text)
        })?,
        name: row.get(2)?,
        namespace_id: row.get(3)?,
        owner_user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

/// Maps a file row without its tags and groups; see `attach_attributes`.
fn file_from_row(row: &Row<'_>) -> rusqlite::Result<File> {
    Ok(File {
        id: row.get(0)?,
        name: row.get(1)?,
        local_name: row.get(2)?,
        owner_user_id: row.get(3)?,
        namespace_id: row.get(4)?,
        size_bytes: row.get(5)?,
        content_type: row.get(6)?,
        is_public: row.get(7)?,
        public_slug: row.get(8)?,
        tags: Vec::new(),
        groups: Vec::new(),
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
        deleted_at: row.get::<_, Option<String>>(11)?.map(|s| parse_datetime(&s)),
    })
}

/// Escapes `LIKE` wildcards so `text` matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn attach_attributes(conn: &Connection, file: &mut File) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ATTRIBUTE_COLUMNS} FROM attributes a
         JOIN file_attributes fa ON a.id = fa.attribute_id
         WHERE fa.file_id = ?1
         ORDER BY a.name"
    ))?;

    let attributes = stmt
        .query_map(params![file.id], attribute_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let (tags, groups) = attributes
        .into_iter()
        .partition(|a| a.kind == AttributeKind::Tag);
    file.tags = tags;
    file.groups = groups;
    Ok(())
}

fn query_files(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<File>> {
    let mut stmt = conn.prepare(sql)?;
    let mut files = stmt
        .query_map(params, file_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for file in &mut files {
        attach_attributes(conn, file)?;
    }
    Ok(files)
}

fn get_file_with(conn: &Connection, id: i64) -> Result<Option<File>> {
    let file = conn
        .query_row(
            &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
            params![id],
            file_from_row,
        )
        .optional()?;

    match file {
        Some(mut file) => {
            attach_attributes(conn, &mut file)?;
            Ok(Some(file))
        }
        None => Ok(None),
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Role operations

    fn create_role(&self, role: &Role) -> Result<i64> {
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO roles (name, capabilities, max_upload_bytes, max_url_content_bytes)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                role.name,
                i64::from(role.capabilities),
                role.max_upload_bytes,
                role.max_url_content_bytes,
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, capabilities, max_upload_bytes, max_url_content_bytes
             FROM roles WHERE name = ?1",
            params![name],
            |row| role_from_row(row, 0),
        )
        .optional()
        .map_err(Error::from)
    }

    // User operations

    fn create_user(&self, name: &str, role_id: i64) -> Result<User> {
        let id = {
            let conn = self.conn();
            let result = conn.execute(
                "INSERT INTO users (name, role_id, created_at) VALUES (?1, ?2, ?3)",
                params![name, role_id, format_datetime(&Utc::now())],
            );

            match result {
                Ok(_) => conn.last_insert_rowid(),
                Err(e) if is_constraint_violation(&e) => return Err(Error::AlreadyExists),
                Err(e) => return Err(Error::from(e)),
            }
        };

        self.get_user(id)?
            .ok_or_else(|| Error::Internal("user vanished after insert".to_string()))
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON u.role_id = r.id WHERE u.id = ?1"
            ),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON u.role_id = r.id WHERE u.name = ?1"
            ),
            params![name],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn has_users(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Namespace operations

    fn create_namespace(&self, name: &str, owner_user_id: Option<i64>) -> Result<Namespace> {
        let now = Utc::now();
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO namespaces (name, owner_user_id, created_at) VALUES (?1, ?2, ?3)",
            params![name, owner_user_id, format_datetime(&now)],
        );

        match result {
            Ok(_) => Ok(Namespace {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                owner_user_id,
                created_at: now,
            }),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_namespace(&self, id: i64) -> Result<Option<Namespace>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {NAMESPACE_COLUMNS} FROM namespaces WHERE id = ?1"),
            params![id],
            namespace_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_default_namespace(&self, name: &str) -> Result<Option<Namespace>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {NAMESPACE_COLUMNS} FROM namespaces WHERE name = ?1 AND owner_user_id IS NULL"
            ),
            params![name],
            namespace_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_namespace(&self, owner_user_id: i64, name: &str) -> Result<Option<Namespace>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {NAMESPACE_COLUMNS} FROM namespaces WHERE name = ?1 AND owner_user_id = ?2"
            ),
            params![name, owner_user_id],
            namespace_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_namespaces_by_name(&self, name: &str) -> Result<Vec<Namespace>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NAMESPACE_COLUMNS} FROM namespaces WHERE name = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![name], namespace_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_namespaces(&self, owner_user_id: i64) -> Result<Vec<Namespace>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NAMESPACE_COLUMNS} FROM namespaces
             WHERE owner_user_id = ?1 OR owner_user_id IS NULL
             ORDER BY name"
        ))?;

        let rows = stmt.query_map(params![owner_user_id], namespace_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Tag/group operations

    fn create_attribute(
        &self,
        kind: AttributeKind,
        namespace_id: i64,
        name: &str,
        owner_user_id: i64,
    ) -> Result<Attribute> {
        let now = Utc::now();
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO attributes (kind, name, namespace_id, owner_user_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                kind.as_str(),
                name,
                namespace_id,
                owner_user_id,
                format_datetime(&now)
            ],
        );

        match result {
            Ok(_) => Ok(Attribute {
                id: conn.last_insert_rowid(),
                kind,
                name: name.to_string(),
                namespace_id,
                owner_user_id,
                created_at: now,
            }),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_attribute(
        &self,
        kind: AttributeKind,
        namespace_id: i64,
        name: &str,
    ) -> Result<Option<Attribute>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {ATTRIBUTE_COLUMNS} FROM attributes a
                 WHERE a.kind = ?1 AND a.namespace_id = ?2 AND a.name = ?3"
            ),
            params![kind.as_str(), namespace_id, name],
            attribute_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_attributes(&self, kind: AttributeKind, namespace_id: i64) -> Result<Vec<Attribute>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTRIBUTE_COLUMNS} FROM attributes a
             WHERE a.kind = ?1 AND a.namespace_id = ?2
             ORDER BY a.name"
        ))?;

        let rows = stmt.query_map(params![kind.as_str(), namespace_id], attribute_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // File operations

    fn create_file(&self, file: &NewFile, attribute_ids: &[i64]) -> Result<File> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = format_datetime(&Utc::now());

        tx.execute(
            "INSERT INTO files (name, local_name, owner_user_id, namespace_id, size_bytes, content_type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                file.name,
                file.local_name,
                file.owner_user_id,
                file.namespace_id,
                file.size_bytes,
                file.content_type,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();

        for attribute_id in attribute_ids {
            tx.execute(
                "INSERT OR IGNORE INTO file_attributes (file_id, attribute_id) VALUES (?1, ?2)",
                params![id, attribute_id],
            )?;
        }

        let created = get_file_with(&tx, id)?
            .ok_or_else(|| Error::Internal("file vanished after insert".to_string()))?;

        tx.commit()?;
        Ok(created)
    }

    fn get_file(&self, id: i64) -> Result<Option<File>> {
        get_file_with(&self.conn(), id)
    }

    fn find_files(&self, query: &FileQuery<'_>) -> Result<Vec<File>> {
        query_files(
            &self.conn(),
            &format!(
                "SELECT {FILE_COLUMNS} FROM files
                 WHERE name = ?1 AND namespace_id = ?2 AND owner_user_id = ?3
                   AND (?4 IS NULL OR id = ?4) AND deleted_at IS NULL
                 ORDER BY id"
            ),
            params![
                query.name,
                query.namespace_id,
                query.owner_user_id,
                query.id
            ],
        )
    }

    fn count_files(&self, query: &FileQuery<'_>) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files
             WHERE name = ?1 AND namespace_id = ?2 AND owner_user_id = ?3
               AND (?4 IS NULL OR id = ?4) AND deleted_at IS NULL",
            params![
                query.name,
                query.namespace_id,
                query.owner_user_id,
                query.id
            ],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_files(
        &self,
        namespace_id: i64,
        owner_user_id: Option<i64>,
        name_contains: Option<&str>,
    ) -> Result<Vec<File>> {
        let pattern = name_contains.map(|n| format!("%{}%", escape_like(n)));
        query_files(
            &self.conn(),
            &format!(
                "SELECT {FILE_COLUMNS} FROM files
                 WHERE namespace_id = ?1
                   AND (?2 IS NULL OR owner_user_id = ?2)
                   AND (?3 IS NULL OR name LIKE ?3 ESCAPE '\\')
                   AND deleted_at IS NULL
                 ORDER BY id"
            ),
            params![namespace_id, owner_user_id, pattern],
        )
    }

    fn update_file(&self, file: &File) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE files SET name = ?1, is_public = ?2, public_slug = ?3, updated_at = ?4
             WHERE id = ?5 AND deleted_at IS NULL",
            params![
                file.name,
                file.is_public,
                file.public_slug,
                format_datetime(&file.updated_at),
                file.id
            ],
        );

        match result {
            Ok(0) => Err(Error::not_found("File not found")),
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::conflict("public name already in use"))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn set_file_attributes(&self, file_id: i64, kind: AttributeKind, ids: &[i64]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM file_attributes WHERE file_id = ?1
               AND attribute_id IN (SELECT id FROM attributes WHERE kind = ?2)",
            params![file_id, kind.as_str()],
        )?;

        for attribute_id in ids {
            tx.execute(
                "INSERT OR IGNORE INTO file_attributes (file_id, attribute_id) VALUES (?1, ?2)",
                params![file_id, attribute_id],
            )?;
        }

        tx.execute(
            "UPDATE files SET updated_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), file_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn move_file(&self, file_id: i64, namespace_id: i64, attribute_ids: &[i64]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE files SET namespace_id = ?1, updated_at = ?2 WHERE id = ?3 AND deleted_at IS NULL",
            params![namespace_id, format_datetime(&Utc::now()), file_id],
        )?;
        if rows == 0 {
            return Err(Error::not_found("File not found"));
        }

        tx.execute(
            "DELETE FROM file_attributes WHERE file_id = ?1",
            params![file_id],
        )?;

        for attribute_id in attribute_ids {
            tx.execute(
                "INSERT OR IGNORE INTO file_attributes (file_id, attribute_id) VALUES (?1, ?2)",
                params![file_id, attribute_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn soft_delete_file(&self, id: i64) -> Result<bool> {
        let now = format_datetime(&Utc::now());
        let rows = self.conn().execute(
            "UPDATE files SET is_public = 0, public_slug = NULL, deleted_at = ?1, updated_at = ?1
             WHERE id = ?2 AND deleted_at IS NULL",
            params![now, id],
        )?;
        Ok(rows > 0)
    }

    fn local_name_exists(&self, local_name: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE local_name = ?1",
            params![local_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn get_file_by_slug(&self, slug: &str) -> Result<Option<File>> {
        let conn = self.conn();
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM files WHERE public_slug = ?1 AND deleted_at IS NULL",
                params![slug],
                |row| row.get(0),
            )
            .optional()?;

        match id {
            Some(id) => get_file_with(&conn, id),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn test_user(store: &SqliteStore, name: &str) -> User {
        let role_id = match store.get_role_by_name("user").unwrap() {
            Some(role) => role.id,
            None => store
                .create_role(&Role {
                    id: 0,
                    name: "user".to_string(),
                    capabilities: Capability::UPLOAD_FILES,
                    max_upload_bytes: None,
                    max_url_content_bytes: Some(1024),
                })
                .unwrap(),
        };
        store.create_user(name, role_id).unwrap()
    }

    fn new_file(local_name: &str, owner: i64, namespace_id: i64) -> NewFile {
        NewFile {
            name: "a.txt".to_string(),
            local_name: local_name.to_string(),
            owner_user_id: owner,
            namespace_id,
            size_bytes: 3,
            content_type: "text/plain".to_string(),
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in ["roles", "users", "tokens", "namespaces", "attributes", "files", "file_attributes"] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn test_user_carries_role() {
        let (_temp, store) = test_store();
        let user = test_user(&store, "alice");

        let fetched = store.get_user(user.id).unwrap().unwrap();
        assert_eq!(fetched.name, "alice");
        assert_eq!(fetched.role.name, "user");
        assert_eq!(fetched.role.max_url_content_bytes, Some(1024));
        assert!(store.has_users().unwrap());

        let role_id = fetched.role.id;
        assert!(matches!(
            store.create_user("alice", role_id),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_namespace_unique_per_owner() {
        let (_temp, store) = test_store();
        let alice = test_user(&store, "alice");
        let bob = test_user(&store, "bob");

        store.create_namespace("default", None).unwrap();
        assert!(matches!(
            store.create_namespace("default", None),
            Err(Error::AlreadyExists)
        ));

        store.create_namespace("photos", Some(alice.id)).unwrap();
        store.create_namespace("photos", Some(bob.id)).unwrap();
        assert!(matches!(
            store.create_namespace("photos", Some(alice.id)),
            Err(Error::AlreadyExists)
        ));

        assert_eq!(store.find_namespaces_by_name("photos").unwrap().len(), 2);
        assert_eq!(store.list_user_namespaces(alice.id).unwrap().len(), 2);
        assert!(store.get_default_namespace("default").unwrap().is_some());
    }

    #[test]
    fn test_attribute_uniqueness() {
        let (_temp, store) = test_store();
        let alice = test_user(&store, "alice");
        let ns = store.create_namespace("default", None).unwrap();

        store
            .create_attribute(AttributeKind::Tag, ns.id, "x", alice.id)
            .unwrap();
        let result = store.create_attribute(AttributeKind::Tag, ns.id, "x", alice.id);
        assert!(matches!(result, Err(Error::AlreadyExists)));

        // Same name as a group is a different attribute.
        store
            .create_attribute(AttributeKind::Group, ns.id, "x", alice.id)
            .unwrap();
        assert_eq!(store.list_attributes(AttributeKind::Tag, ns.id).unwrap().len(), 1);
    }

    #[test]
    fn test_file_crud_with_attributes() {
        let (_temp, store) = test_store();
        let alice = test_user(&store, "alice");
        let ns = store.create_namespace("default", None).unwrap();
        let tag = store
            .create_attribute(AttributeKind::Tag, ns.id, "x", alice.id)
            .unwrap();
        let group = store
            .create_attribute(AttributeKind::Group, ns.id, "g", alice.id)
            .unwrap();

        let file = store
            .create_file(&new_file("local1", alice.id, ns.id), &[tag.id, group.id])
            .unwrap();
        assert!(file.id > 0);
        assert_eq!(file.attribute_names(AttributeKind::Tag), vec!["x"]);
        assert_eq!(file.attribute_names(AttributeKind::Group), vec!["g"]);
        assert!(store.local_name_exists("local1").unwrap());

        store
            .set_file_attributes(file.id, AttributeKind::Tag, &[])
            .unwrap();
        let fetched = store.get_file(file.id).unwrap().unwrap();
        assert!(fetched.tags.is_empty());
        assert_eq!(fetched.groups.len(), 1);

        let query = FileQuery {
            name: "a.txt",
            namespace_id: ns.id,
            owner_user_id: alice.id,
            id: None,
        };
        assert_eq!(store.count_files(&query).unwrap(), 1);

        assert!(store.soft_delete_file(file.id).unwrap());
        assert!(!store.soft_delete_file(file.id).unwrap());
        assert_eq!(store.count_files(&query).unwrap(), 0);
        assert!(store.get_file(file.id).unwrap().unwrap().deleted_at.is_some());
        // Soft-deleted rows still reserve their local name.
        assert!(store.local_name_exists("local1").unwrap());
    }

    #[test]
    fn test_list_files_name_filter_is_literal() {
        let (_temp, store) = test_store();
        let alice = test_user(&store, "alice");
        let ns = store.create_namespace("default", None).unwrap();

        for (local, name) in [("l1", "a_b.txt"), ("l2", "axb.txt"), ("l3", "100%.txt")] {
            let mut file = new_file(local, alice.id, ns.id);
            file.name = name.to_string();
            store.create_file(&file, &[]).unwrap();
        }

        let names = |filter: &str| -> Vec<String> {
            store
                .list_files(ns.id, None, Some(filter))
                .unwrap()
                .into_iter()
                .map(|f| f.name)
                .collect()
        };
        assert_eq!(names("a_b"), vec!["a_b.txt"]);
        assert_eq!(names("0%"), vec!["100%.txt"]);
        assert_eq!(names(".txt").len(), 3);
        assert!(names("a\\b").is_empty());
    }

    #[test]
    fn test_public_slug_collision_is_conflict() {
        let (_temp, store) = test_store();
        let alice = test_user(&store, "alice");
        let ns = store.create_namespace("default", None).unwrap();

        let mut first = store
            .create_file(&new_file("local1", alice.id, ns.id), &[])
            .unwrap();
        let mut second = store
            .create_file(&new_file("local2", alice.id, ns.id), &[])
            .unwrap();

        first.is_public = true;
        first.public_slug = Some("abc".to_string());
        store.update_file(&first).unwrap();

        second.is_public = true;
        second.public_slug = Some("abc".to_string());
        assert!(matches!(store.update_file(&second), Err(Error::Conflict(_))));

        let found = store.get_file_by_slug("abc").unwrap().unwrap();
        assert_eq!(found.id, first.id);

        // Deleting frees the slug.
        store.soft_delete_file(first.id).unwrap();
        assert!(store.get_file_by_slug("abc").unwrap().is_none());
        store.update_file(&second).unwrap();
    }

    #[test]
    fn test_move_file_replaces_associations() {
        let (_temp, store) = test_store();
        let alice = test_user(&store, "alice");
        let from = store.create_namespace("default", None).unwrap();
        let to = store.create_namespace("archive", Some(alice.id)).unwrap();
        let old_tag = store
            .create_attribute(AttributeKind::Tag, from.id, "x", alice.id)
            .unwrap();
        let new_tag = store
            .create_attribute(AttributeKind::Tag, to.id, "x", alice.id)
            .unwrap();

        let file = store
            .create_file(&new_file("local1", alice.id, from.id), &[old_tag.id])
            .unwrap();
        store.move_file(file.id, to.id, &[new_tag.id]).unwrap();

        let moved = store.get_file(file.id).unwrap().unwrap();
        assert_eq!(moved.namespace_id, to.id);
        assert_eq!(moved.attribute_ids(AttributeKind::Tag), vec![new_tag.id]);
        assert_eq!(store.list_files(from.id, None, None).unwrap().len(), 0);
        assert_eq!(store.list_files(to.id, Some(alice.id), Some("a.")).unwrap().len(), 1);
    }

    #[test]
    fn test_token_lookup_collision() {
        let (_temp, store) = test_store();
        let alice = test_user(&store, "alice");

        let token = |id: &str| Token {
            id: id.to_string(),
            token_hash: "hash".to_string(),
            token_lookup: "lookup12".to_string(),
            user_id: alice.id,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token("token-1")).unwrap();

        let result = store.create_token(&token("token-2"));
        assert!(matches!(result, Err(Error::AlreadyExists)));
        assert_eq!(
            store.get_token_by_lookup("lookup12").unwrap().unwrap().id,
            "token-1"
        );
    }
}
