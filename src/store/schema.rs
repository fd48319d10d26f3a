pub const SCHEMA: &str = r#"
-- Roles carry capabilities and size ceilings
CREATE TABLE IF NOT EXISTS roles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    capabilities INTEGER NOT NULL DEFAULT 0,
    max_upload_bytes INTEGER,        -- NULL = unlimited
    max_url_content_bytes INTEGER    -- NULL = unlimited
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    role_id INTEGER NOT NULL REFERENCES roles(id),
    created_at TEXT DEFAULT (datetime('now'))
);

-- Tokens are bearer credentials for users
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- lookup segment of the token for fast lookup
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Namespaces scope files, tags and groups
CREATE TABLE IF NOT EXISTS namespaces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    owner_user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,  -- NULL = shared default
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(owner_user_id, name)
);

-- Tags and groups share one table, told apart by kind
CREATE TABLE IF NOT EXISTS attributes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL CHECK (kind IN ('tag', 'group')),
    name TEXT NOT NULL,
    namespace_id INTEGER NOT NULL REFERENCES namespaces(id) ON DELETE CASCADE,
    owner_user_id INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(kind, namespace_id, name)
);

CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    local_name TEXT NOT NULL UNIQUE,
    owner_user_id INTEGER NOT NULL REFERENCES users(id),
    namespace_id INTEGER NOT NULL REFERENCES namespaces(id),
    size_bytes INTEGER NOT NULL DEFAULT 0,
    content_type TEXT NOT NULL DEFAULT 'application/octet-stream',

    -- Visibility
    is_public INTEGER NOT NULL DEFAULT 0,
    public_slug TEXT UNIQUE,

    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    deleted_at TEXT                    -- soft delete
);

-- Many-to-many relationship between files and tags/groups
CREATE TABLE IF NOT EXISTS file_attributes (
    file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    attribute_id INTEGER NOT NULL REFERENCES attributes(id) ON DELETE CASCADE,
    PRIMARY KEY (file_id, attribute_id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_namespaces_default ON namespaces(name) WHERE owner_user_id IS NULL;
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_namespaces_name ON namespaces(name);
CREATE INDEX IF NOT EXISTS idx_attributes_namespace ON attributes(namespace_id);
CREATE INDEX IF NOT EXISTS idx_files_namespace ON files(namespace_id);
CREATE INDEX IF NOT EXISTS idx_files_lookup ON files(namespace_id, owner_user_id, name);
CREATE INDEX IF NOT EXISTS idx_file_attributes_attribute ON file_attributes(attribute_id);
"#;
