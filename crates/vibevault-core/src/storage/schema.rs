//! SQLite schema
//!
//! Every entity row carries its owner's `user_id`; uniqueness is always
//! scoped to the owner.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS collections (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            UNIQUE (user_id, name),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS links (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            url TEXT NOT NULL,
            normalized_url TEXT NOT NULL,
            domain TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            note TEXT NOT NULL DEFAULT '',
            og_image TEXT,
            favicon TEXT,
            site_name TEXT,
            published_time INTEGER,
            status TEXT NOT NULL DEFAULT 'INBOX'
                CHECK (status IN ('INBOX', 'READING', 'ARCHIVED')),
            favorite INTEGER NOT NULL DEFAULT 0,
            collection_id TEXT,
            metadata_status TEXT NOT NULL DEFAULT 'PENDING'
                CHECK (metadata_status IN ('PENDING', 'READY', 'FAILED')),
            metadata_error TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            last_visited_at INTEGER,
            UNIQUE (user_id, url),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (collection_id) REFERENCES collections(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS tags (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            UNIQUE (user_id, name),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        -- Link-tag junction table (many-to-many)
        CREATE TABLE IF NOT EXISTS link_tags (
            link_id TEXT NOT NULL,
            tag_id TEXT NOT NULL,
            PRIMARY KEY (link_id, tag_id),
            FOREIGN KEY (link_id) REFERENCES links(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );

        -- Listing filters and sort keys, always scoped by owner
        CREATE INDEX IF NOT EXISTS idx_links_user_created_at ON links(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_links_user_status ON links(user_id, status);
        CREATE INDEX IF NOT EXISTS idx_links_user_visited ON links(user_id, last_visited_at);
        CREATE INDEX IF NOT EXISTS idx_links_collection_id ON links(collection_id);

        -- Fast tag lookups
        CREATE INDEX IF NOT EXISTS idx_link_tags_tag_id ON link_tags(tag_id);
        "#,
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
