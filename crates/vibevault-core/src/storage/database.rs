//! SQLite connection management
//!
//! Opens the vault database from the configured data directory (or in
//! memory for tests), enables foreign keys, registers collations and
//! initializes the schema.

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::debug;

use crate::config::Config;
use crate::search::locale_cmp;
use crate::storage::schema::{init_schema, needs_init};

/// Unicode case-insensitive collation, ordering text like the in-memory sort
pub const LOCALE_COLLATION: &str = "VAULT_LOCALE";

/// Owner of the SQLite connection
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the SQLite database
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.sqlite_path();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open SQLite database at {:?}", path))?;

        configure(&conn)?;

        if needs_init(&conn) {
            init_schema(&conn).context("Failed to initialize SQLite schema")?;
        }

        debug!("Opened database at {:?}", path);
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Get mutable access (needed to open transactions)
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.create_collation(LOCALE_COLLATION, locale_cmp)
}
