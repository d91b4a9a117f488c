//! Unified entry point
//!
//! The `Vault` owns the SQLite connection and the configuration, and hands
//! out the per-entity services bound to that connection.
//!
//! ## Usage
//!
//! ```ignore
//! let vault = Vault::open()?;
//! let (_, session) = vault.sign_in("ada@example.com")?;
//!
//! let link = vault.links().create_link(&session, NewLink::new("https://example.com"))?;
//! let page = vault.links().list_links(&session, &vault.default_query())?;
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::params;
use serde::Serialize;
use tracing::info;

use crate::collections::CollectionService;
use crate::config::Config;
use crate::error::VaultResult;
use crate::graph::{build_graph, TagGraph};
use crate::links::LinkService;
use crate::models::{LinkPage, LinkQuery, User};
use crate::session::Session;
use crate::storage::{read_to_string, write_atomic, Database};
use crate::tags::TagService;
use crate::transfer::{parse_document, to_json_pretty, ImportReport, TransferService};
use crate::users;

/// Links the graph view loads at most
pub const GRAPH_LINK_LIMIT: u32 = 100;

/// Counts shown by `vibevault status`
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VaultStats {
    pub links: i64,
    pub inbox: i64,
    pub reading: i64,
    pub archived: i64,
    pub favorites: i64,
    pub tags: i64,
    pub collections: i64,
}

pub struct Vault {
    db: Database,
    config: Config,
}

impl Vault {
    /// Open the vault from the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open the vault with a specific configuration
    pub fn open_with_config(config: Config) -> Result<Self> {
        let db = Database::open(&config).context("Failed to open SQLite database")?;
        Ok(Self { db, config })
    }

    /// Open an in-memory vault (for testing)
    pub fn open_in_memory(config: Config) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Users ====================

    pub fn sign_in(&self, email: &str) -> VaultResult<(User, Session)> {
        users::sign_in(self.db.connection(), email)
    }

    /// Session for `email`, falling back to the configured user; with
    /// neither, an anonymous session
    pub fn session_for(&self, email: Option<&str>) -> VaultResult<Session> {
        match email.or(self.config.user_email.as_deref()) {
            Some(email) => Ok(self.sign_in(email)?.1),
            None => Ok(Session::anonymous()),
        }
    }

    // ==================== Services ====================

    pub fn tags(&self) -> TagService<'_> {
        TagService::new(self.db.connection()).with_default_color(&self.config.default_tag_color)
    }

    pub fn links(&self) -> LinkService<'_> {
        LinkService::new(self.db.connection())
    }

    pub fn collections(&self) -> CollectionService<'_> {
        CollectionService::new(self.db.connection())
    }

    pub fn transfer(&mut self) -> TransferService<'_> {
        TransferService::new(self.db.connection_mut())
            .with_default_color(&self.config.default_tag_color)
    }

    // ==================== Queries ====================

    /// First page with the configured page size
    pub fn default_query(&self) -> LinkQuery {
        LinkQuery {
            page_size: self.config.page_size,
            ..LinkQuery::default()
        }
    }

    /// Fuzzy search with the configured threshold and distance
    pub fn search(&self, session: &Session, query: &LinkQuery, text: &str) -> VaultResult<LinkPage> {
        self.links()
            .search_links(session, query, text, &self.config.search_options())
    }

    /// Tag graph over the newest links
    pub fn graph(&self, session: &Session) -> VaultResult<TagGraph> {
        let page = self.links().list_links(
            session,
            &LinkQuery {
                page_size: GRAPH_LINK_LIMIT,
                ..LinkQuery::default()
            },
        )?;
        Ok(build_graph(&page.items))
    }

    pub fn stats(&self, session: &Session) -> VaultResult<VaultStats> {
        let Some(user_id) = session.user_id() else {
            return Ok(VaultStats::default());
        };
        let conn = self.db.connection();
        let user_id = user_id.to_string();

        let (links, inbox, reading, archived, favorites): (i64, i64, i64, i64, i64) = conn.query_row(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(status = 'INBOX'), 0),
                   COALESCE(SUM(status = 'READING'), 0),
                   COALESCE(SUM(status = 'ARCHIVED'), 0),
                   COALESCE(SUM(favorite), 0)
            FROM links WHERE user_id = ?
            "#,
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )?;
        let tags: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tags WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        let collections: i64 = conn.query_row(
            "SELECT COUNT(*) FROM collections WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;

        Ok(VaultStats {
            links,
            inbox,
            reading,
            archived,
            favorites,
            tags,
            collections,
        })
    }

    // ==================== Files ====================

    /// Export the user's data to `path`; returns the number of links written
    pub fn export_to_file(&mut self, session: &Session, path: &Path) -> VaultResult<usize> {
        let doc = self.transfer().export_data(session)?;
        let json = to_json_pretty(&doc)?;
        write_atomic(path, json.as_bytes())?;

        info!("Wrote export of {} links to {:?}", doc.links.len(), path);
        Ok(doc.links.len())
    }

    pub fn import_from_file(&mut self, session: &Session, path: &Path) -> VaultResult<ImportReport> {
        session.require_user()?;
        let doc = parse_document(&read_to_string(path)?)?;
        self.transfer().import_data(session, &doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultError;
    use crate::models::{LinkStatus, LinkUpdate, NewLink};
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_open_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        Vault::open_with_config(config.clone()).unwrap();
        assert!(config.sqlite_path().exists());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        {
            let vault = Vault::open_with_config(config.clone()).unwrap();
            let (_, session) = vault.sign_in("ada@example.com").unwrap();
            vault
                .links()
                .create_link(&session, NewLink::new("https://example.com"))
                .unwrap();
        }

        let vault = Vault::open_with_config(config).unwrap();
        let (_, session) = vault.sign_in("ada@example.com").unwrap();
        assert_eq!(vault.stats(&session).unwrap().links, 1);
    }

    #[test]
    fn test_session_for_falls_back_to_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);

        let vault = Vault::open_in_memory(config.clone()).unwrap();
        assert!(!vault.session_for(None).unwrap().is_authenticated());

        config.user_email = Some("ada@example.com".to_string());
        let vault = Vault::open_in_memory(config).unwrap();
        let configured = vault.session_for(None).unwrap();
        let explicit = vault.session_for(Some("bob@example.com")).unwrap();
        assert!(configured.is_authenticated());
        assert_ne!(configured, explicit);
    }

    #[test]
    fn test_configured_tag_color_and_page_size() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            default_tag_color: "#00ff00".to_string(),
            page_size: 2,
            ..test_config(&temp_dir)
        };
        let vault = Vault::open_in_memory(config).unwrap();
        let (_, session) = vault.sign_in("ada@example.com").unwrap();

        let tag = vault.tags().create_tag(&session, "green", None).unwrap();
        assert_eq!(tag.color, "#00ff00");

        for i in 0..3 {
            vault
                .links()
                .create_link(&session, NewLink::new(format!("https://a.test/{}", i)))
                .unwrap();
        }
        let page = vault
            .links()
            .list_links(&session, &vault.default_query())
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_stats() {
        let temp_dir = TempDir::new().unwrap();
        let vault = Vault::open_in_memory(test_config(&temp_dir)).unwrap();
        let (_, session) = vault.sign_in("ada@example.com").unwrap();

        let a = vault
            .links()
            .create_link(&session, NewLink::new("https://a.test"))
            .unwrap();
        vault
            .links()
            .create_link(&session, NewLink::new("https://b.test"))
            .unwrap();
        vault
            .links()
            .update_link(
                &session,
                a.id,
                LinkUpdate {
                    status: Some(LinkStatus::Reading),
                    favorite: Some(true),
                    ..LinkUpdate::default()
                },
            )
            .unwrap();
        vault.tags().create_tag(&session, "t", None).unwrap();

        let stats = vault.stats(&session).unwrap();
        assert_eq!(stats.links, 2);
        assert_eq!(stats.inbox, 1);
        assert_eq!(stats.reading, 1);
        assert_eq!(stats.favorites, 1);
        assert_eq!(stats.tags, 1);
        assert_eq!(vault.stats(&Session::anonymous()).unwrap(), VaultStats::default());
    }

    #[test]
    fn test_export_import_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("export.json");
        let mut vault = Vault::open_in_memory(test_config(&temp_dir)).unwrap();
        let (_, ada) = vault.sign_in("ada@example.com").unwrap();
        let (_, bob) = vault.sign_in("bob@example.com").unwrap();

        vault
            .links()
            .create_link(&ada, NewLink::new("https://a.test"))
            .unwrap();

        assert_eq!(vault.export_to_file(&ada, &path).unwrap(), 1);
        let report = vault.import_from_file(&bob, &path).unwrap();
        assert_eq!(report.imported_links, 1);

        assert!(matches!(
            vault.import_from_file(&Session::anonymous(), &path),
            Err(VaultError::Unauthenticated)
        ));
        assert!(matches!(
            vault.import_from_file(&bob, &temp_dir.path().join("missing.json")),
            Err(VaultError::Io { .. })
        ));
    }

    #[test]
    fn test_graph_groups_links() {
        let temp_dir = TempDir::new().unwrap();
        let vault = Vault::open_in_memory(test_config(&temp_dir)).unwrap();
        let (_, session) = vault.sign_in("ada@example.com").unwrap();

        let tag = vault.tags().create_tag(&session, "rust", None).unwrap();
        vault
            .links()
            .create_link(&session, NewLink::new("https://a.test").with_tags(vec![tag.id]))
            .unwrap();
        vault
            .links()
            .create_link(&session, NewLink::new("https://b.test"))
            .unwrap();

        let graph = vault.graph(&session).unwrap();
        assert_eq!(graph.groups.len(), 2);
        assert!(vault.graph(&Session::anonymous()).unwrap().groups.is_empty());
    }
}
