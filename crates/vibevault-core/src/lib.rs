//! VibeVault Core Library
//!
//! This crate provides the core functionality for VibeVault, a bookmark
//! manager: users save links, label them with tags, file them into
//! collections, search them and move their data between accounts as JSON.
//!
//! # Architecture
//!
//! - **SQLite**: a single database holds every user's rows; every query is
//!   scoped to the acting user
//! - **Services**: `TagService`, `LinkService`, `CollectionService` and
//!   `TransferService` borrow the connection and take a `Session`
//! - **Search**: a pure fuzzy-filter-then-sort pipeline over loaded links
//!
//! # Quick Start
//!
//! ```text
//! let vault = Vault::open()?;
//! let (_, session) = vault.sign_in("ada@example.com")?;
//!
//! let tag = vault.tags().create_tag(&session, "rust", None)?;
//! vault.links().create_link(
//!     &session,
//!     NewLink::new("https://doc.rust-lang.org/book/").with_tags(vec![tag.id]),
//! )?;
//!
//! let page = vault.search(&session, &vault.default_query(), "rust book")?;
//! ```
//!
//! # Modules
//!
//! - `vault`: Unified entry point
//! - `models`: Users, links, tags, collections and query types
//! - `links`, `tags`, `collections`: Per-entity services
//! - `search`: Fuzzy matching and sorting
//! - `transfer`: JSON export/import
//! - `graph`: Links grouped by tag, with layout
//! - `storage`: SQLite schema and connection
//! - `config`: Application configuration

pub mod collections;
pub mod config;
pub mod error;
pub mod graph;
pub mod links;
pub mod models;
pub mod normalize;
pub mod search;
pub mod session;
pub mod storage;
pub mod tags;
pub mod transfer;
pub mod users;
pub mod vault;

pub use collections::CollectionService;
pub use config::Config;
pub use error::{VaultError, VaultResult};
pub use graph::{build_graph, TagGraph};
pub use links::LinkService;
pub use models::{
    Collection, Link, LinkMetadata, LinkPage, LinkQuery, LinkStatus, LinkUpdate, MetadataStatus,
    NewLink, SortField, Tag, TagWithCount, User,
};
pub use search::{search_and_sort, SearchOptions};
pub use session::Session;
pub use tags::TagService;
pub use transfer::{ExportDocument, ImportDocument, ImportReport, TransferService};
pub use vault::{Vault, VaultStats};
