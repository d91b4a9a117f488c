//! Import/export of a user's data as a portable JSON document
//!
//! The document carries links (with their tag associations), tags and
//! collections. Ids inside a document are opaque strings: importing never
//! reuses them, every imported row gets a fresh UUID.
//!
//! Import is a single transaction. Each tag, collection and link is decoded
//! and written inside its own savepoint, so an item that is malformed or fails
//! to write leaves nothing behind and is counted as skipped, while the rest of
//! the batch goes through. A fault that loses the transaction itself aborts
//! the whole import.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collections::{find_or_create, load_collections};
use crate::error::{VaultError, VaultResult};
use crate::links::{attach_tag, insert_link_record, link_exists_by_url, load_all_links};
use crate::models::{Collection, Link, LinkStatus, MetadataStatus, Tag, DEFAULT_TAG_COLOR};
use crate::normalize::normalize_url;
use crate::session::Session;
use crate::storage::rows::{tag_from_row, TAG_COLUMNS};
use crate::tags::{find_tag_by_name, upsert_tag_by_name};

/// Version written into every export
pub const EXPORT_VERSION: &str = "1.0.0";

/// The portable export document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    #[serde(default)]
    pub tags: Vec<TagRecord>,
    #[serde(default)]
    pub collections: Vec<CollectionRecord>,
}

fn default_version() -> String {
    EXPORT_VERSION.to_string()
}

/// A document as read for import
///
/// Items stay as raw JSON until the import decodes them one by one, so a
/// single malformed entry cannot reject the whole file.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub links: Vec<Value>,
    #[serde(default)]
    pub tags: Vec<Value>,
    #[serde(default)]
    pub collections: Vec<Value>,
}

/// Status fields are matched case-insensitively, `inbox` reads as `INBOX`
fn status_from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// A link as it appears in a document; everything but `url` is optional
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub normalized_url: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub og_image: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub published_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "status_from_str")]
    pub status: LinkStatus,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default, deserialize_with = "status_from_str")]
    pub metadata_status: MetadataStatus,
    #[serde(default)]
    pub metadata_error: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_visited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub link_tags: Vec<LinkTagRecord>,
    /// Older documents list tags directly on the link
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagRecord>,
}

impl LinkRecord {
    /// Tag names referenced by this link, from either representation
    fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.link_tags
            .iter()
            .map(|lt| &lt.tag)
            .chain(self.tags.iter())
            .map(|t| t.name.trim())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LinkTagRecord {
    #[serde(default)]
    pub link_id: Option<String>,
    #[serde(default)]
    pub tag_id: Option<String>,
    pub tag: TagRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl From<&Tag> for TagRecord {
    fn from(tag: &Tag) -> Self {
        Self {
            id: Some(tag.id.to_string()),
            user_id: Some(tag.user_id.to_string()),
            name: tag.name.clone(),
            color: Some(tag.color.clone()),
        }
    }
}

impl From<&Collection> for CollectionRecord {
    fn from(collection: &Collection) -> Self {
        Self {
            id: Some(collection.id.to_string()),
            user_id: Some(collection.user_id.to_string()),
            name: collection.name.clone(),
        }
    }
}

impl From<&Link> for LinkRecord {
    fn from(link: &Link) -> Self {
        Self {
            id: Some(link.id.to_string()),
            user_id: Some(link.user_id.to_string()),
            url: link.url.clone(),
            normalized_url: Some(link.normalized_url.clone()),
            domain: Some(link.domain.clone()),
            title: Some(link.title.clone()),
            description: Some(link.description.clone()),
            note: Some(link.note.clone()),
            og_image: link.og_image.clone(),
            favicon: link.favicon.clone(),
            site_name: link.site_name.clone(),
            published_time: link.published_time,
            status: link.status,
            favorite: link.favorite,
            collection_id: link.collection_id.map(|id| id.to_string()),
            metadata_status: link.metadata_status,
            metadata_error: link.metadata_error.clone(),
            created_at: Some(link.created_at),
            updated_at: Some(link.updated_at),
            last_visited_at: link.last_visited_at,
            link_tags: link
                .tags
                .iter()
                .map(|tag| LinkTagRecord {
                    link_id: Some(link.id.to_string()),
                    tag_id: Some(tag.id.to_string()),
                    tag: TagRecord::from(tag),
                })
                .collect(),
            tags: Vec::new(),
        }
    }
}

/// Outcome of an import
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported_links: u32,
    pub imported_tags: u32,
    pub skipped_links: u32,
    pub skipped_tags: u32,
}

/// Parse a document for import; only the envelope is checked here
pub fn parse_document(json: &str) -> VaultResult<ImportDocument> {
    Ok(serde_json::from_str(json)?)
}

/// Render a document as indented JSON
pub fn to_json_pretty(doc: &ExportDocument) -> VaultResult<String> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Export and import on behalf of a session
pub struct TransferService<'a> {
    conn: &'a mut Connection,
    default_color: &'a str,
}

impl<'a> TransferService<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            default_color: DEFAULT_TAG_COLOR,
        }
    }

    /// Color for imported tags that carry none
    pub fn with_default_color(mut self, color: &'a str) -> Self {
        self.default_color = color;
        self
    }

    /// Snapshot of everything the user owns
    pub fn export_data(&self, session: &Session) -> VaultResult<ExportDocument> {
        let user_id = session.require_user()?;

        let conn: &Connection = &*self.conn;
        let links = load_all_links(conn, user_id)?;
        let tags = load_tags(conn, user_id)?;
        let collections = load_collections(conn, user_id)?;

        info!(
            "Exported {} links, {} tags, {} collections",
            links.len(),
            tags.len(),
            collections.len()
        );
        Ok(ExportDocument {
            version: EXPORT_VERSION.to_string(),
            created_at: Utc::now(),
            user_id: user_id.to_string(),
            links: links.iter().map(LinkRecord::from).collect(),
            tags: tags.iter().map(TagRecord::from).collect(),
            collections: collections.iter().map(CollectionRecord::from).collect(),
        })
    }

    /// Merge a document into the user's data
    ///
    /// Tags are upserted by name, collections resolved by name, and links
    /// whose URL the user already saved are skipped.
    pub fn import_data(
        &mut self,
        session: &Session,
        doc: &ImportDocument,
    ) -> VaultResult<ImportReport> {
        let user_id = session.require_user()?;
        debug!(
            "Importing document version {} ({} links, {} tags, {} collections)",
            doc.version.as_deref().unwrap_or("unknown"),
            doc.links.len(),
            doc.tags.len(),
            doc.collections.len()
        );

        let default_color = self.default_color;
        let mut report = ImportReport::default();
        let mut tx = self.conn.transaction()?;

        for value in &doc.tags {
            let record = match TagRecord::deserialize(value) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping malformed tag: {}", e);
                    report.skipped_tags += 1;
                    continue;
                }
            };
            let name = record.name.trim();
            if name.is_empty() {
                warn!("Skipping tag without a name");
                report.skipped_tags += 1;
                continue;
            }
            let color = record
                .color
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(default_color);

            match in_savepoint(&mut tx, |conn| {
                upsert_tag_by_name(conn, user_id, name, color).map_err(VaultError::from)
            })? {
                Ok(_) => report.imported_tags += 1,
                Err(e) => {
                    warn!("Skipping tag '{}': {}", name, e);
                    report.skipped_tags += 1;
                }
            }
        }

        let mut collection_ids: HashMap<String, Uuid> = HashMap::new();
        for value in &doc.collections {
            let record = match CollectionRecord::deserialize(value) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping malformed collection: {}", e);
                    continue;
                }
            };
            let name = record.name.trim();
            if name.is_empty() {
                warn!("Skipping collection without a name");
                continue;
            }
            match in_savepoint(&mut tx, |conn| {
                find_or_create(conn, user_id, name).map_err(VaultError::from)
            })? {
                Ok(collection) => {
                    if let Some(id) = record.id {
                        collection_ids.insert(id, collection.id);
                    }
                }
                Err(e) => warn!("Skipping collection '{}': {}", name, e),
            }
        }

        for value in &doc.links {
            let record = match LinkRecord::deserialize(value) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping malformed link: {}", e);
                    report.skipped_links += 1;
                    continue;
                }
            };
            let url = record.url.trim();
            if url.is_empty() {
                warn!("Skipping link without a URL");
                report.skipped_links += 1;
                continue;
            }
            if link_exists_by_url(&tx, user_id, url)? {
                debug!("Skipping already saved link {}", url);
                report.skipped_links += 1;
                continue;
            }

            let collection_id = record
                .collection_id
                .as_deref()
                .and_then(|id| collection_ids.get(id).copied());

            match in_savepoint(&mut tx, |conn| {
                import_link(conn, user_id, &record, url, collection_id)
            })? {
                Ok(()) => report.imported_links += 1,
                Err(e) => {
                    warn!("Skipping link {}: {}", url, e);
                    report.skipped_links += 1;
                }
            }
        }

        tx.commit()?;

        info!(
            "Import finished: {} links imported, {} skipped; {} tags imported, {} skipped",
            report.imported_links, report.skipped_links, report.imported_tags, report.skipped_tags
        );
        Ok(report)
    }
}

/// Run `f` inside a savepoint, releasing it on success and rolling it back
/// on failure
///
/// The inner result is the item's outcome. The outer one fails when the
/// enclosing transaction is gone, since SQLite may roll back the whole
/// transaction on some errors and later savepoints would then autocommit.
fn in_savepoint<T, F>(tx: &mut Transaction<'_>, f: F) -> VaultResult<VaultResult<T>>
where
    F: FnOnce(&Connection) -> VaultResult<T>,
{
    let sp = tx.savepoint()?;
    match f(&sp) {
        Ok(value) => {
            sp.commit()?;
            Ok(Ok(value))
        }
        Err(e) => {
            drop(sp);
            if tx.is_autocommit() {
                return Err(VaultError::TransactionAborted(e.to_string()));
            }
            Ok(Err(e))
        }
    }
}

fn import_link(
    conn: &Connection,
    user_id: Uuid,
    record: &LinkRecord,
    url: &str,
    collection_id: Option<Uuid>,
) -> VaultResult<()> {
    let (normalized_url, domain) = match (&record.normalized_url, &record.domain) {
        (Some(normalized), Some(domain)) => (normalized.clone(), domain.clone()),
        (normalized, domain) => {
            let derived = normalize_url(url)?;
            (
                normalized.clone().unwrap_or(derived.normalized),
                domain.clone().unwrap_or(derived.domain),
            )
        }
    };

    let created_at = record.created_at.unwrap_or_else(Utc::now);
    let link = Link {
        id: Uuid::new_v4(),
        user_id,
        url: url.to_string(),
        normalized_url,
        domain,
        title: record.title.clone().unwrap_or_default(),
        description: record.description.clone().unwrap_or_default(),
        note: record.note.clone().unwrap_or_default(),
        og_image: record.og_image.clone(),
        favicon: record.favicon.clone(),
        site_name: record.site_name.clone(),
        published_time: record.published_time,
        status: record.status,
        favorite: record.favorite,
        collection_id,
        metadata_status: record.metadata_status,
        metadata_error: record.metadata_error.clone(),
        created_at,
        updated_at: record.updated_at.unwrap_or(created_at),
        last_visited_at: record.last_visited_at,
        tags: Vec::new(),
    };
    insert_link_record(conn, &link)?;

    for name in record.tag_names() {
        match find_tag_by_name(conn, user_id, name)? {
            Some(tag) => attach_tag(conn, link.id, tag.id)?,
            None => debug!("Dropping unknown tag '{}' from {}", name, url),
        }
    }

    Ok(())
}

fn load_tags(conn: &Connection, user_id: Uuid) -> rusqlite::Result<Vec<Tag>> {
    let sql = format!("SELECT {TAG_COLUMNS} FROM tags t WHERE t.user_id = ? ORDER BY t.name");
    let mut stmt = conn.prepare(&sql)?;
    let tags = stmt
        .query_map([user_id.to_string()], tag_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tags)
}
