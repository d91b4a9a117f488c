//! Data models for VibeVault
//!
//! Defines the core data structures: User, Link, Tag, Collection and the
//! request/response types the services exchange with callers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VaultError;

/// Color given to tags created without one
pub const DEFAULT_TAG_COLOR: &str = "#8b5cf6";

/// An account; the ownership scope for every other entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Reading state of a link
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkStatus {
    #[default]
    Inbox,
    Reading,
    Archived,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Inbox => "INBOX",
            LinkStatus::Reading => "READING",
            LinkStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkStatus {
    type Err = VaultError;

    /// Case-insensitive: `inbox`, `Inbox` and `INBOX` are the same status
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INBOX" => Ok(LinkStatus::Inbox),
            "READING" => Ok(LinkStatus::Reading),
            "ARCHIVED" => Ok(LinkStatus::Archived),
            _ => Err(VaultError::Validation(format!(
                "Unknown status '{}'. Expected one of: inbox, reading, archived",
                s
            ))),
        }
    }
}

/// Progress of the page-metadata fetch for a link
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetadataStatus {
    #[default]
    Pending,
    Ready,
    Failed,
}

impl MetadataStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataStatus::Pending => "PENDING",
            MetadataStatus::Ready => "READY",
            MetadataStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for MetadataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataStatus {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(MetadataStatus::Pending),
            "READY" => Ok(MetadataStatus::Ready),
            "FAILED" => Ok(MetadataStatus::Failed),
            _ => Err(VaultError::Validation(format!(
                "Unknown metadata status '{}'",
                s
            ))),
        }
    }
}

/// Field a link listing is ordered by (always descending)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    LastVisitedAt,
    Domain,
    Title,
}

impl SortField {
    /// Column in the `links` table
    pub(crate) fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::LastVisitedAt => "last_visited_at",
            SortField::Domain => "domain",
            SortField::Title => "title",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::LastVisitedAt => "lastVisitedAt",
            SortField::Domain => "domain",
            SortField::Title => "title",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = VaultError;

    /// Accepts `createdAt`, `created_at` and `created-at` spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "createdat" => Ok(SortField::CreatedAt),
            "lastvisitedat" => Ok(SortField::LastVisitedAt),
            "domain" => Ok(SortField::Domain),
            "title" => Ok(SortField::Title),
            _ => Err(VaultError::Validation(format!(
                "Unknown sort field '{}'. Expected one of: createdAt, lastVisitedAt, domain, title",
                s
            ))),
        }
    }
}

/// A user-defined label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
}

/// A tag together with the number of links it is attached to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub link_count: i64,
}

/// A named container a link may belong to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

/// A saved bookmark
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: Uuid,
    pub user_id: Uuid,
    /// URL exactly as submitted
    pub url: String,
    /// Parsed URL without fragment, fixed at creation
    pub normalized_url: String,
    /// Host of the URL, fixed at creation
    pub domain: String,
    pub title: String,
    pub description: String,
    pub note: String,
    pub og_image: Option<String>,
    pub favicon: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<DateTime<Utc>>,
    pub status: LinkStatus,
    pub favorite: bool,
    pub collection_id: Option<Uuid>,
    pub metadata_status: MetadataStatus,
    pub metadata_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_visited_at: Option<DateTime<Utc>>,
    /// Tags attached through `link_tags`, ordered by name
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Link {
    /// Tag names, in display order
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }

    /// Text fields the search pipeline matches against
    pub fn searchable_fields(&self) -> [&str; 6] {
        [
            self.title.as_str(),
            self.url.as_str(),
            self.description.as_str(),
            self.note.as_str(),
            self.site_name.as_deref().unwrap_or(""),
            self.domain.as_str(),
        ]
    }
}

/// Input for creating a link
#[derive(Debug, Clone, Default)]
pub struct NewLink {
    pub url: String,
    pub title: Option<String>,
    pub note: Option<String>,
    pub tag_ids: Vec<Uuid>,
}

impl NewLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<Uuid>) -> Self {
        self.tag_ids = tag_ids;
        self
    }
}

/// Partial update of a link; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub note: Option<String>,
    pub favorite: Option<bool>,
    pub status: Option<LinkStatus>,
}

impl LinkUpdate {
    pub fn is_empty(&self) -> bool {
        self == &LinkUpdate::default()
    }
}

/// Page metadata scraped from a link's URL
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub og_image: Option<String>,
    pub favicon: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<DateTime<Utc>>,
}

/// Filters and paging for a link listing
#[derive(Debug, Clone, PartialEq)]
pub struct LinkQuery {
    pub status: Option<LinkStatus>,
    pub tag_id: Option<Uuid>,
    pub sort: SortField,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl Default for LinkQuery {
    fn default() -> Self {
        Self {
            status: None,
            tag_id: None,
            sort: SortField::CreatedAt,
            page: 1,
            page_size: 20,
        }
    }
}

impl LinkQuery {
    /// Row offset for this page (pages below 1 count as the first page)
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }
}

/// One page of a link listing
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkPage {
    pub items: Vec<Link>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl LinkPage {
    pub(crate) fn empty(query: &LinkQuery) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: query.page.max(1),
            page_size: query.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("inbox".parse::<LinkStatus>().unwrap(), LinkStatus::Inbox);
        assert_eq!("Reading".parse::<LinkStatus>().unwrap(), LinkStatus::Reading);
        assert_eq!(
            " ARCHIVED ".parse::<LinkStatus>().unwrap(),
            LinkStatus::Archived
        );
        assert!(matches!(
            "done".parse::<LinkStatus>(),
            Err(VaultError::Validation(_))
        ));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&LinkStatus::Reading).unwrap();
        assert_eq!(json, "\"READING\"");
        let json = serde_json::to_string(&MetadataStatus::Failed).unwrap();
        assert_eq!(json, "\"FAILED\"");
    }

    #[test]
    fn test_sort_field_spellings() {
        assert_eq!(
            "createdAt".parse::<SortField>().unwrap(),
            SortField::CreatedAt
        );
        assert_eq!(
            "last_visited_at".parse::<SortField>().unwrap(),
            SortField::LastVisitedAt
        );
        assert_eq!("Domain".parse::<SortField>().unwrap(), SortField::Domain);
        assert!("rank".parse::<SortField>().is_err());
        assert_eq!(SortField::LastVisitedAt.column(), "last_visited_at");
    }

    #[test]
    fn test_query_offset() {
        let mut query = LinkQuery::default();
        assert_eq!(query.offset(), 0);

        query.page = 3;
        query.page_size = 10;
        assert_eq!(query.offset(), 20);

        query.page = 0;
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_link_update_is_empty() {
        assert!(LinkUpdate::default().is_empty());
        let update = LinkUpdate {
            favorite: Some(true),
            ..LinkUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_new_link_builder() {
        let tag = Uuid::new_v4();
        let new = NewLink::new("https://example.com")
            .with_title("Example")
            .with_note("later")
            .with_tags(vec![tag]);
        assert_eq!(new.url, "https://example.com");
        assert_eq!(new.title.as_deref(), Some("Example"));
        assert_eq!(new.note.as_deref(), Some("later"));
        assert_eq!(new.tag_ids, vec![tag]);
    }
}
