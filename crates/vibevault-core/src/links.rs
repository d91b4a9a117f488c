//! Link service
//!
//! Links are per-user bookmarks; `(user, url)` is unique. The normalized URL
//! and domain are computed once at creation. Tags are attached through the
//! `link_tags` join table, and only tags owned by the same user can be
//! attached.

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::models::{
    Link, LinkMetadata, LinkPage, LinkQuery, LinkStatus, LinkUpdate, MetadataStatus, NewLink,
    SortField,
};
use crate::normalize::normalize_url;
use crate::search::{search_and_sort, SearchOptions};
use crate::session::Session;
use crate::storage::database::LOCALE_COLLATION;
use crate::storage::rows::{hydrate_tags, link_from_row, millis, LINK_COLUMNS};
use crate::tags::fetch_tag;

/// Link operations on behalf of a session
pub struct LinkService<'a> {
    conn: &'a Connection,
}

impl<'a> LinkService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Save a new link
    ///
    /// Tag ids that don't belong to the user are skipped.
    pub fn create_link(&self, session: &Session, new: NewLink) -> VaultResult<Link> {
        let user_id = session.require_user()?;
        let url = new.url.trim().to_string();
        let normalized = normalize_url(&url)?;

        let now = Utc::now();
        let mut link = Link {
            id: Uuid::new_v4(),
            user_id,
            url,
            normalized_url: normalized.normalized,
            domain: normalized.domain,
            title: new.title.map(|t| t.trim().to_string()).unwrap_or_default(),
            description: String::new(),
            note: new.note.unwrap_or_default(),
            og_image: None,
            favicon: None,
            site_name: None,
            published_time: None,
            status: LinkStatus::Inbox,
            favorite: false,
            collection_id: None,
            metadata_status: MetadataStatus::Pending,
            metadata_error: None,
            created_at: now,
            updated_at: now,
            last_visited_at: None,
            tags: Vec::new(),
        };

        let tx = self.conn.unchecked_transaction()?;
        insert_link_record(&tx, &link).map_err(|e| {
            VaultError::from_insert(e, || format!("Link '{}' is already saved", link.url))
        })?;

        for tag_id in &new.tag_ids {
            match fetch_tag(&tx, user_id, *tag_id)? {
                Some(tag) => {
                    attach_tag(&tx, link.id, tag.id)?;
                    link.tags.push(tag);
                }
                None => debug!("Skipping unknown tag {} for new link", tag_id),
            }
        }
        tx.commit()?;

        link.tags.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Created link {} ({})", link.url, link.id);
        Ok(link)
    }

    /// One page of the user's links, filtered and sorted in the database
    pub fn list_links(&self, session: &Session, query: &LinkQuery) -> VaultResult<LinkPage> {
        let Some(user_id) = session.user_id() else {
            return Ok(LinkPage::empty(query));
        };

        let filter = Filter::new(user_id, query);

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM links l WHERE {}", filter.clause),
            params_from_iter(filter.values.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links l WHERE {} ORDER BY {}, l.rowid DESC LIMIT ? OFFSET ?",
            filter.clause,
            order_by(query.sort)
        );
        let mut values = filter.values;
        values.push(Value::Integer(i64::from(query.page_size)));
        values.push(Value::Integer(
            i64::try_from(query.offset()).unwrap_or(i64::MAX),
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut items = stmt
            .query_map(params_from_iter(values.iter()), link_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        hydrate_tags(self.conn, &mut items)?;

        debug!(
            "Listed {} of {} links (page {})",
            items.len(),
            total,
            query.page.max(1)
        );
        Ok(LinkPage {
            items,
            total: u64::try_from(total).unwrap_or_default(),
            page: query.page.max(1),
            page_size: query.page_size,
        })
    }

    /// Fuzzy-search the user's links, then sort and page the matches
    ///
    /// Status and tag filters apply before matching; an empty `text` lists
    /// every filtered link.
    pub fn search_links(
        &self,
        session: &Session,
        query: &LinkQuery,
        text: &str,
        options: &SearchOptions,
    ) -> VaultResult<LinkPage> {
        let Some(user_id) = session.user_id() else {
            return Ok(LinkPage::empty(query));
        };

        let filter = Filter::new(user_id, query);
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links l WHERE {} ORDER BY l.rowid DESC",
            filter.clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut candidates = stmt
            .query_map(params_from_iter(filter.values.iter()), link_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        hydrate_tags(self.conn, &mut candidates)?;

        let matches = search_and_sort(&candidates, text, query.sort, options);
        let total = matches.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matches
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .collect();

        debug!(
            "Search {:?} matched {} of {} links",
            text,
            total,
            candidates.len()
        );
        Ok(LinkPage {
            items,
            total,
            page: query.page.max(1),
            page_size: query.page_size,
        })
    }

    pub fn get_link(&self, session: &Session, link_id: Uuid) -> VaultResult<Option<Link>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };
        Ok(fetch_link(self.conn, user_id, link_id)?)
    }

    /// Apply the present fields of `update`; the URL never changes
    pub fn update_link(
        &self,
        session: &Session,
        link_id: Uuid,
        update: LinkUpdate,
    ) -> VaultResult<Link> {
        let user_id = session.require_user()?;
        let mut link = self.require_link(user_id, link_id)?;

        if let Some(title) = update.title {
            link.title = title;
        }
        if let Some(description) = update.description {
            link.description = description;
        }
        if let Some(note) = update.note {
            link.note = note;
        }
        if let Some(favorite) = update.favorite {
            link.favorite = favorite;
        }
        if let Some(status) = update.status {
            link.status = status;
        }
        link.updated_at = Utc::now();

        self.conn.execute(
            r#"
            UPDATE links
            SET title = ?, description = ?, note = ?, favorite = ?, status = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                link.title,
                link.description,
                link.note,
                link.favorite,
                link.status.as_str(),
                millis(link.updated_at),
                link_id.to_string(),
                user_id.to_string(),
            ],
        )?;

        debug!("Updated link {}", link_id);
        Ok(link)
    }

    /// Attach one of the user's tags to one of the user's links
    pub fn add_tag_to_link(
        &self,
        session: &Session,
        link_id: Uuid,
        tag_id: Uuid,
    ) -> VaultResult<()> {
        let user_id = session.require_user()?;

        if fetch_tag(self.conn, user_id, tag_id)?.is_none() {
            return Err(VaultError::not_found("Tag", tag_id));
        }
        if !link_owned_by(self.conn, user_id, link_id)? {
            return Err(VaultError::not_found("Link", link_id));
        }

        attach_tag(self.conn, link_id, tag_id)?;
        debug!("Tagged link {} with {}", link_id, tag_id);
        Ok(())
    }

    /// Detach a tag; a missing association is not an error
    pub fn remove_tag_from_link(
        &self,
        session: &Session,
        link_id: Uuid,
        tag_id: Uuid,
    ) -> VaultResult<()> {
        let user_id = session.require_user()?.to_string();

        let removed = self.conn.execute(
            r#"
            DELETE FROM link_tags
            WHERE link_id = ? AND tag_id = ?
              AND link_id IN (SELECT id FROM links WHERE user_id = ?)
              AND tag_id IN (SELECT id FROM tags WHERE user_id = ?)
            "#,
            params![link_id.to_string(), tag_id.to_string(), user_id, user_id],
        )?;

        debug!("Untagged link {} ({} rows)", link_id, removed);
        Ok(())
    }

    /// Delete a link and its tag associations
    pub fn delete_link(&self, session: &Session, link_id: Uuid) -> VaultResult<()> {
        let user_id = session.require_user()?;
        if !link_owned_by(self.conn, user_id, link_id)? {
            return Err(VaultError::not_found("Link", link_id));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM link_tags WHERE link_id = ?",
            params![link_id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM links WHERE id = ? AND user_id = ?",
            params![link_id.to_string(), user_id.to_string()],
        )?;
        tx.commit()?;

        debug!("Deleted link {}", link_id);
        Ok(())
    }

    /// Stamp the link as visited now
    pub fn record_visit(&self, session: &Session, link_id: Uuid) -> VaultResult<Link> {
        let user_id = session.require_user()?;
        let mut link = self.require_link(user_id, link_id)?;

        let now = Utc::now();
        link.last_visited_at = Some(now);
        self.conn.execute(
            "UPDATE links SET last_visited_at = ? WHERE id = ? AND user_id = ?",
            params![millis(now), link_id.to_string(), user_id.to_string()],
        )?;

        Ok(link)
    }

    /// Store fetched page metadata and mark the link READY
    ///
    /// Title and description are only filled in when the user left them empty.
    pub fn apply_metadata(
        &self,
        session: &Session,
        link_id: Uuid,
        metadata: LinkMetadata,
    ) -> VaultResult<Link> {
        let user_id = session.require_user()?;
        let mut link = self.require_link(user_id, link_id)?;

        if link.title.is_empty() {
            if let Some(title) = metadata.title {
                link.title = title;
            }
        }
        if link.description.is_empty() {
            if let Some(description) = metadata.description {
                link.description = description;
            }
        }
        link.og_image = metadata.og_image.or(link.og_image);
        link.favicon = metadata.favicon.or(link.favicon);
        link.site_name = metadata.site_name.or(link.site_name);
        link.published_time = metadata.published_time.or(link.published_time);
        link.metadata_status = MetadataStatus::Ready;
        link.metadata_error = None;
        link.updated_at = Utc::now();

        self.conn.execute(
            r#"
            UPDATE links
            SET title = ?, description = ?, og_image = ?, favicon = ?, site_name = ?,
                published_time = ?, metadata_status = ?, metadata_error = NULL, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                link.title,
                link.description,
                link.og_image,
                link.favicon,
                link.site_name,
                link.published_time.map(millis),
                link.metadata_status.as_str(),
                millis(link.updated_at),
                link_id.to_string(),
                user_id.to_string(),
            ],
        )?;

        debug!("Applied metadata to link {}", link_id);
        Ok(link)
    }

    pub fn mark_metadata_failed(
        &self,
        session: &Session,
        link_id: Uuid,
        error: &str,
    ) -> VaultResult<Link> {
        let user_id = session.require_user()?;
        let mut link = self.require_link(user_id, link_id)?;

        link.metadata_status = MetadataStatus::Failed;
        link.metadata_error = Some(error.to_string());
        link.updated_at = Utc::now();

        self.conn.execute(
            r#"
            UPDATE links SET metadata_status = ?, metadata_error = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                link.metadata_status.as_str(),
                link.metadata_error,
                millis(link.updated_at),
                link_id.to_string(),
                user_id.to_string(),
            ],
        )?;

        debug!("Metadata fetch failed for link {}: {}", link_id, error);
        Ok(link)
    }

    /// Move a link into one of the user's collections, or out of any
    pub fn set_collection(
        &self,
        session: &Session,
        link_id: Uuid,
        collection_id: Option<Uuid>,
    ) -> VaultResult<Link> {
        let user_id = session.require_user()?;
        let mut link = self.require_link(user_id, link_id)?;

        if let Some(collection_id) = collection_id {
            let owned: bool = self
                .conn
                .prepare("SELECT 1 FROM collections WHERE id = ? AND user_id = ?")?
                .exists(params![collection_id.to_string(), user_id.to_string()])?;
            if !owned {
                return Err(VaultError::not_found("Collection", collection_id));
            }
        }

        link.collection_id = collection_id;
        link.updated_at = Utc::now();
        self.conn.execute(
            "UPDATE links SET collection_id = ?, updated_at = ? WHERE id = ? AND user_id = ?",
            params![
                collection_id.map(|id| id.to_string()),
                millis(link.updated_at),
                link_id.to_string(),
                user_id.to_string(),
            ],
        )?;

        Ok(link)
    }

    fn require_link(&self, user_id: Uuid, link_id: Uuid) -> VaultResult<Link> {
        fetch_link(self.conn, user_id, link_id)?.ok_or_else(|| VaultError::not_found("Link", link_id))
    }
}

/// WHERE clause and bound values shared by the count and page queries
struct Filter {
    clause: String,
    values: Vec<Value>,
}

impl Filter {
    fn new(user_id: Uuid, query: &LinkQuery) -> Self {
        let mut clause = String::from("l.user_id = ?");
        let mut values = vec![Value::Text(user_id.to_string())];

        if let Some(status) = query.status {
            clause.push_str(" AND l.status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(tag_id) = query.tag_id {
            clause.push_str(
                " AND EXISTS (SELECT 1 FROM link_tags lt WHERE lt.link_id = l.id AND lt.tag_id = ?)",
            );
            values.push(Value::Text(tag_id.to_string()));
        }

        Self { clause, values }
    }
}

fn order_by(sort: SortField) -> String {
    match sort {
        SortField::Domain | SortField::Title => {
            format!("l.{} COLLATE {} DESC", sort.column(), LOCALE_COLLATION)
        }
        SortField::CreatedAt | SortField::LastVisitedAt => format!("l.{} DESC", sort.column()),
    }
}

pub(crate) fn fetch_link(
    conn: &Connection,
    user_id: Uuid,
    link_id: Uuid,
) -> rusqlite::Result<Option<Link>> {
    let sql = format!("SELECT {LINK_COLUMNS} FROM links l WHERE l.id = ? AND l.user_id = ?");
    let link = conn
        .query_row(
            &sql,
            params![link_id.to_string(), user_id.to_string()],
            link_from_row,
        )
        .optional()?;

    match link {
        Some(link) => {
            let mut links = [link];
            hydrate_tags(conn, &mut links)?;
            let [link] = links;
            Ok(Some(link))
        }
        None => Ok(None),
    }
}

fn link_owned_by(conn: &Connection, user_id: Uuid, link_id: Uuid) -> rusqlite::Result<bool> {
    conn.prepare_cached("SELECT 1 FROM links WHERE id = ? AND user_id = ?")?
        .exists(params![link_id.to_string(), user_id.to_string()])
}

/// Every link of the user with tags, newest first
pub(crate) fn load_all_links(conn: &Connection, user_id: Uuid) -> rusqlite::Result<Vec<Link>> {
    let sql = format!(
        "SELECT {LINK_COLUMNS} FROM links l WHERE l.user_id = ? ORDER BY l.created_at DESC, l.rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut links = stmt
        .query_map(params![user_id.to_string()], link_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    hydrate_tags(conn, &mut links)?;
    Ok(links)
}

pub(crate) fn link_exists_by_url(
    conn: &Connection,
    user_id: Uuid,
    url: &str,
) -> rusqlite::Result<bool> {
    conn.prepare_cached("SELECT 1 FROM links WHERE user_id = ? AND url = ?")?
        .exists(params![user_id.to_string(), url])
}

/// Insert every column of `link`; tags are not written
pub(crate) fn insert_link_record(conn: &Connection, link: &Link) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO links (
            id, user_id, url, normalized_url, domain, title, description, note,
            og_image, favicon, site_name, published_time, status, favorite,
            collection_id, metadata_status, metadata_error,
            created_at, updated_at, last_visited_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            link.id.to_string(),
            link.user_id.to_string(),
            link.url,
            link.normalized_url,
            link.domain,
            link.title,
            link.description,
            link.note,
            link.og_image,
            link.favicon,
            link.site_name,
            link.published_time.map(millis),
            link.status.as_str(),
            link.favorite,
            link.collection_id.map(|id| id.to_string()),
            link.metadata_status.as_str(),
            link.metadata_error,
            millis(link.created_at),
            millis(link.updated_at),
            link.last_visited_at.map(millis),
        ],
    )?;
    Ok(())
}

/// Add a `link_tags` row; an existing association is left alone
pub(crate) fn attach_tag(conn: &Connection, link_id: Uuid, tag_id: Uuid) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO link_tags (link_id, tag_id) VALUES (?, ?)",
        params![link_id.to_string(), tag_id.to_string()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::tags::TagService;
    use crate::users::sign_in;

    fn setup() -> (Database, Session) {
        let db = Database::open_in_memory().unwrap();
        let (_, session) = sign_in(db.connection(), "ada@example.com").unwrap();
        (db, session)
    }

    #[test]
    fn test_create_link_normalizes_url() {
        let (db, session) = setup();
        let links = LinkService::new(db.connection());

        let link = links
            .create_link(&session, NewLink::new("https://Example.com/page#frag"))
            .unwrap();

        assert_eq!(link.url, "https://Example.com/page#frag");
        assert_eq!(link.normalized_url, "https://example.com/page");
        assert_eq!(link.domain, "example.com");
        assert_eq!(link.status, LinkStatus::Inbox);
        assert_eq!(link.metadata_status, MetadataStatus::Pending);
        assert_eq!(link.title, "");
        assert_eq!(link.note, "");

        let stored = links.get_link(&session, link.id).unwrap().unwrap();
        assert_eq!(stored.normalized_url, link.normalized_url);
    }

    #[test]
    fn test_create_link_validation() {
        let (db, session) = setup();
        let links = LinkService::new(db.connection());

        assert!(matches!(
            links.create_link(&session, NewLink::new("")),
            Err(VaultError::Validation(_))
        ));
        assert!(matches!(
            links.create_link(&session, NewLink::new("not a url")),
            Err(VaultError::Validation(_))
        ));
        assert!(matches!(
            links.create_link(&Session::anonymous(), NewLink::new("https://a.test")),
            Err(VaultError::Unauthenticated)
        ));
    }

    #[test]
    fn test_duplicate_url_is_conflict() {
        let (db, session) = setup();
        let links = LinkService::new(db.connection());

        links
            .create_link(&session, NewLink::new("https://a.test/x"))
            .unwrap();
        let err = links
            .create_link(&session, NewLink::new("https://a.test/x"))
            .unwrap_err();
        assert!(matches!(err, VaultError::Conflict(_)));
    }

    #[test]
    fn test_create_skips_foreign_tags() {
        let (db, ada) = setup();
        let (_, bob) = sign_in(db.connection(), "bob@example.com").unwrap();
        let tags = TagService::new(db.connection());
        let links = LinkService::new(db.connection());

        let mine = tags.create_tag(&ada, "rust", None).unwrap();
        let theirs = tags.create_tag(&bob, "go", None).unwrap();

        let link = links
            .create_link(
                &ada,
                NewLink::new("https://a.test").with_tags(vec![mine.id, theirs.id, Uuid::new_v4()]),
            )
            .unwrap();
        assert_eq!(link.tag_names(), vec!["rust"]);

        let stored = links.get_link(&ada, link.id).unwrap().unwrap();
        assert_eq!(stored.tags, vec![mine]);
    }

    #[test]
    fn test_list_links_filters_and_pages() {
        let (db, session) = setup();
        let tags = TagService::new(db.connection());
        let links = LinkService::new(db.connection());
        let rust = tags.create_tag(&session, "rust", None).unwrap();

        for i in 0..5 {
            let new = NewLink::new(format!("https://a.test/{}", i));
            let new = if i % 2 == 0 {
                new.with_tags(vec![rust.id])
            } else {
                new
            };
            links.create_link(&session, new).unwrap();
        }

        let page = links
            .list_links(
                &session,
                &LinkQuery {
                    page_size: 2,
                    ..LinkQuery::default()
                },
            )
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        // Newest first
        assert_eq!(page.items[0].url, "https://a.test/4");

        let page = links
            .list_links(
                &session,
                &LinkQuery {
                    page: 3,
                    page_size: 2,
                    ..LinkQuery::default()
                },
            )
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].url, "https://a.test/0");

        let tagged = links
            .list_links(
                &session,
                &LinkQuery {
                    tag_id: Some(rust.id),
                    ..LinkQuery::default()
                },
            )
            .unwrap();
        assert_eq!(tagged.total, 3);
        assert!(tagged.items.iter().all(|l| l.tag_names() == vec!["rust"]));
    }

    #[test]
    fn test_list_links_by_status() {
        let (db, session) = setup();
        let links = LinkService::new(db.connection());

        let a = links
            .create_link(&session, NewLink::new("https://a.test"))
            .unwrap();
        links
            .create_link(&session, NewLink::new("https://b.test"))
            .unwrap();
        links
            .update_link(
                &session,
                a.id,
                LinkUpdate {
                    status: Some("archived".parse().unwrap()),
                    ..LinkUpdate::default()
                },
            )
            .unwrap();

        let archived = links
            .list_links(
                &session,
                &LinkQuery {
                    status: Some(LinkStatus::Archived),
                    ..LinkQuery::default()
                },
            )
            .unwrap();
        assert_eq!(archived.total, 1);
        assert_eq!(archived.items[0].id, a.id);
    }

    #[test]
    fn test_list_links_anonymous_is_empty() {
        let (db, session) = setup();
        let links = LinkService::new(db.connection());
        links
            .create_link(&session, NewLink::new("https://a.test"))
            .unwrap();

        let page = links
            .list_links(&Session::anonymous(), &LinkQuery::default())
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn test_update_link_keeps_url() {
        let (db, session) = setup();
        let links = LinkService::new(db.connection());
        let link = links
            .create_link(&session, NewLink::new("https://a.test/x#y").with_title("Old"))
            .unwrap();

        let updated = links
            .update_link(
                &session,
                link.id,
                LinkUpdate {
                    note: Some("read later".to_string()),
                    favorite: Some(true),
                    ..LinkUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Old");
        assert_eq!(updated.note, "read later");
        assert!(updated.favorite);
        assert_eq!(updated.url, link.url);
        assert_eq!(updated.normalized_url, link.normalized_url);
        assert!(updated.updated_at >= link.updated_at);

        let stored = links.get_link(&session, link.id).unwrap().unwrap();
        assert_eq!(stored.note, "read later");
        assert!(stored.favorite);
    }

    #[test]
    fn test_update_foreign_link_is_not_found() {
        let (db, ada) = setup();
        let (_, bob) = sign_in(db.connection(), "bob@example.com").unwrap();
        let links = LinkService::new(db.connection());
        let link = links
            .create_link(&ada, NewLink::new("https://a.test"))
            .unwrap();

        assert!(matches!(
            links.update_link(&bob, link.id, LinkUpdate::default()),
            Err(VaultError::NotFound { .. })
        ));
        assert!(matches!(
            links.delete_link(&bob, link.id),
            Err(VaultError::NotFound { .. })
        ));
        assert!(links.get_link(&bob, link.id).unwrap().is_none());
    }

    #[test]
    fn test_tagging() {
        let (db, session) = setup();
        let tags = TagService::new(db.connection());
        let links = LinkService::new(db.connection());
        let tag = tags.create_tag(&session, "rust", None).unwrap();
        let link = links
            .create_link(&session, NewLink::new("https://a.test"))
            .unwrap();

        links.add_tag_to_link(&session, link.id, tag.id).unwrap();
        // Attaching twice is a no-op
        links.add_tag_to_link(&session, link.id, tag.id).unwrap();
        assert_eq!(tags.list_tags(&session).unwrap()[0].link_count, 1);

        links.remove_tag_from_link(&session, link.id, tag.id).unwrap();
        links.remove_tag_from_link(&session, link.id, tag.id).unwrap();
        assert_eq!(tags.list_tags(&session).unwrap()[0].link_count, 0);

        assert!(matches!(
            links.add_tag_to_link(&session, link.id, Uuid::new_v4()),
            Err(VaultError::NotFound { entity: "Tag", .. })
        ));
        assert!(matches!(
            links.add_tag_to_link(&session, Uuid::new_v4(), tag.id),
            Err(VaultError::NotFound { entity: "Link", .. })
        ));
    }

    #[test]
    fn test_cannot_untag_someone_elses_link() {
        let (db, ada) = setup();
        let (_, bob) = sign_in(db.connection(), "bob@example.com").unwrap();
        let tags = TagService::new(db.connection());
        let links = LinkService::new(db.connection());
        let tag = tags.create_tag(&ada, "rust", None).unwrap();
        let link = links
            .create_link(&ada, NewLink::new("https://a.test").with_tags(vec![tag.id]))
            .unwrap();

        links.remove_tag_from_link(&bob, link.id, tag.id).unwrap();
        assert_eq!(links.get_link(&ada, link.id).unwrap().unwrap().tags.len(), 1);
    }

    #[test]
    fn test_delete_link_removes_associations() {
        let (db, session) = setup();
        let tags = TagService::new(db.connection());
        let links = LinkService::new(db.connection());
        let tag = tags.create_tag(&session, "rust", None).unwrap();
        let link = links
            .create_link(&session, NewLink::new("https://a.test").with_tags(vec![tag.id]))
            .unwrap();

        links.delete_link(&session, link.id).unwrap();

        assert!(links.get_link(&session, link.id).unwrap().is_none());
        let rows: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM link_tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_metadata_fills_only_empty_fields() {
        let (db, session) = setup();
        let links = LinkService::new(db.connection());
        let link = links
            .create_link(&session, NewLink::new("https://a.test").with_title("Mine"))
            .unwrap();

        let updated = links
            .apply_metadata(
                &session,
                link.id,
                LinkMetadata {
                    title: Some("Theirs".to_string()),
                    description: Some("A page".to_string()),
                    site_name: Some("A Test".to_string()),
                    ..LinkMetadata::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Mine");
        assert_eq!(updated.description, "A page");
        assert_eq!(updated.site_name.as_deref(), Some("A Test"));
        assert_eq!(updated.metadata_status, MetadataStatus::Ready);

        let failed = links
            .mark_metadata_failed(&session, link.id, "timeout")
            .unwrap();
        assert_eq!(failed.metadata_status, MetadataStatus::Failed);
        let stored = links.get_link(&session, link.id).unwrap().unwrap();
        assert_eq!(stored.metadata_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_record_visit_and_sort_by_visit() {
        let (db, session) = setup();
        let links = LinkService::new(db.connection());
        let a = links
            .create_link(&session, NewLink::new("https://a.test"))
            .unwrap();
        links
            .create_link(&session, NewLink::new("https://b.test"))
            .unwrap();

        links.record_visit(&session, a.id).unwrap();

        let page = links
            .list_links(
                &session,
                &LinkQuery {
                    sort: SortField::LastVisitedAt,
                    ..LinkQuery::default()
                },
            )
            .unwrap();
        assert_eq!(page.items[0].id, a.id);
        assert!(page.items[0].last_visited_at.is_some());
    }

    #[test]
    fn test_title_order_matches_search_order() {
        let (db, session) = setup();
        let links = LinkService::new(db.connection());
        for (i, title) in ["apple", "Éclair", "Zebra", "éclair"].iter().enumerate() {
            links
                .create_link(
                    &session,
                    NewLink::new(format!("https://a.test/{}", i)).with_title(*title),
                )
                .unwrap();
        }
        let query = LinkQuery {
            sort: SortField::Title,
            ..LinkQuery::default()
        };

        let listed = links.list_links(&session, &query).unwrap();
        let searched = links
            .search_links(&session, &query, "", &SearchOptions::default())
            .unwrap();

        let titles = |page: &LinkPage| -> Vec<String> {
            page.items.iter().map(|l| l.title.clone()).collect()
        };
        assert_eq!(titles(&listed), vec!["Éclair", "éclair", "Zebra", "apple"]);
        assert_eq!(titles(&listed), titles(&searched));
    }

    #[test]
    fn test_search_links_pages_matches() {
        let (db, session) = setup();
        let links = LinkService::new(db.connection());
        for (i, title) in ["Rust Book", "Go Guide", "Rust vs Go"].iter().enumerate() {
            links
                .create_link(
                    &session,
                    NewLink::new(format!("https://a.test/{}", i)).with_title(*title),
                )
                .unwrap();
        }

        let page = links
            .search_links(
                &session,
                &LinkQuery::default(),
                "rust",
                &SearchOptions::default(),
            )
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|l| l.title.contains("Rust")));
    }
}
