//! Row mapping helpers shared by the services
//!
//! Ids are stored as TEXT, timestamps as epoch milliseconds.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::models::{Collection, Link, Tag};

/// Column list matching `link_from_row`, for a `links` table aliased `l`
pub(crate) const LINK_COLUMNS: &str = "l.id, l.user_id, l.url, l.normalized_url, l.domain, \
     l.title, l.description, l.note, l.og_image, l.favicon, l.site_name, l.published_time, \
     l.status, l.favorite, l.collection_id, l.metadata_status, l.metadata_error, \
     l.created_at, l.updated_at, l.last_visited_at";

/// Column list matching `tag_from_row`, for a `tags` table aliased `t`
pub(crate) const TAG_COLUMNS: &str = "t.id, t.user_id, t.name, t.color";

pub(crate) fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn conversion_error(idx: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, message.into())
}

pub(crate) fn uuid_at(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| conversion_error(idx, Type::Text, format!("Invalid UUID {}: {}", raw, e)))
}

pub(crate) fn opt_uuid_at(row: &Row, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        Uuid::parse_str(&raw)
            .map_err(|e| conversion_error(idx, Type::Text, format!("Invalid UUID {}: {}", raw, e)))
    })
    .transpose()
}

pub(crate) fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    Ok(DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now))
}

pub(crate) fn opt_timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let ms: Option<i64> = row.get(idx)?;
    Ok(ms.and_then(DateTime::from_timestamp_millis))
}

/// Map a row selected with `LINK_COLUMNS`; tags are loaded separately
pub(crate) fn link_from_row(row: &Row) -> rusqlite::Result<Link> {
    let status: String = row.get(12)?;
    let metadata_status: String = row.get(15)?;

    Ok(Link {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        url: row.get(2)?,
        normalized_url: row.get(3)?,
        domain: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        note: row.get(7)?,
        og_image: row.get(8)?,
        favicon: row.get(9)?,
        site_name: row.get(10)?,
        published_time: opt_timestamp_at(row, 11)?,
        status: status
            .parse()
            .map_err(|e| conversion_error(12, Type::Text, format!("{}", e)))?,
        favorite: row.get(13)?,
        collection_id: opt_uuid_at(row, 14)?,
        metadata_status: metadata_status
            .parse()
            .map_err(|e| conversion_error(15, Type::Text, format!("{}", e)))?,
        metadata_error: row.get(16)?,
        created_at: timestamp_at(row, 17)?,
        updated_at: timestamp_at(row, 18)?,
        last_visited_at: opt_timestamp_at(row, 19)?,
        tags: Vec::new(),
    })
}

/// Map a row selected with `TAG_COLUMNS`
pub(crate) fn tag_from_row(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        name: row.get(2)?,
        color: row.get(3)?,
    })
}

pub(crate) fn collection_from_row(row: &Row) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        name: row.get(2)?,
    })
}

/// Fill in the tags of each link, ordered by tag name
pub(crate) fn hydrate_tags(conn: &Connection, links: &mut [Link]) -> rusqlite::Result<()> {
    let sql = format!(
        r#"
        SELECT {TAG_COLUMNS} FROM tags t
        JOIN link_tags lt ON t.id = lt.tag_id
        WHERE lt.link_id = ?
        ORDER BY t.name
        "#
    );
    let mut stmt = conn.prepare_cached(&sql)?;

    for link in links.iter_mut() {
        link.tags = stmt
            .query_map(params![link.id.to_string()], tag_from_row)?
            .collect::<rusqlite::Result<Vec<Tag>>>()?;
    }

    Ok(())
}
