//! Tag service
//!
//! Tags are per-user labels; `(user, name)` is unique. Deleting a tag
//! removes its link associations before the tag itself.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::models::{Tag, TagWithCount, DEFAULT_TAG_COLOR};
use crate::session::Session;
use crate::storage::rows::{tag_from_row, TAG_COLUMNS};

/// Tag operations on behalf of a session
pub struct TagService<'a> {
    conn: &'a Connection,
    default_color: &'a str,
}

impl<'a> TagService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            default_color: DEFAULT_TAG_COLOR,
        }
    }

    /// Use a different color for tags created or updated without one
    pub fn with_default_color(mut self, color: &'a str) -> Self {
        self.default_color = color;
        self
    }

    /// All of the user's tags with their link counts, by name
    pub fn list_tags(&self, session: &Session) -> VaultResult<Vec<TagWithCount>> {
        let Some(user_id) = session.user_id() else {
            return Ok(Vec::new());
        };

        let sql = format!(
            r#"
            SELECT {TAG_COLUMNS}, COUNT(lt.link_id) AS link_count
            FROM tags t
            LEFT JOIN link_tags lt ON t.id = lt.tag_id
            WHERE t.user_id = ?
            GROUP BY t.id
            ORDER BY t.name ASC
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tags = stmt
            .query_map(params![user_id.to_string()], |row| {
                Ok(TagWithCount {
                    tag: tag_from_row(row)?,
                    link_count: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tags)
    }

    pub fn get_tag(&self, session: &Session, tag_id: Uuid) -> VaultResult<Option<Tag>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };
        Ok(fetch_tag(self.conn, user_id, tag_id)?)
    }

    /// Exact (case-sensitive) name lookup
    pub fn find_tag_by_name(&self, session: &Session, name: &str) -> VaultResult<Option<Tag>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };
        Ok(find_tag_by_name(self.conn, user_id, name.trim())?)
    }

    pub fn create_tag(
        &self,
        session: &Session,
        name: &str,
        color: Option<&str>,
    ) -> VaultResult<Tag> {
        let user_id = session.require_user()?;
        let name = required_name(name)?;

        let tag = Tag {
            id: Uuid::new_v4(),
            user_id,
            name,
            color: self.color_or_default(color),
        };

        self.conn
            .execute(
                "INSERT INTO tags (id, user_id, name, color) VALUES (?, ?, ?, ?)",
                params![
                    tag.id.to_string(),
                    user_id.to_string(),
                    tag.name,
                    tag.color
                ],
            )
            .map_err(|e| {
                VaultError::from_insert(e, || format!("Tag '{}' already exists", tag.name))
            })?;

        debug!("Created tag {} ({})", tag.name, tag.id);
        Ok(tag)
    }

    /// Rename and recolor a tag; an omitted color resets to the default
    pub fn update_tag(
        &self,
        session: &Session,
        tag_id: Uuid,
        name: &str,
        color: Option<&str>,
    ) -> VaultResult<Tag> {
        let user_id = session.require_user()?;
        let name = required_name(name)?;

        let mut tag = fetch_tag(self.conn, user_id, tag_id)?
            .ok_or_else(|| VaultError::not_found("Tag", tag_id))?;
        tag.name = name;
        tag.color = self.color_or_default(color);

        self.conn
            .execute(
                "UPDATE tags SET name = ?, color = ? WHERE id = ? AND user_id = ?",
                params![
                    tag.name,
                    tag.color,
                    tag_id.to_string(),
                    user_id.to_string()
                ],
            )
            .map_err(|e| {
                VaultError::from_insert(e, || format!("Tag '{}' already exists", tag.name))
            })?;

        debug!("Updated tag {}", tag_id);
        Ok(tag)
    }

    /// Delete a tag and its link associations; an absent tag is not an error
    pub fn delete_tag(&self, session: &Session, tag_id: Uuid) -> VaultResult<()> {
        let user_id = session.require_user()?;
        let tag_id = tag_id.to_string();
        let user_id = user_id.to_string();

        let tx = self.conn.unchecked_transaction()?;
        let detached = tx.execute(
            r#"
            DELETE FROM link_tags
            WHERE tag_id IN (SELECT id FROM tags WHERE id = ? AND user_id = ?)
            "#,
            params![tag_id, user_id],
        )?;
        let deleted = tx.execute(
            "DELETE FROM tags WHERE id = ? AND user_id = ?",
            params![tag_id, user_id],
        )?;
        tx.commit()?;

        debug!(
            "Deleted tag {} ({} rows, {} link associations)",
            tag_id, deleted, detached
        );
        Ok(())
    }

    fn color_or_default(&self, color: Option<&str>) -> String {
        match color.map(str::trim) {
            Some(color) if !color.is_empty() => color.to_string(),
            _ => self.default_color.to_string(),
        }
    }
}

fn required_name(name: &str) -> VaultResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(VaultError::Validation("Tag name is required".to_string()));
    }
    Ok(name.to_string())
}

pub(crate) fn fetch_tag(
    conn: &Connection,
    user_id: Uuid,
    tag_id: Uuid,
) -> rusqlite::Result<Option<Tag>> {
    let sql = format!("SELECT {TAG_COLUMNS} FROM tags t WHERE t.id = ? AND t.user_id = ?");
    conn.query_row(
        &sql,
        params![tag_id.to_string(), user_id.to_string()],
        tag_from_row,
    )
    .optional()
}

pub(crate) fn find_tag_by_name(
    conn: &Connection,
    user_id: Uuid,
    name: &str,
) -> rusqlite::Result<Option<Tag>> {
    let sql = format!("SELECT {TAG_COLUMNS} FROM tags t WHERE t.user_id = ? AND t.name = ?");
    conn.query_row(&sql, params![user_id.to_string(), name], tag_from_row)
        .optional()
}

/// Update the color of the user's tag with this name, or create it.
/// Returns the tag and whether it was newly created.
pub(crate) fn upsert_tag_by_name(
    conn: &Connection,
    user_id: Uuid,
    name: &str,
    color: &str,
) -> rusqlite::Result<(Tag, bool)> {
    if let Some(mut tag) = find_tag_by_name(conn, user_id, name)? {
        conn.execute(
            "UPDATE tags SET color = ? WHERE id = ?",
            params![color, tag.id.to_string()],
        )?;
        tag.color = color.to_string();
        return Ok((tag, false));
    }

    let tag = Tag {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        color: color.to_string(),
    };
    conn.execute(
        "INSERT INTO tags (id, user_id, name, color) VALUES (?, ?, ?, ?)",
        params![
            tag.id.to_string(),
            user_id.to_string(),
            tag.name,
            tag.color
        ],
    )?;
    Ok((tag, true))
}
