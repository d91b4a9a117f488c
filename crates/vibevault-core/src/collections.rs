//! Collection service
//!
//! A collection is a named bucket a link can sit in. Names are unique per
//! user; deleting a collection detaches its links rather than deleting them.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::models::Collection;
use crate::session::Session;
use crate::storage::rows::collection_from_row;

pub struct CollectionService<'a> {
    conn: &'a Connection,
}

impl<'a> CollectionService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// The user's collections, by name
    pub fn list_collections(&self, session: &Session) -> VaultResult<Vec<Collection>> {
        let Some(user_id) = session.user_id() else {
            return Ok(Vec::new());
        };
        Ok(load_collections(self.conn, user_id)?)
    }

    pub fn find_collection_by_name(
        &self,
        session: &Session,
        name: &str,
    ) -> VaultResult<Option<Collection>> {
        let Some(user_id) = session.user_id() else {
            return Ok(None);
        };
        Ok(find_by_name(self.conn, user_id, name.trim())?)
    }

    pub fn create_collection(&self, session: &Session, name: &str) -> VaultResult<Collection> {
        let user_id = session.require_user()?;
        let name = required_name(name)?;

        let collection = Collection {
            id: Uuid::new_v4(),
            user_id,
            name,
        };
        insert_collection(self.conn, &collection).map_err(|e| {
            VaultError::from_insert(e, || {
                format!("Collection '{}' already exists", collection.name)
            })
        })?;

        debug!("Created collection {} ({})", collection.name, collection.id);
        Ok(collection)
    }

    pub fn rename_collection(
        &self,
        session: &Session,
        collection_id: Uuid,
        name: &str,
    ) -> VaultResult<Collection> {
        let user_id = session.require_user()?;
        let name = required_name(name)?;

        let mut collection = fetch_collection(self.conn, user_id, collection_id)?
            .ok_or_else(|| VaultError::not_found("Collection", collection_id))?;
        collection.name = name;

        self.conn
            .execute(
                "UPDATE collections SET name = ? WHERE id = ? AND user_id = ?",
                params![
                    collection.name,
                    collection_id.to_string(),
                    user_id.to_string()
                ],
            )
            .map_err(|e| {
                VaultError::from_insert(e, || {
                    format!("Collection '{}' already exists", collection.name)
                })
            })?;

        Ok(collection)
    }

    /// Detach the collection's links, then delete it
    pub fn delete_collection(&self, session: &Session, collection_id: Uuid) -> VaultResult<()> {
        let user_id = session.require_user()?;
        if fetch_collection(self.conn, user_id, collection_id)?.is_none() {
            return Err(VaultError::not_found("Collection", collection_id));
        }

        let tx = self.conn.unchecked_transaction()?;
        let detached = tx.execute(
            "UPDATE links SET collection_id = NULL WHERE collection_id = ? AND user_id = ?",
            params![collection_id.to_string(), user_id.to_string()],
        )?;
        tx.execute(
            "DELETE FROM collections WHERE id = ? AND user_id = ?",
            params![collection_id.to_string(), user_id.to_string()],
        )?;
        tx.commit()?;

        debug!(
            "Deleted collection {} ({} links detached)",
            collection_id, detached
        );
        Ok(())
    }
}

fn required_name(name: &str) -> VaultResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(VaultError::Validation(
            "Collection name is required".to_string(),
        ));
    }
    Ok(name.to_string())
}

pub(crate) fn load_collections(
    conn: &Connection,
    user_id: Uuid,
) -> rusqlite::Result<Vec<Collection>> {
    let mut stmt =
        conn.prepare("SELECT id, user_id, name FROM collections WHERE user_id = ? ORDER BY name")?;
    let collections = stmt
        .query_map(params![user_id.to_string()], collection_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(collections)
}

fn fetch_collection(
    conn: &Connection,
    user_id: Uuid,
    collection_id: Uuid,
) -> rusqlite::Result<Option<Collection>> {
    conn.query_row(
        "SELECT id, user_id, name FROM collections WHERE id = ? AND user_id = ?",
        params![collection_id.to_string(), user_id.to_string()],
        collection_from_row,
    )
    .optional()
}

fn find_by_name(
    conn: &Connection,
    user_id: Uuid,
    name: &str,
) -> rusqlite::Result<Option<Collection>> {
    conn.query_row(
        "SELECT id, user_id, name FROM collections WHERE user_id = ? AND name = ?",
        params![user_id.to_string(), name],
        collection_from_row,
    )
    .optional()
}

fn insert_collection(conn: &Connection, collection: &Collection) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO collections (id, user_id, name) VALUES (?, ?, ?)",
        params![
            collection.id.to_string(),
            collection.user_id.to_string(),
            collection.name
        ],
    )?;
    Ok(())
}

/// Resolve the user's collection with this name, creating it when missing
pub(crate) fn find_or_create(
    conn: &Connection,
    user_id: Uuid,
    name: &str,
) -> rusqlite::Result<Collection> {
    if let Some(existing) = find_by_name(conn, user_id, name)? {
        return Ok(existing);
    }
    let collection = Collection {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
    };
    insert_collection(conn, &collection)?;
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::LinkService;
    use crate::models::NewLink;
    use crate::storage::Database;
    use crate::users::sign_in;

    fn setup() -> (Database, Session) {
        let db = Database::open_in_memory().unwrap();
        let (_, session) = sign_in(db.connection(), "ada@example.com").unwrap();
        (db, session)
    }

    #[test]
    fn test_create_list_rename() {
        let (db, session) = setup();
        let collections = CollectionService::new(db.connection());

        let reading = collections.create_collection(&session, "Reading").unwrap();
        collections.create_collection(&session, "Archive").unwrap();

        let names: Vec<String> = collections
            .list_collections(&session)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Archive", "Reading"]);

        let renamed = collections
            .rename_collection(&session, reading.id, "Later")
            .unwrap();
        assert_eq!(renamed.name, "Later");
        assert!(matches!(
            collections.rename_collection(&session, reading.id, "Archive"),
            Err(VaultError::Conflict(_))
        ));
    }

    #[test]
    fn test_create_errors() {
        let (db, session) = setup();
        let collections = CollectionService::new(db.connection());

        collections.create_collection(&session, "Reading").unwrap();
        assert!(matches!(
            collections.create_collection(&session, "Reading"),
            Err(VaultError::Conflict(_))
        ));
        assert!(matches!(
            collections.create_collection(&session, " "),
            Err(VaultError::Validation(_))
        ));
        assert!(matches!(
            collections.create_collection(&Session::anonymous(), "X"),
            Err(VaultError::Unauthenticated)
        ));
    }

    #[test]
    fn test_delete_detaches_links() {
        let (db, session) = setup();
        let collections = CollectionService::new(db.connection());
        let links = LinkService::new(db.connection());

        let collection = collections.create_collection(&session, "Reading").unwrap();
        let link = links
            .create_link(&session, NewLink::new("https://a.test"))
            .unwrap();
        links
            .set_collection(&session, link.id, Some(collection.id))
            .unwrap();

        collections
            .delete_collection(&session, collection.id)
            .unwrap();

        let stored = links.get_link(&session, link.id).unwrap().unwrap();
        assert!(stored.collection_id.is_none());
        assert!(collections.list_collections(&session).unwrap().is_empty());
    }

    #[test]
    fn test_foreign_collection_is_not_found() {
        let (db, ada) = setup();
        let (_, bob) = sign_in(db.connection(), "bob@example.com").unwrap();
        let collections = CollectionService::new(db.connection());
        let links = LinkService::new(db.connection());

        let collection = collections.create_collection(&ada, "Reading").unwrap();
        let link = links
            .create_link(&bob, NewLink::new("https://a.test"))
            .unwrap();

        assert!(matches!(
            links.set_collection(&bob, link.id, Some(collection.id)),
            Err(VaultError::NotFound { .. })
        ));
        assert!(matches!(
            collections.delete_collection(&bob, collection.id),
            Err(VaultError::NotFound { .. })
        ));
        assert!(collections.list_collections(&bob).unwrap().is_empty());
    }

    #[test]
    fn test_find_or_create_reuses_existing() {
        let (db, session) = setup();
        let user_id = session.require_user().unwrap();

        let first = find_or_create(db.connection(), user_id, "Reading").unwrap();
        let second = find_or_create(db.connection(), user_id, "Reading").unwrap();
        assert_eq!(first, second);
    }
}
