//! Command handlers, one module per command group

pub mod collection;
pub mod config;
pub mod graph;
pub mod link;
pub mod status;
pub mod tag;
pub mod transfer;

use anyhow::{bail, Result};
use uuid::Uuid;

use vibevault_core::{Collection, Link, LinkQuery, Session, Tag, Vault};

/// Every link of the session's user, newest first
pub(crate) fn all_links(vault: &Vault, session: &Session) -> Result<Vec<Link>> {
    let page = vault.links().list_links(
        session,
        &LinkQuery {
            page_size: u32::MAX,
            ..LinkQuery::default()
        },
    )?;
    Ok(page.items)
}

/// Resolve a link by full UUID or unique id prefix
pub(crate) fn resolve_link(vault: &Vault, session: &Session, id: &str) -> Result<Link> {
    if let Ok(uuid) = Uuid::parse_str(id) {
        return match vault.links().get_link(session, uuid)? {
            Some(link) => Ok(link),
            None => bail!("Link not found: {}", id),
        };
    }

    let links = all_links(vault, session)?;
    let matches = by_prefix(&links, id, |l| l.id);
    match matches.as_slice() {
        [] => bail!("No link found matching: {}", id),
        [link] => Ok((*link).clone()),
        _ => {
            eprintln!("Multiple links match '{}':", id);
            for link in &matches {
                eprintln!("  {} - {}", link.id, link.url);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Resolve a tag by exact name or id prefix
pub(crate) fn resolve_tag(vault: &Vault, session: &Session, name_or_id: &str) -> Result<Tag> {
    let tags = vault.tags();
    if let Some(tag) = tags.find_tag_by_name(session, name_or_id)? {
        return Ok(tag);
    }

    let all: Vec<Tag> = tags
        .list_tags(session)?
        .into_iter()
        .map(|entry| entry.tag)
        .collect();
    match by_prefix(&all, name_or_id, |t| t.id).as_slice() {
        [tag] => Ok((*tag).clone()),
        [] => bail!("No tag named '{}'", name_or_id),
        _ => bail!("Ambiguous tag ID '{}'. Please provide more characters.", name_or_id),
    }
}

/// Resolve a collection by name or id prefix
pub(crate) fn resolve_collection(
    vault: &Vault,
    session: &Session,
    name_or_id: &str,
) -> Result<Collection> {
    let collections = vault.collections();
    if let Some(collection) = collections.find_collection_by_name(session, name_or_id)? {
        return Ok(collection);
    }

    let all = collections.list_collections(session)?;
    match by_prefix(&all, name_or_id, |c| c.id).as_slice() {
        [collection] => Ok((*collection).clone()),
        [] => bail!("No collection named '{}'", name_or_id),
        _ => bail!(
            "Ambiguous collection ID '{}'. Please provide more characters.",
            name_or_id
        ),
    }
}

fn by_prefix<'a, T>(items: &'a [T], prefix: &str, id: impl Fn(&T) -> Uuid) -> Vec<&'a T> {
    let prefix = prefix.to_ascii_lowercase();
    if prefix.is_empty() {
        return Vec::new();
    }
    items
        .iter()
        .filter(|item| id(item).to_string().starts_with(&prefix))
        .collect()
}
