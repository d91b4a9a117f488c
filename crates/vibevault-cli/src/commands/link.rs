//! Link command handlers

use anyhow::{bail, Context, Result};
use tracing::warn;
use uuid::Uuid;

use vibevault_core::normalize::normalize_url;
use vibevault_core::{Link, LinkStatus, LinkUpdate, NewLink, Session, SortField, Vault};

use super::{resolve_collection, resolve_link, resolve_tag};
use crate::editor::{confirm, edit_text};
use crate::metadata::fetch_metadata;
use crate::output::Output;

/// Options of `link add`
pub struct AddArgs {
    pub url: String,
    pub title: Option<String>,
    pub note: Option<String>,
    pub tags: Vec<String>,
    pub collection: Option<String>,
    pub fetch: bool,
}

/// Options of `link list`
pub struct ListArgs {
    pub status: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: u32,
    pub limit: Option<u32>,
}

/// Options of `link edit`; with none set the edit is interactive
#[derive(Default)]
pub struct EditArgs {
    pub title: Option<String>,
    pub description: Option<String>,
    pub note: Option<String>,
    pub edit_note: bool,
    pub status: Option<String>,
    pub favorite: Option<bool>,
    pub collection: Option<String>,
    pub no_collection: bool,
}

/// Save a new link, then fetch its page metadata
///
/// Missing tags are only created once the link itself was saved, so a bad or
/// duplicate URL leaves no new tags behind.
pub async fn add(vault: &Vault, session: &Session, args: AddArgs, output: &Output) -> Result<()> {
    session.require_user().context("Sign in with --user or `config set user_email`")?;
    normalize_url(args.url.trim())?;

    let mut new = NewLink::new(&args.url);
    if let Some(title) = args.title {
        new = new.with_title(title);
    }
    if let Some(note) = args.note {
        new = new.with_note(note);
    }

    let mut link = vault
        .links()
        .create_link(session, new)
        .context("Failed to create link")?;

    let tag_ids = tag_ids_creating_missing(vault, session, &args.tags)?;
    if !tag_ids.is_empty() {
        for tag_id in tag_ids {
            vault.links().add_tag_to_link(session, link.id, tag_id)?;
        }
        link = vault
            .links()
            .get_link(session, link.id)?
            .context("Link vanished after tagging")?;
    }

    if let Some(ref name) = args.collection {
        let collection = match vault.collections().find_collection_by_name(session, name)? {
            Some(c) => c,
            None => vault.collections().create_collection(session, name)?,
        };
        link = vault
            .links()
            .set_collection(session, link.id, Some(collection.id))?;
    }

    if args.fetch {
        link = refresh_metadata(vault, session, link.id, &link.url).await?;
    }

    output.success(&format!("Created link: {}", link.id));
    output.print_link(&link);
    Ok(())
}

/// List links with filters, sort and paging
pub fn list(vault: &Vault, session: &Session, args: ListArgs, output: &Output) -> Result<()> {
    let mut query = vault.default_query();
    query.page = args.page.max(1);
    if let Some(limit) = args.limit {
        if limit == 0 {
            bail!("--limit must be at least 1");
        }
        query.page_size = limit;
    }
    if let Some(ref status) = args.status {
        query.status = Some(status.parse::<LinkStatus>()?);
    }
    if let Some(ref sort) = args.sort {
        query.sort = sort.parse::<SortField>()?;
    }
    if let Some(ref tag) = args.tag {
        query.tag_id = Some(resolve_tag(vault, session, tag)?.id);
    }

    let page = match args.search {
        Some(ref text) => vault.search(session, &query, text)?,
        None => vault.links().list_links(session, &query)?,
    };

    output.print_link_page(&page);
    Ok(())
}

/// Show a single link
pub fn show(vault: &Vault, session: &Session, id: String, output: &Output) -> Result<()> {
    let link = resolve_link(vault, session, &id)?;
    output.print_link(&link);
    Ok(())
}

/// Edit a link
pub fn edit(
    vault: &Vault,
    session: &Session,
    id: String,
    args: EditArgs,
    output: &Output,
) -> Result<()> {
    let link = resolve_link(vault, session, &id)?;
    let links = vault.links();

    let mut update = LinkUpdate {
        title: args.title,
        description: args.description,
        note: args.note,
        favorite: args.favorite,
        status: args
            .status
            .as_deref()
            .map(|s| s.parse::<LinkStatus>())
            .transpose()?,
    };

    if args.edit_note {
        update.note = Some(edit_text(&link.note)?);
    }

    let collection_change = args.collection.is_some() || args.no_collection;
    if update.is_empty() && !collection_change {
        if !output.should_prompt() {
            bail!("Nothing to change. Pass --title, --note, --status or another field.");
        }

        println!("Editing link: {}", link.id);
        println!("Press Enter to keep current value, or type new value.\n");
        update.title = prompt_with_default("Title", &link.title)?;
        update.description = prompt_with_default("Description", &link.description)?;
        update.status = prompt_with_default("Status", link.status.as_str())?
            .map(|s| s.parse::<LinkStatus>())
            .transpose()?;
    }

    let mut updated = links
        .update_link(session, link.id, update)
        .context("Failed to update link")?;

    if args.no_collection {
        updated = links.set_collection(session, link.id, None)?;
    } else if let Some(ref name) = args.collection {
        let collection = resolve_collection(vault, session, name)?;
        updated = links.set_collection(session, link.id, Some(collection.id))?;
    }

    output.success("Link updated");
    output.print_link(&updated);
    Ok(())
}

/// Delete a link
pub fn delete(
    vault: &Vault,
    session: &Session,
    id: String,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let link = resolve_link(vault, session, &id)?;

    if !yes && output.should_prompt() {
        println!("Delete link: {} - {}", &link.id.to_string()[..8], link.url);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    vault
        .links()
        .delete_link(session, link.id)
        .context("Failed to delete link")?;

    output.success(&format!("Deleted link: {}", link.id));
    Ok(())
}

/// Attach tags by name; unknown names become new tags
pub fn tag(
    vault: &Vault,
    session: &Session,
    id: String,
    names: Vec<String>,
    output: &Output,
) -> Result<()> {
    let link = resolve_link(vault, session, &id)?;
    for tag_id in tag_ids_creating_missing(vault, session, &names)? {
        vault.links().add_tag_to_link(session, link.id, tag_id)?;
    }

    let link = resolve_link(vault, session, &link.id.to_string())?;
    output.success(&format!("Tagged link: {}", link.tag_names().join(", ")));
    Ok(())
}

pub fn untag(
    vault: &Vault,
    session: &Session,
    id: String,
    names: Vec<String>,
    output: &Output,
) -> Result<()> {
    let link = resolve_link(vault, session, &id)?;
    for name in &names {
        let tag = resolve_tag(vault, session, name)?;
        vault.links().remove_tag_from_link(session, link.id, tag.id)?;
    }

    output.success(&format!("Removed {} tag(s) from {}", names.len(), link.id));
    Ok(())
}

/// Open a link in the browser and record the visit
pub fn open(vault: &Vault, session: &Session, id: String, output: &Output) -> Result<()> {
    let link = resolve_link(vault, session, &id)?;

    ::open::that(&link.url).with_context(|| format!("Failed to open {}", link.url))?;
    vault.links().record_visit(session, link.id)?;

    output.success(&format!("Opened {}", link.url));
    Ok(())
}

/// Re-fetch page metadata for a link
pub async fn fetch(vault: &Vault, session: &Session, id: String, output: &Output) -> Result<()> {
    let link = resolve_link(vault, session, &id)?;
    let link = refresh_metadata(vault, session, link.id, &link.url).await?;

    output.success(&format!("Metadata {}", link.metadata_status));
    output.print_link(&link);
    Ok(())
}

/// Fetch metadata and store the outcome on the link; a failed fetch is
/// recorded, not returned
async fn refresh_metadata(
    vault: &Vault,
    session: &Session,
    link_id: Uuid,
    url: &str,
) -> Result<Link> {
    match fetch_metadata(url).await {
        Ok(metadata) => Ok(vault.links().apply_metadata(session, link_id, metadata)?),
        Err(e) => {
            warn!("Metadata fetch for {} failed: {:#}", url, e);
            Ok(vault
                .links()
                .mark_metadata_failed(session, link_id, &format!("{:#}", e))?)
        }
    }
}

fn tag_ids_creating_missing(
    vault: &Vault,
    session: &Session,
    names: &[String],
) -> Result<Vec<Uuid>> {
    let tags = vault.tags();
    let mut ids = Vec::with_capacity(names.len());
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let tag = match tags.find_tag_by_name(session, name)? {
            Some(tag) => tag,
            None => tags.create_tag(session, name, None)?,
        };
        if !ids.contains(&tag.id) {
            ids.push(tag.id);
        }
    }
    Ok(ids)
}

/// Prompt with a default value, returns None if user keeps default
fn prompt_with_default(prompt: &str, default: &str) -> Result<Option<String>> {
    use std::io::{self, Write};

    if default.is_empty() {
        print!("{}: ", prompt);
    } else {
        print!("{} [{}]: ", prompt, default);
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.is_empty() {
        Ok(None)
    } else {
        Ok(Some(input.to_string()))
    }
}
