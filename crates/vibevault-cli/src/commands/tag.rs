//! Tag command handlers

use anyhow::{Context, Result};

use vibevault_core::{Session, Vault};

use super::resolve_tag;
use crate::editor::confirm;
use crate::output::Output;

/// List all tags with usage counts
pub fn list(vault: &Vault, session: &Session, output: &Output) -> Result<()> {
    let tags = vault.tags().list_tags(session)?;
    output.print_tags(&tags);
    Ok(())
}

pub fn add(
    vault: &Vault,
    session: &Session,
    name: String,
    color: Option<String>,
    output: &Output,
) -> Result<()> {
    let tag = vault
        .tags()
        .create_tag(session, &name, color.as_deref())
        .context("Failed to create tag")?;

    if output.is_json() {
        output.json(&tag);
    } else {
        output.success(&format!("Created tag: {} ({})", tag.name, tag.color));
    }
    Ok(())
}

/// Rename and recolor a tag; the name is kept when `new_name` is absent
pub fn edit(
    vault: &Vault,
    session: &Session,
    name_or_id: String,
    new_name: Option<String>,
    color: Option<String>,
    output: &Output,
) -> Result<()> {
    let tag = resolve_tag(vault, session, &name_or_id)?;
    let name = new_name.unwrap_or_else(|| tag.name.clone());

    let updated = vault
        .tags()
        .update_tag(session, tag.id, &name, color.as_deref())
        .context("Failed to update tag")?;

    output.success(&format!("Updated tag: {} ({})", updated.name, updated.color));
    Ok(())
}

pub fn delete(
    vault: &Vault,
    session: &Session,
    name_or_id: String,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let tag = resolve_tag(vault, session, &name_or_id)?;

    if !yes && output.should_prompt() {
        println!("Delete tag '{}'? It will be removed from every link.", tag.name);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    vault.tags().delete_tag(session, tag.id)?;
    output.success(&format!("Deleted tag: {}", tag.name));
    Ok(())
}
