//! Collection command handlers

use anyhow::{Context, Result};

use vibevault_core::{Session, Vault};

use super::resolve_collection;
use crate::editor::confirm;
use crate::output::Output;

pub fn list(vault: &Vault, session: &Session, output: &Output) -> Result<()> {
    let collections = vault.collections().list_collections(session)?;
    output.print_collections(&collections);
    Ok(())
}

pub fn add(vault: &Vault, session: &Session, name: String, output: &Output) -> Result<()> {
    let collection = vault
        .collections()
        .create_collection(session, &name)
        .context("Failed to create collection")?;

    output.success(&format!("Created collection: {}", collection.name));
    Ok(())
}

pub fn rename(
    vault: &Vault,
    session: &Session,
    name_or_id: String,
    new_name: String,
    output: &Output,
) -> Result<()> {
    let collection = resolve_collection(vault, session, &name_or_id)?;
    let renamed = vault
        .collections()
        .rename_collection(session, collection.id, &new_name)
        .context("Failed to rename collection")?;

    output.success(&format!("Renamed '{}' to '{}'", collection.name, renamed.name));
    Ok(())
}

/// Delete a collection; its links stay, without a collection
pub fn delete(
    vault: &Vault,
    session: &Session,
    name_or_id: String,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let collection = resolve_collection(vault, session, &name_or_id)?;

    if !yes && output.should_prompt() {
        println!("Delete collection '{}'? Its links are kept.", collection.name);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    vault
        .collections()
        .delete_collection(session, collection.id)?;
    output.success(&format!("Deleted collection: {}", collection.name));
    Ok(())
}
