//! Export and import command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use vibevault_core::{Session, Vault};

use crate::output::Output;

/// Write the user's data as JSON; without a path, to
/// `vibevault-export-<date>.json` in the current directory
pub fn export(
    vault: &mut Vault,
    session: &Session,
    path: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let path = path.unwrap_or_else(default_export_path);
    let count = vault
        .export_to_file(session, &path)
        .with_context(|| format!("Failed to export to {}", path.display()))?;

    output.success(&format!("Exported {} link(s) to {}", count, path.display()));
    Ok(())
}

pub fn import(vault: &mut Vault, session: &Session, path: PathBuf, output: &Output) -> Result<()> {
    let report = vault
        .import_from_file(session, &path)
        .with_context(|| format!("Failed to import {}", path.display()))?;

    output.print_import_report(&report);
    Ok(())
}

fn default_export_path() -> PathBuf {
    PathBuf::from(format!(
        "vibevault-export-{}.json",
        Utc::now().format("%Y-%m-%d")
    ))
}
