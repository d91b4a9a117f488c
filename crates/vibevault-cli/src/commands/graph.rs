//! Graph command handler

use anyhow::Result;

use vibevault_core::{Session, Vault};

use super::all_links;
use crate::output::Output;

/// Print the tag graph of the newest links
pub fn show(vault: &Vault, session: &Session, output: &Output) -> Result<()> {
    let graph = vault.graph(session)?;
    let links = if output.is_json() || output.is_quiet() {
        Vec::new()
    } else {
        all_links(vault, session)?
    };

    output.print_graph(&graph, &links);
    Ok(())
}
