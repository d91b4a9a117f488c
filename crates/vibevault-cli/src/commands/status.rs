//! Status command handler

use anyhow::Result;

use vibevault_core::{Session, Vault};

use crate::output::{Output, OutputFormat};

/// Show the signed-in user, storage location and counts
pub fn show(vault: &Vault, session: &Session, user: Option<&str>, output: &Output) -> Result<()> {
    let stats = vault.stats(session)?;
    let config = vault.config();
    let database = config.sqlite_path();

    match output.format {
        OutputFormat::Json => {
            output.json(&serde_json::json!({
                "user": user,
                "database": database,
                "counts": stats,
            }));
        }
        OutputFormat::Quiet => output.print_stats(&stats),
        OutputFormat::Human => {
            println!("VibeVault Status");
            println!("================");
            println!();
            println!("User:     {}", user.unwrap_or("(anonymous)"));
            println!("Database: {}", database.display());
            if let Ok(meta) = std::fs::metadata(&database) {
                println!("Size:     {}", human_size(meta.len()));
            }
            println!();
            output.print_stats(&stats);
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
