//! Config command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use vibevault_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&Path>, output: &Output) -> Result<()> {
    let config = Config::load_with_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => output.json(&config),
        OutputFormat::Quiet => println!("{}", config.data_dir.display()),
        OutputFormat::Human => {
            let effective_path = effective_path(config_path);
            println!("Configuration:");
            println!("  data_dir:          {}", config.data_dir.display());
            println!(
                "  user_email:        {}",
                config.user_email.as_deref().unwrap_or("(not set)")
            );
            println!("  page_size:         {}", config.page_size);
            println!("  default_tag_color: {}", config.default_tag_color);
            println!("  search_threshold:  {}", config.search_threshold);
            println!("  search_distance:   {}", config.search_distance);
            println!(
                "  log_file:          {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value and save it where it was loaded from
pub fn set(key: String, value: String, config_path: Option<&Path>, output: &Output) -> Result<()> {
    let mut config =
        Config::load_with_override(config_path).context("Failed to load configuration")?;
    config.set_value(&key, &value)?;

    let save_path = effective_path(config_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn effective_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_file_path)
}
