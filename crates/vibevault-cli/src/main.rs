//! VibeVault CLI
//!
//! Command-line interface for VibeVault - save, tag, search and export links.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use vibevault_core::{Config, Session, Vault};

mod commands;
mod editor;
mod metadata;
mod output;

use commands::link::{AddArgs, EditArgs, ListArgs};
use output::{Output, OutputFormat};

/// Environment variable holding the log filter
const LOG_ENV: &str = "VIBEVAULT_LOG";

#[derive(Parser)]
#[command(name = "vibevault")]
#[command(about = "VibeVault - Save, tag and search your links")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Act as this user (defaults to `user_email` from the config)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage links
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: Option<TagCommands>,
    },
    /// Manage collections
    Collection {
        #[command(subcommand)]
        command: Option<CollectionCommands>,
    },
    /// Show links grouped by tag
    Graph,
    /// Export your links, tags and collections as JSON
    Export {
        /// Output file (defaults to vibevault-export-<date>.json)
        path: Option<PathBuf>,
    },
    /// Import a JSON export into your account
    Import {
        /// File to import
        path: PathBuf,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show the current user and counts
    Status,
}

#[derive(Subcommand)]
enum LinkCommands {
    /// Save a new link
    #[command(alias = "create")]
    Add {
        /// URL to save
        url: String,
        /// Title (otherwise taken from the page)
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Free-text note
        #[arg(short, long)]
        note: Option<String>,
        /// Tags to attach (created when missing)
        #[arg(short, long)]
        tag: Vec<String>,
        /// Collection to file the link into (created when missing)
        #[arg(short, long)]
        collection: Option<String>,
        /// Skip fetching page metadata
        #[arg(long)]
        no_fetch: bool,
    },
    /// List links
    #[command(alias = "ls")]
    List {
        /// Filter by status (inbox, reading, archived)
        #[arg(short, long)]
        status: Option<String>,
        /// Filter by tag name
        #[arg(short, long)]
        tag: Option<String>,
        /// Fuzzy search over title, url, description, note, site name and domain
        #[arg(long)]
        search: Option<String>,
        /// Sort by createdAt, lastVisitedAt, domain or title (always descending)
        #[arg(long)]
        sort: Option<String>,
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Links per page (defaults to `page_size` from the config)
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show link details
    Show {
        /// Link ID (full UUID or prefix)
        id: String,
    },
    /// Edit a link (interactive when no field is given)
    Edit {
        /// Link ID (full UUID or prefix)
        id: String,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, conflicts_with = "edit_note")]
        note: Option<String>,
        /// Edit the note in $EDITOR
        #[arg(long)]
        edit_note: bool,
        /// inbox, reading or archived
        #[arg(short, long)]
        status: Option<String>,
        #[arg(long, conflicts_with = "unfavorite")]
        favorite: bool,
        #[arg(long)]
        unfavorite: bool,
        /// Move to this collection
        #[arg(short, long, conflicts_with = "no_collection")]
        collection: Option<String>,
        /// Remove from its collection
        #[arg(long)]
        no_collection: bool,
    },
    /// Delete a link
    #[command(alias = "rm")]
    Delete {
        /// Link ID (full UUID or prefix)
        id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Attach tags to a link
    Tag {
        /// Link ID (full UUID or prefix)
        id: String,
        /// Tag names
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Detach tags from a link
    Untag {
        /// Link ID (full UUID or prefix)
        id: String,
        /// Tag names
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Open a link in the browser
    Open {
        /// Link ID (full UUID or prefix)
        id: String,
    },
    /// Re-fetch page metadata
    Fetch {
        /// Link ID (full UUID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// List tags with link counts
    #[command(alias = "ls")]
    List,
    /// Create a tag
    #[command(alias = "create")]
    Add {
        name: String,
        /// Hex color, e.g. #3b82f6
        #[arg(short, long)]
        color: Option<String>,
    },
    /// Rename or recolor a tag
    Edit {
        /// Tag name or ID prefix
        tag: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New color (the default color when omitted)
        #[arg(short, long)]
        color: Option<String>,
    },
    /// Delete a tag and detach it from every link
    #[command(alias = "rm")]
    Delete {
        /// Tag name or ID prefix
        tag: String,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CollectionCommands {
    /// List collections
    #[command(alias = "ls")]
    List,
    /// Create a collection
    #[command(alias = "create")]
    Add { name: String },
    /// Rename a collection
    Rename {
        /// Collection name or ID prefix
        collection: String,
        new_name: String,
    },
    /// Delete a collection (its links are kept)
    #[command(alias = "rm")]
    Delete {
        /// Collection name or ID prefix
        collection: String,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, user_email, page_size, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work even when the vault cannot be opened
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_deref(), &output);
    }

    let config = Config::load_with_override(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let user = cli.user.clone().or_else(|| config.user_email.clone());
    let mut vault = Vault::open_with_config(config)?;
    let session = vault.session_for(user.as_deref())?;
    debug!("Acting as {:?}", user);

    match cli.command {
        Commands::Link { command } => {
            handle_link_command(command, &vault, &session, &output).await
        }
        Commands::Tag { command } => handle_tag_command(command, &vault, &session, &output),
        Commands::Collection { command } => {
            handle_collection_command(command, &vault, &session, &output)
        }
        Commands::Graph => commands::graph::show(&vault, &session, &output),
        Commands::Export { path } => commands::transfer::export(&mut vault, &session, path, &output),
        Commands::Import { path } => commands::transfer::import(&mut vault, &session, path, &output),
        Commands::Status => commands::status::show(&vault, &session, user.as_deref(), &output),
        Commands::Config { .. } => Ok(()),
    }
}

async fn handle_link_command(
    command: LinkCommands,
    vault: &Vault,
    session: &Session,
    output: &Output,
) -> Result<()> {
    match command {
        LinkCommands::Add {
            url,
            title,
            note,
            tag,
            collection,
            no_fetch,
        } => {
            let args = AddArgs {
                url,
                title,
                note,
                tags: tag,
                collection,
                fetch: !no_fetch,
            };
            commands::link::add(vault, session, args, output).await
        }
        LinkCommands::List {
            status,
            tag,
            search,
            sort,
            page,
            limit,
        } => {
            let args = ListArgs {
                status,
                tag,
                search,
                sort,
                page,
                limit,
            };
            commands::link::list(vault, session, args, output)
        }
        LinkCommands::Show { id } => commands::link::show(vault, session, id, output),
        LinkCommands::Edit {
            id,
            title,
            description,
            note,
            edit_note,
            status,
            favorite,
            unfavorite,
            collection,
            no_collection,
        } => {
            let args = EditArgs {
                title,
                description,
                note,
                edit_note,
                status,
                favorite: match (favorite, unfavorite) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                collection,
                no_collection,
            };
            commands::link::edit(vault, session, id, args, output)
        }
        LinkCommands::Delete { id, yes } => commands::link::delete(vault, session, id, yes, output),
        LinkCommands::Tag { id, tags } => commands::link::tag(vault, session, id, tags, output),
        LinkCommands::Untag { id, tags } => commands::link::untag(vault, session, id, tags, output),
        LinkCommands::Open { id } => commands::link::open(vault, session, id, output),
        LinkCommands::Fetch { id } => commands::link::fetch(vault, session, id, output).await,
    }
}

fn handle_tag_command(
    command: Option<TagCommands>,
    vault: &Vault,
    session: &Session,
    output: &Output,
) -> Result<()> {
    match command {
        Some(TagCommands::List) | None => commands::tag::list(vault, session, output),
        Some(TagCommands::Add { name, color }) => {
            commands::tag::add(vault, session, name, color, output)
        }
        Some(TagCommands::Edit { tag, name, color }) => {
            commands::tag::edit(vault, session, tag, name, color, output)
        }
        Some(TagCommands::Delete { tag, yes }) => {
            commands::tag::delete(vault, session, tag, yes, output)
        }
    }
}

fn handle_collection_command(
    command: Option<CollectionCommands>,
    vault: &Vault,
    session: &Session,
    output: &Output,
) -> Result<()> {
    match command {
        Some(CollectionCommands::List) | None => commands::collection::list(vault, session, output),
        Some(CollectionCommands::Add { name }) => {
            commands::collection::add(vault, session, name, output)
        }
        Some(CollectionCommands::Rename {
            collection,
            new_name,
        }) => commands::collection::rename(vault, session, collection, new_name, output),
        Some(CollectionCommands::Delete { collection, yes }) => {
            commands::collection::delete(vault, session, collection, yes, output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&std::path::Path>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize tracing from `VIBEVAULT_LOG` (default `warn`), writing to the
/// configured log file or stderr
fn init_logging(config: &Config) {
    let level = std::env::var(LOG_ENV).unwrap_or_else(|_| "warn".to_string());
    let env_filter = if level.contains('=') {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(format!(
            "warn,vibevault_core={},vibevault={}",
            level, level
        ))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore errors if a subscriber is already set
    match config.log_file {
        Some(ref path) => {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => {
                    let _ = builder
                        .with_ansi(false)
                        .with_writer(Mutex::new(file))
                        .try_init();
                }
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                    let _ = builder.with_writer(std::io::stderr).try_init();
                }
            }
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
