//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use vibevault_core::graph::link_label;
use vibevault_core::{Collection, ImportReport, Link, LinkPage, TagGraph, TagWithCount, VaultStats};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        }
    }

    /// Print a single link with all its fields
    pub fn print_link(&self, link: &Link) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", link.id);
                println!("Title:       {}", link_label(link));
                println!("URL:         {}", link.url);
                println!("Domain:      {}", link.domain);
                if !link.description.is_empty() {
                    println!("Description: {}", truncate_line(&link.description, 70));
                }
                if let Some(ref site) = link.site_name {
                    println!("Site:        {}", site);
                }
                println!(
                    "Status:      {}{}",
                    link.status,
                    if link.favorite { " ★" } else { "" }
                );
                if !link.tags.is_empty() {
                    println!("Tags:        {}", link.tag_names().join(", "));
                }
                println!("Metadata:    {}", link.metadata_status);
                if let Some(ref error) = link.metadata_error {
                    println!("  Error:     {}", error);
                }
                println!("Created:     {}", link.created_at.format("%Y-%m-%d %H:%M"));
                if let Some(visited) = link.last_visited_at {
                    println!("Visited:     {}", visited.format("%Y-%m-%d %H:%M"));
                }
                if !link.note.is_empty() {
                    println!();
                    println!("── Note ──");
                    println!("{}", link.note);
                }
            }
            OutputFormat::Json => self.json(link),
            OutputFormat::Quiet => println!("{}", link.id),
        }
    }

    /// Print one page of a link listing
    pub fn print_link_page(&self, page: &LinkPage) {
        match self.format {
            OutputFormat::Human => {
                if page.items.is_empty() {
                    println!("No links found.");
                    return;
                }
                for link in &page.items {
                    let tags = if link.tags.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", link.tag_names().join(", "))
                    };
                    println!(
                        "{} | {:<8} | {}{} | {}",
                        short_id(&link.id.to_string()),
                        link.status.as_str(),
                        truncate(link_label(link), 35),
                        tags,
                        truncate(&link.url, 45)
                    );
                }
                let pages = page.total.div_ceil(u64::from(page.page_size.max(1)));
                println!(
                    "\n{} link(s), page {} of {}",
                    page.total,
                    page.page,
                    pages.max(1)
                );
            }
            OutputFormat::Json => self.json(page),
            OutputFormat::Quiet => {
                for link in &page.items {
                    println!("{}", link.id);
                }
            }
        }
    }

    /// Print tags with usage counts
    pub fn print_tags(&self, tags: &[TagWithCount]) {
        match self.format {
            OutputFormat::Human => {
                if tags.is_empty() {
                    println!("No tags found.");
                    return;
                }
                for entry in tags {
                    println!(
                        "{} | {} {} ({})",
                        short_id(&entry.tag.id.to_string()),
                        entry.tag.color,
                        entry.tag.name,
                        entry.link_count
                    );
                }
                println!("\n{} tag(s)", tags.len());
            }
            OutputFormat::Json => self.json(tags),
            OutputFormat::Quiet => {
                for entry in tags {
                    println!("{}", entry.tag.name);
                }
            }
        }
    }

    pub fn print_collections(&self, collections: &[Collection]) {
        match self.format {
            OutputFormat::Human => {
                if collections.is_empty() {
                    println!("No collections found.");
                    return;
                }
                for collection in collections {
                    println!(
                        "{} | {}",
                        short_id(&collection.id.to_string()),
                        collection.name
                    );
                }
                println!("\n{} collection(s)", collections.len());
            }
            OutputFormat::Json => self.json(collections),
            OutputFormat::Quiet => {
                for collection in collections {
                    println!("{}", collection.name);
                }
            }
        }
    }

    pub fn print_import_report(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                println!("Import complete:");
                println!("  Links: {} imported, {} skipped", report.imported_links, report.skipped_links);
                println!("  Tags:  {} imported, {} skipped", report.imported_tags, report.skipped_tags);
            }
            OutputFormat::Json => self.json(report),
            OutputFormat::Quiet => println!("{}", report.imported_links),
        }
    }

    pub fn print_stats(&self, stats: &VaultStats) {
        match self.format {
            OutputFormat::Human => {
                println!("Links:       {}", stats.links);
                println!("  Inbox:     {}", stats.inbox);
                println!("  Reading:   {}", stats.reading);
                println!("  Archived:  {}", stats.archived);
                println!("  Favorites: {}", stats.favorites);
                println!("Tags:        {}", stats.tags);
                println!("Collections: {}", stats.collections);
            }
            OutputFormat::Json => self.json(stats),
            OutputFormat::Quiet => println!("{}", stats.links),
        }
    }

    /// Print the tag graph as an indented tree (human) or nodes and edges (JSON)
    pub fn print_graph(&self, graph: &TagGraph, links: &[Link]) {
        match self.format {
            OutputFormat::Human => {
                if graph.groups.is_empty() {
                    println!("No links to graph.");
                    return;
                }
                for group in &graph.groups {
                    println!("● {} ({})", group.name, group.link_ids.len());
                    for link_id in &group.link_ids {
                        if let Some(link) = links.iter().find(|l| l.id == *link_id) {
                            println!("  └─ {}", truncate(link_label(link), 60));
                        }
                    }
                }
            }
            OutputFormat::Json => self.json(graph),
            OutputFormat::Quiet => {
                for group in &graph.groups {
                    println!("{}\t{}", group.name, group.link_ids.len());
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
