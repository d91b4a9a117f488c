//! URL metadata fetching
//!
//! Fetches title, description, preview image, favicon, site name and
//! publication time for a saved link.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use url::Url;

use vibevault_core::LinkMetadata;

/// Fetch timeout in seconds
const FETCH_TIMEOUT: u64 = 10;

/// Fetch and parse metadata for `url`
///
/// Unlike a best-effort fetch, failures are returned so the caller can
/// record them on the link.
pub async fn fetch_metadata(url: &str) -> Result<LinkMetadata> {
    let base = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT))
        .user_agent("Mozilla/5.0 (compatible; VibeVault/1.0)")
        .build()?;

    let response = client
        .get(base.as_str())
        .send()
        .await
        .context("Request failed")?;

    if !response.status().is_success() {
        bail!("Server responded with {}", response.status());
    }

    let html = response.text().await.context("Failed to read response body")?;
    Ok(parse_metadata(&html, &base))
}

/// Parse metadata from HTML content; relative image and icon URLs are
/// resolved against `base`
fn parse_metadata(html: &str, base: &Url) -> LinkMetadata {
    let document = Html::parse_document(html);

    LinkMetadata {
        title: extract_title(&document),
        description: extract_description(&document),
        og_image: extract_meta_content(&document, "og:image")
            .or_else(|| extract_meta_content(&document, "twitter:image"))
            .and_then(|href| resolve(base, &href)),
        favicon: extract_favicon(&document, base),
        site_name: extract_meta_content(&document, "og:site_name"),
        published_time: extract_meta_content(&document, "article:published_time")
            .and_then(|value| parse_time(&value)),
    }
}

/// Extract title from HTML
fn extract_title(document: &Html) -> Option<String> {
    if let Some(og_title) = extract_meta_content(document, "og:title") {
        return Some(og_title);
    }
    if let Some(twitter_title) = extract_meta_content(document, "twitter:title") {
        return Some(twitter_title);
    }

    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extract description from HTML
fn extract_description(document: &Html) -> Option<String> {
    extract_meta_content(document, "og:description")
        .or_else(|| extract_meta_content(document, "twitter:description"))
        .or_else(|| extract_meta_content(document, "description"))
}

/// First `<link rel="icon">`-like element, else `/favicon.ico` on the host
fn extract_favicon(document: &Html, base: &Url) -> Option<String> {
    let selector = Selector::parse("link[rel]").ok()?;
    let declared = document.select(&selector).find_map(|el| {
        let rel = el.value().attr("rel")?.to_ascii_lowercase();
        if rel.split_whitespace().any(|r| r == "icon") {
            el.value().attr("href").map(str::trim)
        } else {
            None
        }
    });

    match declared {
        Some(href) if !href.is_empty() => resolve(base, href),
        _ => resolve(base, "/favicon.ico"),
    }
}

/// Extract content from a meta tag by property or name
fn extract_meta_content(document: &Html, property: &str) -> Option<String> {
    ["property", "name"].iter().find_map(|attr| {
        let selector = Selector::parse(&format!(r#"meta[{}="{}"]"#, attr, property)).ok()?;
        document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|u| u.to_string())
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
