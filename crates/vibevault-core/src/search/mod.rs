//! Search & sort pipeline
//!
//! Pure functions over an in-memory list of links: a fuzzy filter followed
//! by a descending sort. Nothing here touches the store, and the input is
//! never modified.

mod fuzzy;
mod sort;

pub use fuzzy::{rank, Match};
pub(crate) use sort::locale_cmp;
pub use sort::sort_links;

use crate::models::{Link, SortField};

/// Tuning for the fuzzy filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Highest score a link may have and still match (0.0 is exact)
    pub threshold: f64,
    /// Characters of drift from the expected position that cost a full point
    pub distance: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            distance: 100,
        }
    }
}

/// Filter `links` by `query` and sort the result by `sort`, descending
///
/// A blank query keeps every link. Links with equal sort keys stay in match
/// order (best match first).
pub fn search_and_sort(
    links: &[Link],
    query: &str,
    sort: SortField,
    options: &SearchOptions,
) -> Vec<Link> {
    let mut result: Vec<Link> = if query.trim().is_empty() {
        links.to_vec()
    } else {
        rank(links, query, options)
            .into_iter()
            .map(|m| links[m.index].clone())
            .collect()
    };

    sort_links(&mut result, sort);
    result
}
