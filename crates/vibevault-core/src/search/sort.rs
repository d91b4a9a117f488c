//! Descending sort for link lists

use std::cmp::Ordering;

use crate::models::{Link, SortField};

/// Sort links by `field`, largest first. The sort is stable.
pub fn sort_links(links: &mut [Link], field: SortField) {
    match field {
        SortField::CreatedAt => {
            links.sort_by_key(|l| std::cmp::Reverse(l.created_at.timestamp_millis()))
        }
        // A link never visited sorts as if visited at the epoch
        SortField::LastVisitedAt => links.sort_by_key(|l| {
            std::cmp::Reverse(l.last_visited_at.map_or(0, |t| t.timestamp_millis()))
        }),
        SortField::Domain => links.sort_by(|a, b| locale_cmp(&b.domain, &a.domain)),
        SortField::Title => links.sort_by(|a, b| locale_cmp(&b.title, &a.title)),
    }
}

/// Ascending collation: case-insensitive first, then lowercase before
/// uppercase. SQLite orders with the same function, see
/// `storage::database::LOCALE_COLLATION`.
pub(crate) fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}
