//! Approximate token matching
//!
//! Each query token is located in a field with an approximate substring
//! search (edit distance, any start position). A token's score combines the
//! error rate with how far the match drifted from where it was expected:
//!
//! `score = errors / token_len + |start - expected| / distance`
//!
//! The first token is expected at position 0; each later token right after
//! the previous match. Scores range from 0.0 (exact, in place) upwards; a
//! token scoring above the threshold does not match at all.

use crate::models::Link;

use super::SearchOptions;

/// Added when a token is found before the end of the previous one
const ORDER_PENALTY: f64 = 0.1;

/// Added when tokens are matched across different fields
const CROSS_FIELD_PENALTY: f64 = 0.1;

/// A link that matched, by position in the input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub index: usize,
    pub score: f64,
}

/// Score every link against `query` and keep those within the threshold,
/// best first; equal scores keep input order
pub fn rank(links: &[Link], query: &str, options: &SearchOptions) -> Vec<Match> {
    let tokens: Vec<Vec<char>> = query
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.chars().collect())
        .collect();
    if tokens.is_empty() {
        return (0..links.len())
            .map(|index| Match { index, score: 0.0 })
            .collect();
    }

    let mut matches: Vec<Match> = links
        .iter()
        .enumerate()
        .filter_map(|(index, link)| {
            score_link(link, &tokens, options)
                .filter(|score| *score <= options.threshold)
                .map(|score| Match { index, score })
        })
        .collect();

    matches.sort_by(|a, b| a.score.total_cmp(&b.score));
    matches
}

fn score_link(link: &Link, tokens: &[Vec<char>], options: &SearchOptions) -> Option<f64> {
    let fields: Vec<Vec<char>> = link
        .searchable_fields()
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| f.to_lowercase().chars().collect())
        .collect();
    if fields.is_empty() {
        return None;
    }

    let in_field = fields
        .iter()
        .filter_map(|field| score_field(field, tokens, options))
        .min_by(f64::total_cmp);

    let across = if tokens.len() > 1 {
        score_across_fields(&fields, tokens, options)
    } else {
        None
    };

    match (in_field, across) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// All tokens in one field, in order
fn score_field(field: &[char], tokens: &[Vec<char>], options: &SearchOptions) -> Option<f64> {
    let mut expected = 0;
    let mut previous_end: Option<usize> = None;
    let mut total = 0.0;
    let mut penalty = 0.0;

    for token in tokens {
        let found = best_match(token, field, expected, options)?;
        if previous_end.is_some_and(|end| found.start < end) {
            penalty += ORDER_PENALTY;
        }
        total += found.score;
        expected = found.end;
        previous_end = Some(found.end);
    }

    Some(total / tokens.len() as f64 + penalty)
}

/// Each token in whichever field suits it best
fn score_across_fields(
    fields: &[Vec<char>],
    tokens: &[Vec<char>],
    options: &SearchOptions,
) -> Option<f64> {
    let mut total = 0.0;
    for token in tokens {
        let best = fields
            .iter()
            .filter_map(|field| best_match(token, field, 0, options))
            .map(|m| m.score)
            .min_by(f64::total_cmp)?;
        total += best;
    }
    Some(total / tokens.len() as f64 + CROSS_FIELD_PENALTY)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TokenMatch {
    score: f64,
    start: usize,
    end: usize,
}

/// Lowest-scoring approximate occurrence of `pattern` in `text`, if any
/// clears the threshold
///
/// Sellers' dynamic program: a column per text position holding the edit
/// distance of the best alignment of each pattern prefix ending there, with
/// free leading text. The start of each alignment rides along so the
/// location term can be computed.
fn best_match(
    pattern: &[char],
    text: &[char],
    expected: usize,
    options: &SearchOptions,
) -> Option<TokenMatch> {
    let m = pattern.len();
    if m == 0 || text.is_empty() {
        return None;
    }
    let distance = options.distance.max(1) as f64;

    // (errors, start) for pattern prefixes 0..=m at the previous column
    let mut prev: Vec<(usize, usize)> = (0..=m).map(|i| (i, 0)).collect();
    let mut cur = prev.clone();
    let mut best: Option<TokenMatch> = None;

    for (j, &c) in text.iter().enumerate() {
        cur[0] = (0, j + 1);
        for i in 1..=m {
            let cost = usize::from(pattern[i - 1] != c);
            let diagonal = (prev[i - 1].0 + cost, prev[i - 1].1);
            let skip_pattern = (cur[i - 1].0 + 1, cur[i - 1].1);
            let skip_text = (prev[i].0 + 1, prev[i].1);

            cur[i] = diagonal;
            if skip_pattern.0 < cur[i].0 {
                cur[i] = skip_pattern;
            }
            if skip_text.0 < cur[i].0 {
                cur[i] = skip_text;
            }
        }

        let (errors, start) = cur[m];
        let score = errors as f64 / m as f64 + start.abs_diff(expected) as f64 / distance;
        if score <= options.threshold && best.map_or(true, |b| score < b.score) {
            best = Some(TokenMatch {
                score,
                start,
                end: j + 1,
            });
        }

        std::mem::swap(&mut prev, &mut cur);
    }

    best
}
