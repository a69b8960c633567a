//! Pure facet filtering over a fetched base set.
//!
//! Values within one facet combine with OR, the two facets combine with
//! AND, and an empty facet imposes no constraint. The filter is stable
//! (input order preserved) and idempotent, so it is safe to re-run on
//! every state change.

use crate::model::types::Book;

/// Apply the genre and author facets to `records`.
pub fn filter(records: &[Book], genres: &[String], authors: &[String]) -> Vec<Book> {
    records
        .iter()
        .filter(|book| {
            (genres.is_empty() || genres.iter().any(|g| *g == book.genre))
                && (authors.is_empty() || authors.iter().any(|a| *a == book.author))
        })
        .cloned()
        .collect()
}

/// Typeahead over the known distinct-author list: case-insensitive
/// substring match, recomputed on every keystroke. An empty input yields
/// no suggestions. Independent of the currently selected authors.
pub fn author_suggestions(known: &[String], typed: &str) -> Vec<String> {
    if typed.is_empty() {
        return Vec::new();
    }
    let needle = typed.to_lowercase();
    known
        .iter()
        .filter(|author| author.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
