//! Inventory entity structs and session filter state.

use serde::{Deserialize, Serialize};

/// Queries shorter than this are treated as empty for mode selection;
/// at this length and above the query goes to the server.
pub const MIN_QUERY_CHARS: usize = 3;

/// A catalogued book. `id` is assigned by the store and never changes;
/// every other field is replaced wholesale on edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    /// Calendar date in `YYYY-MM-DD` form.
    pub publication_date: String,
    /// ISBN-10 or ISBN-13 shape, no checksum enforcement.
    pub isbn: String,
    pub stock: i64,
}

/// Payload for add/edit: a [`Book`] before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publication_date: String,
    pub isbn: String,
    pub stock: i64,
}

impl BookDraft {
    pub fn into_book(self, id: i64) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            genre: self.genre,
            publication_date: self.publication_date,
            isbn: self.isbn,
            stock: self.stock,
        }
    }
}

/// Which source is authoritative for the displayed set. Exactly one mode
/// applies at any instant, derived from [`SearchState`] alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// No query past the threshold, no facets: show the full inventory.
    Unfiltered,
    /// Query at or past the threshold: server-side prefix search replaces
    /// the display. Takes priority over any facet selections.
    TextSearch,
    /// Facets selected, query below the threshold: post-filter the last
    /// unfiltered base set on the client side.
    FacetFiltered,
}

/// Session-scoped filter state. All mutation goes through the named
/// operations here; facet membership is case-sensitive exact match and
/// the selection vectors stay duplicate-free in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    query: String,
    genres: Vec<String>,
    authors: Vec<String>,
    author_typeahead: String,
}

impl SearchState {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn author_typeahead(&self) -> &str {
        &self.author_typeahead
    }

    pub fn set_query(&mut self, text: &str) {
        self.query = text.to_string();
    }

    pub fn set_author_typeahead(&mut self, text: &str) {
        self.author_typeahead = text.to_string();
    }

    /// Insert a genre; no-op when already selected.
    pub fn add_genre(&mut self, genre: &str) {
        if !self.genres.iter().any(|g| g == genre) {
            self.genres.push(genre.to_string());
        }
    }

    /// Remove a genre; no-op when absent.
    pub fn remove_genre(&mut self, genre: &str) {
        self.genres.retain(|g| g != genre);
    }

    /// Insert an author; no-op when already selected.
    pub fn add_author(&mut self, author: &str) {
        if !self.authors.iter().any(|a| a == author) {
            self.authors.push(author.to_string());
        }
    }

    /// Remove an author; no-op when absent.
    pub fn remove_author(&mut self, author: &str) {
        self.authors.retain(|a| a != author);
    }

    /// Drop every facet selection and the in-progress typeahead text.
    /// The query text is left alone.
    pub fn clear_filters(&mut self) {
        self.genres.clear();
        self.authors.clear();
        self.author_typeahead.clear();
    }

    pub fn has_facets(&self) -> bool {
        !self.genres.is_empty() || !self.authors.is_empty()
    }

    /// Whether the query is long enough to go to the server.
    pub fn query_active(&self) -> bool {
        self.query.chars().count() >= MIN_QUERY_CHARS
    }

    /// Derive the active display mode. Level-triggered: recomputed from
    /// current values, never from the event that got us here.
    pub fn mode(&self) -> DisplayMode {
        if self.query_active() {
            DisplayMode::TextSearch
        } else if self.has_facets() {
            DisplayMode::FacetFiltered
        } else {
            DisplayMode::Unfiltered
        }
    }
}
