//! Decides which data-acquisition mode is active and keeps the displayed
//! set consistent with the session's filter state.
//!
//! Three mutually exclusive modes (see [`DisplayMode`]): the full list,
//! server-side prefix search, and client-side facet filtering of the last
//! unfiltered base set. Every event re-derives the mode from current
//! values and either recomputes the display synchronously or asks the
//! caller to perform a fetch.
//!
//! Fetches are decoupled from I/O: event methods return an optional
//! [`FetchRequest`] carrying a monotonically increasing token, the caller
//! runs it against a [`Catalog`], and feeds the outcome back through
//! [`SearchCoordinator::apply_fetch`]. Only the most recently issued
//! token is ever applied, so a response that arrives after a newer fetch
//! was triggered is dropped regardless of arrival order.

use anyhow::Result;
use tracing::{debug, warn};

use crate::model::types::{Book, DisplayMode, SearchState};
use crate::session::facet;
use crate::storage::Catalog;

/// What the caller should fetch on the coordinator's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchKind {
    /// Full inventory; becomes the base set for facet filtering.
    ListAll,
    /// Server-side prefix search; the result replaces the display.
    SearchByPrefix(String),
}

/// A single outstanding fetch. The token identifies the newest request;
/// anything older is stale by definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub token: u64,
    pub kind: FetchKind,
}

/// Source of the currently displayed set, used to suppress duplicate
/// fetches when an event re-enters the same mode with the same inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Provenance {
    FullList,
    Search(String),
    Facets,
}

pub struct SearchCoordinator {
    state: SearchState,
    /// Last successfully fetched unfiltered inventory.
    base: Option<Vec<Book>>,
    displayed: Vec<Book>,
    loading: bool,
    next_token: u64,
    pending: Option<FetchRequest>,
    shown: Option<Provenance>,
    known_authors: Vec<String>,
    suggestions: Vec<String>,
}

impl Default for SearchCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchCoordinator {
    pub fn new() -> Self {
        Self {
            state: SearchState::default(),
            base: None,
            displayed: Vec::new(),
            loading: false,
            next_token: 0,
            pending: None,
            shown: None,
            known_authors: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn mode(&self) -> DisplayMode {
        self.state.mode()
    }

    /// The current result set. Derived, never mutated directly.
    pub fn displayed(&self) -> &[Book] {
        &self.displayed
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Current author typeahead suggestions.
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Provide the distinct-author list the typeahead matches against.
    pub fn set_known_authors(&mut self, authors: Vec<String>) {
        self.known_authors = authors;
    }

    // -- UI event surface ------------------------------------------------

    #[must_use]
    pub fn on_query_change(&mut self, text: &str) -> Option<FetchRequest> {
        self.state.set_query(text);
        self.evaluate()
    }

    #[must_use]
    pub fn on_genre_select(&mut self, genre: &str) -> Option<FetchRequest> {
        self.state.add_genre(genre);
        self.evaluate()
    }

    #[must_use]
    pub fn on_genre_remove(&mut self, genre: &str) -> Option<FetchRequest> {
        self.state.remove_genre(genre);
        self.evaluate()
    }

    /// Keystroke in the author filter box. Recomputes suggestions only;
    /// nothing is committed to the selection and no fetch is needed.
    pub fn on_author_typeahead(&mut self, text: &str) {
        self.state.set_author_typeahead(text);
        self.suggestions = facet::author_suggestions(&self.known_authors, text);
    }

    /// Commit a suggestion: select the author, clear the typeahead text
    /// and the suggestion list, then re-evaluate.
    #[must_use]
    pub fn on_author_select(&mut self, author: &str) -> Option<FetchRequest> {
        self.state.add_author(author);
        self.state.set_author_typeahead("");
        self.suggestions.clear();
        self.evaluate()
    }

    #[must_use]
    pub fn on_author_remove(&mut self, author: &str) -> Option<FetchRequest> {
        self.state.remove_author(author);
        self.evaluate()
    }

    #[must_use]
    pub fn on_clear_filters(&mut self) -> Option<FetchRequest> {
        self.state.clear_filters();
        self.suggestions.clear();
        self.evaluate()
    }

    /// Re-run the current mode's action without changing any input.
    /// Used for the initial load and after a reported fetch failure.
    #[must_use]
    pub fn refresh(&mut self) -> Option<FetchRequest> {
        self.evaluate()
    }

    // -- mode evaluation -------------------------------------------------

    /// Level-triggered re-evaluation: derive the mode from current state
    /// and run its action. Returns a fetch request when the display needs
    /// data the coordinator does not hold.
    fn evaluate(&mut self) -> Option<FetchRequest> {
        match self.state.mode() {
            DisplayMode::TextSearch => {
                let term = self.state.query().to_string();
                self.request(FetchKind::SearchByPrefix(term))
            }
            DisplayMode::Unfiltered => self.request(FetchKind::ListAll),
            DisplayMode::FacetFiltered => match &self.base {
                Some(base) => {
                    self.displayed =
                        facet::filter(base, self.state.genres(), self.state.authors());
                    self.shown = Some(Provenance::Facets);
                    // A display derived synchronously supersedes whatever
                    // fetch was in flight.
                    self.pending = None;
                    self.loading = false;
                    None
                }
                None => self.request(FetchKind::ListAll),
            },
        }
    }

    /// Issue `kind` unless an identical fetch is already outstanding or
    /// the display already came from those exact inputs.
    fn request(&mut self, kind: FetchKind) -> Option<FetchRequest> {
        if let Some(pending) = &self.pending {
            if pending.kind == kind {
                return None;
            }
        } else {
            let satisfied = match (&kind, &self.shown) {
                (FetchKind::ListAll, Some(Provenance::FullList)) => true,
                (FetchKind::SearchByPrefix(term), Some(Provenance::Search(shown))) => {
                    term == shown
                }
                _ => false,
            };
            if satisfied {
                return None;
            }
        }

        self.next_token += 1;
        let request = FetchRequest {
            token: self.next_token,
            kind,
        };
        debug!(token = request.token, kind = ?request.kind, "issuing fetch");
        self.pending = Some(request.clone());
        self.loading = true;
        Some(request)
    }

    // -- fetch completion ------------------------------------------------

    /// Feed back the outcome of a fetch. Results for any token other than
    /// the most recently issued one are discarded; a failure keeps the
    /// previous display in place and clears the loading indicator.
    pub fn apply_fetch(&mut self, token: u64, result: Result<Vec<Book>>) {
        let kind = match &self.pending {
            Some(pending) if pending.token == token => pending.kind.clone(),
            _ => {
                debug!(token, "discarding stale fetch result");
                return;
            }
        };
        self.pending = None;
        self.loading = false;

        let books = match result {
            Ok(books) => books,
            Err(err) => {
                warn!(token, error = %err, "fetch failed; keeping previous display");
                return;
            }
        };

        match kind {
            FetchKind::SearchByPrefix(term) => {
                self.displayed = books;
                self.shown = Some(Provenance::Search(term));
            }
            FetchKind::ListAll => {
                // The list may serve either Unfiltered or FacetFiltered,
                // depending on where the state sits now.
                if self.state.mode() == DisplayMode::FacetFiltered {
                    self.displayed =
                        facet::filter(&books, self.state.genres(), self.state.authors());
                    self.shown = Some(Provenance::Facets);
                } else {
                    self.displayed = books.clone();
                    self.shown = Some(Provenance::FullList);
                }
                self.base = Some(books);
            }
        }
    }

    /// Perform an issued fetch synchronously against `catalog` and apply
    /// the outcome. Convenience for single-threaded drivers (CLI, tests).
    pub fn execute<C: Catalog>(&mut self, request: FetchRequest, catalog: &C) {
        let result = match &request.kind {
            FetchKind::ListAll => catalog.list_all(),
            FetchKind::SearchByPrefix(term) => catalog.search_by_prefix(term),
        };
        self.apply_fetch(request.token, result);
    }

    /// Execute a plan if one was issued.
    pub fn drive<C: Catalog>(&mut self, plan: Option<FetchRequest>, catalog: &C) {
        if let Some(request) = plan {
            self.execute(request, catalog);
        }
    }
}
