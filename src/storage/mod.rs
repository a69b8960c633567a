pub mod sqlite;

use anyhow::Result;

use crate::model::types::Book;

/// Read side of the inventory store, as consumed by the browse session.
/// Kept separate from the mutation API so session logic can be exercised
/// against a fake in tests.
pub trait Catalog {
    /// Full unfiltered inventory, in insertion order.
    fn list_all(&self) -> Result<Vec<Book>>;

    /// Records whose title, author, or genre *starts with* `term`,
    /// case-insensitively. Callers guarantee a non-empty term; the
    /// minimum-length gating lives in the session layer.
    fn search_by_prefix(&self, term: &str) -> Result<Vec<Book>>;

    fn distinct_authors(&self) -> Result<Vec<String>>;

    fn distinct_genres(&self) -> Result<Vec<String>>;
}
