//! `SQLite` backend: schema, pragmas, and the inventory CRUD surface.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::model::types::{Book, BookDraft};
use crate::storage::Catalog;

const SCHEMA_VERSION: i64 = 1;

/// Owned connection to the inventory database.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and ensure the
    /// schema is present.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating data dir {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let store = Self {
            conn,
            path: path.to_path_buf(),
        };
        store.migrate()?;
        info!(path = %store.path.display(), "opened inventory database");
        Ok(store)
    }

    /// In-memory database, used by tests and `--db :memory:`.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS inventory (
                 entry_id         INTEGER PRIMARY KEY AUTOINCREMENT,
                 title            TEXT NOT NULL,
                 author           TEXT NOT NULL,
                 genre            TEXT NOT NULL,
                 publication_date TEXT NOT NULL,
                 isbn             TEXT NOT NULL,
                 stock            INTEGER NOT NULL DEFAULT 0
             );
             CREATE INDEX IF NOT EXISTS idx_inventory_author ON inventory(author);
             CREATE INDEX IF NOT EXISTS idx_inventory_genre  ON inventory(genre);
             CREATE TABLE IF NOT EXISTS meta (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Escape hatch for tests and ad-hoc queries.
    pub fn raw(&self) -> &Connection {
        &self.conn
    }

    pub fn schema_version(&self) -> Result<i64> {
        let version: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        version
            .ok_or_else(|| anyhow!("meta table has no schema_version row"))?
            .parse()
            .context("schema_version is not an integer")
    }

    // -- mutation --------------------------------------------------------

    /// Insert a new record and return its assigned id. Field validation
    /// happens upstream; the store persists what it is given.
    pub fn insert(&self, draft: &BookDraft) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO inventory (title, author, genre, publication_date, isbn, stock)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    draft.title,
                    draft.author,
                    draft.genre,
                    draft.publication_date,
                    draft.isbn,
                    draft.stock
                ],
            )
            .context("inserting book")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Replace every field of an existing record except its id.
    pub fn update(&self, id: i64, draft: &BookDraft) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE inventory
                 SET title = ?1, author = ?2, genre = ?3,
                     publication_date = ?4, isbn = ?5, stock = ?6
                 WHERE entry_id = ?7",
                params![
                    draft.title,
                    draft.author,
                    draft.genre,
                    draft.publication_date,
                    draft.isbn,
                    draft.stock,
                    id
                ],
            )
            .context("updating book")?;
        if changed == 0 {
            return Err(anyhow!("no book with id {id}"));
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM inventory WHERE entry_id = ?1", params![id])
            .context("deleting book")?;
        if changed == 0 {
            return Err(anyhow!("no book with id {id}"));
        }
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<Option<Book>> {
        self.conn
            .query_row(
                "SELECT entry_id, title, author, genre, publication_date, isbn, stock
                 FROM inventory WHERE entry_id = ?1",
                params![id],
                row_to_book,
            )
            .optional()
            .context("fetching book")
    }

    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM inventory", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        genre: row.get(3)?,
        publication_date: row.get(4)?,
        isbn: row.get(5)?,
        stock: row.get(6)?,
    })
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl Catalog for SqliteStore {
    fn list_all(&self) -> Result<Vec<Book>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, title, author, genre, publication_date, isbn, stock
             FROM inventory ORDER BY entry_id",
        )?;
        let rows = stmt.query_map([], row_to_book)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("listing inventory")
    }

    fn search_by_prefix(&self, term: &str) -> Result<Vec<Book>> {
        // Trailing wildcard only: prefix match, not arbitrary substring.
        // SQLite LIKE is ASCII case-insensitive by default.
        let pattern = format!("{}%", escape_like(term));
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, title, author, genre, publication_date, isbn, stock
             FROM inventory
             WHERE title  LIKE ?1 ESCAPE '\\'
                OR author LIKE ?1 ESCAPE '\\'
                OR genre  LIKE ?1 ESCAPE '\\'
             ORDER BY entry_id",
        )?;
        let rows = stmt.query_map(params![pattern], row_to_book)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("searching inventory")
    }

    fn distinct_authors(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT author FROM inventory ORDER BY author")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("listing authors")
    }

    fn distinct_genres(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT genre FROM inventory ORDER BY genre")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("listing genres")
    }
}
