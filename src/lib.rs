pub mod daemon;
pub mod export;
pub mod model;
pub mod session;
pub mod storage;
pub mod validate;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::daemon::{DaemonConfig, InventoryDaemon};
use crate::export::ExportFormat;
use crate::model::types::{Book, BookDraft};
use crate::session::SearchCoordinator;
use crate::storage::sqlite::SqliteStore;
use crate::storage::Catalog;
use crate::validate::validate_book;

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "bookstation",
    version,
    about = "Book inventory with prefix search and facet filtering"
)]
pub struct Cli {
    /// Path to the SQLite database (defaults to platform data dir)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Args, Debug)]
pub struct DraftArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub author: String,

    #[arg(long)]
    pub genre: String,

    /// Publication date, YYYY-MM-DD
    #[arg(long)]
    pub publication_date: String,

    /// ISBN-10 or ISBN-13
    #[arg(long)]
    pub isbn: String,

    /// Copies in stock (non-negative)
    #[arg(long, default_value_t = 0)]
    pub stock: i64,
}

impl DraftArgs {
    fn into_draft(self) -> BookDraft {
        BookDraft {
            title: self.title,
            author: self.author,
            genre: self.genre,
            publication_date: self.publication_date,
            isbn: self.isbn,
            stock: self.stock,
        }
    }
}

/// Filter flags shared by `query` and `export`: they describe the same
/// displayed set.
#[derive(clap::Args, Debug)]
pub struct FilterArgs {
    /// Search text; goes to the server once it reaches 3 characters
    #[arg(long, default_value = "")]
    pub query: String,

    /// Genre facet value (repeatable, OR within the facet)
    #[arg(long = "genre")]
    pub genres: Vec<String>,

    /// Author facet value (repeatable, OR within the facet)
    #[arg(long = "author")]
    pub authors: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the inventory daemon
    Serve {
        /// Socket path (defaults to /tmp/bookstation-$USER.sock)
        #[arg(long)]
        socket: Option<PathBuf>,
    },
    /// Add a book
    Add {
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Replace every field of an existing book
    Edit {
        #[arg(long)]
        id: i64,

        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Delete a book
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// Print the full inventory
    List,
    /// Run a browse session: search text plus facet filters
    Query {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Export the displayed set as JSON or CSV
    Export {
        #[arg(long, value_enum)]
        format: ExportFormat,

        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate man page to stdout
    Man,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { socket } => run_serve(cli.db, socket),
        Commands::Add { draft } => run_add(cli.db, draft.into_draft()),
        Commands::Edit { id, draft } => run_edit(cli.db, id, draft.into_draft()),
        Commands::Delete { id } => run_delete(cli.db, id),
        Commands::List => run_list(cli.db),
        Commands::Query { filters } => run_query(cli.db, &filters),
        Commands::Export {
            format,
            output,
            filters,
        } => run_export(cli.db, format, output, &filters),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "bookstation", &mut std::io::stdout());
            Ok(())
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            let mut out = std::io::stdout();
            man.render(&mut out)?;
            Ok(())
        }
    }
}

fn open_store(db_override: Option<PathBuf>) -> Result<SqliteStore> {
    let path = db_override.unwrap_or_else(default_db_path);
    SqliteStore::open(&path)
}

fn run_serve(db_override: Option<PathBuf>, socket: Option<PathBuf>) -> Result<()> {
    let store = open_store(db_override)?;
    let mut config = DaemonConfig::from_env();
    if let Some(path) = socket {
        config.socket_path = path;
    }
    let daemon = InventoryDaemon::new(config, store);
    daemon.run().context("running inventory daemon")
}

fn run_add(db_override: Option<PathBuf>, draft: BookDraft) -> Result<()> {
    validate_book(&draft).map_err(|reason| anyhow::anyhow!("{reason}"))?;
    let store = open_store(db_override)?;
    let id = store.insert(&draft)?;
    println!("added book {id}");
    Ok(())
}

fn run_edit(db_override: Option<PathBuf>, id: i64, draft: BookDraft) -> Result<()> {
    validate_book(&draft).map_err(|reason| anyhow::anyhow!("{reason}"))?;
    let store = open_store(db_override)?;
    store.update(id, &draft)?;
    println!("updated book {id}");
    Ok(())
}

fn run_delete(db_override: Option<PathBuf>, id: i64) -> Result<()> {
    let store = open_store(db_override)?;
    store.delete(id)?;
    println!("deleted book {id}");
    Ok(())
}

fn run_list(db_override: Option<PathBuf>) -> Result<()> {
    let store = open_store(db_override)?;
    print_books(&store.list_all()?);
    Ok(())
}

/// Drive a full browse session against the store: initial load, then the
/// query text and each facet selection as individual events, exactly as
/// the interactive UI would deliver them.
fn displayed_set(store: &SqliteStore, filters: &FilterArgs) -> Result<Vec<Book>> {
    let mut coord = SearchCoordinator::new();
    coord.set_known_authors(store.distinct_authors()?);

    let plan = coord.refresh();
    coord.drive(plan, store);
    let plan = coord.on_query_change(&filters.query);
    coord.drive(plan, store);
    for genre in &filters.genres {
        let plan = coord.on_genre_select(genre);
        coord.drive(plan, store);
    }
    for author in &filters.authors {
        let plan = coord.on_author_select(author);
        coord.drive(plan, store);
    }
    Ok(coord.displayed().to_vec())
}

fn run_query(db_override: Option<PathBuf>, filters: &FilterArgs) -> Result<()> {
    let store = open_store(db_override)?;
    print_books(&displayed_set(&store, filters)?);
    Ok(())
}

fn run_export(
    db_override: Option<PathBuf>,
    format: ExportFormat,
    output: Option<PathBuf>,
    filters: &FilterArgs,
) -> Result<()> {
    let store = open_store(db_override)?;
    let books = displayed_set(&store, filters)?;
    let bytes = export::render(&books, format)?;
    match output {
        Some(path) => std::fs::write(&path, bytes)
            .with_context(|| format!("writing export to {}", path.display()))?,
        None => std::io::stdout().write_all(&bytes)?,
    }
    Ok(())
}

fn print_books(books: &[Book]) {
    if books.is_empty() {
        println!("no books found");
        return;
    }
    for book in books {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            book.id,
            book.title,
            book.author,
            book.genre,
            book.publication_date,
            book.isbn,
            book.stock
        );
    }
}

pub fn default_db_path() -> PathBuf {
    default_data_dir().join("inventory.db")
}

pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "bookstation", "bookstation")
        .expect("project dirs available")
        .data_dir()
        .to_path_buf()
}
