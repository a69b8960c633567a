//! Daemon server core: listens on a Unix domain socket and dispatches
//! inventory requests against the SQLite store.

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::protocol::{
    decode_message, default_socket_path, encode_message, ErrorCode, ErrorResponse, FramedMessage,
    HealthStatus, Request, Response, MAX_FRAME_BYTES, PROTOCOL_VERSION,
};
use crate::export;
use crate::model::types::Book;
use crate::storage::sqlite::SqliteStore;
use crate::storage::Catalog;
use crate::validate::validate_book;

/// Configuration for the daemon server.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Path to the Unix socket.
    pub socket_path: PathBuf,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Per-request read/write timeout.
    pub request_timeout: Duration,
    /// Idle shutdown timeout (0 = never shut down).
    pub idle_timeout: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            max_connections: 16,
            request_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(0),
        }
    }
}

impl DaemonConfig {
    /// Load config from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(path) = dotenvy::var("BOOKSTATION_SOCKET") {
            cfg.socket_path = PathBuf::from(path);
        }

        if let Ok(val) = dotenvy::var("BOOKSTATION_MAX_CONNECTIONS") {
            if let Ok(n) = val.parse() {
                cfg.max_connections = n;
            }
        }

        if let Ok(val) = dotenvy::var("BOOKSTATION_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                cfg.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(val) = dotenvy::var("BOOKSTATION_IDLE_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                cfg.idle_timeout = Duration::from_secs(secs);
            }
        }

        cfg
    }
}

/// Daemon server state.
pub struct InventoryDaemon {
    config: DaemonConfig,
    store: Mutex<SqliteStore>,
    start_time: Instant,
    total_requests: AtomicU64,
    active_connections: AtomicU64,
    shutdown: AtomicBool,
    last_activity: RwLock<Instant>,
}

impl InventoryDaemon {
    pub fn new(config: DaemonConfig, store: SqliteStore) -> Self {
        Self {
            config,
            store: Mutex::new(store),
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    fn should_shutdown_idle(&self) -> bool {
        if self.config.idle_timeout.is_zero() {
            return false;
        }
        let last = *self.last_activity.read();
        last.elapsed() > self.config.idle_timeout
    }

    fn touch_activity(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Run the accept loop until shutdown is requested.
    pub fn run(&self) -> std::io::Result<()> {
        // Remove a stale socket from a previous run.
        if self.config.socket_path.exists() {
            std::fs::remove_file(&self.config.socket_path)?;
        }
        if let Some(parent) = self.config.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.config.socket_path)?;
        listener.set_nonblocking(true)?;

        info!(
            socket = %self.config.socket_path.display(),
            max_connections = self.config.max_connections,
            "inventory daemon listening"
        );

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("shutdown requested, stopping daemon");
                break;
            }

            if self.should_shutdown_idle() {
                info!(
                    idle_secs = self.config.idle_timeout.as_secs(),
                    "idle timeout reached, shutting down"
                );
                break;
            }

            match listener.accept() {
                Ok((stream, _addr)) => {
                    let active = self.active_connections.fetch_add(1, Ordering::SeqCst);
                    if active >= self.config.max_connections as u64 {
                        self.active_connections.fetch_sub(1, Ordering::SeqCst);
                        warn!(
                            active = active,
                            max = self.config.max_connections,
                            "max connections reached, rejecting"
                        );
                        continue;
                    }

                    self.touch_activity();
                    if let Err(e) = self.handle_connection(stream) {
                        debug!(error = %e, "connection error");
                    }
                    self.active_connections.fetch_sub(1, Ordering::SeqCst);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }

        if self.config.socket_path.exists() {
            let _ = std::fs::remove_file(&self.config.socket_path);
        }

        info!("daemon stopped");
        Ok(())
    }

    /// Serve framed requests on one connection until the client hangs up.
    fn handle_connection(&self, mut stream: UnixStream) -> std::io::Result<()> {
        stream.set_read_timeout(Some(self.config.request_timeout))?;
        stream.set_write_timeout(Some(self.config.request_timeout))?;

        loop {
            let mut len_buf = [0u8; 4];
            match stream.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    debug!("connection timed out");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }

            let len = u32::from_be_bytes(len_buf) as usize;
            if len > MAX_FRAME_BYTES {
                warn!(len = len, "request frame too large, closing connection");
                return Ok(());
            }

            let mut payload = vec![0u8; len];
            stream.read_exact(&mut payload)?;

            let response = match decode_message::<Request>(&payload) {
                Ok(msg) => {
                    self.total_requests.fetch_add(1, Ordering::Relaxed);
                    self.touch_activity();
                    let response = self.handle_request(&msg.request_id, msg.payload);
                    FramedMessage::new(msg.request_id, response)
                }
                Err(e) => {
                    warn!(error = %e, "failed to decode request");
                    FramedMessage::new(
                        "error",
                        Response::Error(ErrorResponse {
                            code: ErrorCode::InvalidInput,
                            message: format!("decode error: {}", e),
                        }),
                    )
                }
            };

            let encoded =
                encode_message(&response).map_err(|e| std::io::Error::other(e.to_string()))?;
            stream.write_all(&encoded)?;

            if matches!(response.payload, Response::Shutdown { .. }) {
                return Ok(());
            }
        }
    }

    /// Dispatch a single decoded request.
    fn handle_request(&self, request_id: &str, request: Request) -> Response {
        match request {
            Request::Health => {
                let books = self.store.lock().count().unwrap_or(0);
                Response::Health(HealthStatus {
                    uptime_secs: self.uptime_secs(),
                    version: PROTOCOL_VERSION,
                    books,
                })
            }

            Request::ListBooks => match self.store.lock().list_all() {
                Ok(books) => Response::Books(books),
                Err(e) => storage_error(e),
            },

            Request::SearchBooks { term } => {
                debug!(request_id, term = %term, "prefix search");
                match self.store.lock().search_by_prefix(&term) {
                    Ok(books) => Response::Books(books),
                    Err(e) => storage_error(e),
                }
            }

            Request::DistinctAuthors => match self.store.lock().distinct_authors() {
                Ok(authors) => Response::Authors(authors),
                Err(e) => storage_error(e),
            },

            Request::DistinctGenres => match self.store.lock().distinct_genres() {
                Ok(genres) => Response::Genres(genres),
                Err(e) => storage_error(e),
            },

            Request::AddBook { draft } => {
                if let Err(reason) = validate_book(&draft) {
                    return validation_error(reason.to_string());
                }
                match self.store.lock().insert(&draft) {
                    Ok(id) => {
                        info!(request_id, id, title = %draft.title, "book added");
                        Response::Ack { id }
                    }
                    Err(e) => storage_error(e),
                }
            }

            Request::EditBook { id, draft } => {
                if let Err(reason) = validate_book(&draft) {
                    return validation_error(reason.to_string());
                }
                let store = self.store.lock();
                match store.get(id) {
                    Ok(None) => Response::Error(ErrorResponse {
                        code: ErrorCode::NotFound,
                        message: format!("no book with id {id}"),
                    }),
                    Ok(Some(_)) => match store.update(id, &draft) {
                        Ok(()) => {
                            info!(request_id, id, "book updated");
                            Response::Ack { id }
                        }
                        Err(e) => storage_error(e),
                    },
                    Err(e) => storage_error(e),
                }
            }

            Request::DeleteBook { id } => {
                let store = self.store.lock();
                match store.get(id) {
                    Ok(None) => Response::Error(ErrorResponse {
                        code: ErrorCode::NotFound,
                        message: format!("no book with id {id}"),
                    }),
                    Ok(Some(_)) => match store.delete(id) {
                        Ok(()) => {
                            info!(request_id, id, "book deleted");
                            Response::Ack { id }
                        }
                        Err(e) => storage_error(e),
                    },
                    Err(e) => storage_error(e),
                }
            }

            Request::Export { format, ids } => {
                let books = match self.store.lock().list_all() {
                    Ok(books) => books,
                    Err(e) => return storage_error(e),
                };
                // The UI exports what it currently displays, so an id
                // list narrows the set while preserving store order.
                let books: Vec<Book> = match ids {
                    Some(ids) => books.into_iter().filter(|b| ids.contains(&b.id)).collect(),
                    None => books,
                };
                match export::render(&books, format) {
                    Ok(bytes) => Response::Export {
                        file_name: format.file_name().to_string(),
                        bytes,
                    },
                    Err(e) => Response::Error(ErrorResponse {
                        code: ErrorCode::Internal,
                        message: e.to_string(),
                    }),
                }
            }

            Request::Shutdown => {
                info!(request_id, "shutdown requested");
                self.shutdown.store(true, Ordering::SeqCst);
                Response::Shutdown {
                    message: "daemon shutting down".to_string(),
                }
            }
        }
    }

    /// Request the daemon to shut down after the current request.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn storage_error(e: anyhow::Error) -> Response {
    Response::Error(ErrorResponse {
        code: ErrorCode::Storage,
        message: e.to_string(),
    })
}

fn validation_error(message: String) -> Response {
    Response::Error(ErrorResponse {
        code: ErrorCode::Validation,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::BookDraft;

    fn draft(title: &str, author: &str, genre: &str) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: author.to_string(),
            genre: genre.to_string(),
            publication_date: "2001-09-01".to_string(),
            isbn: "9780441172719".to_string(),
            stock: 2,
        }
    }

    fn daemon() -> InventoryDaemon {
        let store = SqliteStore::open_in_memory().unwrap();
        InventoryDaemon::new(DaemonConfig::default(), store)
    }

    #[test]
    fn config_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.max_connections, 16);
        assert!(config.idle_timeout.is_zero());
    }

    #[test]
    fn add_then_list_round_trip() {
        let daemon = daemon();
        let resp = daemon.handle_request(
            "t",
            Request::AddBook {
                draft: draft("Dune", "Frank Herbert", "Fiction"),
            },
        );
        let id = match resp {
            Response::Ack { id } => id,
            other => panic!("expected Ack, got {other:?}"),
        };

        match daemon.handle_request("t", Request::ListBooks) {
            Response::Books(books) => {
                assert_eq!(books.len(), 1);
                assert_eq!(books[0].id, id);
                assert_eq!(books[0].title, "Dune");
            }
            other => panic!("expected Books, got {other:?}"),
        }
    }

    #[test]
    fn invalid_draft_is_refused_with_verbatim_reason() {
        let daemon = daemon();
        let mut bad = draft("Dune", "Frank Herbert", "Fiction");
        bad.isbn = "not-an-isbn".to_string();
        match daemon.handle_request("t", Request::AddBook { draft: bad }) {
            Response::Error(err) => {
                assert_eq!(err.code, ErrorCode::Validation);
                assert_eq!(err.message, "Invalid ISBN");
            }
            other => panic!("expected Error, got {other:?}"),
        }
        // Nothing was persisted.
        match daemon.handle_request("t", Request::ListBooks) {
            Response::Books(books) => assert!(books.is_empty()),
            other => panic!("expected Books, got {other:?}"),
        }
    }

    #[test]
    fn edit_missing_id_is_not_found() {
        let daemon = daemon();
        let resp = daemon.handle_request(
            "t",
            Request::EditBook {
                id: 42,
                draft: draft("Dune", "Frank Herbert", "Fiction"),
            },
        );
        match resp {
            Response::Error(err) => assert_eq!(err.code, ErrorCode::NotFound),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn export_narrows_to_requested_ids() {
        let daemon = daemon();
        let mut ids = Vec::new();
        for title in ["Dune", "Dracula"] {
            match daemon.handle_request(
                "t",
                Request::AddBook {
                    draft: draft(title, "Stoker", "Horror"),
                },
            ) {
                Response::Ack { id } => ids.push(id),
                other => panic!("expected Ack, got {other:?}"),
            }
        }

        match daemon.handle_request(
            "t",
            Request::Export {
                format: crate::export::ExportFormat::Csv,
                ids: Some(vec![ids[1]]),
            },
        ) {
            Response::Export { file_name, bytes } => {
                assert_eq!(file_name, "books.csv");
                let text = String::from_utf8(bytes).unwrap();
                assert!(text.contains("Dracula"));
                assert!(!text.contains("Dune"));
            }
            other => panic!("expected Export, got {other:?}"),
        }
    }

    #[test]
    fn shutdown_flag() {
        let daemon = daemon();
        assert!(!daemon.shutdown.load(Ordering::SeqCst));
        match daemon.handle_request("t", Request::Shutdown) {
            Response::Shutdown { .. } => {}
            other => panic!("expected Shutdown, got {other:?}"),
        }
        assert!(daemon.shutdown.load(Ordering::SeqCst));
    }
}
