//! Client for the inventory daemon: framed request/response over a Unix
//! domain socket, one typed helper per operation.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use parking_lot::Mutex;
use tracing::debug;

use super::protocol::{
    decode_message, default_socket_path, encode_message, FramedMessage, HealthStatus, Request,
    Response, MAX_FRAME_BYTES,
};
use crate::export::ExportFormat;
use crate::model::types::{Book, BookDraft};

/// Configuration for the daemon client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub socket_path: PathBuf,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Load config from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(path) = dotenvy::var("BOOKSTATION_SOCKET") {
            cfg.socket_path = PathBuf::from(path);
        }

        if let Ok(val) = dotenvy::var("BOOKSTATION_CONNECT_TIMEOUT_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                cfg.connect_timeout = Duration::from_millis(ms);
            }
        }

        if let Ok(val) = dotenvy::var("BOOKSTATION_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                cfg.request_timeout = Duration::from_millis(ms);
            }
        }

        cfg
    }
}

/// Unix domain socket client for the inventory daemon.
pub struct InventoryClient {
    config: ClientConfig,
    connection: Mutex<Option<UnixStream>>,
    request_counter: AtomicU64,
}

impl InventoryClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
            request_counter: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ClientConfig::from_env())
    }

    fn connect(&self) -> Result<UnixStream> {
        let stream = UnixStream::connect(&self.config.socket_path).with_context(|| {
            format!(
                "connecting to daemon at {}",
                self.config.socket_path.display()
            )
        })?;
        stream.set_read_timeout(Some(self.config.request_timeout))?;
        stream.set_write_timeout(Some(self.config.request_timeout))?;
        debug!(socket = %self.config.socket_path.display(), "connected to daemon");
        Ok(stream)
    }

    fn roundtrip_on(stream: &mut UnixStream, encoded: &[u8]) -> Result<Vec<u8>> {
        stream.write_all(encoded)?;

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_BYTES {
            bail!("response frame too large ({len} bytes)");
        }
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Send a request and decode the response, reconnecting once if the
    /// cached connection went away (daemon restart, timeout).
    pub fn request(&self, request: Request) -> Result<Response> {
        let id = self.request_counter.fetch_add(1, Ordering::Relaxed);
        let msg = FramedMessage::new(format!("req-{id}"), request);
        let encoded = encode_message(&msg).map_err(|e| anyhow!(e.to_string()))?;

        let mut guard = self.connection.lock();
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }

        let payload = {
            let stream = guard.as_mut().expect("connection populated above");
            match Self::roundtrip_on(stream, &encoded) {
                Ok(payload) => payload,
                Err(first_err) => {
                    debug!(error = %first_err, "roundtrip failed, reconnecting once");
                    let mut fresh = self.connect()?;
                    let payload = Self::roundtrip_on(&mut fresh, &encoded)?;
                    *guard = Some(fresh);
                    payload
                }
            }
        };

        let decoded: FramedMessage<Response> =
            decode_message(&payload).map_err(|e| anyhow!(e.to_string()))?;
        if let Response::Error(err) = &decoded.payload {
            bail!("{:?}: {}", err.code, err.message);
        }
        Ok(decoded.payload)
    }

    // -- typed helpers ---------------------------------------------------

    pub fn health(&self) -> Result<HealthStatus> {
        match self.request(Request::Health)? {
            Response::Health(status) => Ok(status),
            other => bail!("unexpected response to Health: {other:?}"),
        }
    }

    pub fn list_books(&self) -> Result<Vec<Book>> {
        match self.request(Request::ListBooks)? {
            Response::Books(books) => Ok(books),
            other => bail!("unexpected response to ListBooks: {other:?}"),
        }
    }

    pub fn search_books(&self, term: &str) -> Result<Vec<Book>> {
        match self.request(Request::SearchBooks {
            term: term.to_string(),
        })? {
            Response::Books(books) => Ok(books),
            other => bail!("unexpected response to SearchBooks: {other:?}"),
        }
    }

    pub fn distinct_authors(&self) -> Result<Vec<String>> {
        match self.request(Request::DistinctAuthors)? {
            Response::Authors(authors) => Ok(authors),
            other => bail!("unexpected response to DistinctAuthors: {other:?}"),
        }
    }

    pub fn distinct_genres(&self) -> Result<Vec<String>> {
        match self.request(Request::DistinctGenres)? {
            Response::Genres(genres) => Ok(genres),
            other => bail!("unexpected response to DistinctGenres: {other:?}"),
        }
    }

    pub fn add_book(&self, draft: BookDraft) -> Result<i64> {
        match self.request(Request::AddBook { draft })? {
            Response::Ack { id } => Ok(id),
            other => bail!("unexpected response to AddBook: {other:?}"),
        }
    }

    pub fn edit_book(&self, id: i64, draft: BookDraft) -> Result<()> {
        match self.request(Request::EditBook { id, draft })? {
            Response::Ack { .. } => Ok(()),
            other => bail!("unexpected response to EditBook: {other:?}"),
        }
    }

    pub fn delete_book(&self, id: i64) -> Result<()> {
        match self.request(Request::DeleteBook { id })? {
            Response::Ack { .. } => Ok(()),
            other => bail!("unexpected response to DeleteBook: {other:?}"),
        }
    }

    pub fn export(&self, format: ExportFormat, ids: Option<Vec<i64>>) -> Result<(String, Vec<u8>)> {
        match self.request(Request::Export { format, ids })? {
            Response::Export { file_name, bytes } => Ok((file_name, bytes)),
            other => bail!("unexpected response to Export: {other:?}"),
        }
    }

    pub fn shutdown(&self) -> Result<()> {
        match self.request(Request::Shutdown)? {
            Response::Shutdown { .. } => Ok(()),
            other => bail!("unexpected response to Shutdown: {other:?}"),
        }
    }
}
