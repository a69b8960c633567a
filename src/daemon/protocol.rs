//! Wire protocol for the inventory daemon.
//!
//! Length-prefixed MessagePack frames over a Unix domain socket. Every
//! frame carries the protocol version and a request id so responses can
//! be correlated by clients that pipeline.

use serde::{Deserialize, Serialize};

use crate::export::ExportFormat;
use crate::model::types::{Book, BookDraft};

/// Bumped whenever an existing variant changes shape.
pub const PROTOCOL_VERSION: u32 = 1;

/// Frames larger than this are rejected without decoding.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Default socket path, namespaced per user.
pub fn default_socket_path() -> std::path::PathBuf {
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".into());
    // Keep only alphanumeric, dash, underscore to prevent path traversal.
    let safe_user: String = user
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect();
    let safe_user = if safe_user.is_empty() {
        "unknown".to_string()
    } else {
        safe_user
    };
    std::path::PathBuf::from(format!("/tmp/bookstation-{}.sock", safe_user))
}

/// Requests the daemon understands, one per inventory operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    /// Health check - returns daemon status.
    Health,

    /// Full unfiltered inventory.
    ListBooks,

    /// Prefix search over title/author/genre. The caller is responsible
    /// for any minimum-length gating; the daemon searches whatever term
    /// it is given.
    SearchBooks { term: String },

    /// Distinct author names, for the typeahead.
    DistinctAuthors,

    /// Distinct genre values, for the filter dropdown.
    DistinctGenres,

    /// Validate and insert a new record.
    AddBook { draft: BookDraft },

    /// Validate and replace every field of `id` except the id itself.
    EditBook { id: i64, draft: BookDraft },

    /// Remove a record.
    DeleteBook { id: i64 },

    /// Serialize a record set for download. When `ids` is `None` the
    /// full inventory is exported; the UI passes the ids of the
    /// currently displayed set.
    Export {
        format: ExportFormat,
        ids: Option<Vec<i64>>,
    },

    /// Request graceful shutdown.
    Shutdown,
}

/// Responses from the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Health(HealthStatus),

    /// Result set for ListBooks / SearchBooks.
    Books(Vec<Book>),

    Authors(Vec<String>),

    Genres(Vec<String>),

    /// Mutation acknowledged; `id` is the affected record.
    Ack { id: i64 },

    /// Rendered export payload.
    Export {
        file_name: String,
        bytes: Vec<u8>,
    },

    Shutdown { message: String },

    Error(ErrorResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub uptime_secs: u64,
    pub version: u32,
    /// Records currently in the store.
    pub books: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    /// For `Validation` this is the validator's reason, verbatim.
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    /// Unknown or internal error.
    Internal,
    /// Malformed request frame.
    InvalidInput,
    /// A field failed format validation; message carries the reason.
    Validation,
    /// The store rejected the operation.
    Storage,
    /// No record with the given id.
    NotFound,
}

/// Framed message wrapper for the length-prefixed protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramedMessage<T> {
    pub version: u32,
    pub request_id: String,
    pub payload: T,
}

impl<T> FramedMessage<T> {
    pub fn new(request_id: impl Into<String>, payload: T) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            request_id: request_id.into(),
            payload,
        }
    }
}

/// Encode a message to MessagePack bytes with a u32 length prefix.
pub fn encode_message<T: Serialize>(msg: &FramedMessage<T>) -> Result<Vec<u8>, EncodeError> {
    let payload = rmp_serde::to_vec(msg).map_err(|e| EncodeError(e.to_string()))?;
    let len = payload.len() as u32;
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decode a message from MessagePack bytes (without the length prefix).
pub fn decode_message<T: for<'de> Deserialize<'de>>(
    data: &[u8],
) -> Result<FramedMessage<T>, DecodeError> {
    rmp_serde::from_slice(data).map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct EncodeError(pub String);

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "encode error: {}", self.0)
    }
}

impl std::error::Error for EncodeError {}

#[derive(Debug, Clone)]
pub struct DecodeError(pub String);

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "decode error: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}
