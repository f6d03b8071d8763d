//! Error types for the authfetch library.
//!
//! A single [`Error`] enum with explicit variants for transport, HTTP status,
//! authentication, storage, decoding and input validation failures.

use std::fmt;
use thiserror::Error;

/// The unified error type for authfetch operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-success status.
    #[error("{0}")]
    Http(#[from] HttpError),

    /// Authentication errors (missing or rejected refresh token).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Token store failures.
    #[error("token store error: {0}")]
    Store(#[from] StoreError),

    /// A successful response could not be decoded into the requested type.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Input validation errors (base URL, header names and values).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http(err) => Some(err.status),
            _ => None,
        }
    }

    /// Returns true if the server rejected the request with 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Body attached to a non-success response.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    /// The response declared a JSON content type and parsed.
    Json(serde_json::Value),
    /// The response declared a `text/*` content type.
    Text(String),
    /// No usable body.
    Empty,
}

/// A non-success HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    /// HTTP status code.
    pub status: u16,
    /// Parsed body, when one could be recovered.
    pub body: ErrorBody,
}

impl HttpError {
    /// Create a new HTTP error.
    pub fn new(status: u16, body: ErrorBody) -> Self {
        Self { status, body }
    }

    /// Returns the JSON body, if the server sent one.
    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            ErrorBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the text body, if the server sent one.
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            ErrorBody::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        match &self.body {
            ErrorBody::Json(value) => write!(f, ": {}", value),
            ErrorBody::Text(text) if !text.is_empty() => write!(f, ": {}", text),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for HttpError {}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A refresh was needed but the session holds no refresh token.
    #[error("no refresh token available")]
    MissingRefreshToken,

    /// The refresh endpoint rejected the refresh token or could not be reached.
    #[error("token refresh failed: {reason}")]
    RefreshFailed { reason: String },
}

/// Token store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The stored entries could not be serialized.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No platform data directory could be determined.
    #[error("could not determine data directory")]
    NoDataDir,
}

/// Decoding failures for successful responses.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The JSON payload did not match the requested type.
    #[error("unexpected JSON shape: {0}")]
    Json(#[from] serde_json::Error),

    /// A JSON payload was requested but the response was binary.
    #[error("expected JSON payload, got {len} bytes of binary data")]
    UnexpectedBinary { len: usize },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid base URL.
    #[error("invalid base URL '{value}': {reason}")]
    BaseUrl { value: String, reason: String },

    /// Invalid header name or value.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// The request body could not be serialized.
    #[error("invalid request body: {reason}")]
    Body { reason: String },
}
