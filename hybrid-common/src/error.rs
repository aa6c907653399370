//! Common error types for the hybrid feed
//!
//! One taxonomy covers both stores so a caller can tell a bad configuration
//! apart from an unreachable store, a rejected query, or malformed data.

use std::fmt;
use thiserror::Error;

/// Boxed driver error kept as the `source` of store failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Common result type for hybrid feed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which backing store an error (or event) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Normalized social graph (users, posts, follows, likes)
    Relational,
    /// Activity events and preference blobs
    Document,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Relational => "relational",
            StoreKind::Document => "document",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common error types across the hybrid feed crates
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid connection parameters (fatal, never retried)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Store unreachable or credentials rejected while opening a session
    #[error("Connection error ({store}): {source}")]
    Connection {
        store: StoreKind,
        #[source]
        source: BoxError,
    },

    /// A catalog operation was rejected by its store
    #[error("Query error ({store}, {operation}): {source}")]
    Query {
        store: StoreKind,
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// Malformed data reached the federation engine
    #[error("Validation error: {0}")]
    Validation(String),

    /// A store handle was requested from a session that is not established
    #[error("Session closed: {0} handle is not live")]
    SessionClosed(StoreKind),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Wrap a driver error raised while opening a store
    pub fn connection(store: StoreKind, source: impl Into<BoxError>) -> Self {
        Error::Connection {
            store,
            source: source.into(),
        }
    }

    /// Wrap a driver error raised by a catalog operation
    pub fn query(store: StoreKind, operation: &'static str, source: impl Into<BoxError>) -> Self {
        Error::Query {
            store,
            operation,
            source: source.into(),
        }
    }

    /// Store the error belongs to, if any
    pub fn store(&self) -> Option<StoreKind> {
        match self {
            Error::Connection { store, .. } | Error::Query { store, .. } => Some(*store),
            Error::SessionClosed(store) => Some(*store),
            _ => None,
        }
    }
}
