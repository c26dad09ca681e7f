//! Error types for the rover telemetry client.
//!
//! This module defines the crate-level error type used by the transport,
//! the client and the configuration layer. Frame-level parse failures have
//! their own types in [`crate::protocol::parser`] and convert into
//! [`Error::Parse`].
//!
//! # Error Categories
//!
//! | Category | Variants | Handling |
//! |----------|----------|----------|
//! | Configuration | [`Error::Config`] | Rejected before connecting |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] | Fatal for the session |
//! | Transient I/O | [`Error::Io`] | Logged, loop continues |
//! | Protocol | [`Error::Parse`] | Logged, frame dropped |
//! | External | [`Error::Json`], [`Error::Join`] | Propagated |

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::task::JoinError;

use crate::protocol::ParseFailure;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Host resolution or TCP connect failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The peer closed the stream, or the transport was disconnected.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// A frame could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseFailure),

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON decoding error (options files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Background task panicked or was aborted.
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::ConnectionClosed => true,
            Self::Io(e) => matches!(
                e.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::NotConnected
            ),
            _ => false,
        }
    }

    /// Returns `true` if the I/O loop may log this error and keep going.
    ///
    /// A single failed read or write is transient; a lost connection is not.
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Parse(_) => true,
            Self::Io(_) => !self.is_connection_error(),
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
