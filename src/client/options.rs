//! Client configuration.
//!
//! [`ClientOptions`] can be built in code or loaded from JSON. Missing
//! JSON keys take their defaults.
//!
//! # Example
//!
//! ```
//! use rover_link::ClientOptions;
//!
//! let options = ClientOptions::from_json_str(r#"{ "host": "10.0.0.7", "port": 17676 }"#)?;
//! assert_eq!(options.tick_interval_ms, 100);
//! # Ok::<(), rover_link::Error>(())
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default controller host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default controller port.
pub const DEFAULT_PORT: u16 = 17676;

/// Default control tick (milliseconds).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Default idle wait of the I/O loop (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Default size of a single socket read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

// ============================================================================
// ClientOptions
// ============================================================================

/// Connection and loop timing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Controller host name or IP address.
    pub host: String,

    /// Controller TCP port.
    pub port: u16,

    /// Time between control ticks (milliseconds).
    pub tick_interval_ms: u64,

    /// Longest idle wait of the I/O loop before it flushes commands again
    /// (milliseconds).
    pub poll_interval_ms: u64,

    /// Bytes requested per socket read.
    pub read_chunk_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the JSON is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Json`]
    /// if it is malformed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the controller host.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the controller port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the control tick.
    #[inline]
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Sets the I/O loop idle wait.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Sets the socket read size.
    #[inline]
    #[must_use]
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ClientOptions {
    /// Control tick as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// I/O loop idle wait as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Checks that the options can be used to connect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("host must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::config("port must be non-zero"));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::config("tick_interval_ms must be non-zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::config("poll_interval_ms must be non-zero"));
        }
        if self.read_chunk_size == 0 {
            return Err(Error::config("read_chunk_size must be non-zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let options = ClientOptions::new();
        assert_eq!(options.host, DEFAULT_HOST);
        assert_eq!(options.port, DEFAULT_PORT);
        assert_eq!(options.tick_interval(), Duration::from_millis(100));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let options = ClientOptions::new()
            .with_host("rover.local")
            .with_port(9000)
            .with_tick_interval(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(2))
            .with_read_chunk_size(512);

        assert_eq!(options.host, "rover.local");
        assert_eq!(options.port, 9000);
        assert_eq!(options.tick_interval_ms, 50);
        assert_eq!(options.poll_interval(), Duration::from_millis(2));
        assert_eq!(options.read_chunk_size, 512);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            (ClientOptions::new().with_host("  "), "host"),
            (ClientOptions::new().with_port(0), "port"),
            (
                ClientOptions::new().with_tick_interval(Duration::ZERO),
                "tick_interval_ms",
            ),
            (
                ClientOptions::new().with_poll_interval(Duration::ZERO),
                "poll_interval_ms",
            ),
            (ClientOptions::new().with_read_chunk_size(0), "read_chunk_size"),
        ];

        for (options, field) in cases {
            let err = options.validate().unwrap_err();
            assert!(matches!(err, Error::Config { .. }));
            assert!(err.to_string().contains(field), "{err}");
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = ClientOptions::from_json_str(r#"{ "port": 4242 }"#).unwrap();
        assert_eq!(options.port, 4242);
        assert_eq!(options.host, DEFAULT_HOST);
        assert_eq!(options.read_chunk_size, DEFAULT_READ_CHUNK_SIZE);
    }

    #[test]
    fn test_malformed_json_is_error() {
        let err = ClientOptions::from_json_str("{ port: }").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "host": "10.1.2.3", "port": 17700, "tick_interval_ms": 40 }}"#
        )
        .unwrap();

        let options = ClientOptions::from_json_file(file.path()).unwrap();
        assert_eq!(options.host, "10.1.2.3");
        assert_eq!(options.port, 17700);
        assert_eq!(options.tick_interval_ms, 40);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientOptions::from_json_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let options = ClientOptions::new().with_host("h").with_port(1);
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(ClientOptions::from_json_str(&json).unwrap(), options);
    }
}
