//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```
//! use rover_link::Client;
//!
//! # fn example() -> rover_link::Result<()> {
//! let client = Client::builder()
//!     .host("127.0.0.1")
//!     .port(17676)
//!     .build()?;
//! assert_eq!(client.options().port, 17676);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::Result;

use super::core::Client;
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`].
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Settings collected so far.
    options: ClientOptions,
}

impl ClientBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all settings, e.g. with options loaded from a file.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the controller host name or IP address.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.options.host = host.into();
        self
    }

    /// Sets the controller port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }

    /// Sets the time between control ticks.
    #[inline]
    #[must_use]
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.options = self.options.with_tick_interval(interval);
        self
    }

    /// Sets how long the I/O loop waits for input before flushing again.
    #[inline]
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.options = self.options.with_poll_interval(interval);
        self
    }

    /// Sets the number of bytes requested per socket read.
    #[inline]
    #[must_use]
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.options.read_chunk_size = size;
        self
    }

    /// Validates the settings and builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if any setting is invalid.
    pub fn build(self) -> Result<Client> {
        self.options.validate()?;
        Ok(Client::new(self.options))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;

    #[test]
    fn test_new_uses_defaults() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.options, ClientOptions::default());
    }

    #[test]
    fn test_setters() {
        let client = ClientBuilder::new()
            .host("sim.example")
            .port(2008)
            .tick_interval(Duration::from_millis(25))
            .poll_interval(Duration::from_millis(5))
            .read_chunk_size(1024)
            .build()
            .unwrap();

        let options = client.options();
        assert_eq!(options.host, "sim.example");
        assert_eq!(options.port, 2008);
        assert_eq!(options.tick_interval_ms, 25);
        assert_eq!(options.poll_interval_ms, 5);
        assert_eq!(options.read_chunk_size, 1024);
    }

    #[test]
    fn test_options_then_override() {
        let loaded = ClientOptions::new().with_host("a").with_port(1);
        let client = ClientBuilder::new().options(loaded).port(2).build().unwrap();
        assert_eq!(client.options().host, "a");
        assert_eq!(client.options().port, 2);
    }

    #[test]
    fn test_build_fails_without_host() {
        let err = ClientBuilder::new().host("").build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn test_build_fails_with_zero_port() {
        let err = ClientBuilder::new().port(0).build().unwrap_err();
        assert!(err.to_string().contains("port"));
    }
}
