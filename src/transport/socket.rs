//! TCP transport to the rover controller.
//!
//! [`Transport`] is the byte-level seam used by the I/O loop;
//! [`TcpTransport`] implements it over a tokio [`TcpStream`].
//!
//! # Read Modes
//!
//! | Mode | `read` when no data is ready |
//! |------|-------------------------------|
//! | non-blocking (default) | returns [`ReadOutcome::WouldBlock`] immediately |
//! | blocking | waits until the socket is readable |

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

// ============================================================================
// ReadOutcome
// ============================================================================

/// Result of a single read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were copied into the buffer.
    Data(usize),
    /// No data is available right now. Not an error.
    WouldBlock,
    /// The peer closed the stream.
    Closed,
}

// ============================================================================
// Transport
// ============================================================================

/// Byte-level connection used by the I/O loop.
#[async_trait]
pub trait Transport: Send {
    /// Reads available bytes into `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on a genuine I/O failure and
    /// [`Error::ConnectionClosed`] after [`Transport::disconnect`].
    async fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome>;

    /// Writes all of `bytes`, returning how many were written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write fails.
    async fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Waits up to `wait` for the connection to become readable.
    ///
    /// Returns `false` if the wait elapsed first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if polling the socket fails.
    async fn wait_readable(&mut self, wait: Duration) -> Result<bool>;

    /// Switches between non-blocking and blocking reads.
    fn set_nonblocking(&mut self, nonblocking: bool);

    /// Closes the connection. Further operations fail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if shutting down the socket fails.
    async fn disconnect(&mut self) -> Result<()>;
}

// ============================================================================
// TcpTransport
// ============================================================================

/// TCP connection to the rover controller.
#[derive(Debug)]
pub struct TcpTransport {
    /// Connected stream; `None` after disconnect.
    stream: Option<TcpStream>,
    /// Address actually connected to.
    peer: SocketAddr,
    /// Read mode.
    nonblocking: bool,
}

impl TcpTransport {
    /// Resolves `host` and connects to `host:port`.
    ///
    /// `host` may be a literal IP address or a name to resolve. Every
    /// resolved address is tried in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if resolution fails, resolves to
    /// nothing, or no address accepts the connection.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let addrs = resolve(host, port).await?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(error = %e, "Failed to set TCP_NODELAY");
                    }
                    info!(%addr, "Connected to rover controller");
                    return Ok(Self {
                        stream: Some(stream),
                        peer: addr,
                        nonblocking: true,
                    });
                }
                Err(e) => {
                    debug!(%addr, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error.map_or_else(|| "no address".to_owned(), |e| e.to_string());
        Err(Error::connection(format!(
            "cannot connect to {host}:{port}: {reason}"
        )))
    }

    /// Wraps an already connected stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the peer address cannot be read.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let peer = stream.peer_addr()?;
        Ok(Self {
            stream: Some(stream),
            peer,
            nonblocking: true,
        })
    }

    /// Address of the controller.
    #[inline]
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Returns `true` until [`Transport::disconnect`] is called.
    #[inline]
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns `true` if reads never wait.
    #[inline]
    #[must_use]
    pub const fn is_nonblocking(&self) -> bool {
        self.nonblocking
    }

    fn stream(&self) -> Result<&TcpStream> {
        self.stream.as_ref().ok_or(Error::ConnectionClosed)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let nonblocking = self.nonblocking;
        let stream = self.stream()?;

        loop {
            if !nonblocking {
                stream.readable().await?;
            }

            match stream.try_read(buf) {
                Ok(0) => return Ok(ReadOutcome::Closed),
                Ok(n) => return Ok(ReadOutcome::Data(n)),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if nonblocking {
                        return Ok(ReadOutcome::WouldBlock);
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
        stream.write_all(bytes).await?;
        Ok(bytes.len())
    }

    async fn wait_readable(&mut self, wait: Duration) -> Result<bool> {
        let stream = self.stream()?;
        match timeout(wait, stream.readable()).await {
            Ok(ready) => ready.map(|()| true).map_err(Error::from),
            Err(_) => Ok(false),
        }
    }

    fn set_nonblocking(&mut self, nonblocking: bool) {
        self.nonblocking = nonblocking;
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        info!(peer = %self.peer, "Disconnecting");
        match stream.shutdown().await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolves a literal address or host name.
async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }

    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| Error::connection(format!("cannot resolve {host}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(Error::connection(format!("{host} resolved to no address")));
    }

    debug!(host, count = addrs.len(), "Host resolved");
    Ok(addrs)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn pair() -> (TcpTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().unwrap().port();

        let (client, server) = tokio::join!(TcpTransport::connect("127.0.0.1", port), async {
            listener.accept().await.expect("accept").0
        });
        (client.expect("connect"), server)
    }

    #[tokio::test]
    async fn test_connect_literal_address() {
        let (transport, _server) = pair().await;
        assert!(transport.is_connected());
        assert!(transport.is_nonblocking());
        assert!(transport.peer().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_connect_by_name() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().unwrap().port();

        // `localhost` may resolve to ::1 first; the IPv4 address is tried next.
        let transport = TcpTransport::connect("localhost", port)
            .await
            .expect("localhost should resolve to the listener");
        assert!(transport.is_connected());
        assert_eq!(transport.peer().port(), port);
        assert!(transport.peer().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = TcpTransport::connect("127.0.0.1", port).await.unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[tokio::test]
    async fn test_resolution_failure_is_connection_error() {
        let err = TcpTransport::connect("no-such-host.invalid", 17676)
            .await
            .unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_nonblocking_read_would_block() {
        let (mut transport, _server) = pair().await;
        let mut buf = [0u8; 64];
        assert_eq!(
            transport.read(&mut buf).await.unwrap(),
            ReadOutcome::WouldBlock
        );
    }

    #[tokio::test]
    async fn test_blocking_read_waits_for_data() {
        let (mut transport, mut server) = pair().await;
        transport.set_nonblocking(false);

        server.write_all(b"S 10 ;").await.unwrap();

        let mut buf = [0u8; 64];
        let outcome = transport.read(&mut buf).await.unwrap();
        let ReadOutcome::Data(n) = outcome else {
            panic!("expected data, got {outcome:?}");
        };
        assert_eq!(&buf[..n], b"S 10 ;");
    }

    #[tokio::test]
    async fn test_wait_readable_times_out() {
        let (mut transport, _server) = pair().await;
        let ready = transport
            .wait_readable(Duration::from_millis(20))
            .await
            .unwrap();
        assert!(!ready);
    }

    #[tokio::test]
    async fn test_write_reaches_peer() {
        let (mut transport, mut server) = pair().await;
        assert_eq!(transport.write(b"al;").await.unwrap(), 3);

        let mut buf = [0u8; 3];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"al;");
    }

    #[tokio::test]
    async fn test_peer_close_is_reported() {
        let (mut transport, server) = pair().await;
        drop(server);

        assert!(transport.wait_readable(Duration::from_secs(5)).await.unwrap());
        let mut buf = [0u8; 16];
        assert_eq!(transport.read(&mut buf).await.unwrap(), ReadOutcome::Closed);
    }

    #[tokio::test]
    async fn test_disconnect_then_read_fails() {
        let (mut transport, _server) = pair().await;
        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());

        let mut buf = [0u8; 16];
        let err = transport.read(&mut buf).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));

        // Second disconnect is a no-op.
        transport.disconnect().await.unwrap();
    }
}
