//! Client entry point and running session.
//!
//! A [`Client`] holds validated options. [`Client::connect`] opens the TCP
//! connection and returns a [`Session`] whose control loop is already
//! spawned; [`Session::run`] drives the I/O loop on the calling task until
//! the controller hangs up.
//!
//! # Example
//!
//! ```no_run
//! use rover_link::Client;
//!
//! # async fn example() -> rover_link::Result<()> {
//! let client = Client::builder().host("127.0.0.1").port(17676).build()?;
//! let session = client.connect().await?;
//!
//! session.state().set_expected_speed(5.0);
//! let summary = session.run().await?;
//! println!("scores: {:?}", summary.scores);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::{error, info, warn};

use crate::control::{ControlHandle, ControlLoop, OutgoingCommandQueue};
use crate::error::Result;
use crate::transport::{TcpTransport, Transport};
use crate::vehicle::SharedVehicleState;

use super::builder::ClientBuilder;
use super::io_loop::{IoLoop, RunSummary};
use super::options::ClientOptions;

// ============================================================================
// Client
// ============================================================================

/// Configured, not yet connected client.
#[derive(Debug, Clone)]
pub struct Client {
    options: ClientOptions,
}

impl Client {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from already validated options.
    pub(crate) fn new(options: ClientOptions) -> Self {
        Self { options }
    }

    /// Settings this client connects with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Connects to the controller and starts the control loop.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Connection`] if the host cannot be resolved
    /// or no address accepts the connection.
    pub async fn connect(&self) -> Result<Session> {
        let transport = TcpTransport::connect(&self.options.host, self.options.port).await?;
        Ok(Session::start(transport, &self.options))
    }
}

// ============================================================================
// Session
// ============================================================================

/// Live connection with its control loop running.
pub struct Session<T: Transport = TcpTransport> {
    io: IoLoop<T>,
    control: ControlHandle,
    state: SharedVehicleState,
    queue: OutgoingCommandQueue,
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Session<T> {
    /// Wires `transport` to fresh state and spawns the control loop.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn start(transport: T, options: &ClientOptions) -> Self {
        let state = SharedVehicleState::new();
        let queue = OutgoingCommandQueue::new();

        let control = ControlLoop::new(state.clone(), queue.clone())
            .with_tick_interval(options.tick_interval())
            .spawn();

        let io = IoLoop::new(transport, state.clone(), queue.clone())
            .with_poll_interval(options.poll_interval())
            .with_read_chunk_size(options.read_chunk_size);

        Self {
            io,
            control,
            state,
            queue,
        }
    }

    /// Shared vehicle state. Set the expected values here.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &SharedVehicleState {
        &self.state
    }

    /// Outgoing command queue.
    #[inline]
    #[must_use]
    pub fn queue(&self) -> &OutgoingCommandQueue {
        &self.queue
    }

    /// Runs the I/O loop until the controller closes the connection, then
    /// stops the control loop and closes the transport.
    ///
    /// Dropping a session without calling `run` also stops the control
    /// loop.
    ///
    /// # Errors
    ///
    /// Returns the I/O loop's fatal error if it had one, otherwise
    /// [`crate::Error::Join`] if the control task panicked.
    pub async fn run(mut self) -> Result<RunSummary> {
        let outcome = self.io.run().await;
        let stopped = self.control.shutdown().await;
        finish(self.io.transport_mut(), outcome, stopped).await
    }
}

/// Closes the transport, then reports the I/O outcome before any control
/// task failure.
async fn finish<T: Transport>(
    transport: &mut T,
    outcome: Result<RunSummary>,
    stopped: Result<u64>,
) -> Result<RunSummary> {
    if let Err(e) = transport.disconnect().await {
        warn!(error = %e, "Disconnect failed");
    }

    if let (Err(join), Err(_)) = (&stopped, &outcome) {
        error!(error = %join, "Control loop failed");
    }

    let mut summary = outcome?;
    let ticks = stopped?;
    summary.control_ticks = ticks;
    info!(
        frames = summary.frames,
        commands = summary.commands_sent,
        ticks,
        "Session finished"
    );
    Ok(summary)
}

// ============================================================================
// Tests
// ============================================================================
