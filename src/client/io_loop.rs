//! Foreground I/O loop.
//!
//! Each pass of the loop:
//!
//! 1. reads everything the transport has ready into the demultiplexer,
//! 2. parses each complete frame and applies it to the vehicle state,
//! 3. drains the outgoing queue into the transport.
//!
//! When a pass reads nothing the loop waits for input for at most the
//! poll interval, so queued commands are never held back for long.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::control::OutgoingCommandQueue;
use crate::error::Result;
use crate::protocol::{EventKind, Message, parse};
use crate::transport::{FrameDemultiplexer, ReadOutcome, Transport};
use crate::vehicle::SharedVehicleState;

use super::options::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_READ_CHUNK_SIZE};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on reads per pass so a busy stream cannot starve writes.
const MAX_READS_PER_PASS: usize = 64;

// ============================================================================
// IoStatus
// ============================================================================

/// What one pass of the loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStatus {
    /// Bytes read.
    pub bytes: usize,
    /// Complete frames taken from the demultiplexer.
    pub frames: usize,
    /// Messages that changed the vehicle state.
    pub applied: usize,
    /// Frames rejected by the parser.
    pub rejected: usize,
    /// Command units written.
    pub sent: usize,
    /// The peer closed the connection or it was lost.
    pub closed: bool,
}

// ============================================================================
// RunSummary
// ============================================================================

/// Informational record of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Frames received.
    pub frames: u64,
    /// Frames rejected by the parser.
    pub rejected_frames: u64,
    /// Object records dropped from otherwise valid telemetry.
    pub dropped_objects: u64,
    /// Command units written.
    pub commands_sent: u64,
    /// Outcome events with their timestamps, in arrival order.
    pub events: Vec<(EventKind, u32)>,
    /// `(timestamp, score)` of each end-of-run message.
    pub scores: Vec<(u32, u32)>,
    /// Ticks run by the control loop.
    pub control_ticks: u64,
}

// ============================================================================
// IoLoop
// ============================================================================

/// Moves bytes between the transport, the vehicle state and the queue.
pub struct IoLoop<T: Transport> {
    /// Connection to the controller.
    transport: T,
    /// Frame reassembly.
    demux: FrameDemultiplexer,
    /// Where parsed messages are applied.
    state: SharedVehicleState,
    /// Commands waiting to be written.
    queue: OutgoingCommandQueue,
    /// Scratch buffer for one read.
    read_buf: Vec<u8>,
    /// Longest idle wait.
    poll_interval: Duration,
    /// Totals so far.
    summary: RunSummary,
}

impl<T: Transport> IoLoop<T> {
    /// Creates a loop over `transport`, switching it to non-blocking reads.
    #[must_use]
    pub fn new(mut transport: T, state: SharedVehicleState, queue: OutgoingCommandQueue) -> Self {
        transport.set_nonblocking(true);
        Self {
            transport,
            demux: FrameDemultiplexer::new(),
            state,
            queue,
            read_buf: vec![0; DEFAULT_READ_CHUNK_SIZE],
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            summary: RunSummary::default(),
        }
    }

    /// Sets the longest idle wait.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the number of bytes requested per read.
    #[inline]
    #[must_use]
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_buf = vec![0; size.max(1)];
        self
    }

    /// Totals so far.
    #[inline]
    #[must_use]
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// The underlying transport.
    #[inline]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Runs until the controller closes the connection or it is lost.
    ///
    /// End-of-run messages are recorded but do not stop the loop; a
    /// controller may run several trials over one connection.
    ///
    /// # Errors
    ///
    /// Returns the first transport error that is neither transient nor a
    /// lost connection.
    pub async fn run(&mut self) -> Result<RunSummary> {
        info!("I/O loop started");

        loop {
            let status = self.run_once().await?;

            if status.closed {
                let dropped = self.demux.reset();
                if dropped > 0 {
                    warn!(bytes = dropped, "Dropped unterminated frame at close");
                }
                info!("Connection closed");
                break;
            }

            if status.bytes == 0 {
                match self.transport.wait_readable(self.poll_interval).await {
                    Ok(_) => {}
                    Err(e) if e.is_transient() => warn!(error = %e, "Readiness wait failed"),
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(self.summary.clone())
    }

    /// Runs a single read/parse/apply/write pass.
    ///
    /// # Errors
    ///
    /// Returns the first transport error that is neither transient nor a
    /// lost connection.
    pub async fn run_once(&mut self) -> Result<IoStatus> {
        let mut status = IoStatus::default();
        self.receive(&mut status).await?;
        self.process_frames(&mut status);
        self.flush(&mut status).await?;
        Ok(status)
    }

    async fn receive(&mut self, status: &mut IoStatus) -> Result<()> {
        for _ in 0..MAX_READS_PER_PASS {
            match self.transport.read(&mut self.read_buf).await {
                Ok(ReadOutcome::Data(n)) => {
                    self.demux.push(&self.read_buf[..n]);
                    status.bytes += n;
                }
                Ok(ReadOutcome::WouldBlock) => break,
                Ok(ReadOutcome::Closed) => {
                    status.closed = true;
                    break;
                }
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "Read failed");
                    break;
                }
                Err(e) if e.is_connection_error() => {
                    warn!(error = %e, "Connection lost");
                    status.closed = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn process_frames(&mut self, status: &mut IoStatus) {
        while let Some(frame) = self.demux.next_frame() {
            status.frames += 1;
            self.summary.frames += 1;
            trace!(frame = %frame, "Raw frame");

            let parsed = match parse(&frame) {
                Ok(parsed) => parsed,
                Err(e) => {
                    status.rejected += 1;
                    self.summary.rejected_frames += 1;
                    warn!(error = %e, "Frame dropped");
                    continue;
                }
            };

            for failure in &parsed.dropped {
                warn!(error = %failure, "Object dropped from telemetry");
            }
            self.summary.dropped_objects += parsed.dropped.len() as u64;

            if self.dispatch(&parsed.message) {
                status.applied += 1;
            }
        }
    }

    /// Applies a message and records it. Returns `true` if state changed.
    fn dispatch(&mut self, message: &Message) -> bool {
        let applied = self.state.apply(message);

        match message {
            Message::Initialization(init) => {
                info!(
                    map_width = init.map_size.0,
                    map_height = init.map_size.1,
                    time_limit_ms = init.time_limit,
                    max_speed = init.max_speed,
                    "Initialization received"
                );
            }
            Message::Telemetry(telemetry) => {
                debug!(
                    timestamp = telemetry.timestamp,
                    x = telemetry.position.0,
                    y = telemetry.position.1,
                    heading = telemetry.heading,
                    speed = telemetry.speed,
                    objects = telemetry.objects.len(),
                    "Telemetry applied"
                );
            }
            Message::Event { kind, timestamp } => {
                info!(?kind, timestamp, "Run event");
                self.summary.events.push((*kind, *timestamp));
            }
            Message::EndOfRun { timestamp, score } => {
                info!(timestamp, score, "End of run");
                self.summary.scores.push((*timestamp, *score));
            }
        }
        applied
    }

    async fn flush(&mut self, status: &mut IoStatus) -> Result<()> {
        for command in self.queue.drain_all() {
            match self.transport.write(command.as_bytes()).await {
                Ok(_) => {
                    status.sent += 1;
                    self.summary.commands_sent += 1;
                    trace!(command = %command, "Command sent");
                }
                Err(e) if e.is_transient() => {
                    warn!(error = %e, command = %command, "Write failed, command dropped");
                }
                Err(e) if e.is_connection_error() => {
                    warn!(error = %e, "Connection lost");
                    status.closed = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
