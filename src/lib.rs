//! Rover Link - telemetry client for a remotely controlled rover.
//!
//! This library connects to a rover controller over TCP, decodes the
//! controller's ASCII telemetry stream into a shared vehicle state and
//! steers the rover by streaming short command tokens back.
//!
//! # Architecture
//!
//! Two tasks share one [`SharedVehicleState`]:
//!
//! - **I/O loop** (foreground): socket bytes → frames → [`Message`]s →
//!   state; queued commands → socket
//! - **Control loop** (background): every tick, compares `current` with
//!   `expected`, steps the move/turn levels and queues a command batch
//!
//! ```text
//! Transport → FrameDemultiplexer → parse → SharedVehicleState ⇄ ControlLoop
//!     ↑                                                              │
//!     └──────────────────── OutgoingCommandQueue ←───────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use rover_link::{Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder().host("127.0.0.1").port(17676).build()?;
//!     let session = client.connect().await?;
//!
//!     // Where we want to go.
//!     session.state().set_expected_speed(8.0);
//!     session.state().set_expected_heading(45.0);
//!
//!     let summary = session.run().await?;
//!     println!("{} frames, scores {:?}", summary.frames, summary.scores);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], [`Session`], options and the I/O loop |
//! | [`control`] | [`ControlLoop`] and [`OutgoingCommandQueue`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Wire messages, commands and the frame parser |
//! | [`transport`] | TCP transport and frame reassembly |
//! | [`vehicle`] | [`SharedVehicleState`] and control levels |

// ============================================================================
// Modules
// ============================================================================

/// Client configuration, connection and session driving.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Periodic control loop and outgoing command queue.
pub mod control;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Wire protocol: messages, commands and parsing.
pub mod protocol;

/// Byte transport and frame reassembly.
pub mod transport;

/// Shared vehicle state.
pub mod vehicle;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientOptions, IoLoop, IoStatus, RunSummary, Session};

// Control types
pub use control::{ControlHandle, ControlLoop, OutgoingCommandQueue};

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::{Command, CommandBatch, EventKind, Message, Object, parse};

// Transport types
pub use transport::{FrameDemultiplexer, TcpTransport, Transport};

// Vehicle types
pub use vehicle::{MoveLevel, SharedVehicleState, Snapshot, TurnLevel};
