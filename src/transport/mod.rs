//! Byte transport and framing.
//!
//! This module owns the TCP connection to the rover controller and the
//! reassembly of its byte stream into frames.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   bytes    ┌────────────────────┐   frames
//! │  TcpTransport    │──────────►│ FrameDemultiplexer │──────────► parser
//! │  (non-blocking)  │◄──────────│                    │
//! └──────────────────┘  commands  └────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `demux` | Byte stream → terminator-delimited frames |
//! | `socket` | [`Transport`] trait and TCP implementation |

// ============================================================================
// Submodules
// ============================================================================

/// Frame reassembly.
pub mod demux;

/// TCP transport.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use demux::{FrameDemultiplexer, Frames};
pub use socket::{ReadOutcome, TcpTransport, Transport};
