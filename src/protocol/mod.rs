//! Rover wire protocol.
//!
//! This module defines the ASCII frames exchanged with the rover
//! controller and the parser that decodes them.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | [`Message`] | Controller → Client | Initialization, telemetry, events, end of run |
//! | [`CommandBatch`] | Client → Controller | Control tokens `a b l r` |
//!
//! Every frame ends with `;`. Fields are separated by ASCII whitespace.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outgoing command tokens and batches |
//! | `message` | Incoming message and object types |
//! | `parser` | Frame text → [`Message`] |

// ============================================================================
// Submodules
// ============================================================================

/// Outgoing command tokens.
pub mod command;

/// Incoming message types.
pub mod message;

/// Frame parser.
pub mod parser;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, CommandBatch};
pub use message::{
    ControlEcho, EventKind, Initialization, Martian, Message, MessageTag, Object, Obstacle,
    TERMINATOR, Telemetry,
};
pub use parser::{ObjectParseFailure, ParseFailure, ParseStage, ParsedFrame, parse};
