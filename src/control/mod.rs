//! Control loop and outgoing command queue.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `controller` | Periodic loop stepping move/turn levels |
//! | `queue` | FIFO of encoded command batches |

// ============================================================================
// Submodules
// ============================================================================

/// Periodic control loop.
pub mod controller;

/// Outgoing command queue.
pub mod queue;

// ============================================================================
// Re-exports
// ============================================================================

pub use controller::{ControlHandle, ControlLoop, DEFAULT_TICK_INTERVAL};
pub use queue::OutgoingCommandQueue;
