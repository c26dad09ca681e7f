//! Client configuration, connection and session driving.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent [`ClientBuilder`] |
//! | `core` | [`Client`] and the running [`Session`] |
//! | `io_loop` | Read/parse/apply/write loop |
//! | `options` | Serializable [`ClientOptions`] |

// ============================================================================
// Submodules
// ============================================================================

/// Client builder.
pub mod builder;

/// Client and session.
pub mod core;

/// Foreground I/O loop.
pub mod io_loop;

/// Client options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::{Client, Session};
pub use io_loop::{IoLoop, IoStatus, RunSummary};
pub use options::ClientOptions;
