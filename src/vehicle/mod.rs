//! Vehicle state shared between the I/O loop and the control loop.

/// Current/expected snapshots and control levels.
pub mod state;

pub use state::{MoveLevel, SharedVehicleState, Snapshot, TurnLevel, VehicleState};
