//! Shared vehicle state.
//!
//! [`SharedVehicleState`] holds the last observed kinematics (`current`),
//! the control target (`expected`) and the discrete move/turn levels. The
//! receive path writes `current`; the control loop reads both snapshots
//! and steps the levels.
//!
//! # Locking
//!
//! One mutex covers the whole [`VehicleState`]. Every method takes the
//! lock for exactly the duration of the call, so readers never see a
//! half-applied telemetry frame.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use crate::protocol::{ControlEcho, Message};

// ============================================================================
// MoveLevel
// ============================================================================

/// Discrete acceleration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[repr(i8)]
pub enum MoveLevel {
    /// Brakes applied.
    Braking = -1,
    /// Coasting.
    #[default]
    Rolling = 0,
    /// Throttle applied.
    Accelerating = 1,
}

impl MoveLevel {
    /// One step up, or `None` at [`MoveLevel::Accelerating`].
    #[must_use]
    pub const fn faster(self) -> Option<Self> {
        match self {
            Self::Braking => Some(Self::Rolling),
            Self::Rolling => Some(Self::Accelerating),
            Self::Accelerating => None,
        }
    }

    /// One step down, or `None` at [`MoveLevel::Braking`].
    #[must_use]
    pub const fn slower(self) -> Option<Self> {
        match self {
            Self::Braking => None,
            Self::Rolling => Some(Self::Braking),
            Self::Accelerating => Some(Self::Rolling),
        }
    }
}

impl fmt::Display for MoveLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Braking => "braking",
            Self::Rolling => "rolling",
            Self::Accelerating => "accelerating",
        })
    }
}

// ============================================================================
// TurnLevel
// ============================================================================

/// Discrete steering state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[repr(i8)]
pub enum TurnLevel {
    /// Hard left.
    HardLeft = -2,
    /// Left.
    Left = -1,
    /// Straight ahead.
    #[default]
    Straight = 0,
    /// Right.
    Right = 1,
    /// Hard right.
    HardRight = 2,
}

impl TurnLevel {
    /// One step to the left, or `None` at [`TurnLevel::HardLeft`].
    #[must_use]
    pub const fn left(self) -> Option<Self> {
        match self {
            Self::HardLeft => None,
            Self::Left => Some(Self::HardLeft),
            Self::Straight => Some(Self::Left),
            Self::Right => Some(Self::Straight),
            Self::HardRight => Some(Self::Right),
        }
    }

    /// One step to the right, or `None` at [`TurnLevel::HardRight`].
    #[must_use]
    pub const fn right(self) -> Option<Self> {
        match self {
            Self::HardLeft => Some(Self::Left),
            Self::Left => Some(Self::Straight),
            Self::Straight => Some(Self::Right),
            Self::Right => Some(Self::HardRight),
            Self::HardRight => None,
        }
    }
}

impl fmt::Display for TurnLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HardLeft => "hard-left",
            Self::Left => "left",
            Self::Straight => "straight",
            Self::Right => "right",
            Self::HardRight => "hard-right",
        })
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// One view of the vehicle: limits from initialization plus kinematics
/// from telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Snapshot {
    /// Map width and height (metres).
    pub map_size: (f32, f32),
    /// Time limit for the run (milliseconds).
    pub time_limit: u32,
    /// Minimum and maximum sensor range (metres).
    pub sensor_range: (f32, f32),
    /// Maximum speed (metres per second).
    pub max_speed: f32,
    /// Maximum turn rate (degrees per second).
    pub max_turn: f32,
    /// Maximum hard-turn rate (degrees per second).
    pub max_hard_turn: f32,
    /// Timestamp of the last telemetry (milliseconds).
    pub timestamp: u32,
    /// Control echo of the last telemetry.
    pub control: ControlEcho,
    /// Position (metres).
    pub position: (f32, f32),
    /// Heading (degrees, counter-clockwise from the x-axis).
    pub heading: f32,
    /// Speed (metres per second).
    pub speed: f32,
}

// ============================================================================
// VehicleState
// ============================================================================

/// Everything guarded by the vehicle-state lock.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct VehicleState {
    /// Last observed state.
    pub current: Snapshot,
    /// Target state.
    pub expected: Snapshot,
    /// Acceleration level.
    pub move_level: MoveLevel,
    /// Steering level.
    pub turn_level: TurnLevel,
}

impl VehicleState {
    /// Copies message fields into `current`.
    ///
    /// Returns `false` for events and end-of-run, which carry no
    /// kinematic state.
    pub fn apply(&mut self, message: &Message) -> bool {
        let current = &mut self.current;
        match message {
            Message::Initialization(init) => {
                current.map_size = init.map_size;
                current.time_limit = init.time_limit;
                current.sensor_range = init.sensor_range;
                current.max_speed = init.max_speed;
                current.max_turn = init.max_turn;
                current.max_hard_turn = init.max_hard_turn;
                true
            }
            Message::Telemetry(telemetry) => {
                current.timestamp = telemetry.timestamp;
                current.control = telemetry.control;
                current.position = telemetry.position;
                current.heading = telemetry.heading;
                current.speed = telemetry.speed;
                true
            }
            Message::Event { .. } | Message::EndOfRun { .. } => false,
        }
    }
}

// ============================================================================
// SharedVehicleState
// ============================================================================

/// Clonable handle to the vehicle state shared by the I/O and control
/// loops.
///
/// # Example
///
/// ```
/// use rover_link::protocol::parse;
/// use rover_link::vehicle::{MoveLevel, SharedVehicleState};
///
/// let state = SharedVehicleState::new();
/// let frame = parse("T 500 -- 1.0 2.0 45.0 0.5 ;").unwrap();
/// state.apply(&frame.message);
///
/// assert_eq!(state.current().position, (1.0, 2.0));
/// assert!(state.try_accelerate());
/// assert_eq!(state.move_level(), MoveLevel::Accelerating);
/// ```
#[derive(Clone)]
pub struct SharedVehicleState {
    /// The guarded state.
    inner: Arc<Mutex<VehicleState>>,
    /// Opened by the first applied telemetry frame.
    initialized: Arc<watch::Sender<bool>>,
}

impl Default for SharedVehicleState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedVehicleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedVehicleState")
            .field("state", &*self.inner.lock())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

// ============================================================================
// SharedVehicleState - Receive Path
// ============================================================================

impl SharedVehicleState {
    /// Creates a zeroed state with levels at rolling/straight.
    #[must_use]
    pub fn new() -> Self {
        let (initialized, _) = watch::channel(false);
        Self {
            inner: Arc::new(Mutex::new(VehicleState::default())),
            initialized: Arc::new(initialized),
        }
    }

    /// Applies a parsed message to `current`.
    ///
    /// Only initialization and telemetry mutate state. The first telemetry
    /// opens the initialization latch.
    pub fn apply(&self, message: &Message) -> bool {
        let changed = self.inner.lock().apply(message);

        if changed && matches!(message, Message::Telemetry(_)) {
            self.mark_initialized();
        }
        changed
    }

    /// Returns `true` once a telemetry frame has been applied.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        *self.initialized.borrow()
    }

    /// Waits until a telemetry frame has been applied.
    pub async fn wait_initialized(&self) {
        let mut rx = self.initialized.subscribe();
        // `self` keeps the sender alive, so the channel cannot close here.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    fn mark_initialized(&self) {
        let opened = self.initialized.send_if_modified(|ready| {
            let was = *ready;
            *ready = true;
            !was
        });
        if opened {
            info!("Vehicle state initialized from first telemetry");
        }
    }
}

// ============================================================================
// SharedVehicleState - Accessors
// ============================================================================

impl SharedVehicleState {
    /// Copy of the whole state, read under one lock.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> VehicleState {
        *self.inner.lock()
    }

    /// Copy of the observed snapshot.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Snapshot {
        self.inner.lock().current
    }

    /// Copy of the target snapshot.
    #[inline]
    #[must_use]
    pub fn expected(&self) -> Snapshot {
        self.inner.lock().expected
    }

    /// Current acceleration level.
    #[inline]
    #[must_use]
    pub fn move_level(&self) -> MoveLevel {
        self.inner.lock().move_level
    }

    /// Current steering level.
    #[inline]
    #[must_use]
    pub fn turn_level(&self) -> TurnLevel {
        self.inner.lock().turn_level
    }
}

// ============================================================================
// SharedVehicleState - Target
// ============================================================================

impl SharedVehicleState {
    /// Sets the target speed.
    pub fn set_expected_speed(&self, speed: f32) {
        self.inner.lock().expected.speed = speed;
    }

    /// Sets the target heading.
    pub fn set_expected_heading(&self, heading: f32) {
        self.inner.lock().expected.heading = heading;
    }

    /// Sets the target position.
    pub fn set_expected_position(&self, position: (f32, f32)) {
        self.inner.lock().expected.position = position;
    }
}

// ============================================================================
// SharedVehicleState - Control Levels
// ============================================================================

impl SharedVehicleState {
    /// Steps the move level up. Returns `false` if already accelerating.
    pub fn try_accelerate(&self) -> bool {
        self.step_move(MoveLevel::faster)
    }

    /// Steps the move level down. Returns `false` if already braking.
    pub fn try_brake(&self) -> bool {
        self.step_move(MoveLevel::slower)
    }

    /// Steps the turn level left. Returns `false` at hard left.
    pub fn try_turn_left(&self) -> bool {
        self.step_turn(TurnLevel::left)
    }

    /// Steps the turn level right. Returns `false` at hard right.
    pub fn try_turn_right(&self) -> bool {
        self.step_turn(TurnLevel::right)
    }

    fn step_move(&self, step: fn(MoveLevel) -> Option<MoveLevel>) -> bool {
        let mut state = self.inner.lock();
        match step(state.move_level) {
            Some(next) => {
                state.move_level = next;
                true
            }
            None => false,
        }
    }

    fn step_turn(&self, step: fn(TurnLevel) -> Option<TurnLevel>) -> bool {
        let mut state = self.inner.lock();
        match step(state.turn_level) {
            Some(next) => {
                state.turn_level = next;
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
