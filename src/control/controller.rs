//! Periodic control loop.
//!
//! Once per tick the loop compares `current` against `expected`, steps
//! the move and turn levels towards the target, and enqueues one command
//! batch for the transitions that actually happened.
//!
//! | Comparison | Command |
//! |------------|---------|
//! | current speed < expected | accelerate |
//! | current speed > expected | brake |
//! | current heading < expected | turn left |
//! | current heading > expected | turn right |
//!
//! # Lifecycle
//!
//! 1. [`ControlLoop::spawn`] starts the task.
//! 2. The task waits for the first telemetry before its first tick.
//! 3. [`ControlHandle::shutdown`] raises the stop flag and joins the task.
//!    Dropping the handle raises the flag without joining.

// ============================================================================
// Imports
// ============================================================================

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::error::Result;
use crate::protocol::{Command, CommandBatch};
use crate::vehicle::SharedVehicleState;

use super::OutgoingCommandQueue;

// ============================================================================
// Constants
// ============================================================================

/// Default time between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// StopSignal
// ============================================================================

/// Cooperative stop flag with a wake-up for a sleeping loop.
#[derive(Debug, Default)]
struct StopSignal {
    stopped: AtomicBool,
    wake: Notify,
}

impl StopSignal {
    fn raise(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    fn is_raised(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

// ============================================================================
// ControlLoop
// ============================================================================

/// Compares current and expected state and emits commands.
#[derive(Debug)]
pub struct ControlLoop {
    /// Shared vehicle state.
    state: SharedVehicleState,
    /// Destination for command batches.
    queue: OutgoingCommandQueue,
    /// Time between ticks.
    tick_interval: Duration,
    /// Commands produced during the current tick.
    batch: CommandBatch,
}

impl ControlLoop {
    /// Creates a control loop with the default tick interval.
    #[must_use]
    pub fn new(state: SharedVehicleState, queue: OutgoingCommandQueue) -> Self {
        Self {
            state,
            queue,
            tick_interval: DEFAULT_TICK_INTERVAL,
            batch: CommandBatch::new(),
        }
    }

    /// Sets the time between ticks.
    #[inline]
    #[must_use]
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Time between ticks.
    #[inline]
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Runs one control step.
    ///
    /// Returns the encoded batch if one was enqueued.
    pub fn tick(&mut self) -> Option<String> {
        let snapshot = self.state.snapshot();
        let (current, expected) = (snapshot.current, snapshot.expected);

        match current.speed.partial_cmp(&expected.speed) {
            Some(CmpOrdering::Less) => self.request(Command::Accelerate),
            Some(CmpOrdering::Greater) => self.request(Command::Brake),
            _ => {}
        }

        match current.heading.partial_cmp(&expected.heading) {
            Some(CmpOrdering::Less) => self.request(Command::TurnLeft),
            Some(CmpOrdering::Greater) => self.request(Command::TurnRight),
            _ => {}
        }

        self.execute()
    }

    /// Attempts one level transition; records the command if it happened.
    fn request(&mut self, command: Command) {
        let moved = match command {
            Command::Accelerate => self.state.try_accelerate(),
            Command::Brake => self.state.try_brake(),
            Command::TurnLeft => self.state.try_turn_left(),
            Command::TurnRight => self.state.try_turn_right(),
        };
        if moved {
            self.batch.push(command);
        }
    }

    /// Flushes the batch into the queue.
    fn execute(&mut self) -> Option<String> {
        if self.batch.is_empty() {
            return None;
        }
        debug!(
            commands = ?self.batch.commands(),
            move_level = %self.state.move_level(),
            turn_level = %self.state.turn_level(),
            "Command batch queued"
        );
        let encoded = self.batch.take()?;
        self.queue.enqueue(encoded.clone());
        Some(encoded)
    }

    /// Spawns the loop as a background task.
    ///
    /// The task does nothing until the vehicle state is initialized.
    #[must_use]
    pub fn spawn(self) -> ControlHandle {
        let signal = Arc::new(StopSignal::default());
        let task = tokio::spawn(self.run(Arc::clone(&signal)));
        ControlHandle { signal, task }
    }

    async fn run(mut self, signal: Arc<StopSignal>) -> u64 {
        tokio::select! {
            () = self.state.wait_initialized() => {}
            () = signal.wake.notified() => {}
        }
        if signal.is_raised() {
            debug!("Control loop stopped before initialization");
            return 0;
        }

        info!(
            interval_ms = self.tick_interval.as_millis() as u64,
            "Control loop started"
        );

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = signal.wake.notified() => {}
            }
            if signal.is_raised() {
                break;
            }
            self.tick();
            ticks += 1;
        }

        debug!(ticks, "Control loop terminated");
        ticks
    }
}

// ============================================================================
// ControlHandle
// ============================================================================

/// Handle to a spawned [`ControlLoop`].
#[derive(Debug)]
pub struct ControlHandle {
    signal: Arc<StopSignal>,
    task: JoinHandle<u64>,
}

impl ControlHandle {
    /// Returns `true` if the task has exited.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the loop at its next wake-up and waits for it to exit.
    ///
    /// Returns the number of ticks run.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Join`] if the task panicked.
    pub async fn shutdown(mut self) -> Result<u64> {
        self.signal.raise();
        let ticks = (&mut self.task).await?;
        Ok(ticks)
    }
}

impl Drop for ControlHandle {
    /// Stops a loop whose handle is dropped without [`ControlHandle::shutdown`].
    fn drop(&mut self) {
        if !self.task.is_finished() {
            self.signal.raise();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::parse;
    use crate::vehicle::{MoveLevel, TurnLevel};

    fn setup() -> (SharedVehicleState, OutgoingCommandQueue, ControlLoop) {
        let state = SharedVehicleState::new();
        let queue = OutgoingCommandQueue::new();
        let control = ControlLoop::new(state.clone(), queue.clone());
        (state, queue, control)
    }

    fn telemetry(state: &SharedVehicleState, speed: f32, heading: f32) {
        let frame = format!("T 100 -- 0 0 {heading} {speed} ;");
        state.apply(&parse(&frame).unwrap().message);
    }

    #[test]
    fn test_tick_at_target_sends_nothing() {
        let (_state, queue, mut control) = setup();
        assert_eq!(control.tick(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_tick_accelerates_and_turns_left() {
        let (state, queue, mut control) = setup();
        state.set_expected_speed(5.0);
        state.set_expected_heading(45.0);

        assert_eq!(control.tick().as_deref(), Some("al;"));
        assert_eq!(queue.drain_all(), vec!["al;"]);
        assert_eq!(state.move_level(), MoveLevel::Accelerating);
        assert_eq!(state.turn_level(), TurnLevel::Left);
    }

    #[test]
    fn test_tick_stops_at_clamp() {
        let (state, queue, mut control) = setup();
        state.set_expected_speed(5.0);
        state.set_expected_heading(45.0);

        assert_eq!(control.tick().as_deref(), Some("al;"));
        assert_eq!(control.tick().as_deref(), Some("l;"));
        // Accelerating and hard left: nothing left to do.
        assert_eq!(control.tick(), None);

        assert_eq!(queue.drain_all(), vec!["al;", "l;"]);
        assert_eq!(state.turn_level(), TurnLevel::HardLeft);
    }

    #[test]
    fn test_tick_brakes_and_turns_right() {
        let (state, queue, mut control) = setup();
        telemetry(&state, 4.0, 30.0);
        state.set_expected_speed(1.0);
        state.set_expected_heading(-40.0);

        assert_eq!(control.tick().as_deref(), Some("br;"));
        assert_eq!(control.tick().as_deref(), Some("r;"));
        assert_eq!(control.tick(), None);
        assert_eq!(queue.len(), 2);
        assert_eq!(state.move_level(), MoveLevel::Braking);
        assert_eq!(state.turn_level(), TurnLevel::HardRight);
    }

    #[test]
    fn test_nan_speed_sends_nothing() {
        let (state, _queue, mut control) = setup();
        state.set_expected_speed(f32::NAN);
        assert_eq!(control.tick(), None);
    }

    #[tokio::test]
    async fn test_loop_waits_for_telemetry() {
        let (state, queue, control) = setup();
        state.set_expected_speed(5.0);

        let handle = control
            .with_tick_interval(Duration::from_millis(5))
            .spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(queue.is_empty(), "no tick before first telemetry");

        telemetry(&state, 0.0, 0.0);
        tokio::time::timeout(Duration::from_secs(2), async {
            while queue.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("loop should tick after telemetry");

        let ticks = handle.shutdown().await.unwrap();
        assert!(ticks >= 1);
        assert_eq!(queue.drain_all()[0], "a;");
    }

    #[tokio::test]
    async fn test_shutdown_before_initialization() {
        let (_state, _queue, control) = setup();
        let handle = control.spawn();
        let ticks = tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("shutdown should not hang")
            .unwrap();
        assert_eq!(ticks, 0);
    }

    #[tokio::test]
    async fn test_dropped_handle_stops_waiting_loop() {
        let (state, queue, control) = setup();
        state.set_expected_speed(5.0);
        drop(control.with_tick_interval(Duration::from_millis(5)).spawn());

        telemetry(&state, 0.0, 0.0);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(queue.is_empty());
        assert_eq!(state.move_level(), MoveLevel::Rolling);
    }

    #[tokio::test]
    async fn test_dropped_handle_stops_running_loop() {
        let (state, queue, control) = setup();
        telemetry(&state, 0.0, 0.0);
        let handle = control
            .with_tick_interval(Duration::from_millis(5))
            .spawn();
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_millis(20)).await;

        state.set_expected_speed(5.0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(queue.is_empty());
        assert_eq!(state.move_level(), MoveLevel::Rolling);
    }

    #[tokio::test]
    async fn test_shutdown_while_running() {
        let (state, _queue, control) = setup();
        telemetry(&state, 1.0, 1.0);

        let handle = control
            .with_tick_interval(Duration::from_secs(3600))
            .spawn();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("shutdown should wake a sleeping loop")
            .unwrap();
    }
}
