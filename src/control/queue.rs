//! Outgoing command queue.
//!
//! FIFO of encoded command batches waiting to be written to the
//! transport. Producers (the control loop) call [`OutgoingCommandQueue::enqueue`];
//! the I/O loop takes everything at once with
//! [`OutgoingCommandQueue::drain_all`]. The queue has its own lock,
//! independent of the vehicle-state lock.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

// ============================================================================
// OutgoingCommandQueue
// ============================================================================

/// Thread-safe FIFO of command text.
#[derive(Clone, Default)]
pub struct OutgoingCommandQueue {
    /// Pending units, oldest first.
    inner: Arc<Mutex<VecDeque<String>>>,
}

impl fmt::Debug for OutgoingCommandQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingCommandQueue")
            .field("len", &self.len())
            .finish()
    }
}

impl OutgoingCommandQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one unit of command text.
    pub fn enqueue(&self, command: impl Into<String>) {
        self.inner.lock().push_back(command.into());
    }

    /// Removes and returns everything queued, oldest first.
    ///
    /// Never waits for more items.
    #[must_use]
    pub fn drain_all(&self) -> Vec<String> {
        let pending = mem::take(&mut *self.inner.lock());
        pending.into()
    }

    /// Number of queued units.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
