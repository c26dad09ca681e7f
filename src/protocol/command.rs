//! Outgoing control commands.
//!
//! Each [`Command`] is a single ASCII token. A [`CommandBatch`] collects
//! the tokens produced during one control tick and is sent as one unit
//! with a single terminator, e.g. `"arl;"`.
//!
//! | Command | Token |
//! |---------|-------|
//! | [`Command::Accelerate`] | `a` |
//! | [`Command::Brake`] | `b` |
//! | [`Command::TurnLeft`] | `l` |
//! | [`Command::TurnRight`] | `r` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use super::message::TERMINATOR;

// ============================================================================
// Command
// ============================================================================

/// A single control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Step the move level up.
    Accelerate,
    /// Step the move level down.
    Brake,
    /// Step the turn level towards hard left.
    TurnLeft,
    /// Step the turn level towards hard right.
    TurnRight,
}

impl Command {
    /// Returns the wire token.
    #[inline]
    #[must_use]
    pub const fn token(self) -> char {
        match self {
            Self::Accelerate => 'a',
            Self::Brake => 'b',
            Self::TurnLeft => 'l',
            Self::TurnRight => 'r',
        }
    }

    /// Looks up a command by its wire token.
    #[must_use]
    pub const fn from_token(token: char) -> Option<Self> {
        match token {
            'a' => Some(Self::Accelerate),
            'b' => Some(Self::Brake),
            'l' => Some(Self::TurnLeft),
            'r' => Some(Self::TurnRight),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

// ============================================================================
// CommandBatch
// ============================================================================

/// Commands accumulated during one control tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    commands: Vec<Command>,
}

impl CommandBatch {
    /// Creates an empty batch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command.
    #[inline]
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Returns `true` if nothing was queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of queued commands.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Queued commands in order.
    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Encodes the batch as one terminated unit.
    ///
    /// Returns `None` for an empty batch, which is never sent.
    #[must_use]
    pub fn encode(&self) -> Option<String> {
        if self.commands.is_empty() {
            return None;
        }
        let mut out: String = self.commands.iter().map(|c| c.token()).collect();
        out.push(char::from(TERMINATOR));
        Some(out)
    }

    /// Encodes the batch and clears it.
    pub fn take(&mut self) -> Option<String> {
        let encoded = self.encode();
        self.commands.clear();
        encoded
    }
}

// ============================================================================
// Tests
// ============================================================================
