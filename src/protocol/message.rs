//! Incoming message types.
//!
//! Every frame sent by the rover controller decodes into one [`Message`].
//! Messages are transient: they are built per frame, applied to the
//! vehicle state and dropped.
//!
//! # Wire Format
//!
//! | Tag | Message | Fields |
//! |-----|---------|--------|
//! | `I` | [`Initialization`] | `dx dy time_limit min_sensor max_sensor max_speed max_turn max_hard_turn` |
//! | `T` | [`Telemetry`] | `timestamp ctl x y dir speed objects...` |
//! | `B` `C` `K` `S` | [`Message::Event`] | `timestamp` |
//! | `E` | [`Message::EndOfRun`] | `timestamp score` |
//!
//! `Display` renders the wire form, including the trailing terminator.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

// ============================================================================
// Constants
// ============================================================================

/// Frame terminator shared by incoming frames and outgoing commands.
pub const TERMINATOR: u8 = b';';

// ============================================================================
// MessageTag
// ============================================================================

/// One-character tag that opens every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageTag {
    /// `I` - map and vehicle limits, sent once.
    Initialization,
    /// `T` - periodic vehicle state and sensed objects.
    Telemetry,
    /// `B` - crashed into a boulder or the map edge.
    Crash,
    /// `C` - fell into a crater.
    FellIntoCrater,
    /// `K` - killed by a martian.
    KilledByMartian,
    /// `S` - reached home.
    Success,
    /// `E` - run finished.
    EndOfRun,
}

impl MessageTag {
    /// Looks up a tag by its wire character.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(Self::Initialization),
            'T' => Some(Self::Telemetry),
            'B' => Some(Self::Crash),
            'C' => Some(Self::FellIntoCrater),
            'K' => Some(Self::KilledByMartian),
            'S' => Some(Self::Success),
            'E' => Some(Self::EndOfRun),
            _ => None,
        }
    }

    /// Returns the wire character.
    #[inline]
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Initialization => 'I',
            Self::Telemetry => 'T',
            Self::Crash => 'B',
            Self::FellIntoCrater => 'C',
            Self::KilledByMartian => 'K',
            Self::Success => 'S',
            Self::EndOfRun => 'E',
        }
    }
}

// ============================================================================
// EventKind
// ============================================================================

/// Outcome events that carry only a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    /// Hit a boulder or the edge of the map.
    Crash,
    /// Drove into a crater.
    FellIntoCrater,
    /// Caught by a martian.
    KilledByMartian,
    /// Reached the home base.
    Success,
}

impl EventKind {
    /// Returns the message tag for this event.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> MessageTag {
        match self {
            Self::Crash => MessageTag::Crash,
            Self::FellIntoCrater => MessageTag::FellIntoCrater,
            Self::KilledByMartian => MessageTag::KilledByMartian,
            Self::Success => MessageTag::Success,
        }
    }

    /// Returns `true` if the run ended badly.
    #[inline]
    #[must_use]
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::Success)
    }
}

// ============================================================================
// ControlEcho
// ============================================================================

/// Two-character echo of the controller's view of the vehicle controls.
///
/// The first character is the acceleration state (`a`, `b` or `-`), the
/// second the turn state (`L`, `l`, `-`, `r` or `R`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ControlEcho(pub [char; 2]);

impl ControlEcho {
    /// Builds an echo from a two-character token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), None) => Some(Self([a, b])),
            _ => None,
        }
    }

    /// Acceleration character.
    #[inline]
    #[must_use]
    pub const fn movement(self) -> char {
        self.0[0]
    }

    /// Turn character.
    #[inline]
    #[must_use]
    pub const fn turning(self) -> char {
        self.0[1]
    }
}

impl Default for ControlEcho {
    fn default() -> Self {
        Self(['-', '-'])
    }
}

impl fmt::Display for ControlEcho {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0], self.0[1])
    }
}

// ============================================================================
// Objects
// ============================================================================

/// Stationary circular object: boulder, crater or home base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Obstacle {
    /// Centre x (metres).
    pub x: f32,
    /// Centre y (metres).
    pub y: f32,
    /// Radius (metres).
    pub radius: f32,
}

/// A moving enemy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Martian {
    /// Position x (metres).
    pub x: f32,
    /// Position y (metres).
    pub y: f32,
    /// Heading (degrees, counter-clockwise from the x-axis).
    pub heading: f32,
    /// Speed (metres per second).
    pub speed: f32,
}

/// An object sensed in range during one telemetry frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Object {
    /// `b`
    Boulder(Obstacle),
    /// `c`
    Crater(Obstacle),
    /// `h`
    Home(Obstacle),
    /// `m`
    Enemy(Martian),
}

impl Object {
    /// Wire tag of this object.
    #[inline]
    #[must_use]
    pub const fn tag(&self) -> char {
        match self {
            Self::Boulder(_) => 'b',
            Self::Crater(_) => 'c',
            Self::Home(_) => 'h',
            Self::Enemy(_) => 'm',
        }
    }

    /// Position of the object.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> (f32, f32) {
        match self {
            Self::Boulder(o) | Self::Crater(o) | Self::Home(o) => (o.x, o.y),
            Self::Enemy(m) => (m.x, m.y),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boulder(o) | Self::Crater(o) | Self::Home(o) => {
                write!(f, "{} {} {} {}", self.tag(), o.x, o.y, o.radius)
            }
            Self::Enemy(m) => write!(f, "m {} {} {} {}", m.x, m.y, m.heading, m.speed),
        }
    }
}

// ============================================================================
// Initialization
// ============================================================================

/// Map dimensions and vehicle limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Initialization {
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
}

// ============================================================================
// Telemetry
// ============================================================================

/// Periodic vehicle state plus the objects currently in sensor range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    /// Time since the start of the run (milliseconds).
    pub timestamp: u32,
    /// Controller's echo of the current control state.
    pub control: ControlEcho,
    /// Vehicle position (metres).
    pub position: (f32, f32),
    /// Heading (degrees, counter-clockwise from the x-axis).
    pub heading: f32,
    /// Speed (metres per second).
    pub speed: f32,
    /// Objects in range, in wire order.
    pub objects: Vec<Object>,
}

impl Telemetry {
    /// Returns the home base if it is within sensor range.
    #[must_use]
    pub fn home(&self) -> Option<&Obstacle> {
        self.objects.iter().find_map(|object| match object {
            Object::Home(home) => Some(home),
            _ => None,
        })
    }

    /// Iterates the martians in range.
    pub fn enemies(&self) -> impl Iterator<Item = &Martian> {
        self.objects.iter().filter_map(|object| match object {
            Object::Enemy(martian) => Some(martian),
            _ => None,
        })
    }
}

// ============================================================================
// Message
// ============================================================================

/// A parsed incoming frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Message {
    /// Map and limits.
    Initialization(Initialization),
    /// Vehicle state.
    Telemetry(Telemetry),
    /// Crash, crater, martian or success.
    Event {
        /// Which outcome occurred.
        kind: EventKind,
        /// When it occurred (milliseconds).
        timestamp: u32,
    },
    /// End of the run.
    EndOfRun {
        /// When the run ended (milliseconds).
        timestamp: u32,
        /// Final score (time plus penalties).
        score: u32,
    },
}

impl Message {
    /// Returns the tag of this message.
    #[must_use]
    pub const fn tag(&self) -> MessageTag {
        match self {
            Self::Initialization(_) => MessageTag::Initialization,
            Self::Telemetry(_) => MessageTag::Telemetry,
            Self::Event { kind, .. } => kind.tag(),
            Self::EndOfRun { .. } => MessageTag::EndOfRun,
        }
    }

    /// Encodes the message in wire form, terminator included.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.tag().as_char();
        match self {
            Self::Initialization(init) => write!(
                f,
                "{tag} {} {} {} {} {} {} {} {} ;",
                init.map_size.0,
                init.map_size.1,
                init.time_limit,
                init.sensor_range.0,
                init.sensor_range.1,
                init.max_speed,
                init.max_turn,
                init.max_hard_turn
            ),
            Self::Telemetry(t) => {
                write!(
                    f,
                    "{tag} {} {} {} {} {} {}",
                    t.timestamp, t.control, t.position.0, t.position.1, t.heading, t.speed
                )?;
                for object in &t.objects {
                    write!(f, " {object}")?;
                }
                f.write_str(" ;")
            }
            Self::Event { timestamp, .. } => write!(f, "{tag} {timestamp} ;"),
            Self::EndOfRun { timestamp, score } => write!(f, "{tag} {timestamp} {score} ;"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn boulder(x: f32, y: f32, radius: f32) -> Object {
        Object::Boulder(Obstacle { x, y, radius })
    }

    #[test]
    fn test_message_tag_chars() {
        for c in ['I', 'T', 'B', 'C', 'K', 'S', 'E'] {
            let tag = MessageTag::from_char(c).expect("known tag");
            assert_eq!(tag.as_char(), c);
        }
        assert_eq!(MessageTag::from_char('X'), None);
        assert_eq!(MessageTag::from_char('i'), None);
    }

    #[test]
    fn test_control_echo_from_token() {
        let echo = ControlEcho::from_token("aL").expect("two chars");
        assert_eq!(echo.movement(), 'a');
        assert_eq!(echo.turning(), 'L');
        assert_eq!(echo.to_string(), "aL");

        assert!(ControlEcho::from_token("a").is_none());
        assert!(ControlEcho::from_token("abc").is_none());
    }

    #[test]
    fn test_event_is_failure() {
        assert!(EventKind::Crash.is_failure());
        assert!(EventKind::KilledByMartian.is_failure());
        assert!(!EventKind::Success.is_failure());
    }

    #[test]
    fn test_telemetry_encode() {
        let message = Message::Telemetry(Telemetry {
            timestamp: 500,
            control: ControlEcho(['r', 'l']),
            position: (12.5, 8.0),
            heading: 90.0,
            speed: 3.0,
            objects: vec![
                boulder(20.0, 20.0, 1.0),
                Object::Enemy(Martian {
                    x: -3.5,
                    y: 4.0,
                    heading: 180.0,
                    speed: 2.25,
                }),
            ],
        });

        assert_eq!(
            message.encode(),
            "T 500 rl 12.5 8 90 3 b 20 20 1 m -3.5 4 180 2.25 ;"
        );
    }

    #[test]
    fn test_event_and_end_encode() {
        let event = Message::Event {
            kind: EventKind::FellIntoCrater,
            timestamp: 1200,
        };
        assert_eq!(event.encode(), "C 1200 ;");

        let end = Message::EndOfRun {
            timestamp: 30000,
            score: 31500,
        };
        assert_eq!(end.encode(), "E 30000 31500 ;");
    }

    #[test]
    fn test_telemetry_home_and_enemies() {
        let telemetry = Telemetry {
            timestamp: 0,
            control: ControlEcho::default(),
            position: (0.0, 0.0),
            heading: 0.0,
            speed: 0.0,
            objects: vec![
                boulder(1.0, 1.0, 0.5),
                Object::Home(Obstacle {
                    x: 0.0,
                    y: 0.0,
                    radius: 5.0,
                }),
                Object::Enemy(Martian {
                    x: 9.0,
                    y: 9.0,
                    heading: 0.0,
                    speed: 1.0,
                }),
            ],
        };

        let home = telemetry.home().expect("home visible");
        assert_eq!(home.radius, 5.0);
        assert_eq!(telemetry.enemies().count(), 1);
    }

    #[test]
    fn test_object_position() {
        assert_eq!(boulder(3.0, 4.0, 1.0).position(), (3.0, 4.0));
    }
}
