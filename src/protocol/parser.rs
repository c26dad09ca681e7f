//! Frame parser.
//!
//! Converts the text of one frame into a [`Message`]. Dispatch happens on
//! the first whitespace-separated token, which must be a one-character
//! [`MessageTag`].
//!
//! # Failure Policy
//!
//! - A malformed header field, a wrong field count or an unknown top-level
//!   tag fails the whole frame with a [`ParseFailure`].
//! - A malformed object record inside an otherwise valid telemetry frame
//!   drops only that object. The failure is reported in
//!   [`ParsedFrame::dropped`] and the rest of the frame is kept.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::{FromStr, SplitAsciiWhitespace};

use thiserror::Error;

use super::message::{
    ControlEcho, EventKind, Initialization, Martian, Message, MessageTag, Object, Obstacle,
    Telemetry,
};

// ============================================================================
// ParseStage
// ============================================================================

/// The part of a frame that failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// The leading message tag.
    Tag,
    /// A fixed header field.
    Field(&'static str),
    /// The two-character control echo.
    ControlEcho,
    /// Tokens left over after the last expected field.
    Trailing,
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag => f.write_str("tag"),
            Self::Field(name) => write!(f, "field `{name}`"),
            Self::ControlEcho => f.write_str("control echo"),
            Self::Trailing => f.write_str("trailing data"),
        }
    }
}

// ============================================================================
// ParseFailure
// ============================================================================

/// A frame that was rejected as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Frame parse failed at {stage}: {reason} (frame: {frame:?})")]
pub struct ParseFailure {
    /// The offending frame text.
    pub frame: String,
    /// Where parsing stopped.
    pub stage: ParseStage,
    /// What was wrong.
    pub reason: String,
}

impl ParseFailure {
    fn new(frame: &str, stage: ParseStage, reason: impl Into<String>) -> Self {
        Self {
            frame: frame.to_owned(),
            stage,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// ObjectParseFailure
// ============================================================================

/// A single object record that was dropped from a telemetry frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Object record {index} dropped: {reason} (record: {record:?})")]
pub struct ObjectParseFailure {
    /// Zero-based position of the record among the frame's records.
    pub index: usize,
    /// The record text.
    pub record: String,
    /// What was wrong.
    pub reason: String,
}

// ============================================================================
// ParsedFrame
// ============================================================================

/// Result of parsing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFrame {
    /// The decoded message.
    pub message: Message,
    /// Object records that were skipped. Always empty for non-telemetry.
    pub dropped: Vec<ObjectParseFailure>,
}

impl ParsedFrame {
    fn complete(message: Message) -> Self {
        Self {
            message,
            dropped: Vec::new(),
        }
    }

    /// Returns `true` if no object record was dropped.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Parses one frame.
///
/// The frame may still carry its `;` terminator; anything after the first
/// terminator is ignored.
///
/// # Errors
///
/// Returns [`ParseFailure`] if the tag is unknown or a header field is
/// missing, malformed or followed by unexpected tokens.
pub fn parse(frame: &str) -> Result<ParsedFrame, ParseFailure> {
    let body = frame.split(';').next().unwrap_or_default();
    let mut fields = Fields::new(frame, body);

    let tag_token = fields
        .tokens
        .next()
        .ok_or_else(|| ParseFailure::new(frame, ParseStage::Tag, "empty frame"))?;

    let tag = single_char(tag_token)
        .and_then(MessageTag::from_char)
        .ok_or_else(|| {
            ParseFailure::new(
                frame,
                ParseStage::Tag,
                format!("unknown message tag `{tag_token}`"),
            )
        })?;

    match tag {
        MessageTag::Initialization => parse_initialization(fields).map(ParsedFrame::complete),
        MessageTag::Telemetry => parse_telemetry(fields),
        MessageTag::Crash => parse_event(fields, EventKind::Crash),
        MessageTag::FellIntoCrater => parse_event(fields, EventKind::FellIntoCrater),
        MessageTag::KilledByMartian => parse_event(fields, EventKind::KilledByMartian),
        MessageTag::Success => parse_event(fields, EventKind::Success),
        MessageTag::EndOfRun => parse_end_of_run(fields),
    }
}

// ============================================================================
// Message Grammars
// ============================================================================

fn parse_initialization(mut fields: Fields<'_>) -> Result<Message, ParseFailure> {
    let dx = fields.number("dx")?;
    let dy = fields.number("dy")?;
    let time_limit = fields.number("time_limit")?;
    let min_sensor = fields.number("min_sensor")?;
    let max_sensor = fields.number("max_sensor")?;
    let max_speed = fields.number("max_speed")?;
    let max_turn = fields.number("max_turn")?;
    let max_hard_turn = fields.number("max_hard_turn")?;
    fields.finish()?;

    Ok(Message::Initialization(Initialization {
        map_size: (dx, dy),
        time_limit,
        sensor_range: (min_sensor, max_sensor),
        max_speed,
        max_turn,
        max_hard_turn,
    }))
}

fn parse_telemetry(mut fields: Fields<'_>) -> Result<ParsedFrame, ParseFailure> {
    let timestamp = fields.number("timestamp")?;
    let control = fields.control_echo()?;
    let x = fields.number("x")?;
    let y = fields.number("y")?;
    let heading = fields.number("dir")?;
    let speed = fields.number("speed")?;

    let (objects, dropped) = parse_objects(fields.tokens);

    Ok(ParsedFrame {
        message: Message::Telemetry(Telemetry {
            timestamp,
            control,
            position: (x, y),
            heading,
            speed,
            objects,
        }),
        dropped,
    })
}

fn parse_event(mut fields: Fields<'_>, kind: EventKind) -> Result<ParsedFrame, ParseFailure> {
    let timestamp = fields.number("timestamp")?;
    fields.finish()?;
    Ok(ParsedFrame::complete(Message::Event { kind, timestamp }))
}

fn parse_end_of_run(mut fields: Fields<'_>) -> Result<ParsedFrame, ParseFailure> {
    let timestamp = fields.number("timestamp")?;
    let score = fields.number("score")?;
    fields.finish()?;
    Ok(ParsedFrame::complete(Message::EndOfRun { timestamp, score }))
}

// ============================================================================
// Object Records
// ============================================================================

/// Object tags that start a record.
const OBJECT_TAGS: [char; 4] = ['b', 'c', 'h', 'm'];

/// Splits the trailing telemetry text into records and parses each one.
///
/// A record starts at every object-tag character, whether or not it is
/// preceded by whitespace. Text before the first tag forms a record of
/// its own and is reported.
fn parse_objects(tokens: SplitAsciiWhitespace<'_>) -> (Vec<Object>, Vec<ObjectParseFailure>) {
    let text = tokens.collect::<Vec<_>>().join(" ");

    let mut cuts: Vec<usize> = text
        .char_indices()
        .filter(|(_, c)| OBJECT_TAGS.contains(c))
        .map(|(i, _)| i)
        .collect();
    if cuts.first() != Some(&0) {
        cuts.insert(0, 0);
    }

    let records = cuts
        .iter()
        .zip(cuts.iter().skip(1).copied().chain([text.len()]))
        .map(|(&from, to)| text[from..to].trim())
        .filter(|record| !record.is_empty());

    let mut objects = Vec::new();
    let mut dropped = Vec::new();
    for (index, record) in records.enumerate() {
        match parse_object(record) {
            Ok(object) => objects.push(object),
            Err(reason) => dropped.push(ObjectParseFailure {
                index,
                record: record.to_owned(),
                reason,
            }),
        }
    }
    (objects, dropped)
}

fn parse_object(record: &str) -> Result<Object, String> {
    let Some(tag) = record.chars().next() else {
        return Err("empty record".to_owned());
    };
    let values: Vec<&str> = record[tag.len_utf8()..].split_ascii_whitespace().collect();

    let numbers = |expected: usize| -> Result<Vec<f32>, String> {
        if values.len() != expected {
            return Err(format!(
                "expected {expected} values after `{tag}`, found {}",
                values.len()
            ));
        }
        values
            .iter()
            .map(|v| v.parse::<f32>().map_err(|e| format!("`{v}`: {e}")))
            .collect()
    };

    let obstacle = |v: Vec<f32>| Obstacle {
        x: v[0],
        y: v[1],
        radius: v[2],
    };

    match tag {
        'b' => numbers(3).map(|v| Object::Boulder(obstacle(v))),
        'c' => numbers(3).map(|v| Object::Crater(obstacle(v))),
        'h' => numbers(3).map(|v| Object::Home(obstacle(v))),
        'm' => numbers(4).map(|v| {
            Object::Enemy(Martian {
                x: v[0],
                y: v[1],
                heading: v[2],
                speed: v[3],
            })
        }),
        _ => Err(format!("unknown object tag `{tag}`")),
    }
}

// ============================================================================
// Fields
// ============================================================================

/// Cursor over the whitespace-separated tokens of a frame.
struct Fields<'a> {
    frame: &'a str,
    tokens: SplitAsciiWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(frame: &'a str, body: &'a str) -> Self {
        Self {
            frame,
            tokens: body.split_ascii_whitespace(),
        }
    }

    fn next(&mut self, stage: ParseStage) -> Result<&'a str, ParseFailure> {
        self.tokens
            .next()
            .ok_or_else(|| ParseFailure::new(self.frame, stage, "missing"))
    }

    fn number<T>(&mut self, name: &'static str) -> Result<T, ParseFailure>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let stage = ParseStage::Field(name);
        let token = self.next(stage)?;
        token
            .parse()
            .map_err(|e| ParseFailure::new(self.frame, stage, format!("`{token}`: {e}")))
    }

    fn control_echo(&mut self) -> Result<ControlEcho, ParseFailure> {
        let token = self.next(ParseStage::ControlEcho)?;
        ControlEcho::from_token(token).ok_or_else(|| {
            ParseFailure::new(
                self.frame,
                ParseStage::ControlEcho,
                format!("expected two characters, found `{token}`"),
            )
        })
    }

    fn finish(mut self) -> Result<(), ParseFailure> {
        match self.tokens.next() {
            None => Ok(()),
            Some(token) => Err(ParseFailure::new(
                self.frame,
                ParseStage::Trailing,
                format!("unexpected token `{token}`"),
            )),
        }
    }
}

fn single_char(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
