//! Event model: one captured input action plus its timing
//!
//! Events serialize to JSON objects tagged by variant, with `offset_ms`
//! kept as an integer so persisted timing round-trips exactly.

use serde::{Deserialize, Serialize};

/// Schema version written into persisted macros.
pub const FORMAT_VERSION: u32 = 1;

/// Single recorded action, stamped with elapsed ms since recording start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub offset_ms: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Pointer motion to absolute screen coordinates.
    Move { x: i32, y: i32 },
    /// Pointer button transition at the given coordinates.
    Button {
        button: Button,
        action: Action,
        x: i32,
        y: i32,
    },
    /// Key transition, identified by a stable key name.
    Key { key: String, action: Action },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Press,
    Release,
}

/// A frozen, ordered sequence of recorded events.
///
/// Offsets are relative to recording start, never wall-clock, and are
/// non-decreasing in sequence order. An empty macro is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    pub version: u32,
    pub events: Vec<Event>,
}

impl Macro {
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION,
            events: Vec::new(),
        }
    }

    pub fn from_events(events: Vec<Event>) -> Self {
        Self {
            version: FORMAT_VERSION,
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Offset of the last event, which is also the nominal playback duration.
    pub fn duration_ms(&self) -> u64 {
        self.events.last().map(|e| e.offset_ms).unwrap_or(0)
    }

    /// Offsets never decrease across the sequence. Duplicates are fine;
    /// insertion order is authoritative for simultaneous events.
    pub fn is_monotonic(&self) -> bool {
        self.events.windows(2).all(|w| w[0].offset_ms <= w[1].offset_ms)
    }
}

impl Default for Macro {
    fn default() -> Self {
        Self::new()
    }
}
