//! Activity (timeline interval) model.
//!
//! Activities are the engine's output: every interval on the filling line
//! is a FILL, a CLEAN, or a CHANGEOVER. A strategy creates them once and
//! never mutates them afterward.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Activity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    /// Filling a lot.
    Fill,
    /// Line cleaning (fixed `clean_hours`).
    Clean,
    /// Product-type changeover.
    Changeover,
}

impl ActivityKind {
    /// Canonical upper-case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Fill => "FILL",
            ActivityKind::Clean => "CLEAN",
            ActivityKind::Changeover => "CHANGEOVER",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timed interval on the filling line.
///
/// `lot_id` and `lot_type` are present only for [`ActivityKind::Fill`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Category.
    pub kind: ActivityKind,
    /// Filled lot (FILL only).
    pub lot_id: Option<String>,
    /// Filled lot's type (FILL only).
    pub lot_type: Option<String>,
    /// Absolute start.
    pub start: NaiveDateTime,
    /// Absolute end (`end > start`).
    pub end: NaiveDateTime,
    /// Free-text annotation.
    pub note: String,
}

impl Activity {
    /// Creates a FILL activity.
    pub fn fill(
        lot_id: impl Into<String>,
        lot_type: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self {
            kind: ActivityKind::Fill,
            lot_id: Some(lot_id.into()),
            lot_type: Some(lot_type.into()),
            start,
            end,
            note: String::new(),
        }
    }

    /// Creates a CLEAN activity.
    pub fn clean(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            kind: ActivityKind::Clean,
            lot_id: None,
            lot_type: None,
            start,
            end,
            note: String::new(),
        }
    }

    /// Creates a CHANGEOVER activity.
    pub fn changeover(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            kind: ActivityKind::Changeover,
            lot_id: None,
            lot_type: None,
            start,
            end,
            note: String::new(),
        }
    }

    /// Sets the note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Duration in hours, derived from `end - start`.
    #[inline]
    pub fn duration_hours(&self) -> f64 {
        duration_to_hours(self.end - self.start)
    }

    /// Whether this is a FILL.
    #[inline]
    pub fn is_fill(&self) -> bool {
        self.kind == ActivityKind::Fill
    }
}

/// Converts fractional hours to a millisecond-resolution duration.
pub fn hours_to_duration(hours: f64) -> Duration {
    Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

/// Converts a duration to fractional hours.
pub fn duration_to_hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 3_600_000.0
}
