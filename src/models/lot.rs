//! Lot (production order) model.
//!
//! A lot is one unit of filling work: a product type, a size expressed in
//! vials (or a precomputed fill duration), and an optional time window.
//!
//! # Time Representation
//! Window bounds are absolute plant-local timestamps. Durations are hours.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Configuration;

/// A production lot to be filled.
///
/// Immutable once handed to the engine; strategies borrow lots read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Unique lot identifier.
    pub lot_id: String,
    /// Product type (changeover comparison key).
    pub lot_type: String,
    /// Number of vials. Converted to hours through `fill_rate_vph`.
    pub vials: i64,
    /// Precomputed fill duration (hours). Overrides `vials` when present.
    pub fill_hours: Option<f64>,
    /// Earliest permitted FILL start.
    pub window_start: Option<NaiveDateTime>,
    /// Latest permitted FILL end.
    pub window_end: Option<NaiveDateTime>,
    /// Urgency score (higher = more urgent). `None` = 0.
    pub priority: Option<f64>,
}

impl Lot {
    /// Creates a lot sized in vials.
    pub fn new(lot_id: impl Into<String>, lot_type: impl Into<String>, vials: i64) -> Self {
        Self {
            lot_id: lot_id.into(),
            lot_type: lot_type.into(),
            vials,
            fill_hours: None,
            window_start: None,
            window_end: None,
            priority: None,
        }
    }

    /// Creates a lot with a precomputed fill duration.
    pub fn with_hours(lot_id: impl Into<String>, lot_type: impl Into<String>, hours: f64) -> Self {
        Self {
            fill_hours: Some(hours),
            ..Self::new(lot_id, lot_type, 0)
        }
    }

    /// Sets the vial count.
    pub fn with_vials(mut self, vials: i64) -> Self {
        self.vials = vials;
        self
    }

    /// Sets the permitted time window.
    pub fn with_window(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.window_start = Some(start);
        self.window_end = Some(end);
        self
    }

    /// Sets only the deadline (latest FILL end).
    pub fn with_deadline(mut self, end: NaiveDateTime) -> Self {
        self.window_end = Some(end);
        self
    }

    /// Sets only the release time (earliest FILL start).
    pub fn with_release(mut self, start: NaiveDateTime) -> Self {
        self.window_start = Some(start);
        self
    }

    /// Sets the urgency score.
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Fill duration in hours.
    ///
    /// Uses `fill_hours` when given, otherwise `vials / fill_rate_vph`.
    pub fn duration_hours(&self, config: &Configuration) -> f64 {
        match self.fill_hours {
            Some(hours) => hours,
            None => self.vials as f64 / config.fill_rate_vph,
        }
    }

    /// Urgency score used for tiering (absent priority counts as zero).
    #[inline]
    pub fn urgency(&self) -> f64 {
        self.priority.unwrap_or(0.0)
    }

    /// Window bounds relative to `origin`, in hours.
    pub fn relative_window(&self, origin: NaiveDateTime) -> (Option<f64>, Option<f64>) {
        let rel = |t: NaiveDateTime| (t - origin).num_milliseconds() as f64 / 3_600_000.0;
        (self.window_start.map(rel), self.window_end.map(rel))
    }

    /// Hours by which a FILL over `[start, end)` (relative hours) misses the window.
    ///
    /// Zero when the interval lies inside the window.
    pub fn window_miss_hours(&self, origin: NaiveDateTime, start: f64, end: f64) -> f64 {
        let (ws, we) = self.relative_window(origin);
        let early = ws.map_or(0.0, |ws| (ws - start).max(0.0));
        let late = we.map_or(0.0, |we| (end - we).max(0.0));
        early + late
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_duration_from_vials() {
        let config = Configuration::default().with_fill_rate(1000.0);
        let lot = Lot::new("L1", "A", 2500);
        assert!((lot.duration_hours(&config) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_precomputed_hours_override_vials() {
        let config = Configuration::default().with_fill_rate(1000.0);
        let lot = Lot::with_hours("L1", "A", 3.0).with_vials(99_999);
        assert!((lot.duration_hours(&config) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_relative_window() {
        let start = t0();
        let lot = Lot::with_hours("L1", "A", 1.0)
            .with_window(start + chrono::Duration::hours(2), start + chrono::Duration::hours(6));
        let (ws, we) = lot.relative_window(start);
        assert_eq!(ws, Some(2.0));
        assert_eq!(we, Some(6.0));
    }

    #[test]
    fn test_window_miss_hours() {
        let start = t0();
        let lot = Lot::with_hours("L1", "A", 1.0)
            .with_window(start + chrono::Duration::hours(2), start + chrono::Duration::hours(4));
        assert_eq!(lot.window_miss_hours(start, 2.0, 3.0), 0.0);
        assert!((lot.window_miss_hours(start, 1.5, 2.5) - 0.5).abs() < 1e-12);
        assert!((lot.window_miss_hours(start, 3.5, 5.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_urgency_defaults_to_zero() {
        assert_eq!(Lot::new("L1", "A", 10).urgency(), 0.0);
        assert_eq!(Lot::new("L1", "A", 10).with_priority(2.5).urgency(), 2.5);
    }
}
