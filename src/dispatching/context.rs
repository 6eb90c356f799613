//! Dispatch context for rule evaluation.

use chrono::NaiveDateTime;

use crate::models::Configuration;

/// Read-only state passed to dispatching rules.
///
/// Carries the configuration (to turn vials into hours) and the schedule
/// origin (to turn window timestamps into relative hours).
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    /// Line configuration.
    pub config: &'a Configuration,
    /// Schedule start.
    pub origin: NaiveDateTime,
}

impl<'a> DispatchContext<'a> {
    /// Creates a context.
    pub fn new(config: &'a Configuration, origin: NaiveDateTime) -> Self {
        Self { config, origin }
    }
}
