//! Built-in dispatching rules.
//!
//! # Categories
//!
//! - **Time-based**: SPT, LPT
//! - **Due-date**: EDD (on `window_end`)
//! - **Priority**: PRIORITY (on lot urgency)
//!
//! # Score Convention
//! All rules return lower scores for higher priority lots.

use super::{DispatchContext, DispatchingRule, RuleScore};
use crate::models::Lot;

/// Shortest Processing Time.
///
/// Prioritizes lots with shorter fill duration.
///
/// # Reference
/// Smith (1956), optimal for minimizing mean flow time on a single machine.
#[derive(Debug, Clone, Copy)]
pub struct Spt;

impl DispatchingRule for Spt {
    fn name(&self) -> &'static str {
        "SPT"
    }

    fn evaluate(&self, lot: &Lot, context: &DispatchContext<'_>) -> RuleScore {
        lot.duration_hours(context.config)
    }

    fn description(&self) -> &'static str {
        "Shortest Processing Time"
    }
}

/// Longest Processing Time.
///
/// Prioritizes lots with longer fill duration. Packs clean windows with
/// large lots first.
#[derive(Debug, Clone, Copy)]
pub struct Lpt;

impl DispatchingRule for Lpt {
    fn name(&self) -> &'static str {
        "LPT"
    }

    fn evaluate(&self, lot: &Lot, context: &DispatchContext<'_>) -> RuleScore {
        -lot.duration_hours(context.config)
    }

    fn description(&self) -> &'static str {
        "Longest Processing Time"
    }
}

/// Earliest Due Date.
///
/// Prioritizes lots whose `window_end` comes first. Lots without a
/// deadline go last.
///
/// # Reference
/// Jackson (1955), optimal for minimizing maximum lateness.
#[derive(Debug, Clone, Copy)]
pub struct Edd;

impl DispatchingRule for Edd {
    fn name(&self) -> &'static str {
        "EDD"
    }

    fn evaluate(&self, lot: &Lot, context: &DispatchContext<'_>) -> RuleScore {
        lot.relative_window(context.origin).1.unwrap_or(f64::MAX)
    }

    fn description(&self) -> &'static str {
        "Earliest Due Date"
    }
}

/// Highest urgency first.
#[derive(Debug, Clone, Copy)]
pub struct Priority;

impl DispatchingRule for Priority {
    fn name(&self) -> &'static str {
        "PRIORITY"
    }

    fn evaluate(&self, lot: &Lot, _context: &DispatchContext<'_>) -> RuleScore {
        -lot.urgency()
    }

    fn description(&self) -> &'static str {
        "Highest Priority"
    }
}
