//! Changeover and cleaning rules.
//!
//! Pure functions deciding what the line must do between two consecutive
//! lots. Every strategy, and the exact model's cost matrix, reaches these
//! rules through [`transition`], so heuristics and the MILP agree on cost.
//!
//! # Transition Model
//!
//! | Situation | Emitted before the FILL |
//! |-----------|-------------------------|
//! | First lot (or line just cleaned) | nothing |
//! | Same type, no cleaning | CHANGEOVER (`chg_same_hours`) |
//! | Type change, no cleaning | CHANGEOVER (`chg_diff_hours`) |
//! | Type change under a type-change policy | CHANGEOVER, then CLEAN |
//! | Run would exceed `window_hours` | CLEAN only (line reset) |

use crate::models::Configuration;

/// Float tolerance for window-capacity comparisons (hours).
pub const EPSILON_HOURS: f64 = 1e-9;

/// Why a CLEAN precedes a FILL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanReason {
    /// Product type changed under a type-change policy.
    TypeChange,
    /// Continuous run would exceed `window_hours`.
    WindowExhausted,
}

/// What the line does between the previous lot and the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// CHANGEOVER duration (0 = no CHANGEOVER activity).
    pub changeover_hours: f64,
    /// CLEAN trigger, if one is required.
    pub clean: Option<CleanReason>,
}

impl Transition {
    /// A transition with no activity (first lot on a clean line).
    pub const NONE: Transition = Transition {
        changeover_hours: 0.0,
        clean: None,
    };

    /// Total non-productive hours before the FILL.
    pub fn hours(&self, config: &Configuration) -> f64 {
        self.changeover_hours + if self.clean.is_some() { config.clean_hours } else { 0.0 }
    }

    /// Whether the line is cleaned as part of this transition.
    #[inline]
    pub fn cleans(&self) -> bool {
        self.clean.is_some()
    }
}

/// Changeover hours between two consecutive lot types.
///
/// Returns 0 when there is no previous lot, `chg_same_hours` for equal
/// types, and `chg_diff_hours` otherwise.
pub fn changeover_hours(prev_type: Option<&str>, next_type: &str, config: &Configuration) -> f64 {
    match prev_type {
        None => 0.0,
        Some(prev) if prev == next_type => config.chg_same_hours,
        Some(_) => config.chg_diff_hours,
    }
}

/// Type-change trigger of the cleaning policy.
///
/// True when the policy cleans on type change and the type actually changes.
pub fn cleaning_required(prev_type: Option<&str>, next_type: &str, config: &Configuration) -> bool {
    match prev_type {
        Some(prev) => config.cleaning_policy.on_type_change() && prev != next_type,
        None => false,
    }
}

/// Continuous-run trigger of the cleaning policy.
///
/// True when the policy enforces the window and adding `need` hours to the
/// `window_used` run would overflow `window_hours`.
pub fn window_exhausted(window_used: f64, need: f64, config: &Configuration) -> bool {
    config.cleaning_policy.enforces_window()
        && window_used > 0.0
        && window_used + need > config.window_hours + EPSILON_HOURS
}

/// Full transition from the current line state to the next lot.
///
/// `window_used` is the FILL + CHANGEOVER time accumulated since the last
/// CLEAN. A window-triggered CLEAN takes precedence and resets the line, so
/// no changeover is charged after it.
pub fn transition(
    prev_type: Option<&str>,
    next_type: &str,
    next_fill_hours: f64,
    window_used: f64,
    config: &Configuration,
) -> Transition {
    let changeover = changeover_hours(prev_type, next_type, config);

    if prev_type.is_some() && window_exhausted(window_used, changeover + next_fill_hours, config) {
        return Transition {
            changeover_hours: changeover_hours(None, next_type, config),
            clean: Some(CleanReason::WindowExhausted),
        };
    }

    Transition {
        changeover_hours: changeover,
        clean: cleaning_required(prev_type, next_type, config).then_some(CleanReason::TypeChange),
    }
}

/// Cheapest cost the line can be charged between `prev_type` and
/// `next_type`, over every window state.
///
/// Mid-window the transition is the fresh-window one; when the policy
/// enforces the window, an exhausted window replaces it with a bare CLEAN.
pub fn transition_floor_hours(prev_type: &str, next_type: &str, config: &Configuration) -> f64 {
    let fresh = transition(Some(prev_type), next_type, 0.0, 0.0, config).hours(config);
    if config.cleaning_policy.enforces_window() {
        fresh.min(config.clean_hours)
    } else {
        fresh
    }
}
