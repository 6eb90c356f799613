//! Run configuration.
//!
//! Process constants of the filling line plus strategy tuning knobs.
//! All fields have defaults, so a partial document deserializes cleanly.
//! A configuration is read-only for the duration of one scheduling run.

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Longest accepted single duration (lot fill, clean window, clean,
/// changeover), in hours.
pub const MAX_DURATION_HOURS: f64 = 10_000.0;

/// Longest accepted exact-solver time limit (one week), in seconds.
pub const MAX_TIME_LIMIT_SECONDS: f64 = 604_800.0;

/// When a CLEAN must be inserted between two lots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningPolicy {
    /// Clean on every product-type change (after the changeover).
    OnTypeChange,
    /// Clean when the continuous run since the last CLEAN would exceed
    /// `window_hours`. The clean resets the line (no changeover follows).
    #[default]
    WindowExhausted,
    /// Either trigger.
    OnTypeChangeOrWindow,
}

impl CleaningPolicy {
    /// Whether a product-type change triggers cleaning.
    pub fn on_type_change(&self) -> bool {
        matches!(self, Self::OnTypeChange | Self::OnTypeChangeOrWindow)
    }

    /// Whether the `window_hours` run limit is enforced.
    pub fn enforces_window(&self) -> bool {
        matches!(self, Self::WindowExhausted | Self::OnTypeChangeOrWindow)
    }
}

/// Order in which CFS visits type clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterOrder {
    /// Largest lot count first.
    #[default]
    ByCount,
    /// Largest total fill hours first.
    ByTotalHours,
}

/// Sequencing rule inside a CFS cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithinClusterOrder {
    /// Shortest fill first.
    #[default]
    Spt,
    /// Longest fill first.
    Lpt,
}

/// SmartPack (beam search) scoring weights.
///
/// Scores are hours-equivalent; higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartPackTuning {
    /// Weight on transition hours (changeover + clean).
    pub changeover_weight: f64,
    /// Bonus for continuing the current product type.
    pub streak_bonus: f64,
    /// Penalty per hour of clean-window capacity no remaining lot can use.
    pub slack_waste_weight: f64,
    /// Switch-penalty multiplier at an empty window.
    pub dynamic_switch_mult_min: f64,
    /// Switch-penalty multiplier at a full window.
    pub dynamic_switch_mult_max: f64,
    /// Headroom kept free at the end of each clean window (hours).
    pub util_pad_hours: f64,
    /// Weight of the best follow-up score in the look-ahead.
    pub lookahead_weight: f64,
    /// Weight on lot priority.
    pub priority_weight: f64,
    /// Weight on deadline urgency `1 / (1 + slack_hours)`.
    pub urgency_weight: f64,
}

impl Default for SmartPackTuning {
    fn default() -> Self {
        Self {
            changeover_weight: 1.0,
            streak_bonus: 1.0,
            slack_waste_weight: 3.0,
            dynamic_switch_mult_min: 1.0,
            dynamic_switch_mult_max: 1.5,
            util_pad_hours: 0.0,
            lookahead_weight: 0.25,
            priority_weight: 1.0,
            urgency_weight: 4.0,
        }
    }
}

/// Cluster-first strategy knobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterTuning {
    /// Cluster visiting order.
    pub cluster_order: ClusterOrder,
    /// Sequencing inside each cluster.
    pub within: WithinClusterOrder,
}

/// Scheduling run configuration.
///
/// # Example
/// ```
/// use u_filling::models::{CleaningPolicy, Configuration};
///
/// let config = Configuration::default()
///     .with_changeovers(0.5, 1.0)
///     .with_clean_hours(2.0)
///     .with_cleaning_policy(CleaningPolicy::OnTypeChange);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Fill rate (vials per hour).
    pub fill_rate_vph: f64,
    /// Duration of one CLEAN (hours).
    pub clean_hours: f64,
    /// Maximum continuous run between CLEANs (hours).
    pub window_hours: f64,
    /// Changeover between lots of the same type (hours).
    pub chg_same_hours: f64,
    /// Changeover between lots of different types (hours).
    pub chg_diff_hours: f64,
    /// Cleaning trigger policy.
    pub cleaning_policy: CleaningPolicy,
    /// Emit a CLEAN before the first lot.
    pub start_with_clean: bool,
    /// Treat lot time windows as hard constraints.
    pub hard_windows: bool,
    /// SmartPack candidates kept per step (K ≥ 1).
    pub beam_width: usize,
    /// Exact solver wall-clock limit (seconds).
    pub time_limit_seconds: f64,
    /// Exact solver accepted relative optimality gap.
    pub mip_gap: f64,
    /// CFS urgency threshold for the critical tier.
    pub critical_threshold: f64,
    /// Hybrid: fraction of lots scheduled by SmartPack.
    pub pack_first_ratio: f64,
    /// Largest instance the exact strategy accepts.
    pub milp_max_lots: usize,
    /// SmartPack scoring weights.
    pub smart_pack: SmartPackTuning,
    /// CFS knobs.
    pub cfs: ClusterTuning,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            fill_rate_vph: 19_920.0,
            clean_hours: 24.0,
            window_hours: 120.0,
            chg_same_hours: 4.0,
            chg_diff_hours: 8.0,
            cleaning_policy: CleaningPolicy::default(),
            start_with_clean: false,
            hard_windows: false,
            beam_width: 3,
            time_limit_seconds: 60.0,
            mip_gap: 0.01,
            critical_threshold: 1.0,
            pack_first_ratio: 0.5,
            milp_max_lots: 30,
            smart_pack: SmartPackTuning::default(),
            cfs: ClusterTuning::default(),
        }
    }
}

impl Configuration {
    /// Sets the fill rate.
    pub fn with_fill_rate(mut self, vials_per_hour: f64) -> Self {
        self.fill_rate_vph = vials_per_hour;
        self
    }

    /// Sets the CLEAN duration.
    pub fn with_clean_hours(mut self, hours: f64) -> Self {
        self.clean_hours = hours;
        self
    }

    /// Sets the clean-window length.
    pub fn with_window_hours(mut self, hours: f64) -> Self {
        self.window_hours = hours;
        self
    }

    /// Sets same-type and different-type changeover durations.
    pub fn with_changeovers(mut self, same_hours: f64, diff_hours: f64) -> Self {
        self.chg_same_hours = same_hours;
        self.chg_diff_hours = diff_hours;
        self
    }

    /// Sets the cleaning policy.
    pub fn with_cleaning_policy(mut self, policy: CleaningPolicy) -> Self {
        self.cleaning_policy = policy;
        self
    }

    /// Emits a CLEAN before the first lot.
    pub fn with_initial_clean(mut self, enabled: bool) -> Self {
        self.start_with_clean = enabled;
        self
    }

    /// Treats lot windows as hard constraints.
    pub fn with_hard_windows(mut self, enabled: bool) -> Self {
        self.hard_windows = enabled;
        self
    }

    /// Sets the SmartPack beam width.
    pub fn with_beam_width(mut self, width: usize) -> Self {
        self.beam_width = width;
        self
    }

    /// Sets exact-solver limits.
    pub fn with_solver_limits(mut self, time_limit_seconds: f64, mip_gap: f64) -> Self {
        self.time_limit_seconds = time_limit_seconds;
        self.mip_gap = mip_gap;
        self
    }

    /// Sets the CFS critical threshold.
    pub fn with_critical_threshold(mut self, threshold: f64) -> Self {
        self.critical_threshold = threshold;
        self
    }

    /// Sets the hybrid SmartPack fraction.
    pub fn with_pack_first_ratio(mut self, ratio: f64) -> Self {
        self.pack_first_ratio = ratio;
        self
    }

    /// Checks every tuning parameter's range.
    ///
    /// # Errors
    /// `ScheduleError::Configuration` naming the first offending field.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        fn check(ok: bool, message: impl FnOnce() -> String) -> Result<(), ScheduleError> {
            if ok {
                Ok(())
            } else {
                Err(ScheduleError::Configuration(message()))
            }
        }

        check(self.fill_rate_vph.is_finite() && self.fill_rate_vph > 0.0, || {
            format!("fill_rate_vph must be > 0 (got {})", self.fill_rate_vph)
        })?;
        check(
            self.window_hours > 0.0 && self.window_hours <= MAX_DURATION_HOURS,
            || format!("window_hours must be within (0, {MAX_DURATION_HOURS}] (got {})", self.window_hours),
        )?;
        for (name, value) in [
            ("clean_hours", self.clean_hours),
            ("chg_same_hours", self.chg_same_hours),
            ("chg_diff_hours", self.chg_diff_hours),
        ] {
            check((0.0..=MAX_DURATION_HOURS).contains(&value), || {
                format!("{name} must be within [0, {MAX_DURATION_HOURS}] (got {value})")
            })?;
        }
        check(self.beam_width >= 1, || {
            format!("beam_width must be >= 1 (got {})", self.beam_width)
        })?;
        check(
            (0.0..=MAX_TIME_LIMIT_SECONDS).contains(&self.time_limit_seconds),
            || {
                format!(
                    "time_limit_seconds must be within [0, {MAX_TIME_LIMIT_SECONDS}] (got {})",
                    self.time_limit_seconds
                )
            },
        )?;
        check((0.0..=1.0).contains(&self.mip_gap), || {
            format!("mip_gap must be within [0, 1] (got {})", self.mip_gap)
        })?;
        check((0.0..=1.0).contains(&self.pack_first_ratio), || {
            format!("pack_first_ratio must be within [0, 1] (got {})", self.pack_first_ratio)
        })?;
        check(self.critical_threshold.is_finite(), || {
            "critical_threshold must be finite".to_string()
        })?;
        check(self.milp_max_lots >= 1, || "milp_max_lots must be >= 1".to_string())?;

        let sp = &self.smart_pack;
        check(
            sp.dynamic_switch_mult_min <= sp.dynamic_switch_mult_max,
            || {
                format!(
                    "smart_pack.dynamic_switch_mult_min ({}) exceeds dynamic_switch_mult_max ({})",
                    sp.dynamic_switch_mult_min, sp.dynamic_switch_mult_max
                )
            },
        )?;
        check(
            sp.util_pad_hours >= 0.0 && sp.util_pad_hours < self.window_hours,
            || format!("smart_pack.util_pad_hours out of range (got {})", sp.util_pad_hours),
        )?;

        Ok(())
    }
}
