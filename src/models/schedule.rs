//! Schedule result model.
//!
//! The fully-timed activity sequence returned to the caller, with its
//! headline metrics and KPI set. Created fresh per run and owned by the
//! caller afterward.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Activity, ActivityKind, Lot};
use crate::scheduler::{ScheduleKpi, StrategyId};

/// How close to optimal a result is known to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optimality {
    /// Produced by a heuristic; no optimality claim.
    #[default]
    Heuristic,
    /// Proven optimal by the exact solver.
    Optimal,
    /// Proven within the configured `mip_gap` of optimal.
    WithinGap,
    /// Feasible, but no proven bound puts it within `mip_gap` of optimal
    /// (solver time limit, or the relaxed model undercuts the timeline).
    Degraded,
}

/// A complete filling-line schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// Strategy that produced this schedule.
    pub strategy: StrategyId,
    /// Activities ordered by non-decreasing start.
    pub activities: Vec<Activity>,
    /// Last activity end minus first activity start (hours).
    pub makespan_hours: f64,
    /// Number of CHANGEOVER activities.
    pub changeover_count: usize,
    /// Number of FILL activities.
    pub lots_scheduled: usize,
    /// FILL activities outside their lot's time window.
    pub window_violations: usize,
    /// Aggregate performance indicators.
    pub kpis: ScheduleKpi,
    /// Optimality status.
    pub optimality: Optimality,
    /// Non-fatal findings (validator warnings, ignored sequence ids).
    pub warnings: Vec<String>,
}

impl ScheduleResult {
    /// Builds a result from a finished activity sequence.
    ///
    /// Headline metrics are taken from the computed KPI set, so the two
    /// never disagree.
    pub fn new(strategy: StrategyId, activities: Vec<Activity>, lots: &[Lot]) -> Self {
        let kpis = ScheduleKpi::calculate(&activities, lots);
        Self {
            strategy,
            makespan_hours: kpis.makespan_hours,
            changeover_count: kpis.changeover_count,
            lots_scheduled: kpis.lots_scheduled,
            window_violations: kpis.window_violations,
            activities,
            kpis,
            optimality: Optimality::Heuristic,
            warnings: Vec::new(),
        }
    }

    /// Sets the optimality status.
    pub fn with_optimality(mut self, optimality: Optimality) -> Self {
        self.optimality = optimality;
        self
    }

    /// Appends non-fatal findings.
    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    /// Whether the exact solver stopped before proving optimality.
    pub fn is_degraded(&self) -> bool {
        self.optimality == Optimality::Degraded
    }

    /// First activity start.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.activities.first().map(|a| a.start)
    }

    /// Last activity end.
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.activities.last().map(|a| a.end)
    }

    /// Lot ids in FILL order.
    pub fn fill_order(&self) -> Vec<&str> {
        self.activities
            .iter()
            .filter_map(|a| match a.kind {
                ActivityKind::Fill => a.lot_id.as_deref(),
                _ => None,
            })
            .collect()
    }

    /// Activities of one kind.
    pub fn activities_of(&self, kind: ActivityKind) -> impl Iterator<Item = &Activity> {
        self.activities.iter().filter(move |a| a.kind == kind)
    }

    /// Sum of all activity durations (hours).
    pub fn total_duration_hours(&self) -> f64 {
        self.activities.iter().map(Activity::duration_hours).sum()
    }
}
