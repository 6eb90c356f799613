//! Schedule quality metrics (KPIs).
//!
//! Computes filling-line performance indicators from a finished activity
//! sequence and its input lots.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Last activity end − first activity start |
//! | Utilization | Total FILL hours ÷ makespan |
//! | Changeover count | Number of CHANGEOVER activities |
//! | Clean blocks | Runs between CLEANs that contain at least one FILL |
//! | Window violations | FILLs starting before `window_start` or ending after `window_end` |
//! | Total lateness | Sum of max(0, FILL end − `window_end`) |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{duration_to_hours, Activity, ActivityKind, Lot};

/// Schedule performance indicators.
///
/// All time values are in hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleKpi {
    /// Last activity end minus first activity start.
    pub makespan_hours: f64,
    /// Sum of FILL durations.
    pub total_fill_hours: f64,
    /// Sum of CHANGEOVER durations.
    pub total_changeover_hours: f64,
    /// Sum of CLEAN durations.
    pub total_clean_hours: f64,
    /// FILL share of the makespan (0.0..1.0).
    pub utilization: f64,
    /// Mean FILL duration.
    pub avg_fill_hours: f64,
    /// Runs between CLEANs holding at least one FILL.
    pub clean_blocks: usize,
    /// Number of CHANGEOVER activities.
    pub changeover_count: usize,
    /// Number of FILL activities.
    pub lots_scheduled: usize,
    /// FILLs outside their lot's window.
    pub window_violations: usize,
    /// Sum of deadline overruns.
    pub total_lateness_hours: f64,
}

impl ScheduleKpi {
    /// Computes KPIs from an activity sequence and its input lots.
    ///
    /// # Arguments
    /// * `activities` - Activities ordered by start.
    /// * `lots` - The input lots (for time windows).
    pub fn calculate(activities: &[Activity], lots: &[Lot]) -> Self {
        let by_id: HashMap<&str, &Lot> = lots.iter().map(|l| (l.lot_id.as_str(), l)).collect();
        let mut kpi = Self::default();
        let mut block_has_fill = false;

        for activity in activities {
            let hours = activity.duration_hours();
            match activity.kind {
                ActivityKind::Fill => {
                    kpi.total_fill_hours += hours;
                    kpi.lots_scheduled += 1;
                    block_has_fill = true;

                    let lot = activity.lot_id.as_deref().and_then(|id| by_id.get(id));
                    if let Some(lot) = lot {
                        let early = lot.window_start.is_some_and(|ws| activity.start < ws);
                        let late = lot.window_end.filter(|&we| activity.end > we);
                        if early || late.is_some() {
                            kpi.window_violations += 1;
                        }
                        if let Some(we) = late {
                            kpi.total_lateness_hours += duration_to_hours(activity.end - we);
                        }
                    }
                }
                ActivityKind::Changeover => {
                    kpi.total_changeover_hours += hours;
                    kpi.changeover_count += 1;
                }
                ActivityKind::Clean => {
                    kpi.total_clean_hours += hours;
                    if block_has_fill {
                        kpi.clean_blocks += 1;
                    }
                    block_has_fill = false;
                }
            }
        }
        if block_has_fill {
            kpi.clean_blocks += 1;
        }

        if let (Some(first), Some(last)) = (activities.first(), activities.last()) {
            kpi.makespan_hours = duration_to_hours(last.end - first.start);
        }
        if kpi.makespan_hours > 0.0 {
            kpi.utilization = kpi.total_fill_hours / kpi.makespan_hours;
        }
        if kpi.lots_scheduled > 0 {
            kpi.avg_fill_hours = kpi.total_fill_hours / kpi.lots_scheduled as f64;
        }

        kpi
    }

    /// KPI mapping keyed by stable snake_case names.
    pub fn as_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("makespan_hours", self.makespan_hours),
            ("total_fill_hours", self.total_fill_hours),
            ("total_changeover_hours", self.total_changeover_hours),
            ("total_clean_hours", self.total_clean_hours),
            ("utilization", self.utilization),
            ("avg_fill_hours", self.avg_fill_hours),
            ("clean_blocks", self.clean_blocks as f64),
            ("changeover_count", self.changeover_count as f64),
            ("lots_scheduled", self.lots_scheduled as f64),
            ("window_violations", self.window_violations as f64),
            ("total_lateness_hours", self.total_lateness_hours),
        ])
    }
}
