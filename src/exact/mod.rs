//! Exact sequencing via mixed-integer programming.
//!
//! Bridges the lot-sequencing problem to a MILP backend:
//!
//! 1. The best heuristic sequence (SPT, LPT, CFS, SmartPack, hybrid)
//!    becomes the incumbent.
//! 2. If the incumbent is already within `mip_gap` of a combinatorial lower
//!    bound, it is returned without calling the solver.
//! 3. Otherwise the relaxed disjunctive model from [`build`] is solved
//!    under `time_limit_seconds` and `mip_gap`, the solver's order is laid
//!    out on the timeline, and the better of solver and incumbent schedules
//!    is returned.
//!
//! Gaps are relative to the schedule: `(makespan − bound) / makespan`.
//! The result is [`Optimality::Optimal`] when its makespan meets a proven
//! bound, [`Optimality::WithinGap`] when it is within `mip_gap` of one, and
//! [`Optimality::Degraded`] otherwise.
//!
//! A solver timeout, or a model the solver rejects while the incumbent
//! already meets every window, returns the incumbent flagged
//! [`Optimality::Degraded`]. A timeout with no acceptable incumbent fails
//! with [`ScheduleError::SolverTimeout`].
//!
//! # Reference
//! - Allahverdi et al. (2008), "A survey of scheduling problems with setup
//!   times or costs", §3 (single machine, sequence-dependent setups)

mod good_lp_backend;
mod model;
mod solver;

pub use good_lp_backend::GoodLpSolver;
pub use model::{build, LinearConstraint, MilpModel, SequencingModel, Sense, VarId, VarKind, Variable};
pub use solver::{Assignment, MilpSolver, SolveLimits, SolveOutcome};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info, instrument, warn};

use crate::error::ScheduleError;
use crate::models::{duration_to_hours, Activity, Configuration, Lot, Optimality, ScheduleResult};
use crate::rules::transition_floor_hours;
use crate::scheduler::{
    assemble, fill_duration, finish, ClusterPack, HybridPack, LineState, PriorityPack, ScheduleKpi,
    SmartPack, Strategy, StrategyId,
};

const MAKESPAN_TOLERANCE_HOURS: f64 = 1e-6;

/// Exact strategy (`milp-opt`).
#[derive(Debug, Clone)]
pub struct MilpStrategy {
    solver: Arc<dyn MilpSolver>,
}

impl Default for MilpStrategy {
    fn default() -> Self {
        Self::new(GoodLpSolver)
    }
}

/// A fully laid-out candidate sequence.
struct Plan {
    source: &'static str,
    activities: Vec<Activity>,
    violations: usize,
    makespan: f64,
}

impl Plan {
    fn new(source: &'static str, lots: &[Lot], order: &[usize], config: &Configuration, start: NaiveDateTime) -> Self {
        let activities = assemble(lots, order, config, start);
        let kpi = ScheduleKpi::calculate(&activities, lots);
        Self {
            source,
            activities,
            violations: kpi.window_violations,
            makespan: kpi.makespan_hours,
        }
    }

    /// Fewer window violations first, then shorter makespan.
    fn beats(&self, other: &Plan) -> bool {
        (self.violations, self.makespan) < (other.violations, other.makespan)
    }

    fn acceptable(&self, config: &Configuration) -> bool {
        !config.hard_windows || self.violations == 0
    }

    /// Optimality against a proven makespan lower bound.
    fn optimality(&self, lower: f64, gap: f64) -> Optimality {
        if self.violations > 0 {
            Optimality::Degraded
        } else if self.makespan <= lower + MAKESPAN_TOLERANCE_HOURS {
            Optimality::Optimal
        } else if self.makespan * (1.0 - gap) <= lower + MAKESPAN_TOLERANCE_HOURS {
            Optimality::WithinGap
        } else {
            Optimality::Degraded
        }
    }
}

impl MilpStrategy {
    /// Creates the strategy over a specific backend.
    pub fn new(solver: impl MilpSolver + 'static) -> Self {
        Self {
            solver: Arc::new(solver),
        }
    }

    fn incumbent(&self, lots: &[Lot], config: &Configuration, start: NaiveDateTime) -> Plan {
        let plans = [
            Plan::new("spt-pack", lots, &PriorityPack::spt().sequence(lots, config, start), config, start),
            Plan::new("lpt-pack", lots, &PriorityPack::lpt().sequence(lots, config, start), config, start),
            Plan::new("cfs-pack", lots, &ClusterPack.sequence(lots, config, start), config, start),
            Plan::new("smart-pack", lots, &SmartPack.sequence(lots, config, start), config, start),
            Plan::new("hybrid-pack", lots, &HybridPack.sequence(lots, config, start), config, start),
        ];
        plans
            .into_iter()
            .reduce(|best, plan| if plan.beats(&best) { plan } else { best })
            .unwrap_or_else(|| Plan::new("empty", lots, &[], config, start))
    }
}

/// Combinatorial makespan lower bound.
///
/// Every one of the n − 1 transitions costs at least the cheapest
/// transition floor, and at least `types − 1` of them change product type.
pub fn lower_bound(lots: &[Lot], config: &Configuration) -> f64 {
    let lead = LineState::new(config).elapsed_hours;
    if lots.is_empty() {
        return lead;
    }
    let fill: f64 = lots
        .iter()
        .map(|lot| duration_to_hours(fill_duration(lot, config)))
        .sum();
    let types = lots.iter().map(|l| l.lot_type.as_str()).collect::<HashSet<_>>().len();

    let same = transition_floor_hours("a", "a", config);
    let diff = transition_floor_hours("a", "b", config);
    let cheapest = same.min(diff);

    lead + fill + (lots.len() - 1) as f64 * cheapest + (types - 1) as f64 * (diff - cheapest)
}

impl Strategy for MilpStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::MilpOpt
    }

    #[instrument(skip_all, fields(strategy = %self.id(), lots = lots.len(), solver = self.solver.name()))]
    fn schedule(
        &self,
        lots: &[Lot],
        config: &Configuration,
        start: NaiveDateTime,
    ) -> Result<ScheduleResult, ScheduleError> {
        if lots.len() > config.milp_max_lots {
            return Err(ScheduleError::Configuration(format!(
                "milp-opt accepts at most {} lots (got {}); use a heuristic strategy",
                config.milp_max_lots,
                lots.len()
            )));
        }

        let limits = SolveLimits::from_config(config)?;

        let incumbent = self.incumbent(lots, config, start);
        let bound = lower_bound(lots, config);
        debug!(
            incumbent = incumbent.source,
            makespan = incumbent.makespan,
            violations = incumbent.violations,
            bound,
            "warm start"
        );

        let optimality = incumbent.optimality(bound, limits.mip_gap);
        if optimality != Optimality::Degraded {
            info!(source = incumbent.source, ?optimality, "incumbent meets the lower bound");
            return Ok(finish(self.id(), incumbent.activities, lots, config)?.with_optimality(optimality));
        }

        let sequencing = build(lots, config, start);
        let outcome = self.solver.solve(&sequencing.model, &limits)?;

        let solver_bound = match &outcome {
            SolveOutcome::Optimal(a) => Some(a.objective + sequencing.lead_hours),
            SolveOutcome::WithinGap(a) => Some(a.objective * (1.0 - limits.mip_gap) + sequencing.lead_hours),
            _ => None,
        };

        let (best, optimality) = match outcome {
            SolveOutcome::Optimal(assignment)
            | SolveOutcome::WithinGap(assignment)
            | SolveOutcome::Feasible(assignment) => {
                if assignment.values.len() != sequencing.model.variables.len() {
                    return Err(ScheduleError::Solver(format!(
                        "solver returned {} values for {} variables",
                        assignment.values.len(),
                        sequencing.model.variables.len()
                    )));
                }
                let solved = Plan::new("solver", lots, &sequencing.decode(&assignment.values), config, start);
                let best = if incumbent.beats(&solved) { incumbent } else { solved };
                let lower = solver_bound.map_or(bound, |b| b.max(bound));
                let optimality = best.optimality(lower, limits.mip_gap);
                (best, optimality)
            }
            SolveOutcome::Infeasible if incumbent.violations == 0 => {
                warn!(
                    makespan = incumbent.makespan,
                    "solver rejected the model; returning heuristic incumbent"
                );
                (incumbent, Optimality::Degraded)
            }
            SolveOutcome::Infeasible if config.hard_windows => {
                return Err(ScheduleError::Infeasible(
                    "no lot order satisfies the hard time windows".into(),
                ));
            }
            SolveOutcome::Infeasible => {
                return Err(ScheduleError::Solver(
                    "sequencing model reported infeasible without hard windows".into(),
                ));
            }
            SolveOutcome::TimedOut if incumbent.acceptable(config) => {
                warn!(
                    makespan = incumbent.makespan,
                    "solver timed out; returning heuristic incumbent"
                );
                (incumbent, Optimality::Degraded)
            }
            SolveOutcome::TimedOut => {
                return Err(ScheduleError::SolverTimeout {
                    limit_seconds: config.time_limit_seconds,
                });
            }
        };

        info!(source = best.source, makespan = best.makespan, ?optimality, "exact strategy finished");
        Ok(finish(self.id(), best.activities, lots, config)?.with_optimality(optimality))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CleaningPolicy;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn scenario() -> (Vec<Lot>, Configuration) {
        let lots = vec![
            Lot::with_hours("A", "X", 2.0),
            Lot::with_hours("B", "X", 3.0),
            Lot::with_hours("C", "Y", 1.0),
        ];
        let config = Configuration::default()
            .with_changeovers(0.5, 1.0)
            .with_clean_hours(2.0)
            .with_cleaning_policy(CleaningPolicy::OnTypeChange);
        (lots, config)
    }

    /// Three 3h lots of one type in a 5h window: a CLEAN separates every
    /// pair, which the lower bound cannot see.
    fn window_bound_scenario() -> (Vec<Lot>, Configuration) {
        let lots = vec![
            Lot::with_hours("A", "X", 3.0),
            Lot::with_hours("B", "X", 3.0),
            Lot::with_hours("C", "X", 3.0),
        ];
        let config = Configuration::default()
            .with_changeovers(0.5, 1.0)
            .with_clean_hours(2.0)
            .with_window_hours(5.0);
        (lots, config)
    }

    #[derive(Debug)]
    struct FixedOutcome(SolveOutcome);

    impl MilpSolver for FixedOutcome {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn solve(&self, _model: &MilpModel, _limits: &SolveLimits) -> Result<SolveOutcome, ScheduleError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_lower_bound() {
        let (lots, config) = scenario();
        // 6h fill + 2 transitions ≥ 0.5 + one type change (3.0 - 0.5)
        assert!((lower_bound(&lots, &config) - 9.5).abs() < 1e-9);

        let (lots, config) = window_bound_scenario();
        assert!((lower_bound(&lots, &config) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_matches_lower_bound_without_solver() {
        let (lots, config) = scenario();
        let strategy = MilpStrategy::new(FixedOutcome(SolveOutcome::TimedOut));
        let result = strategy.schedule(&lots, &config, t0()).unwrap();
        assert!((result.makespan_hours - 9.5).abs() < 1e-9);
        assert_eq!(result.optimality, Optimality::Optimal);
        assert_eq!(result.strategy, StrategyId::MilpOpt);
    }

    #[test]
    fn test_good_lp_solves_sequencing_model() {
        let (lots, config) = scenario();
        let sequencing = build(&lots, &config, t0());
        let limits = SolveLimits::from_config(&config).unwrap();
        let outcome = GoodLpSolver.solve(&sequencing.model, &limits).unwrap();
        let SolveOutcome::Optimal(assignment) = outcome else {
            panic!("expected an optimal solve, got {outcome:?}");
        };
        assert!((assignment.objective - 9.5).abs() < 1e-6);

        let order = sequencing.decode(&assignment.values);
        let activities = assemble(&lots, &order, &config, t0());
        let kpi = ScheduleKpi::calculate(&activities, &lots);
        assert!((kpi.makespan_hours - 9.5).abs() < 1e-6);
    }

    #[test]
    fn test_real_solver_never_loses_to_heuristics() {
        let (lots, config) = window_bound_scenario();
        let result = MilpStrategy::default().schedule(&lots, &config, t0()).unwrap();
        let (spt, lpt) = (PriorityPack::spt(), PriorityPack::lpt());
        let heuristics: [&dyn Strategy; 4] = [&spt, &lpt, &ClusterPack, &SmartPack];
        for heuristic in heuristics {
            let other = heuristic.schedule(&lots, &config, t0()).unwrap();
            assert!(result.makespan_hours <= other.makespan_hours + 1e-9);
        }
        assert!((result.makespan_hours - 13.0).abs() < 1e-9);
        assert_eq!(result.lots_scheduled, 3);
    }

    #[test]
    fn test_timeout_returns_degraded_incumbent() {
        let (lots, config) = window_bound_scenario();
        let strategy = MilpStrategy::new(FixedOutcome(SolveOutcome::TimedOut));
        let result = strategy.schedule(&lots, &config, t0()).unwrap();
        assert!(result.is_degraded());
        assert!((result.makespan_hours - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_timeout_without_feasible_incumbent() {
        let (mut lots, config) = window_bound_scenario();
        lots[0] = lots[0].clone().with_deadline(t0() + Duration::hours(1));
        let strategy = MilpStrategy::new(FixedOutcome(SolveOutcome::TimedOut));
        let err = strategy
            .schedule(&lots, &config.with_hard_windows(true), t0())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::SolverTimeout { .. }));
        assert!(err.is_infeasible());
    }

    /// Two X lots and one Y lot in a 3h window: every transition is a
    /// 1h window CLEAN, far cheaper than the 5h type changeover.
    fn cheap_clean_scenario() -> (Vec<Lot>, Configuration) {
        let deadline = t0() + Duration::hours(8);
        let lots = vec![
            Lot::with_hours("X1", "X", 2.0).with_deadline(deadline),
            Lot::with_hours("X2", "X", 2.0).with_deadline(deadline),
            Lot::with_hours("Y1", "Y", 2.0).with_deadline(deadline),
        ];
        let config = Configuration::default()
            .with_window_hours(3.0)
            .with_changeovers(0.5, 5.0)
            .with_clean_hours(1.0)
            .with_hard_windows(true);
        (lots, config)
    }

    #[test]
    fn test_hard_windows_with_cheap_window_clean() {
        let (lots, config) = cheap_clean_scenario();
        let spt = PriorityPack::spt().schedule(&lots, &config, t0()).unwrap();
        assert!((spt.makespan_hours - 8.0).abs() < 1e-9);

        let result = MilpStrategy::default().schedule(&lots, &config, t0()).unwrap();
        assert!((result.makespan_hours - 8.0).abs() < 1e-9);
        assert_eq!(result.window_violations, 0);
        assert_eq!(result.lots_scheduled, 3);
    }

    #[test]
    fn test_rejected_model_falls_back_to_meeting_incumbent() {
        let (lots, config) = cheap_clean_scenario();
        let strategy = MilpStrategy::new(FixedOutcome(SolveOutcome::Infeasible));
        let result = strategy.schedule(&lots, &config, t0()).unwrap();
        assert!(result.is_degraded());
        assert_eq!(result.window_violations, 0);

        let (lots, config) = window_bound_scenario();
        let result = strategy.schedule(&lots, &config.with_hard_windows(true), t0()).unwrap();
        assert!(result.is_degraded());
    }

    #[test]
    fn test_proven_infeasible_hard_windows() {
        let (mut lots, config) = window_bound_scenario();
        lots[0] = lots[0].clone().with_deadline(t0() + Duration::hours(1));
        let strategy = MilpStrategy::new(FixedOutcome(SolveOutcome::Infeasible));
        let err = strategy
            .schedule(&lots, &config.clone().with_hard_windows(true), t0())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Infeasible(_)));

        let err = strategy.schedule(&lots, &config, t0()).unwrap_err();
        assert!(matches!(err, ScheduleError::Solver(_)));
    }

    #[test]
    fn test_out_of_range_time_limit_is_a_configuration_error() {
        let (lots, config) = window_bound_scenario();
        for seconds in [1e20, f64::NAN, -1.0] {
            let err = MilpStrategy::default()
                .schedule(&lots, &config.clone().with_solver_limits(seconds, 0.0), t0())
                .unwrap_err();
            assert!(matches!(err, ScheduleError::Configuration(ref m) if m.contains("time_limit_seconds")));
        }
    }

    #[test]
    fn test_zero_time_limit_returns_incumbent() {
        let (lots, config) = window_bound_scenario();
        let result = MilpStrategy::default()
            .schedule(&lots, &config.with_solver_limits(0.0, 0.0), t0())
            .unwrap();
        assert!(result.is_degraded());
        assert!((result.makespan_hours - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_incumbent_within_gap_of_bound() {
        // 13h incumbent, 10h bound: (13 - 10) / 13 < 0.3
        let (lots, config) = window_bound_scenario();
        let strategy = MilpStrategy::new(FixedOutcome(SolveOutcome::Infeasible));
        let result = strategy
            .schedule(&lots, &config.with_solver_limits(10.0, 0.3), t0())
            .unwrap();
        assert_eq!(result.optimality, Optimality::WithinGap);
    }

    #[test]
    fn test_solver_gap_outcome_is_within_gap() {
        let (lots, config) = window_bound_scenario();
        let config = config.with_solver_limits(10.0, 0.2);
        let sequencing = build(&lots, &config, t0());
        let mut values = vec![0.0; sequencing.model.variables.len()];
        values[sequencing.starts[0].0] = 0.0;
        values[sequencing.starts[1].0] = 5.0;
        values[sequencing.starts[2].0] = 10.0;
        values[sequencing.makespan.0] = 13.0;
        let outcome = SolveOutcome::WithinGap(Assignment {
            values,
            objective: 13.0,
        });
        let result = MilpStrategy::new(FixedOutcome(outcome))
            .schedule(&lots, &config, t0())
            .unwrap();
        assert_eq!(result.optimality, Optimality::WithinGap);
        assert!((result.makespan_hours - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_real_solver_detects_impossible_deadline() {
        let (mut lots, config) = scenario();
        lots[1] = lots[1].clone().with_deadline(t0() + Duration::hours(2));
        let err = MilpStrategy::default()
            .schedule(&lots, &config.with_hard_windows(true), t0())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Infeasible(_)));
    }

    #[test]
    fn test_feasible_outcome_is_degraded() {
        let (lots, config) = window_bound_scenario();
        let sequencing = build(&lots, &config, t0());
        let mut values = vec![0.0; sequencing.model.variables.len()];
        values[sequencing.starts[0].0] = 7.0;
        values[sequencing.starts[1].0] = 3.5;
        values[sequencing.starts[2].0] = 0.0;
        values[sequencing.makespan.0] = 10.0;
        let outcome = SolveOutcome::Feasible(Assignment {
            values,
            objective: 10.0,
        });
        let result = MilpStrategy::new(FixedOutcome(outcome))
            .schedule(&lots, &config, t0())
            .unwrap();
        assert!(result.is_degraded());
        assert_eq!(result.lots_scheduled, 3);
    }

    #[test]
    fn test_size_guard() {
        let config = Configuration::default();
        let lots: Vec<Lot> = (0..31)
            .map(|i| Lot::with_hours(format!("L{i}"), "X", 1.0))
            .collect();
        let err = MilpStrategy::default().schedule(&lots, &config, t0()).unwrap_err();
        assert!(matches!(err, ScheduleError::Configuration(ref m) if m.contains("30")));
    }
}
