//! Scheduling orchestrator.
//!
//! [`Planner`] is the single entry point a caller needs: it validates the
//! lot list and configuration, resolves the strategy through its own
//! [`StrategyRegistry`], runs it, and audits the produced timeline before
//! handing it back.
//!
//! # Flow
//!
//! ```text
//! validate_lots ──▶ Configuration::validate ──▶ registry.get(id)
//!        │                                            │
//!   Validation error                          Strategy::schedule
//!                                                     │
//!                                  validate_schedule (contract audit)
//!                                                     │
//!                                  ScheduleResult + validator warnings
//! ```

use chrono::{Local, NaiveDateTime};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::ScheduleError;
use crate::models::{Configuration, Lot, ScheduleResult};
use crate::scheduler::{GivenOrder, ScheduleKpi, StrategyId, StrategyRegistry};
use crate::validation::{validate_lots, validate_schedule};

/// Validates, dispatches, and audits scheduling runs.
///
/// # Example
/// ```
/// use u_filling::models::{Configuration, Lot};
/// use u_filling::planner::Planner;
/// use u_filling::scheduler::StrategyId;
///
/// let lots = vec![
///     Lot::with_hours("A", "X", 2.0),
///     Lot::with_hours("B", "X", 3.0),
///     Lot::with_hours("C", "Y", 1.0),
/// ];
/// let config = Configuration::default().with_changeovers(0.5, 1.0);
/// let result = Planner::default()
///     .plan_schedule(&lots, &config, StrategyId::CfsPack, None)
///     .unwrap();
/// assert_eq!(result.lots_scheduled, 3);
/// ```
#[derive(Debug)]
pub struct Planner {
    registry: StrategyRegistry,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(StrategyRegistry::standard())
    }
}

impl Planner {
    /// Creates a planner over an explicit registry.
    pub fn new(registry: StrategyRegistry) -> Self {
        Self { registry }
    }

    /// The strategies this planner can run.
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Plans one schedule.
    ///
    /// `start` defaults to the current local time.
    ///
    /// # Errors
    /// - `Validation` with every input error, before any strategy runs
    /// - `Configuration` for out-of-range knobs or an unregistered strategy
    /// - `Infeasible` / `SolverTimeout` / `Solver` from the strategy, unchanged
    ///
    /// # Panics
    /// If the strategy returns a timeline that breaks the engine contract
    /// (overlap, gap, missing or repeated lot, window overrun).
    #[instrument(skip_all, fields(strategy = %strategy, lots = lots.len()))]
    pub fn plan_schedule(
        &self,
        lots: &[Lot],
        config: &Configuration,
        strategy: StrategyId,
        start: Option<NaiveDateTime>,
    ) -> Result<ScheduleResult, ScheduleError> {
        let report = validate_lots(lots, config);
        if !report.is_ok() {
            warn!(errors = report.errors.len(), "input rejected");
            return Err(ScheduleError::Validation(report.errors));
        }
        config.validate()?;

        let runner = self.registry.get(strategy)?;
        let start = start.unwrap_or_else(|| Local::now().naive_local());
        let result = runner.schedule(lots, config, start)?;

        let audit = validate_schedule(&result.activities, lots, config);
        assert!(
            audit.is_ok(),
            "{strategy} produced an invalid timeline: {:?}",
            audit.errors
        );

        info!(
            makespan = result.makespan_hours,
            utilization = result.kpis.utilization,
            changeovers = result.changeover_count,
            violations = result.window_violations,
            optimality = ?result.optimality,
            "schedule planned"
        );
        Ok(result.with_warnings(report.warnings))
    }

    /// Runs several strategies on the same input.
    ///
    /// Each run is independent; with the `parallel` feature they execute
    /// concurrently. Rows come back in `strategies` order.
    pub fn compare(
        &self,
        lots: &[Lot],
        config: &Configuration,
        strategies: &[StrategyId],
        start: Option<NaiveDateTime>,
    ) -> Vec<StrategyComparison> {
        let start = start.unwrap_or_else(|| Local::now().naive_local());
        let run = |&strategy: &StrategyId| StrategyComparison {
            strategy,
            outcome: self
                .plan_schedule(lots, config, strategy, Some(start))
                .map(|result| result.kpis),
        };

        #[cfg(feature = "parallel")]
        let rows = strategies.par_iter().map(run).collect();
        #[cfg(not(feature = "parallel"))]
        let rows = strategies.iter().map(run).collect();
        rows
    }

    /// Runs every registered strategy, in canonical [`StrategyId`] order.
    pub fn compare_all(
        &self,
        lots: &[Lot],
        config: &Configuration,
        start: Option<NaiveDateTime>,
    ) -> Vec<StrategyComparison> {
        let ids: Vec<StrategyId> = self.registry.ids().collect();
        self.compare(lots, config, &ids, start)
    }
}

/// One row of a strategy comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyComparison {
    /// Strategy that was run.
    pub strategy: StrategyId,
    /// Its KPIs, or the error it raised.
    #[serde(serialize_with = "serialize_outcome")]
    pub outcome: Result<ScheduleKpi, ScheduleError>,
}

impl StrategyComparison {
    /// KPIs of a successful run.
    pub fn kpis(&self) -> Option<&ScheduleKpi> {
        self.outcome.as_ref().ok()
    }
}

fn serialize_outcome<S>(outcome: &Result<ScheduleKpi, ScheduleError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match outcome {
        Ok(kpis) => kpis.serialize(serializer),
        Err(e) => serializer.serialize_str(&e.to_string()),
    }
}

/// Plans one schedule with the standard registry.
///
/// See [`Planner::plan_schedule`].
pub fn plan_schedule(
    lots: &[Lot],
    config: &Configuration,
    strategy: StrategyId,
    start: Option<NaiveDateTime>,
) -> Result<ScheduleResult, ScheduleError> {
    Planner::default().plan_schedule(lots, config, strategy, start)
}

/// Plans the lots in a caller-supplied order.
///
/// Lots named in `sequence_ids` come first in that order, the rest follow in
/// input order. Unknown and repeated ids are reported as warnings on the
/// result.
pub fn plan_in_order<S: AsRef<str>>(
    lots: &[Lot],
    sequence_ids: &[S],
    config: &Configuration,
    start: Option<NaiveDateTime>,
) -> Result<ScheduleResult, ScheduleError> {
    let given = GivenOrder::new(sequence_ids.iter().map(|id| id.as_ref().to_string()));
    Planner::new(StrategyRegistry::new().with_strategy(given)).plan_schedule(
        lots,
        config,
        StrategyId::GivenOrder,
        start,
    )
}

/// Reorders `lots` by `sequence_ids`.
///
/// Returns the reordered lots and one warning per ignored id.
pub fn order_lots_by_sequence<S: AsRef<str>>(lots: &[Lot], sequence_ids: &[S]) -> (Vec<Lot>, Vec<String>) {
    let given = GivenOrder::new(sequence_ids.iter().map(|id| id.as_ref().to_string()));
    let (order, warnings) = given.sequence(lots);
    (order.into_iter().map(|i| lots[i].clone()).collect(), warnings)
}

/// Compares strategies with a planner. Rows follow `strategies` order.
pub fn compare_strategies(
    planner: &Planner,
    lots: &[Lot],
    config: &Configuration,
    strategies: &[StrategyId],
    start: Option<NaiveDateTime>,
) -> Vec<StrategyComparison> {
    planner.compare(lots, config, strategies, start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityKind, CleaningPolicy};
    use crate::validation::ValidationErrorKind;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn lots() -> Vec<Lot> {
        vec![
            Lot::with_hours("A", "X", 2.0),
            Lot::with_hours("B", "X", 3.0),
            Lot::with_hours("C", "Y", 1.0),
        ]
    }

    fn config() -> Configuration {
        Configuration::default()
            .with_changeovers(0.5, 1.0)
            .with_clean_hours(2.0)
            .with_cleaning_policy(CleaningPolicy::OnTypeChange)
    }

    #[test]
    fn test_spt_scenario_end_to_end() {
        let result = plan_schedule(&lots(), &config(), StrategyId::SptPack, Some(t0())).unwrap();
        assert_eq!(result.fill_order(), vec!["C", "A", "B"]);
        let kinds: Vec<ActivityKind> = result.activities.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::Fill,
                ActivityKind::Changeover,
                ActivityKind::Clean,
                ActivityKind::Fill,
                ActivityKind::Changeover,
                ActivityKind::Fill,
            ]
        );
        assert!((result.makespan_hours - 9.5).abs() < 1e-9);
        assert_eq!(result.changeover_count, 2);
        assert!((result.kpis.utilization - 6.0 / 9.5).abs() < 1e-9);
        assert_eq!(result.start(), Some(t0()));
    }

    #[test]
    fn test_duplicate_id_aggregated() {
        let lots = vec![
            Lot::with_hours("A", "X", 2.0),
            Lot::with_hours("A", "X", 3.0),
            Lot::with_hours("C", "Y", 1.0),
        ];
        let err = plan_schedule(&lots, &config(), StrategyId::SmartPack, Some(t0())).unwrap_err();
        let errors = err.validation_errors().unwrap();
        let duplicates: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::DuplicateId)
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0].message.contains("A"));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = plan_schedule(&[], &config(), StrategyId::SptPack, Some(t0())).unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));
    }

    #[test]
    fn test_bad_configuration() {
        let err = plan_schedule(&lots(), &config().with_beam_width(0), StrategyId::SmartPack, Some(t0()))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Configuration(ref m) if m.contains("beam_width")));
    }

    #[test]
    fn test_oversized_inputs_rejected_not_panicking() {
        let mut huge = config();
        huge.window_hours = 1e20;
        let lots = vec![Lot::with_hours("A", "X", 1e19), Lot::with_hours("B", "X", 1e19)];
        let err = plan_schedule(&lots, &huge, StrategyId::SptPack, Some(t0())).unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert!(errors.iter().all(|e| e.kind == ValidationErrorKind::SizeTooLarge));
        assert_eq!(errors.len(), 2);

        let err = plan_schedule(&self::lots(), &huge, StrategyId::SptPack, Some(t0())).unwrap_err();
        assert!(matches!(err, ScheduleError::Configuration(ref m) if m.contains("window_hours")));

        let err = plan_schedule(&self::lots(), &config().with_solver_limits(1e20, 0.0), StrategyId::MilpOpt, Some(t0()))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Configuration(ref m) if m.contains("time_limit_seconds")));
    }

    #[test]
    fn test_unregistered_strategy() {
        let planner = Planner::new(StrategyRegistry::new());
        let err = planner
            .plan_schedule(&lots(), &config(), StrategyId::SptPack, Some(t0()))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Configuration(_)));
    }

    #[test]
    fn test_hard_window_infeasible_propagates() {
        let mut lots = lots();
        lots[1] = lots[1].clone().with_window(t0(), t0() + Duration::hours(3));
        lots[0] = lots[0].clone().with_window(t0(), t0() + Duration::hours(2));
        let err = plan_schedule(&lots, &config().with_hard_windows(true), StrategyId::LptPack, Some(t0()))
            .unwrap_err();
        assert!(err.is_infeasible());
    }

    #[test]
    fn test_validator_warnings_attached() {
        let lots = vec![Lot::with_hours("A", "X", 2.0).with_vials(100)];
        let result = plan_schedule(&lots, &config(), StrategyId::SptPack, Some(t0())).unwrap();
        let report = validate_lots(&lots, &config());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(result.warnings, report.warnings);
    }

    #[test]
    fn test_default_start_is_now() {
        let before = Local::now().naive_local();
        let result = plan_schedule(&lots(), &config(), StrategyId::CfsPack, None).unwrap();
        assert!(result.start().unwrap() >= before - Duration::seconds(1));
    }

    #[test]
    fn test_plan_in_order() {
        let result = plan_in_order(&lots(), &["B", "C", "nope"], &config(), Some(t0())).unwrap();
        assert_eq!(result.fill_order(), vec!["B", "C", "A"]);
        assert_eq!(result.strategy, StrategyId::GivenOrder);
        assert!(result.warnings.iter().any(|w| w.contains("nope")));
    }

    #[test]
    fn test_order_lots_by_sequence() {
        let (ordered, warnings) = order_lots_by_sequence(&lots(), &["C"]);
        let ids: Vec<&str> = ordered.iter().map(|l| l.lot_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_compare_strategies() {
        let planner = Planner::default();
        let ids = [
            StrategyId::GivenOrder,
            StrategyId::SptPack,
            StrategyId::CfsPack,
            StrategyId::MilpOpt,
        ];
        let rows = compare_strategies(&planner, &lots(), &config(), &ids, Some(t0()));
        assert_eq!(rows.iter().map(|r| r.strategy).collect::<Vec<_>>(), ids.to_vec());

        let exact = rows[3].kpis().unwrap().makespan_hours;
        for row in &rows {
            assert!(exact <= row.kpis().unwrap().makespan_hours + 1e-9);
        }

        let json = serde_json::to_value(&rows[1]).unwrap();
        assert_eq!(json["strategy"], "spt-pack");
        assert!(json["outcome"]["makespan_hours"].is_number());
    }

    #[test]
    fn test_compare_reports_errors_per_row() {
        let planner = Planner::new(StrategyRegistry::new().with_strategy(crate::scheduler::SmartPack));
        let rows = planner.compare(&lots(), &config(), &[StrategyId::SmartPack, StrategyId::HybridPack], Some(t0()));
        assert!(rows[0].outcome.is_ok());
        assert!(matches!(rows[1].outcome, Err(ScheduleError::Configuration(_))));
    }

    #[test]
    fn test_compare_all_follows_registry() {
        let registry = StrategyRegistry::new()
            .with_strategy(crate::scheduler::SmartPack)
            .with_strategy(crate::scheduler::PriorityPack::spt());
        let rows = Planner::new(registry).compare_all(&lots(), &config(), Some(t0()));
        let ids: Vec<StrategyId> = rows.iter().map(|r| r.strategy).collect();
        assert_eq!(ids, vec![StrategyId::SptPack, StrategyId::SmartPack]);
        assert!(rows.iter().all(|r| r.outcome.is_ok()));

        let rows = Planner::default().compare_all(&lots(), &config(), Some(t0()));
        assert_eq!(rows.len(), StrategyId::ALL.len());
    }
}
