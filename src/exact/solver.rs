//! Narrow solver interface.
//!
//! The rest of the engine only sees [`MilpModel`] in and [`SolveOutcome`]
//! out, so the MILP backend can be swapped without touching strategies.

use std::fmt::Debug;
use std::time::Duration;

use super::MilpModel;
use crate::error::ScheduleError;
use crate::models::{Configuration, MAX_TIME_LIMIT_SECONDS};

/// Solver stopping criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveLimits {
    /// Wall-clock budget of one solve.
    pub time_limit: Duration,
    /// Accepted relative optimality gap.
    pub mip_gap: f64,
}

impl SolveLimits {
    /// Limits taken from a run configuration.
    ///
    /// # Errors
    /// `Configuration` when the time limit is negative, not a number, or
    /// longer than [`MAX_TIME_LIMIT_SECONDS`], or the gap is outside `[0, 1]`.
    pub fn from_config(config: &Configuration) -> Result<Self, ScheduleError> {
        let seconds = config.time_limit_seconds;
        if !(0.0..=MAX_TIME_LIMIT_SECONDS).contains(&seconds) {
            return Err(ScheduleError::Configuration(format!(
                "time_limit_seconds must be within [0, {MAX_TIME_LIMIT_SECONDS}] (got {seconds})"
            )));
        }
        if !(0.0..=1.0).contains(&config.mip_gap) {
            return Err(ScheduleError::Configuration(format!(
                "mip_gap must be within [0, 1] (got {})",
                config.mip_gap
            )));
        }
        Ok(Self {
            time_limit: Duration::from_secs_f64(seconds),
            mip_gap: config.mip_gap,
        })
    }
}

/// Variable values of a solution, indexed like [`MilpModel::variables`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub values: Vec<f64>,
    pub objective: f64,
}

/// How a solve ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// Proven optimal.
    Optimal(Assignment),
    /// Stopped once the incumbent was within `mip_gap` of the best bound.
    WithinGap(Assignment),
    /// Feasible incumbent, stopped by the time limit.
    Feasible(Assignment),
    /// The model has no feasible solution.
    Infeasible,
    /// Time limit reached with no incumbent.
    TimedOut,
}

/// A MILP backend.
///
/// Implementations must return within `limits.time_limit` (plus their own
/// model setup) and must not leave work running after they return.
pub trait MilpSolver: Send + Sync + Debug {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Minimizes `model` within `limits`.
    ///
    /// # Errors
    /// `Solver` when the backend fails for reasons unrelated to the model.
    fn solve(&self, model: &MilpModel, limits: &SolveLimits) -> Result<SolveOutcome, ScheduleError>;
}
