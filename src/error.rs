//! Engine error type.
//!
//! Every failure a scheduling run can report. A degraded (not provably
//! optimal) exact solve is not an error; see
//! [`Optimality::Degraded`](crate::models::Optimality::Degraded).

use thiserror::Error;

use crate::validation::ValidationError;

/// Failure of a scheduling run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// Malformed input. Raised before any strategy runs.
    #[error("input validation failed with {} error(s): {}", .0.len(), join_messages(.0))]
    Validation(Vec<ValidationError>),

    /// Unknown strategy or out-of-range tuning parameter.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No ordering satisfies the hard constraints, or the solver proved
    /// the model infeasible.
    #[error("infeasible: {0}")]
    Infeasible(String),

    /// The exact solver's time budget expired without any feasible incumbent.
    #[error("solver time limit of {limit_seconds}s expired without a feasible schedule")]
    SolverTimeout { limit_seconds: f64 },

    /// The solver backend failed for a reason unrelated to the model.
    #[error("solver failure: {0}")]
    Solver(String),
}

impl ScheduleError {
    /// Whether the failure means no acceptable schedule exists (or none was
    /// found within the time budget).
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible(_) | Self::SolverTimeout { .. })
    }

    /// Validation issues, if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&[ValidationError]> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
