//! `good_lp` backend (pure-Rust `microlp` solver).
//!
//! The wall-clock limit and the relative MIP gap are handed to `microlp`,
//! which stops branch and bound itself; the solve runs on the caller's
//! thread and never outlives [`MilpSolver::solve`].

use std::time::Instant;

use good_lp::{
    microlp, variable, variables, Expression, ResolutionError, Solution, SolutionStatus, SolverModel,
    WithMipGap, WithTimeLimit,
};
use tracing::{debug, warn};

use super::{Assignment, MilpModel, MilpSolver, Sense, SolveLimits, SolveOutcome, VarId, VarKind};
use crate::error::ScheduleError;

/// MILP solver backed by `good_lp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver;

impl MilpSolver for GoodLpSolver {
    fn name(&self) -> &'static str {
        "good_lp/microlp"
    }

    fn solve(&self, model: &MilpModel, limits: &SolveLimits) -> Result<SolveOutcome, ScheduleError> {
        let mut vars = variables!();
        let handles: Vec<good_lp::Variable> = model
            .variables
            .iter()
            .map(|v| match v.kind {
                VarKind::Binary => vars.add(variable().binary().name(v.name.clone())),
                VarKind::Continuous { min, max } => vars.add(variable().min(min).max(max).name(v.name.clone())),
            })
            .collect();

        let linear = |terms: &[(VarId, f64)]| {
            terms
                .iter()
                .fold(Expression::from(0.0), |acc, &(VarId(i), coef)| acc + coef * handles[i])
        };

        let mut problem = vars
            .minimise(linear(&model.objective))
            .using(microlp)
            .with_time_limit(limits.time_limit.as_secs_f64())
            .with_mip_gap(limits.mip_gap as f32)
            .map_err(|e| ScheduleError::Configuration(format!("mip_gap rejected by the solver: {e}")))?;
        for c in &model.constraints {
            let lhs = linear(&c.terms);
            problem.add_constraint(match c.sense {
                Sense::Le => lhs.leq(c.rhs),
                Sense::Ge => lhs.geq(c.rhs),
                Sense::Eq => lhs.eq(c.rhs),
            });
        }

        let started = Instant::now();
        let solved = problem.solve();
        let elapsed = started.elapsed();

        match solved {
            Ok(solution) => {
                let status = solution.status();
                let values: Vec<f64> = handles.iter().map(|&h| solution.value(h)).collect();
                let objective = model.objective_value(&values);
                debug!(objective, ?status, ?elapsed, "solver finished");
                let assignment = Assignment { values, objective };
                Ok(match status {
                    SolutionStatus::Optimal => SolveOutcome::Optimal(assignment),
                    SolutionStatus::GapLimit => SolveOutcome::WithinGap(assignment),
                    SolutionStatus::TimeLimit => SolveOutcome::Feasible(assignment),
                })
            }
            Err(ResolutionError::Infeasible) => Ok(SolveOutcome::Infeasible),
            // microlp reports a limit hit before any incumbent as a bare message.
            Err(ResolutionError::Other(message)) if elapsed >= limits.time_limit => {
                warn!(limit = ?limits.time_limit, reason = message, "solver time limit reached");
                Ok(SolveOutcome::TimedOut)
            }
            Err(e) => Err(ScheduleError::Solver(e.to_string())),
        }
    }
}
