//! Solver-independent MILP model and the lot-sequencing formulation.
//!
//! # Formulation (disjunctive, single machine)
//!
//! Variables:
//! - `s_i ≥ 0` start of lot i's FILL (hours after the line becomes available)
//! - `y_ij ∈ {0, 1}` for i < j, 1 if i precedes j
//! - `C_max` makespan
//!
//! Constraints, with `p_i` fill hours and `c_ij` the cheapest transition
//! the timeline can charge ([`rules::transition_floor_hours`]):
//! ```text
//! s_j − s_i − M·y_ij ≥ p_i + c_ij − M        (i before j)
//! s_i − s_j + M·y_ij ≥ p_j + c_ji            (j before i)
//! C_max − s_i ≥ p_i
//! s_i ≥ ws_i,  s_i ≤ we_i − p_i              (hard windows only)
//! ```
//! Objective: minimize `C_max`.
//!
//! Every `c_ij` is at most what the timeline charges at any window state, so
//! the model is a relaxation: its optimum plus the lead time bounds every
//! real makespan from below.
//!
//! # Reference
//! Balas (1969), "Machine sequencing via disjunctive graphs"

use chrono::NaiveDateTime;

use crate::models::{duration_to_hours, Configuration, Lot};
use crate::rules;
use crate::scheduler::{fill_duration, LineState};

/// Variable handle (index into [`MilpModel::variables`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub usize);

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    /// 0/1 integer.
    Binary,
    /// Bounded continuous.
    Continuous { min: f64, max: f64 },
}

/// A named decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
}

/// Constraint direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// `lhs ≤ rhs`
    Le,
    /// `lhs ≥ rhs`
    Ge,
    /// `lhs = rhs`
    Eq,
}

/// `Σ coef · var  (sense)  rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

/// A minimization MILP: variables, linear constraints, linear objective.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MilpModel {
    pub variables: Vec<Variable>,
    pub constraints: Vec<LinearConstraint>,
    pub objective: Vec<(VarId, f64)>,
}

impl MilpModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable.
    pub fn add_var(&mut self, name: impl Into<String>, kind: VarKind) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            kind,
        });
        VarId(self.variables.len() - 1)
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, terms: Vec<(VarId, f64)>, sense: Sense, rhs: f64) {
        self.constraints.push(LinearConstraint { terms, sense, rhs });
    }

    /// Sets the objective (minimized).
    pub fn minimize(&mut self, terms: Vec<(VarId, f64)>) {
        self.objective = terms;
    }

    /// Number of binary variables.
    pub fn binary_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }

    /// Objective value of an assignment.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.iter().map(|&(VarId(i), c)| c * values[i]).sum()
    }
}

/// Sequencing model plus the handles needed to decode a solution.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencingModel {
    /// The MILP.
    pub model: MilpModel,
    /// `s_i` per lot, in input order.
    pub starts: Vec<VarId>,
    /// `C_max`.
    pub makespan: VarId,
    /// Hours before the first FILL can start (leading CLEAN).
    pub lead_hours: f64,
}

impl SequencingModel {
    /// Lot order implied by solved start times (ties by input index).
    pub fn decode(&self, values: &[f64]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.starts.len()).collect();
        order.sort_by(|&a, &b| {
            values[self.starts[a].0]
                .total_cmp(&values[self.starts[b].0])
                .then(a.cmp(&b))
        });
        order
    }
}

/// Builds the disjunctive sequencing model for `lots`.
///
/// Window-triggered CLEANs are not modelled explicitly; each setup is
/// priced at its floor instead. Time-window bounds are added only when
/// `hard_windows` is set.
pub fn build(lots: &[Lot], config: &Configuration, start: NaiveDateTime) -> SequencingModel {
    let n = lots.len();
    let lead_hours = LineState::new(config).elapsed_hours;
    let fill: Vec<f64> = lots
        .iter()
        .map(|lot| duration_to_hours(fill_duration(lot, config)))
        .collect();
    let setup = |i: usize, j: usize| rules::transition_floor_hours(&lots[i].lot_type, &lots[j].lot_type, config);

    let max_setup = (0..n)
        .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
        .map(|(i, j)| setup(i, j))
        .fold(0.0_f64, f64::max);
    let latest_release = lots
        .iter()
        .filter_map(|lot| lot.relative_window(start).0)
        .map(|ws| ws - lead_hours)
        .fold(0.0_f64, f64::max);
    let horizon = latest_release + fill.iter().sum::<f64>() + n as f64 * max_setup + 1.0;

    let mut model = MilpModel::new();
    let starts: Vec<VarId> = (0..n)
        .map(|i| {
            model.add_var(
                format!("s_{i}"),
                VarKind::Continuous {
                    min: 0.0,
                    max: horizon,
                },
            )
        })
        .collect();
    let makespan = model.add_var(
        "c_max",
        VarKind::Continuous {
            min: 0.0,
            max: horizon,
        },
    );

    for i in 0..n {
        for j in (i + 1)..n {
            let y = model.add_var(format!("y_{i}_{j}"), VarKind::Binary);
            model.add_constraint(
                vec![(starts[j], 1.0), (starts[i], -1.0), (y, -horizon)],
                Sense::Ge,
                fill[i] + setup(i, j) - horizon,
            );
            model.add_constraint(
                vec![(starts[i], 1.0), (starts[j], -1.0), (y, horizon)],
                Sense::Ge,
                fill[j] + setup(j, i),
            );
        }
        model.add_constraint(vec![(makespan, 1.0), (starts[i], -1.0)], Sense::Ge, fill[i]);

        if config.hard_windows {
            let (ws, we) = lots[i].relative_window(start);
            if let Some(ws) = ws {
                model.add_constraint(vec![(starts[i], 1.0)], Sense::Ge, ws - lead_hours);
            }
            if let Some(we) = we {
                model.add_constraint(vec![(starts[i], 1.0)], Sense::Le, we - lead_hours - fill[i]);
            }
        }
    }
    model.minimize(vec![(makespan, 1.0)]);

    SequencingModel {
        model,
        starts,
        makespan,
        lead_hours,
    }
}
