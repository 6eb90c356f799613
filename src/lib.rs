//! Lot sequencing for aseptic filling lines.
//!
//! Turns a list of production lots into a conflict-free, fully-timed
//! timeline of FILL, CHANGEOVER, and CLEAN activities on a single filling
//! line, minimizing makespan under type-dependent changeovers, periodic
//! cleaning, and optional time windows.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Lot`, `Activity`, `Configuration`,
//!   `ScheduleResult`
//! - **`rules`**: The single changeover/cleaning cost model every strategy
//!   shares
//! - **`validation`**: Input checks (duplicate ids, sizes, windows) and the
//!   post-run timeline audit
//! - **`dispatching`**: Priority rules (SPT, LPT, EDD, priority) and the
//!   multi-rule `RuleEngine`
//! - **`scheduler`**: `Strategy` contract, `StrategyRegistry`, timeline
//!   assembly, KPIs, heuristic strategies
//! - **`exact`**: MILP formulation, solver interface, `good_lp` backend
//! - **`planner`**: Orchestrator (`plan_schedule`, `plan_in_order`,
//!   `compare_strategies`)
//!
//! # Example
//!
//! ```
//! use u_filling::models::{CleaningPolicy, Configuration, Lot};
//! use u_filling::planner::plan_schedule;
//! use u_filling::scheduler::StrategyId;
//!
//! let lots = vec![
//!     Lot::with_hours("A", "X", 2.0),
//!     Lot::with_hours("B", "X", 3.0),
//!     Lot::with_hours("C", "Y", 1.0),
//! ];
//! let config = Configuration::default()
//!     .with_changeovers(0.5, 1.0)
//!     .with_clean_hours(2.0)
//!     .with_cleaning_policy(CleaningPolicy::OnTypeChange);
//!
//! let result = plan_schedule(&lots, &config, StrategyId::SptPack, None).unwrap();
//! assert_eq!(result.fill_order(), vec!["C", "A", "B"]);
//! assert!((result.makespan_hours - 9.5).abs() < 1e-9);
//! ```
//!
//! # Features
//!
//! - `parallel`: runs strategy comparisons concurrently with `rayon`
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Allahverdi et al. (2008), "A survey of scheduling problems with setup
//!   times or costs"

pub mod dispatching;
pub mod error;
pub mod exact;
pub mod models;
pub mod planner;
pub mod rules;
pub mod scheduler;
pub mod validation;

pub use error::ScheduleError;
pub use models::{Activity, ActivityKind, Configuration, Lot, Optimality, ScheduleResult};
pub use planner::{compare_strategies, plan_in_order, plan_schedule, Planner};
pub use scheduler::{Strategy, StrategyId, StrategyRegistry};
