//! Dispatching rules and rule engine for lot ordering.
//!
//! Provides priority rules over lots (SPT, LPT, EDD, priority) and a
//! composable rule engine with deterministic tie-breaking. The priority
//! strategies, the cluster-first strategy, and the hybrid partitioning all
//! rank lots through this engine.
//!
//! # Usage
//!
//! ```
//! use u_filling::dispatching::{rules, DispatchContext, RuleEngine, TieBreaker};
//! use u_filling::models::{Configuration, Lot};
//!
//! let config = Configuration::default();
//! let lots = vec![Lot::with_hours("B", "X", 3.0), Lot::with_hours("A", "X", 1.0)];
//! let origin = chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
//!     .unwrap()
//!     .and_hms_opt(8, 0, 0)
//!     .unwrap();
//! let context = DispatchContext::new(&config, origin);
//! let engine = RuleEngine::new()
//!     .with_rule(rules::Spt)
//!     .with_final_tie_breaker(TieBreaker::ById);
//!
//! assert_eq!(engine.sort_indices(&lots, &context), vec![1, 0]);
//! ```
//!
//! # References
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4

mod context;
mod engine;
pub mod rules;

pub use context::DispatchContext;
pub use engine::{RuleEngine, TieBreaker};

use crate::models::Lot;
use std::fmt::Debug;

/// Score returned by a dispatching rule.
///
/// Lower scores = higher priority (dispatched first).
pub type RuleScore = f64;

/// A dispatching rule that evaluates lot priority.
///
/// # Score Convention
/// **Lower score = higher priority.**
pub trait DispatchingRule: Send + Sync + Debug {
    /// Rule name (e.g., "SPT", "EDD").
    fn name(&self) -> &'static str;

    /// Evaluates the priority of a lot.
    fn evaluate(&self, lot: &Lot, context: &DispatchContext<'_>) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
