//! Scheduling strategies and KPI evaluation.
//!
//! Every strategy turns a lot list into a fully-timed, contiguous activity
//! sequence behind the [`Strategy`] contract. Strategies are selected by a
//! closed [`StrategyId`] enumeration through an explicit, caller-owned
//! [`StrategyRegistry`].
//!
//! # Strategies
//!
//! | Id | Type | Algorithm |
//! |----|------|-----------|
//! | `spt-pack` | [`PriorityPack`] | Shortest fill first |
//! | `lpt-pack` | [`PriorityPack`] | Longest fill first |
//! | `cfs-pack` | [`ClusterPack`] | Critical tier first, same-type clusters |
//! | `smart-pack` | [`SmartPack`] | Beam search with one-step look-ahead |
//! | `hybrid-pack` | [`HybridPack`] | SmartPack on the constrained lots, SPT on the rest |
//! | `milp-opt` | [`MilpStrategy`](crate::exact::MilpStrategy) | Disjunctive MILP |
//! | `given-order` | [`GivenOrder`] | Caller-supplied lot order |
//!
//! All strategies emit activities through [`Timeline`], the single place
//! where the changeover and cleaning rules are applied.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - Allahverdi et al. (2008), "A survey of scheduling problems with setup
//!   times or costs"

mod beam;
mod cluster;
mod given;
mod hybrid;
mod kpi;
mod priority;
mod timeline;

pub use beam::{greedy_sequence, SmartPack};
pub use cluster::ClusterPack;
pub use given::GivenOrder;
pub use hybrid::HybridPack;
pub use kpi::ScheduleKpi;
pub use priority::PriorityPack;
pub use timeline::{assemble, fill_duration, LineState, Step, Timeline};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::exact::MilpStrategy;
use crate::models::{Activity, Configuration, Lot, ScheduleResult};

/// Stable strategy identifier.
///
/// Persisted in stored configurations: new strategies get new variants,
/// existing names never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyId {
    SptPack,
    LptPack,
    CfsPack,
    SmartPack,
    HybridPack,
    MilpOpt,
    GivenOrder,
}

impl StrategyId {
    /// Every identifier, in canonical order.
    pub const ALL: [StrategyId; 7] = [
        Self::SptPack,
        Self::LptPack,
        Self::CfsPack,
        Self::SmartPack,
        Self::HybridPack,
        Self::MilpOpt,
        Self::GivenOrder,
    ];

    /// Canonical kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SptPack => "spt-pack",
            Self::LptPack => "lpt-pack",
            Self::CfsPack => "cfs-pack",
            Self::SmartPack => "smart-pack",
            Self::HybridPack => "hybrid-pack",
            Self::MilpOpt => "milp-opt",
            Self::GivenOrder => "given-order",
        }
    }

    /// Whether this is the exact (solver-backed) strategy.
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::MilpOpt)
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| {
                ScheduleError::Configuration(format!(
                    "unknown strategy id {s:?} (expected one of: {})",
                    Self::ALL.map(|id| id.as_str()).join(", ")
                ))
            })
    }
}

/// A scheduling algorithm.
///
/// Implementations are stateless between runs: `lots` and `config` are
/// borrowed read-only and the returned activities are freshly allocated.
///
/// # Contract
/// The returned schedule fills every lot exactly once, applies
/// [`rules::transition`](crate::rules::transition) between consecutive lots,
/// and lays activities back to back from `start`.
pub trait Strategy: Send + Sync + fmt::Debug {
    /// Identifier this strategy is registered under.
    fn id(&self) -> StrategyId;

    /// Schedules `lots` starting at `start`.
    ///
    /// # Errors
    /// `Infeasible` when `hard_windows` is set and no acceptable order was
    /// found; strategy-specific configuration or solver errors.
    fn schedule(
        &self,
        lots: &[Lot],
        config: &Configuration,
        start: NaiveDateTime,
    ) -> Result<ScheduleResult, ScheduleError>;
}

/// Explicit mapping from identifiers to strategy implementations.
///
/// # Example
/// ```
/// use u_filling::scheduler::{StrategyId, StrategyRegistry};
///
/// let registry = StrategyRegistry::standard();
/// assert!(registry.get(StrategyId::SmartPack).is_ok());
/// assert_eq!(registry.ids().count(), 7);
/// ```
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<StrategyId, Box<dyn Strategy>>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy.
    ///
    /// `given-order` is registered with an empty sequence (input order).
    pub fn standard() -> Self {
        Self::new()
            .with_strategy(PriorityPack::spt())
            .with_strategy(PriorityPack::lpt())
            .with_strategy(ClusterPack)
            .with_strategy(SmartPack)
            .with_strategy(HybridPack)
            .with_strategy(MilpStrategy::default())
            .with_strategy(GivenOrder::default())
    }

    /// Registers a strategy under its own id, replacing any previous one.
    pub fn with_strategy<S: Strategy + 'static>(mut self, strategy: S) -> Self {
        self.register(Box::new(strategy));
        self
    }

    /// Registers a boxed strategy under its own id.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) {
        self.strategies.insert(strategy.id(), strategy);
    }

    /// Resolves an identifier.
    ///
    /// # Errors
    /// `Configuration` if no strategy is registered under `id`.
    pub fn get(&self, id: StrategyId) -> Result<&dyn Strategy, ScheduleError> {
        self.strategies
            .get(&id)
            .map(|s| s.as_ref())
            .ok_or_else(|| ScheduleError::Configuration(format!("strategy {id} is not registered")))
    }

    /// Registered identifiers, in canonical order.
    pub fn ids(&self) -> impl Iterator<Item = StrategyId> + '_ {
        self.strategies.keys().copied()
    }
}

/// Wraps a finished timeline into a result, enforcing hard windows.
pub(crate) fn finish(
    id: StrategyId,
    activities: Vec<Activity>,
    lots: &[Lot],
    config: &Configuration,
) -> Result<ScheduleResult, ScheduleError> {
    let result = ScheduleResult::new(id, activities, lots);
    if config.hard_windows && result.window_violations > 0 {
        return Err(ScheduleError::Infeasible(format!(
            "{id} could not place {} lot(s) inside their hard time windows",
            result.window_violations
        )));
    }
    Ok(result)
}
