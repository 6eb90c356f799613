//! Priority strategies (SPT / LPT).

use chrono::NaiveDateTime;
use tracing::{debug, instrument};

use super::{assemble, finish, Strategy, StrategyId};
use crate::dispatching::{rules, DispatchContext, RuleEngine, TieBreaker};
use crate::error::ScheduleError;
use crate::models::{Configuration, Lot, ScheduleResult};

/// Sorts lots by fill duration, ties broken by `lot_id`.
///
/// O(n log n) sort plus O(n) assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityPack {
    longest_first: bool,
}

impl PriorityPack {
    /// Shortest Processing Time first (`spt-pack`).
    pub fn spt() -> Self {
        Self {
            longest_first: false,
        }
    }

    /// Longest Processing Time first (`lpt-pack`).
    pub fn lpt() -> Self {
        Self {
            longest_first: true,
        }
    }

    fn engine(&self) -> RuleEngine {
        let engine = if self.longest_first {
            RuleEngine::new().with_rule(rules::Lpt)
        } else {
            RuleEngine::new().with_rule(rules::Spt)
        };
        engine.with_final_tie_breaker(TieBreaker::ById)
    }

    /// Lot visiting order (indices into `lots`).
    pub fn sequence(&self, lots: &[Lot], config: &Configuration, start: NaiveDateTime) -> Vec<usize> {
        self.engine()
            .sort_indices(lots, &DispatchContext::new(config, start))
    }

    /// Orders a subset of lot indices in place.
    pub(crate) fn sort_subset(
        &self,
        subset: &mut [usize],
        lots: &[Lot],
        config: &Configuration,
        start: NaiveDateTime,
    ) {
        self.engine()
            .sort_subset(subset, lots, &DispatchContext::new(config, start));
    }
}

impl Strategy for PriorityPack {
    fn id(&self) -> StrategyId {
        if self.longest_first {
            StrategyId::LptPack
        } else {
            StrategyId::SptPack
        }
    }

    #[instrument(skip_all, fields(strategy = %self.id(), lots = lots.len()))]
    fn schedule(
        &self,
        lots: &[Lot],
        config: &Configuration,
        start: NaiveDateTime,
    ) -> Result<ScheduleResult, ScheduleError> {
        let order = self.sequence(lots, config, start);
        debug!(?order, "sorted by fill duration");
        finish(self.id(), assemble(lots, &order, config, start), lots, config)
    }
}
