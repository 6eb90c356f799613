//! Given-order strategy.
//!
//! Lays lots out in a caller-supplied order instead of searching for one.
//! Lots named in the sequence come first, in sequence order; lots the
//! sequence does not name follow in input order. With an empty sequence
//! this is the input order itself, the baseline planners compare against.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use tracing::{instrument, warn};

use super::{assemble, finish, Strategy, StrategyId};
use crate::error::ScheduleError;
use crate::models::{Configuration, Lot, ScheduleResult};

/// Follows an explicit lot-id sequence (`given-order`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GivenOrder {
    sequence: Vec<String>,
}

impl GivenOrder {
    /// Creates the strategy from lot ids in the desired order.
    pub fn new<I, S>(sequence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sequence: sequence.into_iter().map(Into::into).collect(),
        }
    }

    /// Lot visiting order plus one warning per ignored sequence entry.
    ///
    /// Ids that match no lot and repeats of an id already placed are
    /// ignored.
    pub fn sequence(&self, lots: &[Lot]) -> (Vec<usize>, Vec<String>) {
        let index: HashMap<&str, usize> = lots
            .iter()
            .enumerate()
            .rev()
            .map(|(i, lot)| (lot.lot_id.as_str(), i))
            .collect();

        let mut placed = HashSet::with_capacity(lots.len());
        let mut order = Vec::with_capacity(lots.len());
        let mut warnings = Vec::new();

        for id in &self.sequence {
            match index.get(id.as_str()) {
                Some(&i) if placed.insert(i) => order.push(i),
                Some(_) => warnings.push(format!("Sequence names lot {id} more than once; repeat ignored")),
                None => warnings.push(format!("Sequence names unknown lot {id}; ignored")),
            }
        }
        order.extend((0..lots.len()).filter(|i| !placed.contains(i)));
        (order, warnings)
    }
}

impl Strategy for GivenOrder {
    fn id(&self) -> StrategyId {
        StrategyId::GivenOrder
    }

    #[instrument(skip_all, fields(strategy = %self.id(), lots = lots.len(), requested = self.sequence.len()))]
    fn schedule(
        &self,
        lots: &[Lot],
        config: &Configuration,
        start: NaiveDateTime,
    ) -> Result<ScheduleResult, ScheduleError> {
        let (order, warnings) = self.sequence(lots);
        if !warnings.is_empty() {
            warn!(ignored = warnings.len(), "sequence entries ignored");
        }
        Ok(finish(self.id(), assemble(lots, &order, config, start), lots, config)?.with_warnings(warnings))
    }
}
