//! Hybrid strategy.
//!
//! Ranks lots by how time-constrained they are (earliest deadline, then
//! highest priority, then `lot_id`). The first `ceil(pack_first_ratio · n)`
//! lots are sequenced by [`SmartPack`], the remainder by SPT, and the two
//! runs are concatenated. The seam is an ordinary transition on the
//! timeline.

use chrono::NaiveDateTime;
use tracing::{debug, instrument};

use super::{assemble, finish, PriorityPack, SmartPack, Strategy, StrategyId};
use crate::dispatching::{rules, DispatchContext, RuleEngine, TieBreaker};
use crate::error::ScheduleError;
use crate::models::{Configuration, Lot, ScheduleResult};

/// SmartPack head, SPT tail (`hybrid-pack`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HybridPack;

impl HybridPack {
    /// Lot visiting order (indices into `lots`).
    pub fn sequence(&self, lots: &[Lot], config: &Configuration, start: NaiveDateTime) -> Vec<usize> {
        let ranked = RuleEngine::new()
            .with_rule(rules::Edd)
            .then_by(rules::Priority)
            .with_final_tie_breaker(TieBreaker::ById)
            .sort_indices(lots, &DispatchContext::new(config, start));

        let head_len = ((config.pack_first_ratio * lots.len() as f64).ceil() as usize).min(lots.len());
        let (head, tail) = ranked.split_at(head_len);
        debug!(head = head.len(), tail = tail.len(), "split by time constraint");

        let mut order = SmartPack.sequence_pool(lots, head, config, start);
        let mut tail = tail.to_vec();
        PriorityPack::spt().sort_subset(&mut tail, lots, config, start);
        order.extend(tail);
        order
    }
}

impl Strategy for HybridPack {
    fn id(&self) -> StrategyId {
        StrategyId::HybridPack
    }

    #[instrument(skip_all, fields(strategy = %self.id(), lots = lots.len()))]
    fn schedule(
        &self,
        lots: &[Lot],
        config: &Configuration,
        start: NaiveDateTime,
    ) -> Result<ScheduleResult, ScheduleError> {
        let order = self.sequence(lots, config, start);
        finish(self.id(), assemble(lots, &order, config, start), lots, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn lots() -> Vec<Lot> {
        vec![
            Lot::with_hours("F1", "X", 5.0),
            Lot::with_hours("D2", "Y", 2.0).with_deadline(t0() + Duration::hours(30)),
            Lot::with_hours("F2", "X", 1.0),
            Lot::with_hours("D1", "Y", 3.0).with_deadline(t0() + Duration::hours(10)),
        ]
    }

    #[test]
    fn test_constrained_head_then_spt_tail() {
        let config = Configuration::default()
            .with_changeovers(0.5, 1.0)
            .with_pack_first_ratio(0.5);
        let lots = lots();
        let order = HybridPack.sequence(&lots, &config, t0());
        let ids: Vec<&str> = order.iter().map(|&i| lots[i].lot_id.as_str()).collect();

        let mut head = ids[..2].to_vec();
        head.sort_unstable();
        assert_eq!(head, vec!["D1", "D2"]);
        assert_eq!(&ids[2..], &["F2", "F1"]);
    }

    #[test]
    fn test_head_is_edd_rank_and_tail_is_spt() {
        let lots = vec![
            Lot::with_hours("A", "X", 4.0).with_deadline(t0() + Duration::hours(20)),
            Lot::with_hours("B", "Y", 1.0).with_deadline(t0() + Duration::hours(6)),
            Lot::with_hours("C", "X", 2.0).with_priority(2.0),
            Lot::with_hours("D", "Y", 3.0)
                .with_deadline(t0() + Duration::hours(6))
                .with_priority(1.0),
            Lot::with_hours("E", "X", 0.5),
            Lot::with_hours("F", "Y", 5.0).with_deadline(t0() + Duration::hours(40)),
            Lot::with_hours("G", "X", 1.0),
        ];
        // ceil(0.4 · 7) = 3 lots in the head: D and B (tied deadline, D has
        // priority), then A.
        let config = Configuration::default().with_pack_first_ratio(0.4);
        let order = HybridPack.sequence(&lots, &config, t0());
        let ids: Vec<&str> = order.iter().map(|&i| lots[i].lot_id.as_str()).collect();

        let mut head = ids[..3].to_vec();
        head.sort_unstable();
        assert_eq!(head, vec!["A", "B", "D"]);
        assert_eq!(&ids[3..], &["E", "G", "C", "F"]);
    }

    #[test]
    fn test_ratio_bounds() {
        let config = Configuration::default().with_pack_first_ratio(0.0);
        let lots = lots();
        let spt = PriorityPack::spt().sequence(&lots, &config, t0());
        assert_eq!(HybridPack.sequence(&lots, &config, t0()), spt);

        let config = config.with_pack_first_ratio(1.0);
        assert_eq!(
            HybridPack.sequence(&lots, &config, t0()),
            SmartPack.sequence(&lots, &config, t0())
        );
    }

    #[test]
    fn test_seam_uses_rules() {
        let config = Configuration::default()
            .with_changeovers(0.5, 1.0)
            .with_pack_first_ratio(0.5);
        let lots = lots();
        let result = HybridPack.schedule(&lots, &config, t0()).unwrap();
        // Three transitions; the Y -> X seam is a different-type changeover.
        assert_eq!(result.changeover_count, 3);
        assert_eq!(result.lots_scheduled, 4);
        assert_eq!(result.strategy, StrategyId::HybridPack);
    }
}
