//! Cluster-first strategy (CFS).
//!
//! Lots are split into a critical tier (urgency ≥ `critical_threshold`) and
//! the rest. Inside each tier, lots of one product type form a cluster that
//! runs contiguously; clusters are visited by size and lots inside a
//! cluster by SPT (or LPT). The second tier opens with the type the first
//! tier ended on, so the seam costs a same-type changeover when possible.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::{debug, instrument};

use super::{assemble, finish, PriorityPack, Strategy, StrategyId};
use crate::error::ScheduleError;
use crate::models::{ClusterOrder, Configuration, Lot, ScheduleResult, WithinClusterOrder};

/// Cluster-first, critical-tier-first strategy (`cfs-pack`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterPack;

struct Cluster<'a> {
    lot_type: &'a str,
    members: Vec<usize>,
    total_hours: f64,
}

impl ClusterPack {
    /// Lot visiting order (indices into `lots`).
    pub fn sequence(&self, lots: &[Lot], config: &Configuration, start: NaiveDateTime) -> Vec<usize> {
        let (critical, rest): (Vec<usize>, Vec<usize>) =
            (0..lots.len()).partition(|&i| lots[i].urgency() >= config.critical_threshold);

        let mut order = Vec::with_capacity(lots.len());
        let mut last_type: Option<&str> = None;
        for tier in [critical, rest] {
            for cluster in clusters(&tier, lots, config, start, last_type) {
                last_type = Some(cluster.lot_type);
                order.extend(cluster.members);
            }
        }
        order
    }
}

/// Groups one tier into ordered same-type clusters.
fn clusters<'a>(
    tier: &[usize],
    lots: &'a [Lot],
    config: &Configuration,
    start: NaiveDateTime,
    opening_type: Option<&str>,
) -> Vec<Cluster<'a>> {
    let mut by_type: BTreeMap<&'a str, Cluster<'a>> = BTreeMap::new();
    for &i in tier {
        let lot = &lots[i];
        let cluster = by_type.entry(lot.lot_type.as_str()).or_insert_with(|| Cluster {
            lot_type: lot.lot_type.as_str(),
            members: Vec::new(),
            total_hours: 0.0,
        });
        cluster.members.push(i);
        cluster.total_hours += lot.duration_hours(config);
    }

    let within = match config.cfs.within {
        WithinClusterOrder::Spt => PriorityPack::spt(),
        WithinClusterOrder::Lpt => PriorityPack::lpt(),
    };
    let mut clusters: Vec<Cluster<'a>> = by_type.into_values().collect();
    for cluster in &mut clusters {
        within.sort_subset(&mut cluster.members, lots, config, start);
    }

    // BTreeMap yields clusters by type name; the stable sort keeps that as
    // the final tie-break.
    clusters.sort_by(|a, b| {
        let opens = |c: &Cluster<'_>| Some(c.lot_type) == opening_type;
        opens(b).cmp(&opens(a)).then_with(|| match config.cfs.cluster_order {
            ClusterOrder::ByCount => b
                .members
                .len()
                .cmp(&a.members.len())
                .then_with(|| b.total_hours.total_cmp(&a.total_hours)),
            ClusterOrder::ByTotalHours => b
                .total_hours
                .total_cmp(&a.total_hours)
                .then_with(|| b.members.len().cmp(&a.members.len())),
        })
    });
    clusters
}

impl Strategy for ClusterPack {
    fn id(&self) -> StrategyId {
        StrategyId::CfsPack
    }

    #[instrument(skip_all, fields(strategy = %self.id(), lots = lots.len()))]
    fn schedule(
        &self,
        lots: &[Lot],
        config: &Configuration,
        start: NaiveDateTime,
    ) -> Result<ScheduleResult, ScheduleError> {
        let order = self.sequence(lots, config, start);
        debug!(?order, "clustered by tier and type");
        finish(self.id(), assemble(lots, &order, config, start), lots, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClusterTuning;
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn ids(lots: &[Lot], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| lots[i].lot_id.clone()).collect()
    }

    #[test]
    fn test_groups_same_type_contiguously() {
        let config = Configuration::default().with_changeovers(0.5, 1.0);
        let lots = vec![
            Lot::with_hours("A1", "A", 3.0),
            Lot::with_hours("B1", "B", 1.0),
            Lot::with_hours("A2", "A", 1.0),
            Lot::with_hours("B2", "B", 2.0),
            Lot::with_hours("A3", "A", 2.0),
        ];
        let order = ClusterPack.sequence(&lots, &config, t0());
        // A has 3 lots, B has 2; each cluster SPT-ordered.
        assert_eq!(ids(&lots, &order), vec!["A2", "A3", "A1", "B1", "B2"]);

        let result = ClusterPack.schedule(&lots, &config, t0()).unwrap();
        assert_eq!(result.changeover_count, 4);
    }

    #[test]
    fn test_critical_tier_first() {
        let config = Configuration::default().with_critical_threshold(5.0);
        let lots = vec![
            Lot::with_hours("N1", "A", 1.0),
            Lot::with_hours("U1", "B", 4.0).with_priority(9.0),
            Lot::with_hours("N2", "B", 1.0),
        ];
        let order = ClusterPack.sequence(&lots, &config, t0());
        // Tier two opens with B, the type tier one ended on.
        assert_eq!(ids(&lots, &order), vec!["U1", "N2", "N1"]);
    }

    #[test]
    fn test_cluster_order_by_total_hours() {
        let mut config = Configuration::default();
        config.cfs = ClusterTuning {
            cluster_order: ClusterOrder::ByTotalHours,
            within: WithinClusterOrder::Lpt,
        };
        let lots = vec![
            Lot::with_hours("A1", "A", 1.0),
            Lot::with_hours("A2", "A", 1.0),
            Lot::with_hours("B1", "B", 5.0),
        ];
        let order = ClusterPack.sequence(&lots, &config, t0());
        assert_eq!(ids(&lots, &order), vec!["B1", "A1", "A2"]);

        config.cfs.cluster_order = ClusterOrder::ByCount;
        let order = ClusterPack.sequence(&lots, &config, t0());
        assert_eq!(ids(&lots, &order), vec!["A1", "A2", "B1"]);
    }

    #[test]
    fn test_type_changes_equal_distinct_types_minus_one() {
        let config = Configuration::default().with_changeovers(0.5, 1.0);
        let lots: Vec<Lot> = (0..12)
            .map(|i| Lot::with_hours(format!("L{i:02}"), ["X", "Y", "Z"][i % 3], 1.0 + i as f64))
            .collect();
        let order = ClusterPack.sequence(&lots, &config, t0());
        let switches = order
            .windows(2)
            .filter(|w| lots[w[0]].lot_type != lots[w[1]].lot_type)
            .count();
        assert_eq!(switches, 2);
    }
}
