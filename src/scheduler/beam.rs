//! Beam-search strategy (SmartPack).
//!
//! Builds the sequence one lot at a time. Each step:
//!
//! 1. Scores every remaining lot against the current [`LineState`] and drops
//!    lots whose FILL would miss their time window (the feasibility floor).
//! 2. Keeps the top `beam_width` (K) by score, ties broken by `lot_id`.
//! 3. For each kept lot, simulates the best follow-up and ranks by
//!    `score + lookahead_weight * follow_up_score`.
//! 4. Commits the winner.
//!
//! When no lot clears the floor, the lot with the smallest window miss is
//! placed and the violation is left to the KPI count.
//!
//! Per-step scratch buffers are allocated once and reused, so a run costs
//! O(n² · K · T) for T product types with no recursion.
//!
//! # Score (hours-equivalent, higher is better)
//!
//! ```text
//! score = − changeover_weight · transition_hours · switch_mult
//!         + streak_bonus                       (same type as the last FILL)
//!         − slack_waste_weight · unusable_slack
//!         + priority_weight · priority
//!         + urgency_weight / (1 + deadline_slack_hours)
//!         − 0.01 · fill_hours
//! ```
//!
//! `switch_mult` grows linearly from `dynamic_switch_mult_min` on an empty
//! clean window to `dynamic_switch_mult_max` on a full one and applies to
//! type changes only. `unusable_slack` is the window capacity left after
//! the FILL when no remaining lot fits into it.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::{debug, instrument, trace};

use super::{assemble, fill_duration, finish, LineState, Strategy, StrategyId};
use crate::error::ScheduleError;
use crate::models::{duration_to_hours, Configuration, Lot, ScheduleResult};
use crate::rules::{changeover_hours, EPSILON_HOURS};

/// Beam-search packing strategy (`smart-pack`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmartPack;

impl SmartPack {
    /// Lot visiting order (indices into `lots`).
    pub fn sequence(&self, lots: &[Lot], config: &Configuration, start: NaiveDateTime) -> Vec<usize> {
        let pool: Vec<usize> = (0..lots.len()).collect();
        self.sequence_pool(lots, &pool, config, start)
    }

    /// Orders the lots named by `pool` (indices into `lots`), starting from
    /// a fresh line.
    pub fn sequence_pool(
        &self,
        lots: &[Lot],
        pool: &[usize],
        config: &Configuration,
        start: NaiveDateTime,
    ) -> Vec<usize> {
        let scorer = Scorer::new(lots, config, start);
        let beam_width = config.beam_width.max(1);
        let mut scratch = Scratch::new(scorer.type_names.len());
        let mut remaining = pool.to_vec();
        let mut state = LineState::new(config);
        let mut order = Vec::with_capacity(pool.len());

        while !remaining.is_empty() {
            scratch.summarize(&scorer, &remaining);
            scratch.candidates.clear();
            let mut fallback: Option<(f64, usize)> = None;

            for (pos, &i) in remaining.iter().enumerate() {
                let eval = scorer.evaluate(&state, i, &[i], &scratch.shortest);
                if eval.miss_hours <= EPSILON_HOURS {
                    scratch.candidates.push(Candidate {
                        pos,
                        score: eval.score,
                    });
                } else if fallback.map_or(true, |(miss, best)| {
                    eval.miss_hours < miss
                        || (eval.miss_hours == miss && lots[i].lot_id < lots[remaining[best]].lot_id)
                }) {
                    fallback = Some((eval.miss_hours, pos));
                }
            }

            let pos = if scratch.candidates.is_empty() {
                let (miss, pos) = fallback.unwrap_or((0.0, 0));
                debug!(
                    lot = %lots[remaining[pos]].lot_id,
                    miss_hours = miss,
                    "no lot fits its window; placing least-infeasible"
                );
                pos
            } else {
                scratch.candidates.sort_by(|a, b| {
                    b.score
                        .total_cmp(&a.score)
                        .then_with(|| lots[remaining[a.pos]].lot_id.cmp(&lots[remaining[b.pos]].lot_id))
                });
                scratch.candidates.truncate(beam_width);
                if scratch.candidates.len() == 1 {
                    scratch.candidates[0].pos
                } else {
                    self.look_ahead(&scorer, &state, &remaining, &scratch)
                }
            };

            let i = remaining.remove(pos);
            trace!(lot = %lots[i].lot_id, "committed");
            state.advance(&lots[i], config);
            order.push(i);
        }

        order
    }

    /// Picks the beam candidate with the best two-step score.
    fn look_ahead<'a>(
        &self,
        scorer: &Scorer<'a>,
        state: &LineState<'a>,
        remaining: &[usize],
        scratch: &Scratch,
    ) -> usize {
        let weight = scorer.config.smart_pack.lookahead_weight;
        let mut best: Option<(f64, usize)> = None;

        for candidate in &scratch.candidates {
            let i = remaining[candidate.pos];
            let mut after = *state;
            after.advance(&scorer.lots[i], scorer.config);

            let follow = remaining
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| scorer.evaluate(&after, j, &[i, j], &scratch.shortest))
                .filter(|e| e.miss_hours <= EPSILON_HOURS)
                .map(|e| e.score)
                .max_by(f64::total_cmp)
                .unwrap_or(0.0);

            let combo = candidate.score + weight * follow;
            if best.map_or(true, |(b, _)| combo > b) {
                best = Some((combo, candidate.pos));
            }
        }

        best.map_or(scratch.candidates[0].pos, |(_, pos)| pos)
    }
}

/// One-step greedy sequence using the SmartPack score.
///
/// Always takes the highest-scoring lot that meets its window (ties by
/// `lot_id`), falling back to the least-infeasible lot. This is what
/// SmartPack reduces to with `beam_width = 1`.
pub fn greedy_sequence(lots: &[Lot], config: &Configuration, start: NaiveDateTime) -> Vec<usize> {
    let scorer = Scorer::new(lots, config, start);
    let mut scratch = Scratch::new(scorer.type_names.len());
    let mut remaining: Vec<usize> = (0..lots.len()).collect();
    let mut state = LineState::new(config);
    let mut order = Vec::with_capacity(lots.len());

    while !remaining.is_empty() {
        scratch.summarize(&scorer, &remaining);
        let evals: Vec<(usize, Evaluation)> = remaining
            .iter()
            .enumerate()
            .map(|(pos, &i)| (pos, scorer.evaluate(&state, i, &[i], &scratch.shortest)))
            .collect();

        let id = |pos: usize| &lots[remaining[pos]].lot_id;
        let feasible = evals
            .iter()
            .filter(|(_, e)| e.miss_hours <= EPSILON_HOURS)
            .min_by(|(pa, a), (pb, b)| b.score.total_cmp(&a.score).then_with(|| id(*pa).cmp(id(*pb))));
        let pos = match feasible {
            Some(&(pos, _)) => pos,
            None => evals
                .iter()
                .min_by(|(pa, a), (pb, b)| {
                    a.miss_hours
                        .total_cmp(&b.miss_hours)
                        .then_with(|| id(*pa).cmp(id(*pb)))
                })
                .map_or(0, |&(pos, _)| pos),
        };

        let i = remaining.remove(pos);
        state.advance(&lots[i], config);
        order.push(i);
    }

    order
}

impl Strategy for SmartPack {
    fn id(&self) -> StrategyId {
        StrategyId::SmartPack
    }

    #[instrument(skip_all, fields(strategy = %self.id(), lots = lots.len(), beam_width = config.beam_width))]
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

#[derive(Debug, Clone, Copy)]
struct Candidate {
    pos: usize,
    score: f64,
}

#[derive(Debug, Clone, Copy)]
struct Evaluation {
    score: f64,
    miss_hours: f64,
}

/// Three shortest remaining fills of one type: `(lot index, hours)`.
type Shortest = [Option<(usize, f64)>; 3];

/// Reusable per-step buffers.
struct Scratch {
    candidates: Vec<Candidate>,
    shortest: Vec<Shortest>,
}

impl Scratch {
    fn new(type_count: usize) -> Self {
        Self {
            candidates: Vec::new(),
            shortest: vec![[None; 3]; type_count],
        }
    }

    /// Rebuilds the per-type shortest-fill summary of `remaining`.
    fn summarize(&mut self, scorer: &Scorer<'_>, remaining: &[usize]) {
        self.shortest.iter_mut().for_each(|s| *s = [None; 3]);
        for &i in remaining {
            let slot = &mut self.shortest[scorer.type_of[i]];
            let mut entry = (i, scorer.fill[i]);
            for cell in slot.iter_mut() {
                match cell {
                    Some(current) if current.1 <= entry.1 => {}
                    Some(current) => std::mem::swap(current, &mut entry),
                    None => {
                        *cell = Some(entry);
                        break;
                    }
                }
            }
        }
    }
}

/// Immutable scoring context for one run.
struct Scorer<'a> {
    lots: &'a [Lot],
    config: &'a Configuration,
    origin: NaiveDateTime,
    type_names: Vec<&'a str>,
    type_of: Vec<usize>,
    fill: Vec<f64>,
}

impl<'a> Scorer<'a> {
    fn new(lots: &'a [Lot], config: &'a Configuration, origin: NaiveDateTime) -> Self {
        let mut ids: HashMap<&str, usize> = HashMap::new();
        let mut type_names = Vec::new();
        let type_of = lots
            .iter()
            .map(|lot| {
                *ids.entry(lot.lot_type.as_str()).or_insert_with(|| {
                    type_names.push(lot.lot_type.as_str());
                    type_names.len() - 1
                })
            })
            .collect();
        let fill = lots
            .iter()
            .map(|lot| duration_to_hours(fill_duration(lot, config)))
            .collect();
        Self {
            lots,
            config,
            origin,
            type_names,
            type_of,
            fill,
        }
    }

    /// Scores placing lot `i` next. `exclude` lists lots that are no longer
    /// available after this placement.
    fn evaluate(
        &self,
        state: &LineState<'a>,
        i: usize,
        exclude: &[usize],
        shortest: &[Shortest],
    ) -> Evaluation {
        let lot = &self.lots[i];
        let tuning = &self.config.smart_pack;
        let step = state.peek(lot, self.config);
        let miss_hours = lot.window_miss_hours(self.origin, step.fill_start, step.fill_end);

        let same_type = state.prev_type == Some(lot.lot_type.as_str());
        let switch_mult = if state.prev_type.is_some() && !same_type {
            let used = (state.window_used / self.config.window_hours).clamp(0.0, 1.0);
            tuning.dynamic_switch_mult_min
                + (tuning.dynamic_switch_mult_max - tuning.dynamic_switch_mult_min) * used
        } else {
            1.0
        };

        let mut after = *state;
        after.commit(lot, &step);
        let waste = self.unusable_slack(&after, exclude, shortest);

        let urgency = lot
            .relative_window(self.origin)
            .1
            .map_or(0.0, |we| tuning.urgency_weight / (1.0 + (we - step.fill_end).max(0.0)));

        let score = -tuning.changeover_weight * step.transition_hours * switch_mult
            + if same_type { tuning.streak_bonus } else { 0.0 }
            - tuning.slack_waste_weight * waste
            + tuning.priority_weight * lot.urgency()
            + urgency
            - 0.01 * step.fill_hours;

        Evaluation { score, miss_hours }
    }

    /// Window capacity no remaining lot can use.
    fn unusable_slack(&self, after: &LineState<'_>, exclude: &[usize], shortest: &[Shortest]) -> f64 {
        let cap = after.window_remaining(self.config);
        if !cap.is_finite() || cap <= EPSILON_HOURS {
            return 0.0;
        }

        let min_need = shortest
            .iter()
            .enumerate()
            .filter_map(|(t, slot)| {
                let (_, hours) = slot.iter().flatten().find(|(j, _)| !exclude.contains(j))?;
                Some(changeover_hours(after.prev_type, self.type_names[t], self.config) + hours)
            })
            .min_by(f64::total_cmp);

        match min_need {
            Some(need) if need > cap + EPSILON_HOURS => cap,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CleaningPolicy;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn ids(lots: &[Lot], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| lots[i].lot_id.clone()).collect()
    }

    fn mixed_lots() -> Vec<Lot> {
        vec![
            Lot::with_hours("A1", "A", 3.0),
            Lot::with_hours("B1", "B", 2.0),
            Lot::with_hours("A2", "A", 1.0),
            Lot::with_hours("B2", "B", 4.0),
            Lot::with_hours("C1", "C", 2.5),
            Lot::with_hours("A3", "A", 2.0),
        ]
    }

    #[test]
    fn test_keeps_types_together() {
        let config = Configuration::default().with_changeovers(0.5, 2.0);
        let lots = mixed_lots();
        let order = SmartPack.sequence(&lots, &config, t0());
        let switches = order
            .windows(2)
            .filter(|w| lots[w[0]].lot_type != lots[w[1]].lot_type)
            .count();
        assert_eq!(switches, 2);
        assert_eq!(order.len(), lots.len());
    }

    #[test]
    fn test_beam_width_one_matches_greedy() {
        let config = Configuration::default()
            .with_changeovers(0.5, 2.0)
            .with_window_hours(6.0)
            .with_clean_hours(1.0)
            .with_beam_width(1);
        let lots = mixed_lots();
        assert_eq!(
            SmartPack.sequence(&lots, &config, t0()),
            greedy_sequence(&lots, &config, t0())
        );
    }

    #[test]
    fn test_deadline_pulls_lot_forward() {
        let config = Configuration::default().with_changeovers(0.5, 1.0);
        let lots = vec![
            Lot::with_hours("A1", "A", 1.0),
            Lot::with_hours("A2", "A", 1.0),
            Lot::with_hours("B1", "B", 1.0).with_deadline(t0() + Duration::hours(1)),
        ];
        let order = SmartPack.sequence(&lots, &config, t0());
        assert_eq!(ids(&lots, &order)[0], "B1");
        let result = SmartPack.schedule(&lots, &config, t0()).unwrap();
        assert_eq!(result.window_violations, 0);
    }

    #[test]
    fn test_places_least_infeasible_lot() {
        let config = Configuration::default().with_changeovers(0.5, 1.0);
        // Both deadlines are impossible; B misses by less.
        let lots = vec![
            Lot::with_hours("A", "X", 4.0).with_deadline(t0() + Duration::hours(1)),
            Lot::with_hours("B", "X", 2.0).with_deadline(t0() + Duration::hours(1)),
        ];
        let result = SmartPack.schedule(&lots, &config, t0()).unwrap();
        assert_eq!(result.fill_order(), vec!["B", "A"]);
        assert_eq!(result.window_violations, 2);
    }

    #[test]
    fn test_deterministic() {
        let config = Configuration::default()
            .with_changeovers(0.5, 2.0)
            .with_window_hours(7.0)
            .with_clean_hours(1.5)
            .with_cleaning_policy(CleaningPolicy::OnTypeChangeOrWindow);
        let lots = mixed_lots();
        let a = SmartPack.schedule(&lots, &config, t0()).unwrap();
        let b = SmartPack.schedule(&lots, &config, t0()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sequence_pool_subset() {
        let config = Configuration::default();
        let lots = mixed_lots();
        let order = SmartPack.sequence_pool(&lots, &[1, 3], &config, t0());
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 3]);
    }

    #[test]
    fn test_shortest_summary() {
        let config = Configuration::default();
        let lots = mixed_lots();
        let scorer = Scorer::new(&lots, &config, t0());
        let mut scratch = Scratch::new(scorer.type_names.len());
        scratch.summarize(&scorer, &[0, 1, 2, 3, 4, 5]);
        let a = scorer.type_of[0];
        assert_eq!(
            scratch.shortest[a],
            [Some((2, 1.0)), Some((5, 2.0)), Some((0, 3.0))]
        );
        let c = scorer.type_of[4];
        assert_eq!(scratch.shortest[c], [Some((4, 2.5)), None, None]);
    }

    #[test]
    fn test_unusable_slack_penalized() {
        let config = Configuration::default()
            .with_changeovers(0.0, 0.0)
            .with_window_hours(10.0)
            .with_clean_hours(1.0);
        // After A (6h) the 4h left cannot hold B (5h): slack is wasted.
        let lots = vec![Lot::with_hours("A", "X", 6.0), Lot::with_hours("B", "X", 5.0)];
        let scorer = Scorer::new(&lots, &config, t0());
        let mut scratch = Scratch::new(scorer.type_names.len());
        scratch.summarize(&scorer, &[0, 1]);
        let state = LineState::new(&config);
        let mut after = state;
        after.advance(&lots[0], &config);
        assert!((scorer.unusable_slack(&after, &[0], &scratch.shortest) - 4.0).abs() < 1e-9);
        // Nothing left to schedule: no waste.
        assert_eq!(scorer.unusable_slack(&after, &[0, 1], &scratch.shortest), 0.0);
    }
}
