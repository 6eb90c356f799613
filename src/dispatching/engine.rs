//! Lexicographic rule chain.
//!
//! Each lot is scored once per rule; lots are then ordered by their score
//! vectors, left to right, and finally by the configured [`TieBreaker`].
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::sync::Arc;

use super::{DispatchContext, DispatchingRule};
use crate::models::Lot;

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreaker {
    /// Keep input order (stable sort).
    #[default]
    InputOrder,
    /// Deterministic by lot id (lexicographic).
    ById,
}

/// Ordered chain of dispatching rules.
///
/// The first rule decides; later rules only separate lots that tie on
/// every rule before them. Scores are compared with [`f64::total_cmp`], so
/// the ordering is total even for NaN scores.
///
/// # Example
/// ```
/// use u_filling::dispatching::{rules, RuleEngine, TieBreaker};
///
/// let engine = RuleEngine::new()
///     .with_rule(rules::Edd)
///     .then_by(rules::Priority)
///     .with_final_tie_breaker(TieBreaker::ById);
/// assert_eq!(engine.rule_names(), vec!["EDD", "PRIORITY"]);
/// ```
#[derive(Clone, Default)]
pub struct RuleEngine {
    chain: Vec<Arc<dyn DispatchingRule>>,
    tie_breaker: TieBreaker,
}

impl RuleEngine {
    /// Creates an empty chain (input order only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the primary rule.
    pub fn with_rule<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.chain.push(Arc::new(rule));
        self
    }

    /// Appends a rule consulted only when all earlier rules tie.
    pub fn then_by<R: DispatchingRule + 'static>(self, rule: R) -> Self {
        self.with_rule(rule)
    }

    /// Sets the final tie-breaking strategy.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Names of the configured rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|rule| rule.name()).collect()
    }

    /// All lot indices, highest priority first.
    pub fn sort_indices(&self, lots: &[Lot], context: &DispatchContext<'_>) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..lots.len()).collect();
        self.sort_subset(&mut indices, lots, context);
        indices
    }

    /// Sorts a subset of lot indices in place.
    pub fn sort_subset(&self, indices: &mut [usize], lots: &[Lot], context: &DispatchContext<'_>) {
        let mut keyed: Vec<(Vec<f64>, usize)> = indices
            .iter()
            .map(|&i| {
                let key = self.chain.iter().map(|rule| rule.evaluate(&lots[i], context)).collect();
                (key, i)
            })
            .collect();

        keyed.sort_by(|(ka, a), (kb, b)| {
            ka.iter()
                .zip(kb)
                .map(|(x, y)| x.total_cmp(y))
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.final_tie(&lots[*a], &lots[*b]))
        });

        for (slot, (_, i)) in indices.iter_mut().zip(keyed) {
            *slot = i;
        }
    }

    fn final_tie(&self, a: &Lot, b: &Lot) -> Ordering {
        match self.tie_breaker {
            TieBreaker::InputOrder => Ordering::Equal,
            TieBreaker::ById => a.lot_id.cmp(&b.lot_id),
        }
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("chain", &self.rule_names())
            .field("tie_breaker", &self.tie_breaker)
            .finish()
    }
}
