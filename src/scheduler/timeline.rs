//! Line state and activity timeline.
//!
//! [`LineState`] is the bookkeeping every strategy simulates against: the
//! last product type on the line, the run accumulated since the last CLEAN,
//! and elapsed hours from the schedule origin. [`Timeline`] turns a lot
//! sequence into contiguous activities using the same state, so what a
//! strategy scores is exactly what gets emitted.
//!
//! All durations are quantized to the timeline's millisecond resolution
//! before they are accounted, which keeps `sum(durations) == makespan`
//! exact.

use chrono::{Duration, NaiveDateTime};

use crate::models::{duration_to_hours, hours_to_duration, Activity, Configuration, Lot};
use crate::rules::{self, CleanReason, Transition};

/// Fill duration as emitted on the timeline (never shorter than one tick).
pub fn fill_duration(lot: &Lot, config: &Configuration) -> Duration {
    hours_to_duration(lot.duration_hours(config)).max(Duration::milliseconds(1))
}

fn quantize(hours: f64) -> f64 {
    duration_to_hours(hours_to_duration(hours))
}

/// Outcome of placing one lot next, relative to the schedule origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Changeover/clean work before the FILL.
    pub transition: Transition,
    /// Quantized changeover + clean hours before the FILL.
    pub transition_hours: f64,
    /// Quantized fill hours.
    pub fill_hours: f64,
    /// FILL start (hours from origin).
    pub fill_start: f64,
    /// FILL end (hours from origin).
    pub fill_end: f64,
}

/// Line bookkeeping between two placements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineState<'a> {
    /// Product type of the last FILL (`None` on a fresh or reset line).
    pub prev_type: Option<&'a str>,
    /// FILL + CHANGEOVER hours since the last CLEAN.
    pub window_used: f64,
    /// Hours from the schedule origin to the end of the last activity.
    pub elapsed_hours: f64,
}

impl<'a> LineState<'a> {
    /// State before the first lot. Accounts for the optional leading CLEAN.
    pub fn new(config: &Configuration) -> Self {
        Self {
            prev_type: None,
            window_used: 0.0,
            elapsed_hours: if config.start_with_clean {
                quantize(config.clean_hours)
            } else {
                0.0
            },
        }
    }

    /// What placing `lot` next would cost, without committing it.
    pub fn peek(&self, lot: &Lot, config: &Configuration) -> Step {
        let fill_hours = duration_to_hours(fill_duration(lot, config));
        let transition = rules::transition(
            self.prev_type,
            &lot.lot_type,
            fill_hours,
            self.window_used,
            config,
        );
        let transition_hours = quantized_transition_hours(&transition, config);
        let fill_start = self.elapsed_hours + transition_hours;
        Step {
            transition,
            transition_hours,
            fill_hours,
            fill_start,
            fill_end: fill_start + fill_hours,
        }
    }

    /// Commits a step previously computed by [`peek`](Self::peek) for `lot`.
    pub fn commit(&mut self, lot: &'a Lot, step: &Step) {
        let changeover = quantize(step.transition.changeover_hours);
        self.window_used = match step.transition.clean {
            Some(_) => step.fill_hours,
            None => self.window_used + changeover + step.fill_hours,
        };
        self.elapsed_hours = step.fill_end;
        self.prev_type = Some(&lot.lot_type);
    }

    /// Peeks and commits in one call.
    pub fn advance(&mut self, lot: &'a Lot, config: &Configuration) -> Step {
        let step = self.peek(lot, config);
        self.commit(lot, &step);
        step
    }

    /// Window capacity left before the next CLEAN (infinite when the policy
    /// does not enforce the window).
    pub fn window_remaining(&self, config: &Configuration) -> f64 {
        if config.cleaning_policy.enforces_window() {
            (config.window_hours - config.smart_pack.util_pad_hours - self.window_used).max(0.0)
        } else {
            f64::INFINITY
        }
    }
}

fn quantized_transition_hours(transition: &Transition, config: &Configuration) -> f64 {
    let clean = if transition.cleans() {
        quantize(config.clean_hours)
    } else {
        0.0
    };
    quantize(transition.changeover_hours) + clean
}

/// Activity builder for one schedule.
///
/// Activities are appended back to back starting at `origin`; the line
/// never idles.
#[derive(Debug, Clone)]
pub struct Timeline<'a> {
    config: &'a Configuration,
    cursor: NaiveDateTime,
    state: LineState<'a>,
    activities: Vec<Activity>,
}

impl<'a> Timeline<'a> {
    /// Starts a timeline at `origin`, emitting the leading CLEAN when
    /// `start_with_clean` is set.
    pub fn new(config: &'a Configuration, origin: NaiveDateTime) -> Self {
        let mut timeline = Self {
            config,
            cursor: origin,
            state: LineState::new(config),
            activities: Vec::new(),
        };
        if config.start_with_clean {
            timeline.emit_clean("Initial clean");
        }
        timeline
    }

    /// Current line state.
    pub fn state(&self) -> &LineState<'a> {
        &self.state
    }

    /// Appends the transition and FILL for `lot`.
    pub fn push(&mut self, lot: &'a Lot) -> Step {
        let prev = self.state.prev_type;
        let step = self.state.advance(lot, self.config);
        let transition = step.transition;

        match transition.clean {
            Some(CleanReason::WindowExhausted) => {
                self.emit_clean("Window exhausted");
            }
            Some(CleanReason::TypeChange) => {
                self.emit_changeover(transition.changeover_hours, prev, &lot.lot_type);
                self.emit_clean(&format!("Type change {} -> {}", prev.unwrap_or("-"), lot.lot_type));
            }
            None => {
                self.emit_changeover(transition.changeover_hours, prev, &lot.lot_type);
            }
        }

        let end = self.cursor + fill_duration(lot, self.config);
        self.activities
            .push(Activity::fill(lot.lot_id.clone(), lot.lot_type.clone(), self.cursor, end));
        self.cursor = end;
        step
    }

    /// Finishes the timeline.
    pub fn into_activities(self) -> Vec<Activity> {
        self.activities
    }

    fn emit_changeover(&mut self, hours: f64, prev: Option<&str>, next: &str) {
        let duration = hours_to_duration(hours);
        if duration <= Duration::zero() {
            return;
        }
        let end = self.cursor + duration;
        self.activities.push(
            Activity::changeover(self.cursor, end).with_note(format!("{} -> {next}", prev.unwrap_or("-"))),
        );
        self.cursor = end;
    }

    fn emit_clean(&mut self, note: &str) {
        let duration = hours_to_duration(self.config.clean_hours);
        if duration <= Duration::zero() {
            return;
        }
        let end = self.cursor + duration;
        self.activities.push(Activity::clean(self.cursor, end).with_note(note));
        self.cursor = end;
    }
}

/// Builds the activity sequence for `lots` visited in `order`.
///
/// # Panics
/// If `order` names an index outside `lots`.
pub fn assemble(
    lots: &[Lot],
    order: &[usize],
    config: &Configuration,
    origin: NaiveDateTime,
) -> Vec<Activity> {
    let mut timeline = Timeline::new(config, origin);
    for &i in order {
        timeline.push(&lots[i]);
    }
    timeline.into_activities()
}
