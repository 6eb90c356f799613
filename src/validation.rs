//! Input and output validation for filling schedules.
//!
//! [`validate_lots`] checks a lot list before any strategy runs. It is a
//! single pass that never mutates the input and returns errors and
//! warnings separately, so the caller decides whether to fail fast.
//! Detects:
//! - Empty lot list, empty ids or types
//! - Non-positive or oversized sizes (`vials` / `fill_hours`)
//! - Duplicate ids (one aggregated error per duplicated id)
//! - Impossible time windows
//! - Lots longer than the clean window
//!
//! [`validate_schedule`] audits a produced timeline (no overlap, coverage,
//! conservation, window overrun, lot splits).

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::{duration_to_hours, Activity, ActivityKind, Configuration, Lot, MAX_DURATION_HOURS};
use crate::rules::EPSILON_HOURS;

/// Slack for timeline audits: timelines are quantized to milliseconds.
const AUDIT_TOLERANCE_HOURS: f64 = 1e-6;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// No lots to schedule.
    EmptyLotList,
    /// A lot has a blank id.
    EmptyLotId,
    /// A lot has a blank type.
    EmptyLotType,
    /// `vials` or `fill_hours` is not positive (or not finite).
    NonPositiveSize,
    /// A lot's fill runs longer than [`MAX_DURATION_HOURS`].
    SizeTooLarge,
    /// Two lots share the same id.
    DuplicateId,
    /// `window_end` is not after `window_start`, or the window is shorter
    /// than the fill.
    InvalidWindow,
    /// A single lot runs longer than `window_hours`.
    ExceedsCleanWindow,
    /// Priority is not a finite number.
    InvalidPriority,
    /// Timeline activities overlap, leave gaps, or run backwards.
    TimelineBroken,
    /// A lot is missing from, repeated in, or unknown to the timeline.
    CoverageMismatch,
    /// Continuous run between CLEANs exceeds `window_hours`.
    WindowOverrun,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors and warnings from one validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Hard errors. Scheduling must not proceed.
    pub errors: Vec<ValidationError>,
    /// Soft findings. Scheduling may proceed.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether no hard errors were found.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors of one kind.
    pub fn errors_of(&self, kind: ValidationErrorKind) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.kind == kind).collect()
    }

    fn error(&mut self, kind: ValidationErrorKind, message: impl Into<String>) {
        self.errors.push(ValidationError::new(kind, message));
    }
}

/// Validates a lot list against the line configuration.
///
/// Checks, in one pass over `lots`:
/// 1. The list is not empty
/// 2. Every lot has a non-blank id and type
/// 3. Sizes are positive (`fill_hours` when given, else `vials`) and no
///    fill exceeds [`MAX_DURATION_HOURS`]
/// 4. Ids are unique; each duplicated id is reported once
/// 5. Windows are ordered and at least as long as the fill
/// 6. No lot exceeds `window_hours`
///
/// Warnings: `fill_hours` disagreeing with `vials / fill_rate_vph` by more
/// than 1%.
pub fn validate_lots(lots: &[Lot], config: &Configuration) -> ValidationReport {
    let mut report = ValidationReport::default();

    if lots.is_empty() {
        report.error(ValidationErrorKind::EmptyLotList, "No lots to schedule");
        return report;
    }

    let rate_usable = config.fill_rate_vph.is_finite() && config.fill_rate_vph > 0.0;
    let mut seen: HashSet<&str> = HashSet::with_capacity(lots.len());
    let mut duplicates: BTreeSet<&str> = BTreeSet::new();

    for lot in lots {
        let label = if lot.lot_id.trim().is_empty() {
            report.error(ValidationErrorKind::EmptyLotId, "A lot has an empty lot_id");
            "(unknown)"
        } else {
            lot.lot_id.as_str()
        };

        if lot.lot_type.trim().is_empty() {
            report.error(
                ValidationErrorKind::EmptyLotType,
                format!("Lot {label} has an empty lot_type"),
            );
        }

        if !seen.insert(lot.lot_id.as_str()) && !lot.lot_id.trim().is_empty() {
            duplicates.insert(lot.lot_id.as_str());
        }

        let size_ok = match lot.fill_hours {
            Some(hours) => {
                let ok = hours.is_finite() && hours > 0.0;
                if !ok {
                    report.error(
                        ValidationErrorKind::NonPositiveSize,
                        format!("Lot {label}: fill_hours must be positive (got {hours})"),
                    );
                } else if lot.vials > 0 && rate_usable {
                    let derived = lot.vials as f64 / config.fill_rate_vph;
                    if (derived - hours).abs() > 0.01 * hours {
                        report.warnings.push(format!(
                            "Lot {label}: fill_hours {hours:.2} h disagrees with {} vials (~{derived:.2} h)",
                            lot.vials
                        ));
                    }
                }
                ok
            }
            None => {
                let ok = lot.vials > 0;
                if !ok {
                    report.error(
                        ValidationErrorKind::NonPositiveSize,
                        format!("Lot {label}: vials must be a positive integer (got {})", lot.vials),
                    );
                }
                ok
            }
        };

        if let Some(priority) = lot.priority {
            if !priority.is_finite() {
                report.error(
                    ValidationErrorKind::InvalidPriority,
                    format!("Lot {label}: priority must be finite"),
                );
            }
        }

        if !size_ok || (lot.fill_hours.is_none() && !rate_usable) {
            continue;
        }
        let hours = lot.duration_hours(config);
        if hours > MAX_DURATION_HOURS {
            report.error(
                ValidationErrorKind::SizeTooLarge,
                format!("Lot {label}: ~{hours:.2} h fill exceeds the {MAX_DURATION_HOURS} h limit"),
            );
            continue;
        }

        if let (Some(ws), Some(we)) = (lot.window_start, lot.window_end) {
            if we <= ws {
                report.error(
                    ValidationErrorKind::InvalidWindow,
                    format!("Lot {label}: window_end {we} is not after window_start {ws}"),
                );
            } else if duration_to_hours(we - ws) + EPSILON_HOURS < hours {
                report.error(
                    ValidationErrorKind::InvalidWindow,
                    format!(
                        "Lot {label}: window of {:.2} h cannot hold a {hours:.2} h fill",
                        duration_to_hours(we - ws)
                    ),
                );
            }
        }

        if hours > config.window_hours + EPSILON_HOURS {
            let max_vials = (config.window_hours * config.fill_rate_vph).floor() as i64;
            report.error(
                ValidationErrorKind::ExceedsCleanWindow,
                format!(
                    "Lot {label}: ~{hours:.2} h exceeds the {} h clean window (max {max_vials} vials at current rate)",
                    config.window_hours
                ),
            );
        }
    }

    for id in duplicates {
        report.error(
            ValidationErrorKind::DuplicateId,
            format!("Duplicate lot_id: {id}"),
        );
    }

    report
}

/// Audits a finished timeline.
///
/// Checks:
/// 1. Every activity has `end > start`
/// 2. Activities are contiguous and ordered (single line: no overlap, no gap)
/// 3. Every lot is filled exactly once; no FILL names an unknown lot
/// 4. No FILL exceeds `window_hours`
/// 5. Continuous run between CLEANs stays within `window_hours` when the
///    cleaning policy enforces the window
pub fn validate_schedule(
    activities: &[Activity],
    lots: &[Lot],
    config: &Configuration,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for pair in activities.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if b.start < a.end {
            report.error(
                ValidationErrorKind::TimelineBroken,
                format!("{} at {} overlaps the preceding {} ending {}", b.kind, b.start, a.kind, a.end),
            );
        } else if b.start > a.end {
            report.error(
                ValidationErrorKind::TimelineBroken,
                format!("Gap between {} ending {} and {} at {}", a.kind, a.end, b.kind, b.start),
            );
        }
    }

    let mut fill_counts: HashMap<&str, usize> = HashMap::new();
    let known: HashSet<&str> = lots.iter().map(|l| l.lot_id.as_str()).collect();
    let mut run = 0.0;

    for a in activities {
        if a.end <= a.start {
            report.error(
                ValidationErrorKind::TimelineBroken,
                format!("{} at {} has non-positive duration", a.kind, a.start),
            );
        }

        let hours = a.duration_hours();
        match a.kind {
            ActivityKind::Clean => {
                if run > config.window_hours + AUDIT_TOLERANCE_HOURS && config.cleaning_policy.enforces_window() {
                    report.error(
                        ValidationErrorKind::WindowOverrun,
                        format!("Window overrun: {run:.2} h > {} h", config.window_hours),
                    );
                }
                run = 0.0;
            }
            ActivityKind::Changeover => run += hours,
            ActivityKind::Fill => {
                run += hours;
                let id = a.lot_id.as_deref().unwrap_or("");
                *fill_counts.entry(id).or_insert(0) += 1;
                if !known.contains(id) {
                    report.error(
                        ValidationErrorKind::CoverageMismatch,
                        format!("FILL references unknown lot {id:?}"),
                    );
                }
                if hours > config.window_hours + AUDIT_TOLERANCE_HOURS {
                    report.error(
                        ValidationErrorKind::WindowOverrun,
                        format!("Lot {id} FILL duration {hours:.2} h exceeds {} h limit", config.window_hours),
                    );
                }
            }
        }
    }
    if run > config.window_hours + AUDIT_TOLERANCE_HOURS && config.cleaning_policy.enforces_window() {
        report.error(
            ValidationErrorKind::WindowOverrun,
            format!("Window overrun: {run:.2} h > {} h", config.window_hours),
        );
    }

    for lot in lots {
        match fill_counts.get(lot.lot_id.as_str()).copied().unwrap_or(0) {
            1 => {}
            0 => report.error(
                ValidationErrorKind::CoverageMismatch,
                format!("Lot {} was never filled", lot.lot_id),
            ),
            n => report.error(
                ValidationErrorKind::CoverageMismatch,
                format!("Lot split detected: {} filled {n} times", lot.lot_id),
            ),
        }
    }

    report
}
