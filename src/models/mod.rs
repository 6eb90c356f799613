//! Filling-line domain models.
//!
//! Provides the value types exchanged with the engine: the input
//! [`Lot`] list and [`Configuration`], and the output [`ScheduleResult`]
//! made of [`Activity`] intervals.
//!
//! # Domain Mappings
//!
//! | u-filling | Plant floor | Generic scheduling |
//! |-----------|-------------|--------------------|
//! | Lot | Batch / fill order | Job |
//! | Activity | FILL / CLEAN / CHANGEOVER | Operation or setup interval |
//! | Configuration | Line constants + planner knobs | Problem parameters |
//! | ScheduleResult | Line timeline | Schedule |

mod activity;
mod config;
mod lot;
mod schedule;

pub use activity::{duration_to_hours, hours_to_duration, Activity, ActivityKind};
pub use config::{
    CleaningPolicy, ClusterOrder, ClusterTuning, Configuration, SmartPackTuning,
    WithinClusterOrder, MAX_DURATION_HOURS, MAX_TIME_LIMIT_SECONDS,
};
pub use lot::Lot;
pub use schedule::{Optimality, ScheduleResult};
