//! Persisted action history and feedback learning.
//!
//! The tracker records every surfaced action, ingests accept/dismiss
//! feedback, and turns it into per-(contact, kind) state:
//! - sensitivity multipliers in [0.1, 2.0] that scale rule priority
//! - accepted/dismissed counts the bandit selector uses as reward estimates

mod feedback;
mod schema;
mod tracker;

pub use feedback::simulate_feedback;
pub use schema::{
    adjust_sensitivity, ActionRecord, FeedbackOutcome, FeedbackStats, FeedbackStatus, KindTable,
    SensitivityMap, SensitivityProfile, StateDocument, StatsMap, ACCEPT_FACTOR, DISMISS_FACTOR,
    SENSITIVITY_DEFAULT, SENSITIVITY_MAX, SENSITIVITY_MIN,
};
pub use tracker::{FeedbackSummaryEntry, StateTracker};
