//! Simulated user feedback for demos and dry runs.

use rand::Rng;
use tracing::info;

use crate::error::KithResult;
use crate::types::SelectedAction;

use super::schema::FeedbackOutcome;
use super::tracker::StateTracker;

/// Record a random outcome for each selected action.
///
/// Each action is accepted with probability `accept_probability` and
/// dismissed otherwise. Returns `(id, outcome)` for every action that was
/// found in the tracker.
pub fn simulate_feedback<R: Rng + ?Sized>(
    tracker: &mut StateTracker,
    actions: &[SelectedAction],
    accept_probability: f64,
    rng: &mut R,
) -> KithResult<Vec<(u64, FeedbackOutcome)>> {
    let p = accept_probability.clamp(0.0, 1.0);
    let mut outcomes = Vec::with_capacity(actions.len());

    for selected in actions {
        let outcome = if rng.gen_bool(p) {
            FeedbackOutcome::Accepted
        } else {
            FeedbackOutcome::Dismissed
        };
        if tracker.record_feedback(selected.id, outcome)? {
            info!(
                id = selected.id,
                contact = %selected.action.contact,
                kind = %selected.action.kind,
                outcome = %outcome,
                "Simulated feedback"
            );
            outcomes.push((selected.id, outcome));
        }
    }

    Ok(outcomes)
}
