//! Decision engine: one pass from contact signals to surfaced actions.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::KithResult;
use crate::prioritization::prioritize_signals;
use crate::rules::RuleEvaluator;
use crate::selection::EpsilonGreedy;
use crate::state::StateTracker;
use crate::types::{ContactSignals, SelectedAction};

/// Runs the prioritize, evaluate, select, record loop.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: EngineConfig,
    selector: EpsilonGreedy,
}

impl DecisionEngine {
    /// Create an engine using `config.selection.epsilon`.
    pub fn new(config: EngineConfig) -> Self {
        let selector = EpsilonGreedy::new(config.selection.epsilon);
        Self { config, selector }
    }

    /// Replace the exploration rate.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.selector = EpsilonGreedy::new(epsilon);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn selector(&self) -> &EpsilonGreedy {
        &self.selector
    }

    /// Run the engine with the current time as the evaluation time.
    pub fn run<R: Rng + ?Sized>(
        &self,
        contacts: &[ContactSignals],
        tracker: &mut StateTracker,
        rng: &mut R,
    ) -> KithResult<Vec<SelectedAction>> {
        self.run_at(contacts, tracker, rng, Utc::now())
    }

    /// Run the engine for every contact, most urgent first.
    ///
    /// Contacts without candidates contribute nothing. Each chosen action
    /// is recorded in `tracker` before it is returned; the only error is a
    /// failed store write.
    pub fn run_at<R: Rng + ?Sized>(
        &self,
        contacts: &[ContactSignals],
        tracker: &mut StateTracker,
        rng: &mut R,
        as_of: DateTime<Utc>,
    ) -> KithResult<Vec<SelectedAction>> {
        let evaluator = RuleEvaluator::new(&self.config, as_of);
        let mut selected = Vec::new();

        for ranked in prioritize_signals(contacts) {
            let signals = &contacts[ranked.index];
            let contact = signals.contact.as_str();

            let sensitivities = tracker.get_sensitivities(contact);
            let candidates = evaluator.evaluate(signals, &sensitivities);
            let Some(first) = candidates.first() else {
                debug!(contact, urgency = ranked.urgency, "No candidate actions");
                continue;
            };

            let chosen = self
                .selector
                .select(&candidates, contact, &*tracker, rng)
                .unwrap_or(first)
                .clone();

            let id = tracker.record_selected(&chosen)?;
            info!(
                id,
                contact,
                kind = %chosen.kind,
                candidates = candidates.len(),
                "Selected action"
            );
            selected.push(SelectedAction { id, action: chosen });
        }

        info!(
            contacts = contacts.len(),
            actions = selected.len(),
            "Decision engine run complete"
        );
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::tests::ConstRng;
    use crate::state::FeedbackOutcome;
    use crate::types::{ActionKind, AnomalyRecord, SentimentDrop};
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_input() {
        let engine = DecisionEngine::new(EngineConfig::default());
        let mut tracker = StateTracker::in_memory();
        let actions = engine.run_at(&[], &mut tracker, &mut ConstRng(0), now()).unwrap();
        assert!(actions.is_empty());
        assert!(tracker.actions().is_empty());
    }

    #[test]
    fn test_quiet_contacts_are_skipped() {
        let engine = DecisionEngine::new(EngineConfig::default());
        let mut tracker = StateTracker::in_memory();
        let contacts = vec![
            ContactSignals::new("Mom", 0.9, 1),
            ContactSignals::new("Priya", 0.4, 2),
        ];

        let actions = engine.run_at(&contacts, &mut tracker, &mut ConstRng(0), now()).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].id, 1);
        assert_eq!(actions[0].action.contact, "Priya");
        assert_eq!(actions[0].action.kind, ActionKind::CatchUp);
        assert_eq!(tracker.actions().len(), 1);
    }

    #[test]
    fn test_actions_follow_contact_urgency() {
        let engine = DecisionEngine::new(EngineConfig::default()).with_epsilon(0.0);
        let mut tracker = StateTracker::in_memory();
        let mut calm = ContactSignals::new("Sneha", 0.8, 2);
        calm.signals.sentiment_drop = Some(SentimentDrop {
            previous: 0.7,
            recent: 0.2,
        });
        let contacts = vec![calm, ContactSignals::new("Varun", 0.2, 20)];

        let actions = engine.run_at(&contacts, &mut tracker, &mut ConstRng(0), now()).unwrap();
        let order: Vec<&str> = actions.iter().map(|a| a.action.contact.as_str()).collect();
        assert_eq!(order, vec!["Varun", "Sneha"]);
        assert_eq!(actions[0].action.kind, ActionKind::CatchUp);
        assert_eq!(actions[1].action.kind, ActionKind::CheckIn);
        assert_eq!(actions.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_feedback_shifts_exploitation() {
        let engine = DecisionEngine::new(EngineConfig::default()).with_epsilon(0.0);
        let mut tracker = StateTracker::in_memory();
        let mut signals = ContactSignals::new("Aryan", 0.9, 10);
        signals.signals.unanswered_questions =
            vec![AnomalyRecord::new(now() - chrono::Duration::days(3), "movie?")];
        let contacts = vec![signals];

        let first = engine.run_at(&contacts, &mut tracker, &mut ConstRng(0), now()).unwrap();
        assert_eq!(first[0].action.kind, ActionKind::ReachOut);

        tracker.record_feedback(first[0].id, FeedbackOutcome::Dismissed).unwrap();
        let follow_up = tracker
            .record_selected(&crate::types::CandidateAction::new(
                ActionKind::FollowUpReminder,
                "Aryan",
                "movie?",
            ))
            .unwrap();
        tracker.record_feedback(follow_up, FeedbackOutcome::Accepted).unwrap();

        let second = engine.run_at(&contacts, &mut tracker, &mut ConstRng(0), now()).unwrap();
        assert_eq!(second[0].action.kind, ActionKind::FollowUpReminder);
        assert_eq!(second[0].id, 3);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let engine = DecisionEngine::new(EngineConfig::default()).with_epsilon(0.5);
        let mut contact = ContactSignals::new("Sahil", 0.3, 12);
        contact.signals.one_sided_ratio = Some(0.1);
        let contacts = vec![contact];

        let mut a = StateTracker::in_memory();
        let mut b = StateTracker::in_memory();
        let first = engine
            .run_at(&contacts, &mut a, &mut StdRng::seed_from_u64(42), now())
            .unwrap();
        let second = engine
            .run_at(&contacts, &mut b, &mut StdRng::seed_from_u64(42), now())
            .unwrap();
        assert_eq!(first, second);
    }
}
