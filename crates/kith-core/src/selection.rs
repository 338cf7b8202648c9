//! Epsilon-greedy action selection.
//!
//! Each contact is a bandit context and each action kind an arm. With
//! probability `epsilon` a candidate is picked uniformly at random;
//! otherwise every candidate is scored as
//!
//! ```text
//! combined = 0.7 * estimated_acceptance + 0.3 * 1 / (base_priority + 1)
//! ```
//!
//! where `estimated_acceptance` is `accepted / (accepted + dismissed)`, or
//! exactly 0.5 for a pair with no feedback yet. The highest score wins and
//! ties go to the earliest candidate.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::error::KithResult;
use crate::state::{FeedbackStats, StatsMap};
use crate::types::{ActionKind, CandidateAction};

/// Weight of the learned acceptance estimate.
pub const ACCEPTANCE_WEIGHT: f64 = 0.7;
/// Weight of the rule urgency.
pub const URGENCY_WEIGHT: f64 = 0.3;
/// Acceptance estimate for a pair without feedback.
pub const NEUTRAL_ACCEPTANCE: f64 = 0.5;

/// Source of accepted/dismissed counts per (contact, kind).
pub trait ActionStatsSource {
    fn action_stats(&self, contact: &str, kind: ActionKind) -> KithResult<FeedbackStats>;
}

impl ActionStatsSource for StatsMap {
    fn action_stats(&self, contact: &str, kind: ActionKind) -> KithResult<FeedbackStats> {
        Ok(self.get(contact, kind))
    }
}

/// Acceptance estimate from feedback counts.
pub fn estimated_acceptance(stats: FeedbackStats) -> f64 {
    stats.acceptance_rate().unwrap_or(NEUTRAL_ACCEPTANCE)
}

/// Urgency of a rule priority: 1 -> 0.5, 5 -> 0.1667.
pub fn urgency_from_priority(base_priority: u8) -> f64 {
    1.0 / (f64::from(base_priority) + 1.0)
}

/// Exploitation score of a candidate given its feedback counts.
pub fn combined_score(stats: FeedbackStats, base_priority: u8) -> f64 {
    ACCEPTANCE_WEIGHT * estimated_acceptance(stats)
        + URGENCY_WEIGHT * urgency_from_priority(base_priority)
}

/// Epsilon-greedy selection policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonGreedy {
    epsilon: f64,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self { epsilon: 0.2 }
    }
}

impl EpsilonGreedy {
    /// Create a policy; epsilon is clamped to [0, 1].
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.clamp(0.0, 1.0),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Pick at most one candidate for `contact`.
    ///
    /// Returns `None` only when `candidates` is empty. A failing stats
    /// lookup counts as no feedback.
    pub fn select<'a, S, R>(
        &self,
        candidates: &'a [CandidateAction],
        contact: &str,
        stats: &S,
        rng: &mut R,
    ) -> Option<&'a CandidateAction>
    where
        S: ActionStatsSource + ?Sized,
        R: Rng + ?Sized,
    {
        if candidates.is_empty() {
            return None;
        }

        if rng.gen::<f64>() < self.epsilon {
            let chosen = candidates.choose(rng)?;
            debug!(contact, kind = %chosen.kind, "Exploring");
            return Some(chosen);
        }

        let chosen = self.exploit(candidates, contact, stats);
        if let Some(action) = chosen {
            debug!(contact, kind = %action.kind, "Exploiting");
        }
        chosen
    }

    /// The exploitation branch: highest combined score, first on ties.
    pub fn exploit<'a, S>(
        &self,
        candidates: &'a [CandidateAction],
        contact: &str,
        stats: &S,
    ) -> Option<&'a CandidateAction>
    where
        S: ActionStatsSource + ?Sized,
    {
        let mut best: Option<(&CandidateAction, f64)> = None;
        for candidate in candidates {
            let counts = stats.action_stats(contact, candidate.kind).unwrap_or_else(|e| {
                debug!(
                    contact,
                    kind = %candidate.kind,
                    error = %e,
                    "Stats lookup failed; using no feedback"
                );
                FeedbackStats::default()
            });
            let score = combined_score(counts, candidate.base_priority);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((candidate, score));
            }
        }
        best.map(|(candidate, _)| candidate)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::KithError;
    use crate::state::FeedbackOutcome;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    /// RNG with a fixed 64-bit word: `ConstRng(0)` makes `gen::<f64>()`
    /// return 0.0, `ConstRng(u64::MAX)` a value just below 1.0. 32-bit draws
    /// are always 0 so index sampling picks the first element.
    pub(crate) struct ConstRng(pub u64);

    impl RngCore for ConstRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            self.0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    struct FailingStats;

    impl ActionStatsSource for FailingStats {
        fn action_stats(&self, _contact: &str, _kind: ActionKind) -> KithResult<FeedbackStats> {
            Err(KithError::stats_lookup("store unavailable"))
        }
    }

    fn candidate(kind: ActionKind) -> CandidateAction {
        CandidateAction::new(kind, "Priya", "reason")
    }

    #[test]
    fn test_empty_candidates() {
        let policy = EpsilonGreedy::new(0.2);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(policy.select(&[], "Priya", &StatsMap::default(), &mut rng).is_none());
    }

    #[test]
    fn test_cold_start_score() {
        assert_eq!(estimated_acceptance(FeedbackStats::default()), 0.5);
        let score = combined_score(FeedbackStats::default(), 1);
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_candidate_regardless_of_epsilon() {
        let candidates = vec![candidate(ActionKind::CatchUp)];
        let stats = StatsMap::default();
        for epsilon in [0.0, 0.5, 1.0] {
            let policy = EpsilonGreedy::new(epsilon);
            for word in [0, u64::MAX / 2, u64::MAX] {
                let chosen = policy.select(&candidates, "Priya", &stats, &mut ConstRng(word));
                assert_eq!(chosen.map(|c| c.kind), Some(ActionKind::CatchUp));
            }
        }
    }

    #[test]
    fn test_exploit_prefers_urgency_on_cold_start() {
        let candidates = vec![
            candidate(ActionKind::ShareMeme),
            candidate(ActionKind::CheckIn),
            candidate(ActionKind::ReachOut),
        ];
        let policy = EpsilonGreedy::new(0.0);
        let chosen = policy.select(&candidates, "Priya", &StatsMap::default(), &mut ConstRng(0));
        assert_eq!(chosen.unwrap().kind, ActionKind::ReachOut);
    }

    #[test]
    fn test_exploit_uses_learned_acceptance() {
        let mut stats = StatsMap::default();
        for _ in 0..3 {
            stats.apply("Priya", ActionKind::ReachOut, FeedbackOutcome::Dismissed);
            stats.apply("Priya", ActionKind::ShareMeme, FeedbackOutcome::Accepted);
        }
        let candidates = vec![candidate(ActionKind::ReachOut), candidate(ActionKind::ShareMeme)];
        let policy = EpsilonGreedy::new(0.0);

        // reach_out: 0.7 * 0 + 0.3 / 3 = 0.1; share_meme: 0.7 * 1 + 0.3 / 7 ~ 0.743
        let chosen = policy.select(&candidates, "Priya", &stats, &mut ConstRng(0));
        assert_eq!(chosen.unwrap().kind, ActionKind::ShareMeme);
    }

    #[test]
    fn test_exploit_reads_base_priority_not_scaled() {
        let mut scaled = candidate(ActionKind::CheckIn);
        scaled.scale_priority(0.1);
        let candidates = vec![candidate(ActionKind::FollowUpReminder), scaled];
        let policy = EpsilonGreedy::new(0.0);
        let chosen = policy.exploit(&candidates, "Priya", &StatsMap::default());
        assert_eq!(chosen.unwrap().kind, ActionKind::FollowUpReminder);
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let mut first = candidate(ActionKind::CheckIn);
        first.details = vec!["first".to_string()];
        let mut second = candidate(ActionKind::SuggestApology);
        second.details = vec!["second".to_string()];
        let candidates = vec![first, second];

        let chosen = EpsilonGreedy::new(0.0).exploit(&candidates, "Priya", &StatsMap::default());
        assert_eq!(chosen.unwrap().details, vec!["first".to_string()]);
    }

    #[test]
    fn test_exploit_is_deterministic() {
        let candidates = vec![
            candidate(ActionKind::Congratulate),
            candidate(ActionKind::SupportCheckin),
            candidate(ActionKind::ImproveFollowup),
        ];
        let policy = EpsilonGreedy::new(0.0);
        let stats = StatsMap::default();
        let a = policy.select(&candidates, "Priya", &stats, &mut StdRng::seed_from_u64(1));
        let b = policy.select(&candidates, "Priya", &stats, &mut StdRng::seed_from_u64(2));
        assert_eq!(a, b);
        assert_eq!(a.unwrap().kind, ActionKind::SupportCheckin);
    }

    #[test]
    fn test_explore_branch_returns_some_candidate() {
        let candidates = vec![
            candidate(ActionKind::ShareMeme),
            candidate(ActionKind::CatchUp),
            candidate(ActionKind::CheckIn),
        ];
        let policy = EpsilonGreedy::new(1.0);
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let chosen = policy
                .select(&candidates, "Priya", &StatsMap::default(), &mut rng)
                .unwrap();
            seen.insert(chosen.kind);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_failing_stats_lookup_counts_as_no_feedback() {
        let candidates = vec![
            candidate(ActionKind::ResponseTimeAlert),
            candidate(ActionKind::CatchUp),
        ];
        let chosen =
            EpsilonGreedy::new(0.0).select(&candidates, "Priya", &FailingStats, &mut ConstRng(0));
        assert_eq!(chosen.unwrap().kind, ActionKind::CatchUp);
    }

    #[test]
    fn test_epsilon_is_clamped() {
        assert_eq!(EpsilonGreedy::new(-1.0).epsilon(), 0.0);
        assert_eq!(EpsilonGreedy::new(3.0).epsilon(), 1.0);
    }
}
