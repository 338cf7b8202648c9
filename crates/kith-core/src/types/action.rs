//! Action kinds and candidate actions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// The fixed vocabulary of relationship-maintenance actions.
///
/// Kinds serialize to snake_case both through serde and strum, so
/// `ActionKind::FollowUpReminder` is stored as `"follow_up_reminder"`.
/// Names that are not recognised (for example from a store written by a
/// newer build) load as [`ActionKind::Other`]. The persisted store keeps
/// kinds as raw names, so such entries survive a load and save.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Relationship score fell below the configured floor.
    CatchUp,
    /// No messages for longer than the inactivity threshold.
    ReachOut,
    /// An unanswered question or a missed commitment.
    FollowUpReminder,
    /// Sentiment dropped between recent windows.
    CheckIn,
    /// Conversation is dominated by one side.
    BalanceConversation,
    /// Replies have been unusually slow.
    ResponseTimeAlert,
    /// Argument periods were detected.
    SuggestApology,
    /// Contact mentioned stress, illness, exams or a thesis.
    SupportCheckin,
    /// Birthday, achievement or similar positive event.
    Congratulate,
    /// Commitments are rarely followed through.
    ImproveFollowup,
    /// Turn a missed commitment into a concrete plan.
    ProposePlan,
    /// Late-night conversations with a romantic partner.
    RomanticCheckin,
    /// Lots of casual chat with a friend.
    ShareMeme,
    /// Work-related chat with an academic contact.
    AcademicReminder,
    /// Unrecognised kind.
    #[serde(other)]
    Other,
}

impl ActionKind {
    /// Base priority of the rule that emits this kind (lower is more urgent).
    pub fn base_priority(self) -> u8 {
        match self {
            ActionKind::CatchUp => 1,
            ActionKind::ReachOut => 2,
            ActionKind::FollowUpReminder
            | ActionKind::SupportCheckin
            | ActionKind::ProposePlan => 3,
            ActionKind::CheckIn
            | ActionKind::SuggestApology
            | ActionKind::Congratulate
            | ActionKind::RomanticCheckin => 4,
            ActionKind::BalanceConversation
            | ActionKind::ImproveFollowup
            | ActionKind::AcademicReminder
            | ActionKind::Other => 5,
            ActionKind::ResponseTimeAlert | ActionKind::ShareMeme => 6,
        }
    }

    /// Returns the snake_case name.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Parse a stored kind name, falling back to [`ActionKind::Other`].
    pub fn from_name(name: &str) -> ActionKind {
        name.parse().unwrap_or(ActionKind::Other)
    }

    /// All known kinds, excluding [`ActionKind::Other`].
    pub fn known() -> impl Iterator<Item = ActionKind> {
        Self::iter().filter(|k| *k != ActionKind::Other)
    }
}

impl AsRef<str> for ActionKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// An unpersisted, rule-derived suggestion for one contact.
///
/// `priority` starts equal to `base_priority` and is scaled by the
/// contact's sensitivity multiplier for this kind. The bandit selector
/// reads `base_priority`, never the scaled value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAction {
    /// What to do.
    pub kind: ActionKind,
    /// Who it concerns.
    pub contact: String,
    /// Human-readable reason the rule fired.
    pub reason: String,
    /// Rule priority before sensitivity scaling.
    pub base_priority: u8,
    /// Priority after sensitivity scaling.
    pub priority: f64,
    /// Supporting message snippets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// Extra structured data for renderers (e.g. `days`).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl CandidateAction {
    /// Create a candidate with the kind's base priority and no details.
    pub fn new(kind: ActionKind, contact: impl Into<String>, reason: impl Into<String>) -> Self {
        let base_priority = kind.base_priority();
        Self {
            kind,
            contact: contact.into(),
            reason: reason.into(),
            base_priority,
            priority: f64::from(base_priority),
            details: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Set the detail snippets.
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// Add one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Rescale `priority` from the base priority by a sensitivity multiplier.
    pub fn scale_priority(&mut self, multiplier: f64) {
        self.priority = f64::from(self.base_priority) * multiplier;
    }
}

/// A candidate that was surfaced and registered with the state tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedAction {
    /// Id of the action record in the state store.
    pub id: u64,
    /// The chosen candidate.
    #[serde(flatten)]
    pub action: CandidateAction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_kind_names_are_snake_case() {
        assert_eq!(ActionKind::FollowUpReminder.to_string(), "follow_up_reminder");
        assert_eq!(ActionKind::from_str("catch_up").unwrap(), ActionKind::CatchUp);
        let json = serde_json::to_string(&ActionKind::ResponseTimeAlert).unwrap();
        assert_eq!(json, "\"response_time_alert\"");
    }

    #[test]
    fn test_unknown_kind_loads_as_other() {
        let kind: ActionKind = serde_json::from_str("\"send_flowers\"").unwrap();
        assert_eq!(kind, ActionKind::Other);
        assert_eq!(ActionKind::from_name("send_flowers"), ActionKind::Other);
        assert_eq!(ActionKind::from_name("check_in"), ActionKind::CheckIn);
    }

    #[test]
    fn test_known_kinds() {
        assert_eq!(ActionKind::known().count(), 14);
        assert!(ActionKind::known().all(|k| k != ActionKind::Other));
    }

    #[test]
    fn test_base_priorities() {
        assert_eq!(ActionKind::CatchUp.base_priority(), 1);
        assert_eq!(ActionKind::ReachOut.base_priority(), 2);
        assert_eq!(ActionKind::ProposePlan.base_priority(), 3);
        assert_eq!(ActionKind::RomanticCheckin.base_priority(), 4);
        assert_eq!(ActionKind::AcademicReminder.base_priority(), 5);
        assert_eq!(ActionKind::ShareMeme.base_priority(), 6);
    }

    #[test]
    fn test_scale_priority_uses_base() {
        let mut action = CandidateAction::new(ActionKind::FollowUpReminder, "Varun", "question");
        action.scale_priority(1.1);
        assert!((action.priority - 3.3).abs() < 1e-9);
        action.scale_priority(0.5);
        assert!((action.priority - 1.5).abs() < 1e-9);
        assert_eq!(action.base_priority, 3);
    }

    #[test]
    fn test_selected_action_flattens_candidate() {
        let selected = SelectedAction {
            id: 7,
            action: CandidateAction::new(ActionKind::CatchUp, "Priya", "low score"),
        };
        let value = serde_json::to_value(&selected).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["kind"], "catch_up");
        assert_eq!(value["contact"], "Priya");
    }
}
