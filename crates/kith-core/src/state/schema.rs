//! Persisted state schema.
//!
//! On disk the store is a single JSON document with three top-level fields:
//!
//! ```text
//! {
//!   "actions":      [ { "id": 1, "contact": "...", "kind": "...",
//!                       "timestamp": "...", "feedback": "pending" } ],
//!   "sensitivity":  { "<contact>": { "<kind>": 1.0 } },
//!   "action_stats": { "<contact>": { "<kind>": { "accepted": 0, "dismissed": 0 } } }
//! }
//! ```
//!
//! Kinds are stored by name and never rewritten, so a store written by a
//! build with more kinds loads and saves without losing entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

use crate::types::ActionKind;

/// Lower bound of a sensitivity multiplier.
pub const SENSITIVITY_MIN: f64 = 0.1;
/// Upper bound of a sensitivity multiplier.
pub const SENSITIVITY_MAX: f64 = 2.0;
/// Multiplier of a pair that has never received feedback.
pub const SENSITIVITY_DEFAULT: f64 = 1.0;
/// Factor applied on accepted feedback.
pub const ACCEPT_FACTOR: f64 = 1.1;
/// Factor applied on dismissed feedback.
pub const DISMISS_FACTOR: f64 = 0.9;

/// Feedback a user gives on a surfaced action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FeedbackOutcome {
    Accepted,
    Dismissed,
}

/// Feedback state of an action record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Accepted,
    Dismissed,
}

impl From<FeedbackOutcome> for FeedbackStatus {
    fn from(outcome: FeedbackOutcome) -> Self {
        match outcome {
            FeedbackOutcome::Accepted => FeedbackStatus::Accepted,
            FeedbackOutcome::Dismissed => FeedbackStatus::Dismissed,
        }
    }
}

impl FeedbackStatus {
    /// Whether feedback has arrived.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, FeedbackStatus::Pending)
    }
}

// Older stores wrote `null` for pending feedback.
fn deserialize_feedback<'de, D>(deserializer: D) -> Result<FeedbackStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<FeedbackStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// Append-only log entry for an action that was surfaced.
///
/// `kind` is the stored kind name. It is kept verbatim so names this build
/// does not recognise are written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: u64,
    pub contact: String,
    #[serde(alias = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_feedback")]
    pub feedback: FeedbackStatus,
}

impl ActionRecord {
    /// The record's kind, [`ActionKind::Other`] when the name is unknown.
    pub fn action_kind(&self) -> ActionKind {
        ActionKind::from_name(&self.kind)
    }
}

/// Accepted and dismissed counts for one (contact, kind) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackStats {
    pub accepted: u64,
    pub dismissed: u64,
}

impl FeedbackStats {
    pub fn new(accepted: u64, dismissed: u64) -> Self {
        Self { accepted, dismissed }
    }

    /// Total feedback received.
    pub fn total(&self) -> u64 {
        self.accepted + self.dismissed
    }

    /// Observed acceptance rate, `None` before any feedback.
    pub fn acceptance_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.accepted as f64 / total as f64),
        }
    }

    fn record(&mut self, outcome: FeedbackOutcome) {
        match outcome {
            FeedbackOutcome::Accepted => self.accepted += 1,
            FeedbackOutcome::Dismissed => self.dismissed += 1,
        }
    }
}

/// Sensitivity multipliers for one contact, keyed by kind.
pub type SensitivityProfile = BTreeMap<ActionKind, f64>;

/// Per-contact values keyed by stored kind name.
pub type KindTable<T> = BTreeMap<String, T>;

/// Apply one feedback outcome to a sensitivity multiplier.
pub fn adjust_sensitivity(current: f64, outcome: FeedbackOutcome) -> f64 {
    match outcome {
        FeedbackOutcome::Accepted => (current * ACCEPT_FACTOR).min(SENSITIVITY_MAX),
        FeedbackOutcome::Dismissed => (current * DISMISS_FACTOR).max(SENSITIVITY_MIN),
    }
}

/// contact -> kind name -> sensitivity multiplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensitivityMap(BTreeMap<String, KindTable<f64>>);

impl SensitivityMap {
    /// Multiplier for a pair, 1.0 when unseen.
    pub fn get(&self, contact: &str, kind: impl AsRef<str>) -> f64 {
        self.0
            .get(contact)
            .and_then(|profile| profile.get(kind.as_ref()))
            .copied()
            .unwrap_or(SENSITIVITY_DEFAULT)
    }

    /// Multipliers for a contact's recognised kinds.
    ///
    /// Entries under names this build does not know are left out; no rule
    /// can emit them.
    pub fn profile(&self, contact: &str) -> SensitivityProfile {
        self.0
            .get(contact)
            .into_iter()
            .flatten()
            .filter_map(|(name, value)| name.parse::<ActionKind>().ok().map(|kind| (kind, *value)))
            .collect()
    }

    /// Apply feedback to a pair and return the new multiplier.
    pub fn apply(&mut self, contact: &str, kind: impl AsRef<str>, outcome: FeedbackOutcome) -> f64 {
        let value = self
            .0
            .entry(contact.to_string())
            .or_default()
            .entry(kind.as_ref().to_string())
            .or_insert(SENSITIVITY_DEFAULT);
        *value = adjust_sensitivity(*value, outcome);
        *value
    }

    /// Pull every multiplier into `[SENSITIVITY_MIN, SENSITIVITY_MAX]`.
    ///
    /// Returns how many values changed.
    pub fn clamp_to_bounds(&mut self) -> usize {
        let mut changed = 0;
        for value in self.0.values_mut().flat_map(|profile| profile.values_mut()) {
            let clamped = value.clamp(SENSITIVITY_MIN, SENSITIVITY_MAX);
            if clamped != *value {
                *value = clamped;
                changed += 1;
            }
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KindTable<f64>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// contact -> kind name -> accepted/dismissed counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsMap(BTreeMap<String, KindTable<FeedbackStats>>);

impl StatsMap {
    /// Counts for a pair, zero when unseen.
    pub fn get(&self, contact: &str, kind: impl AsRef<str>) -> FeedbackStats {
        self.0
            .get(contact)
            .and_then(|stats| stats.get(kind.as_ref()))
            .copied()
            .unwrap_or_default()
    }

    /// Increment the counter matching `outcome`.
    pub fn apply(
        &mut self,
        contact: &str,
        kind: impl AsRef<str>,
        outcome: FeedbackOutcome,
    ) -> FeedbackStats {
        let stats = self
            .0
            .entry(contact.to_string())
            .or_default()
            .entry(kind.as_ref().to_string())
            .or_default();
        stats.record(outcome);
        *stats
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KindTable<FeedbackStats>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The whole persisted store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateDocument {
    pub actions: Vec<ActionRecord>,
    pub sensitivity: SensitivityMap,
    pub action_stats: StatsMap,
}

impl StateDocument {
    /// Id the next appended record receives: one past the largest id seen.
    pub fn next_id(&self) -> u64 {
        self.actions
            .iter()
            .map(|record| record.id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Whether ids start at 1 and increase by exactly one.
    pub fn ids_are_dense(&self) -> bool {
        self.actions
            .iter()
            .enumerate()
            .all(|(i, record)| record.id == i as u64 + 1)
    }
}
