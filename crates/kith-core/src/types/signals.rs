//! Per-contact signal bundles computed upstream.
//!
//! These are inputs only: detectors outside this crate fill them from the
//! message history, and the rule evaluator reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::contact::ContactType;

/// One message-level anomaly (an outlier reply, a gap, a question...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// When the underlying message was sent.
    pub timestamp: DateTime<Utc>,
    /// The message text.
    #[serde(default)]
    pub message: String,
    /// How many standard deviations the measurement sits above the mean,
    /// when the detector reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deviation: Option<f64>,
}

impl AnomalyRecord {
    /// Create a record without a deviation.
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            deviation: None,
        }
    }

    /// Set the deviation.
    pub fn with_deviation(mut self, deviation: f64) -> Self {
        self.deviation = Some(deviation);
        self
    }
}

/// Mean sentiment of the previous window versus the most recent one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentDrop {
    pub previous: f64,
    pub recent: f64,
}

impl SentimentDrop {
    /// Size of the drop.
    pub fn magnitude(&self) -> f64 {
        self.previous - self.recent
    }
}

/// Keyword hit counts for life events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifeEvents {
    pub exam: u32,
    pub thesis: u32,
    pub deadline: u32,
    pub sick: u32,
    pub stress: u32,
}

/// Advanced conversation features for one contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedFeatures {
    /// Number of argument periods (runs of negative messages).
    pub conflict_count: u32,
    /// Life-event keyword counts.
    pub life_events: LifeEvents,
    /// Positive-event messages (birthdays, achievements).
    pub celebration_count: u32,
    /// Messages per topic (`work`, `personal`, `plans`, `casual`).
    pub topic_counts: BTreeMap<String, u32>,
    /// Messages sent between 22:00 and 04:59.
    pub late_night_messages: u32,
    /// Share of the last messages initiated by the contact.
    pub recent_initiation_ratio: f64,
    /// Fraction of the contact's commitments that got a timely reply.
    pub commitment_follow_rate: f64,
}

impl Default for AdvancedFeatures {
    fn default() -> Self {
        Self {
            conflict_count: 0,
            life_events: LifeEvents::default(),
            celebration_count: 0,
            topic_counts: BTreeMap::new(),
            late_night_messages: 0,
            recent_initiation_ratio: 0.5,
            commitment_follow_rate: 1.0,
        }
    }
}

impl AdvancedFeatures {
    /// Message count for a topic, zero when absent.
    pub fn topic(&self, name: &str) -> u32 {
        self.topic_counts.get(name).copied().unwrap_or(0)
    }
}

/// Anomalies and features for one contact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalBundle {
    pub response_time_anomalies: Vec<AnomalyRecord>,
    /// Past silences longer than the inactivity threshold. Informational;
    /// the reach-out rule reads `days_since_last`.
    pub inactivity_gaps: Vec<AnomalyRecord>,
    pub unanswered_questions: Vec<AnomalyRecord>,
    pub missed_commitments: Vec<AnomalyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_drop: Option<SentimentDrop>,
    /// Share of recent messages sent by the contact, present only when the
    /// conversation is one-sided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_sided_ratio: Option<f64>,
    /// Advanced features; the feature-based rules only run when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<AdvancedFeatures>,
}

/// Everything the engine knows about one contact for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSignals {
    pub contact: String,
    /// Relationship score of the latest period, in [0, 1].
    pub latest_score: f64,
    pub days_since_last: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_type: Option<ContactType>,
    #[serde(default)]
    pub signals: SignalBundle,
}

impl ContactSignals {
    /// Create signals with no anomalies or features.
    pub fn new(contact: impl Into<String>, latest_score: f64, days_since_last: u32) -> Self {
        Self {
            contact: contact.into(),
            latest_score,
            days_since_last,
            contact_type: None,
            signals: SignalBundle::default(),
        }
    }

    /// Set the contact type.
    pub fn with_type(mut self, contact_type: ContactType) -> Self {
        self.contact_type = Some(contact_type);
        self
    }

    /// Set the signal bundle.
    pub fn with_signals(mut self, signals: SignalBundle) -> Self {
        self.signals = signals;
        self
    }

    /// The contact type, `Other` when unknown.
    pub fn contact_type(&self) -> ContactType {
        self.contact_type.unwrap_or_default()
    }
}
