//! Rule evaluation: one contact's signals to ranked candidate actions.
//!
//! Every rule is independent; any number may fire for the same contact.
//! A candidate's priority is its kind's base priority times the contact's
//! sensitivity for that kind, and the final list is sorted ascending by
//! that value (most urgent first) with ties kept in rule order.

use chrono::{DateTime, Duration, Utc};
use ordered_float::OrderedFloat;
use tracing::trace;

use crate::config::EngineConfig;
use crate::state::{SensitivityProfile, SENSITIVITY_DEFAULT};
use crate::types::{
    ActionKind, AdvancedFeatures, AnomalyRecord, CandidateAction, ContactSignals, ContactType,
};

/// Ratio below which a one-sided conversation is carried by the user.
const ONE_SIDED_FROM_YOU_BELOW: f64 = 0.3;

/// Turns contact signals into sorted candidate actions.
#[derive(Debug, Clone)]
pub struct RuleEvaluator<'a> {
    config: &'a EngineConfig,
    as_of: DateTime<Utc>,
    keywords: Vec<String>,
}

impl<'a> RuleEvaluator<'a> {
    /// Create an evaluator that judges message age relative to `as_of`.
    pub fn new(config: &'a EngineConfig, as_of: DateTime<Utc>) -> Self {
        let keywords = config
            .nlp
            .commitment_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            config,
            as_of,
            keywords,
        }
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// Evaluate every rule for one contact.
    ///
    /// `sensitivities` is the contact's kind -> multiplier profile; kinds
    /// missing from it scale by 1.0.
    pub fn evaluate(
        &self,
        signals: &ContactSignals,
        sensitivities: &SensitivityProfile,
    ) -> Vec<CandidateAction> {
        let contact = signals.contact.as_str();
        let missed = self.missed_commitments(signals);

        let mut candidates = Vec::new();
        self.core_rules(signals, &missed, &mut candidates);
        if let Some(features) = &signals.signals.features {
            self.feature_rules(contact, signals.contact_type(), features, &missed, &mut candidates);
        }

        for candidate in &mut candidates {
            let multiplier = sensitivities
                .get(&candidate.kind)
                .copied()
                .unwrap_or(SENSITIVITY_DEFAULT);
            candidate.scale_priority(multiplier);
        }
        candidates.sort_by_key(|c| OrderedFloat(c.priority));

        trace!(contact, count = candidates.len(), "Rules evaluated");
        candidates
    }

    fn core_rules(
        &self,
        signals: &ContactSignals,
        missed: &[&AnomalyRecord],
        out: &mut Vec<CandidateAction>,
    ) {
        let contact = signals.contact.as_str();
        let thresholds = &self.config.thresholds;
        let cap = self.config.rules.max_per_signal;
        let bundle = &signals.signals;

        if signals.latest_score < thresholds.low_score {
            out.push(CandidateAction::new(
                ActionKind::CatchUp,
                contact,
                format!("Relationship score is low ({:.2})", signals.latest_score),
            ));
        }

        if signals.days_since_last > thresholds.inactivity_days {
            let days = signals.days_since_last;
            let last_message = self.as_of - Duration::days(i64::from(days));
            let reason = format!("No messages for {days} days");
            let detail = format!("Last message: {}", last_message.format("%Y-%m-%d"));
            out.push(
                CandidateAction::new(ActionKind::ReachOut, contact, reason)
                    .with_details(vec![detail])
                    .with_metadata("days", serde_json::Value::from(days)),
            );
        }

        for question in bundle.unanswered_questions.iter().take(cap) {
            out.push(
                CandidateAction::new(
                    ActionKind::FollowUpReminder,
                    contact,
                    format!("Unanswered question from {}", question.timestamp.format("%Y-%m-%d")),
                )
                .with_details(vec![question.message.clone()]),
            );
        }

        for commitment in missed.iter().take(cap) {
            out.push(
                CandidateAction::new(
                    ActionKind::FollowUpReminder,
                    contact,
                    format!("Missed commitment: '{}'", commitment.message),
                )
                .with_details(vec![commitment.message.clone()]),
            );
        }

        if let Some(sentiment) = bundle.sentiment_drop {
            out.push(CandidateAction::new(
                ActionKind::CheckIn,
                contact,
                format!(
                    "Sentiment dropped from {:.2} to {:.2}",
                    sentiment.previous, sentiment.recent
                ),
            ));
        }

        if let Some(ratio) = bundle.one_sided_ratio {
            let direction = if ratio < ONE_SIDED_FROM_YOU_BELOW {
                "from you"
            } else {
                "from them"
            };
            out.push(CandidateAction::new(
                ActionKind::BalanceConversation,
                contact,
                format!("Conversation is one-sided ({direction})"),
            ));
        }

        let slow: Vec<&AnomalyRecord> = bundle
            .response_time_anomalies
            .iter()
            .filter(|a| {
                a.deviation
                    .map_or(true, |d| d > thresholds.max_response_time_std_multiplier)
            })
            .collect();
        if !slow.is_empty() {
            let details = slow
                .iter()
                .take(self.config.rules.max_detail_snippets)
                .map(|a| format!("Slow reply: {}", a.message))
                .collect();
            out.push(
                CandidateAction::new(
                    ActionKind::ResponseTimeAlert,
                    contact,
                    format!("Unusually slow replies detected ({} instances)", slow.len()),
                )
                .with_details(details),
            );
        }
    }

    fn feature_rules(
        &self,
        contact: &str,
        contact_type: ContactType,
        features: &AdvancedFeatures,
        missed: &[&AnomalyRecord],
        out: &mut Vec<CandidateAction>,
    ) {
        let rules = &self.config.rules;

        if features.conflict_count > 0 {
            out.push(CandidateAction::new(
                ActionKind::SuggestApology,
                contact,
                format!(
                    "Possible conflict detected ({} argument periods)",
                    features.conflict_count
                ),
            ));
        }

        let life = &features.life_events;
        if life.stress > 0 || life.sick > 0 {
            out.push(CandidateAction::new(
                ActionKind::SupportCheckin,
                contact,
                "Contact mentioned stress or illness",
            ));
        }
        if life.exam > 0 || life.thesis > 0 {
            out.push(CandidateAction::new(
                ActionKind::SupportCheckin,
                contact,
                "Contact has exams/thesis deadlines",
            ));
        }

        if features.celebration_count > 0 {
            out.push(CandidateAction::new(
                ActionKind::Congratulate,
                contact,
                "Positive event detected (birthday/achievement)",
            ));
        }

        if features.commitment_follow_rate < rules.follow_rate_floor {
            out.push(CandidateAction::new(
                ActionKind::ImproveFollowup,
                contact,
                format!(
                    "Low follow-through on commitments ({:.0}%)",
                    features.commitment_follow_rate * 100.0
                ),
            ));
        }

        if let Some(first) = missed.first() {
            out.push(
                CandidateAction::new(
                    ActionKind::ProposePlan,
                    contact,
                    "Turn missed commitment into a concrete plan",
                )
                .with_details(vec![first.message.clone()]),
            );
        }

        match contact_type {
            ContactType::Romantic if features.late_night_messages > rules.late_night_min => {
                out.push(CandidateAction::new(
                    ActionKind::RomanticCheckin,
                    contact,
                    "Late night conversations suggest closeness",
                ));
            }
            ContactType::Friend if features.topic("casual") > rules.casual_topic_min => {
                out.push(CandidateAction::new(
                    ActionKind::ShareMeme,
                    contact,
                    "Frequent casual chats – share a meme",
                ));
            }
            ContactType::Academic if features.topic("work") > rules.work_topic_min => {
                out.push(CandidateAction::new(
                    ActionKind::AcademicReminder,
                    contact,
                    "Work-related conversations – remind about deadlines",
                ));
            }
            _ => {}
        }
    }

    /// Missed commitments that mention a commitment keyword.
    ///
    /// The detector already applied the reply window, so record age is not
    /// checked again.
    fn missed_commitments<'s>(&self, signals: &'s ContactSignals) -> Vec<&'s AnomalyRecord> {
        signals
            .signals
            .missed_commitments
            .iter()
            .filter(|c| self.matches_keyword(&c.message))
            .collect()
    }

    fn matches_keyword(&self, message: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let lowered = message.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}
