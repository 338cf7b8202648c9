//! Contact ordering by urgency.
//!
//! `urgency = 0.5 * (1 - latest_score) + 0.5 * days_since_last / max(max_days, 1)`
//! where `max_days` is the largest `days_since_last` in the batch. Ordering
//! only decides evaluation order; every contact is still evaluated.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::types::ContactSignals;

const SCORE_WEIGHT: f64 = 0.5;
const RECENCY_WEIGHT: f64 = 0.5;

/// The fields the prioritizer reads from a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub contact: String,
    pub latest_score: f64,
    pub days_since_last: u32,
}

impl From<&ContactSignals> for ContactSnapshot {
    fn from(signals: &ContactSignals) -> Self {
        Self {
            contact: signals.contact.clone(),
            latest_score: signals.latest_score,
            days_since_last: signals.days_since_last,
        }
    }
}

/// A contact with its urgency and position in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedContact {
    pub contact: String,
    pub urgency: f64,
    /// Index of the contact in the prioritizer input.
    pub index: usize,
}

/// Urgency of one contact given the batch's largest gap.
pub fn urgency(latest_score: f64, days_since_last: u32, max_days: u32) -> f64 {
    let normalizer = f64::from(max_days.max(1));
    SCORE_WEIGHT * (1.0 - latest_score) + RECENCY_WEIGHT * (f64::from(days_since_last) / normalizer)
}

/// Order contacts by descending urgency; ties keep input order.
pub fn prioritize(contacts: &[ContactSnapshot]) -> Vec<RankedContact> {
    let max_days = contacts.iter().map(|c| c.days_since_last).max().unwrap_or(0);

    let mut ranked: Vec<RankedContact> = contacts
        .iter()
        .enumerate()
        .map(|(index, c)| RankedContact {
            contact: c.contact.clone(),
            urgency: urgency(c.latest_score, c.days_since_last, max_days),
            index,
        })
        .collect();

    ranked.sort_by(|a, b| OrderedFloat(b.urgency).cmp(&OrderedFloat(a.urgency)));
    ranked
}

/// Prioritize full signal records.
pub fn prioritize_signals(contacts: &[ContactSignals]) -> Vec<RankedContact> {
    let snapshots: Vec<ContactSnapshot> = contacts.iter().map(ContactSnapshot::from).collect();
    prioritize(&snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(contact: &str, latest_score: f64, days_since_last: u32) -> ContactSnapshot {
        ContactSnapshot {
            contact: contact.to_string(),
            latest_score,
            days_since_last,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(prioritize(&[]).is_empty());
    }

    #[test]
    fn test_more_days_ranks_higher() {
        let ranked = prioritize(&[snapshot("Mom", 0.6, 2), snapshot("Dad", 0.6, 9)]);
        assert_eq!(ranked[0].contact, "Dad");
        assert!(ranked[0].urgency > ranked[1].urgency);
        assert_eq!(ranked[0].index, 1);
    }

    #[test]
    fn test_urgency_formula() {
        let ranked = prioritize(&[snapshot("Riya", 0.2, 5), snapshot("Aryan", 0.9, 10)]);
        // Riya: 0.5 * 0.8 + 0.5 * 0.5 = 0.65; Aryan: 0.5 * 0.1 + 0.5 * 1.0 = 0.55
        assert_eq!(ranked[0].contact, "Riya");
        assert!((ranked[0].urgency - 0.65).abs() < 1e-12);
        assert!((ranked[1].urgency - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_zero_days_everywhere() {
        let ranked = prioritize(&[snapshot("A", 0.5, 0), snapshot("B", 0.5, 0)]);
        assert!((ranked[0].urgency - 0.25).abs() < 1e-12);
        assert_eq!(ranked[0].contact, "A");
        assert_eq!(ranked[1].contact, "B");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let input: Vec<ContactSnapshot> = ["Kiran", "Leela", "Manav", "Nisha"]
            .iter()
            .map(|name| snapshot(name, 0.7, 3))
            .collect();
        let order: Vec<usize> = prioritize(&input).iter().map(|r| r.index).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_prioritize_signals() {
        let contacts = vec![ContactSignals::new("Ira", 0.9, 1), ContactSignals::new("Jai", 0.1, 1)];
        let ranked = prioritize_signals(&contacts);
        assert_eq!(ranked[0].contact, "Jai");
        assert_eq!(ranked[0].index, 1);
    }
}
