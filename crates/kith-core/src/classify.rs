//! Contact-type inference.
//!
//! Resolution order: explicit override, kinship or title words in the
//! name, then conversation features (late nights, work talk, casual talk).
//! Anything else is `Other`.

use std::collections::HashMap;

use tracing::debug;

use crate::types::{AdvancedFeatures, ContactSignals, ContactType};

const FAMILY_NAMES: &[&str] = &[
    "mom", "mum", "mother", "dad", "father", "sister", "brother", "grandma", "grandpa",
];
const ACADEMIC_PREFIXES: &[&str] = &["dr.", "dr ", "prof.", "prof "];

/// Late-night messages above which a contact reads as romantic.
pub const ROMANTIC_LATE_NIGHT_MIN: u32 = 10;
/// Work-topic messages above which a contact reads as academic.
pub const ACADEMIC_WORK_TOPIC_MIN: u32 = 5;
/// Casual-topic messages above which a contact reads as a friend.
pub const FRIEND_CASUAL_TOPIC_MIN: u32 = 5;

/// Infer the relationship type of a contact.
pub fn classify_contact(
    name: &str,
    features: Option<&AdvancedFeatures>,
    overrides: &HashMap<String, ContactType>,
) -> ContactType {
    if let Some(explicit) = overrides.get(name) {
        return *explicit;
    }

    let lowered = name.trim().to_lowercase();
    if FAMILY_NAMES.contains(&lowered.as_str()) {
        return ContactType::Family;
    }
    if ACADEMIC_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return ContactType::Academic;
    }

    if let Some(features) = features {
        if features.late_night_messages > ROMANTIC_LATE_NIGHT_MIN {
            return ContactType::Romantic;
        }
        if features.topic("work") > ACADEMIC_WORK_TOPIC_MIN {
            return ContactType::Academic;
        }
        if features.topic("casual") > FRIEND_CASUAL_TOPIC_MIN {
            return ContactType::Friend;
        }
    }

    ContactType::Other
}

/// Fill in the type of every contact that arrived without one.
pub fn classify_missing(contacts: &mut [ContactSignals], overrides: &HashMap<String, ContactType>) {
    for signals in contacts.iter_mut().filter(|s| s.contact_type.is_none()) {
        let features = signals.signals.features.as_ref();
        let inferred = classify_contact(&signals.contact, features, overrides);
        debug!(contact = %signals.contact, contact_type = %inferred, "Classified contact");
        signals.contact_type = Some(inferred);
    }
}
