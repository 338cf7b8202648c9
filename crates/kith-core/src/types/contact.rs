//! Contact classification types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Relationship type of a contact.
///
/// Some rules only apply to one type (romantic check-ins, meme sharing,
/// academic reminders). Unknown names deserialize to [`ContactType::Other`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Family,
    Romantic,
    Friend,
    Academic,
    #[default]
    #[serde(other)]
    Other,
}

impl ContactType {
    /// Parse a type name, falling back to `Other` for anything unrecognised.
    pub fn parse_lenient(name: &str) -> Self {
        name.trim().to_lowercase().parse().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lenient() {
        assert_eq!(ContactType::parse_lenient("Romantic"), ContactType::Romantic);
        assert_eq!(ContactType::parse_lenient(" friend "), ContactType::Friend);
        assert_eq!(ContactType::parse_lenient("coworker"), ContactType::Other);
    }

    #[test]
    fn test_unknown_type_deserializes_to_other() {
        let t: ContactType = serde_json::from_str("\"neighbour\"").unwrap();
        assert_eq!(t, ContactType::Other);
        let t: ContactType = serde_json::from_str("\"academic\"").unwrap();
        assert_eq!(t, ContactType::Academic);
    }
}
