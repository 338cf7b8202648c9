//! Configuration system for kith.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{KithError, KithResult};
use crate::types::ContactType;

/// Thresholds the rule evaluator compares signals against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Relationship scores below this fire `catch_up`.
    pub low_score: f64,
    /// Days without messages before `reach_out` fires.
    pub inactivity_days: u32,
    /// Days a commitment may go without a reply before it counts as missed.
    ///
    /// Applied by the commitment detector that fills `missed_commitments`;
    /// the rules take those records as already missed.
    pub commitment_followup_days: u32,
    /// Minimum deviation (in standard deviations) of a slow reply.
    pub max_response_time_std_multiplier: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_score: 0.5,
            inactivity_days: 7,
            commitment_followup_days: 3,
            max_response_time_std_multiplier: 2.0,
        }
    }
}

/// Language settings shared with the upstream detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NlpConfig {
    /// Phrases that mark a message as a commitment (matched lowercase).
    pub commitment_keywords: Vec<String>,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            commitment_keywords: ["let's meet", "i will", "i'll", "promise", "tomorrow", "call you"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Caps and feature thresholds for individual rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Most candidates emitted per unanswered-question / commitment signal.
    pub max_per_signal: usize,
    /// Most detail snippets attached to a candidate.
    pub max_detail_snippets: usize,
    /// Follow-through rates below this fire `improve_followup`.
    pub follow_rate_floor: f64,
    /// Late-night messages above this fire `romantic_checkin`.
    pub late_night_min: u32,
    /// Casual-topic messages above this fire `share_meme`.
    pub casual_topic_min: u32,
    /// Work-topic messages above this fire `academic_reminder`.
    pub work_topic_min: u32,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            max_per_signal: 2,
            max_detail_snippets: 2,
            follow_rate_floor: 0.5,
            late_night_min: 5,
            casual_topic_min: 5,
            work_topic_min: 5,
        }
    }
}

/// Bandit selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Probability of exploring a random candidate.
    pub epsilon: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { epsilon: 0.2 }
    }
}

/// Where the state tracker persists its store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        let kith_dir = dirs::home_dir()
            .map(|h| h.join(".kith"))
            .unwrap_or_else(|| PathBuf::from(".kith"));
        Self {
            path: kith_dir.join("actions_log.json"),
        }
    }
}

/// Known contacts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactsConfig {
    /// Explicit contact type per contact name.
    pub types: HashMap<String, ContactType>,
}

/// Simulated feedback settings (demos only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub simulated_accept_probability: f64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            simulated_accept_probability: 0.3,
        }
    }
}

/// Main engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    pub nlp: NlpConfig,
    pub rules: RuleConfig,
    pub selection: SelectionConfig,
    pub state: StateConfig,
    pub contacts: ContactsConfig,
    pub feedback: FeedbackConfig,
}

impl EngineConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> KithResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => toml::from_str(&content).map_err(|e| KithError::config(e.to_string()))?,
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| KithError::config(e.to_string()))?
            }
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| KithError::config(e.to_string()))?
            }
            other => return Err(KithError::unsupported_format(other)),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Reads:
    /// - `KITH_STATE_PATH`
    /// - `KITH_EPSILON`
    /// - `KITH_LOW_SCORE`
    /// - `KITH_INACTIVITY_DAYS`
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `KITH_*` environment overrides on top of this configuration.
    ///
    /// Values that fail to parse are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("KITH_STATE_PATH") {
            self.state.path = PathBuf::from(path);
        }
        if let Some(epsilon) = env_parse("KITH_EPSILON") {
            self.selection.epsilon = epsilon;
        }
        if let Some(low_score) = env_parse("KITH_LOW_SCORE") {
            self.thresholds.low_score = low_score;
        }
        if let Some(days) = env_parse("KITH_INACTIVITY_DAYS") {
            self.thresholds.inactivity_days = days;
        }
        self
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate configuration values are in valid ranges.
    pub fn validate(&self) -> KithResult<()> {
        if !(0.0..=1.0).contains(&self.selection.epsilon) {
            return Err(KithError::out_of_range(
                "selection.epsilon",
                self.selection.epsilon,
                "[0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.thresholds.low_score) {
            return Err(KithError::out_of_range(
                "thresholds.low_score",
                self.thresholds.low_score,
                "[0, 1]",
            ));
        }
        if self.thresholds.max_response_time_std_multiplier <= 0.0 {
            return Err(KithError::out_of_range(
                "thresholds.max_response_time_std_multiplier",
                self.thresholds.max_response_time_std_multiplier,
                "(0, inf)",
            ));
        }
        if !(0.0..=1.0).contains(&self.feedback.simulated_accept_probability) {
            return Err(KithError::out_of_range(
                "feedback.simulated_accept_probability",
                self.feedback.simulated_accept_probability,
                "[0, 1]",
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Builder for EngineConfig.
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the low relationship score floor.
    pub fn low_score(mut self, low_score: f64) -> Self {
        self.config.thresholds.low_score = low_score;
        self
    }

    /// Set the inactivity threshold in days.
    pub fn inactivity_days(mut self, days: u32) -> Self {
        self.config.thresholds.inactivity_days = days;
        self
    }

    /// Set the commitment follow-up window in days.
    pub fn commitment_followup_days(mut self, days: u32) -> Self {
        self.config.thresholds.commitment_followup_days = days;
        self
    }

    /// Set the slow-reply deviation threshold.
    pub fn max_response_time_std_multiplier(mut self, multiplier: f64) -> Self {
        self.config.thresholds.max_response_time_std_multiplier = multiplier;
        self
    }

    /// Set the commitment keywords.
    pub fn commitment_keywords(mut self, keywords: Vec<String>) -> Self {
        self.config.nlp.commitment_keywords = keywords;
        self
    }

    /// Set rule caps and feature thresholds.
    pub fn rules(mut self, rules: RuleConfig) -> Self {
        self.config.rules = rules;
        self
    }

    /// Set the exploration probability.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.config.selection.epsilon = epsilon;
        self
    }

    /// Set the state store path.
    pub fn state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.state.path = path.into();
        self
    }

    /// Register an explicit contact type.
    pub fn contact_type(mut self, contact: impl Into<String>, contact_type: ContactType) -> Self {
        self.config.contacts.types.insert(contact.into(), contact_type);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!((config.thresholds.low_score - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.thresholds.inactivity_days, 7);
        assert_eq!(config.thresholds.commitment_followup_days, 3);
        assert!((config.selection.epsilon - 0.2).abs() < f64::EPSILON);
        assert!(config.state.path.ends_with("actions_log.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::builder()
            .low_score(0.4)
            .inactivity_days(10)
            .epsilon(0.0)
            .contact_type("Priya", ContactType::Romantic)
            .build();
        assert!((config.thresholds.low_score - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.thresholds.inactivity_days, 10);
        assert_eq!(config.contacts.types.get("Priya"), Some(&ContactType::Romantic));
    }

    #[test]
    fn test_validation_errors() {
        let bad_epsilon = EngineConfig::builder().epsilon(1.5).build();
        assert!(bad_epsilon.validate().is_err());

        let bad_score = EngineConfig::builder().low_score(-0.1).build();
        assert!(bad_score.validate().is_err());

        let bad_multiplier = EngineConfig::builder().max_response_time_std_multiplier(0.0).build();
        assert!(bad_multiplier.validate().is_err());
    }

    #[test]
    fn test_from_toml_file_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kith.toml");
        std::fs::write(
            &path,
            r#"
[thresholds]
low_score = 0.35
inactivity_days = 14

[nlp]
commitment_keywords = ["let's meet"]

[contacts.types]
Mom = "family"
"#,
        )
        .unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert!((config.thresholds.low_score - 0.35).abs() < f64::EPSILON);
        assert_eq!(config.thresholds.inactivity_days, 14);
        assert_eq!(config.thresholds.commitment_followup_days, 3);
        assert_eq!(config.nlp.commitment_keywords, vec!["let's meet".to_string()]);
        assert_eq!(config.contacts.types.get("Mom"), Some(&ContactType::Family));
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kith.yaml");
        std::fs::write(&path, "selection:\n  epsilon: 0.05\n").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert!((config.selection.epsilon - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kith.ini");
        std::fs::write(&path, "").unwrap();
        let err = EngineConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, KithError::Configuration { .. }));
        assert_eq!(err.code(), ErrorCode::CfgUnsupportedFormat);
        assert_eq!(err.code().as_str(), "CFG_002");
    }

    #[test]
    fn test_malformed_file_is_invalid_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kith.toml");
        std::fs::write(&path, "[selection\nepsilon = ").unwrap();
        let err = EngineConfig::from_file(&path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CfgInvalidValue);
    }
}
