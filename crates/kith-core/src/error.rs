//! Error types for kith operations.
//!
//! Most conditions inside the decision engine degrade gracefully instead of
//! failing (missing signals, unknown feedback ids, corrupt history). The
//! variants here cover what is left: bad configuration, invalid settings,
//! stats lookups from external sources and failures to write the state store.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for kith operations.
pub type KithResult<T> = Result<T, KithError>;

/// Main error type for all kith operations.
#[derive(Error, Debug)]
pub enum KithError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// State store operation failed.
    #[error("State store error: {message}")]
    State {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Statistics lookup failed.
    #[error("Stats lookup error: {message}")]
    StatsLookup { message: String, code: ErrorCode },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Configuration { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Configuration (CFG_xxx)
    CfgInvalidValue,
    CfgUnsupportedFormat,

    // Validation (VAL_xxx)
    ValOutOfRange,

    // State (STATE_xxx)
    StateWriteFailed,

    // Stats (STATS_xxx)
    StatsUnavailable,

    // IO and serialization
    IoFailed,
    SerializationFailed,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CfgInvalidValue => "CFG_001",
            ErrorCode::CfgUnsupportedFormat => "CFG_002",
            ErrorCode::ValOutOfRange => "VAL_002",
            ErrorCode::StateWriteFailed => "STATE_001",
            ErrorCode::StatsUnavailable => "STATS_001",
            ErrorCode::IoFailed => "IO_001",
            ErrorCode::SerializationFailed => "SER_001",
        }
    }
}

impl KithError {
    /// Create an out-of-range validation error for a named field.
    pub fn out_of_range(field: impl Into<String>, value: impl ToString, range: &str) -> Self {
        let field = field.into();
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.clone());
        details.insert("value".to_string(), value.to_string());
        Self::Validation {
            message: format!("{} must be within {}", field, range),
            code: ErrorCode::ValOutOfRange,
            details,
            suggestion: Some(format!("Set {} to a value within {}", field, range)),
        }
    }

    /// Create a state store error wrapping a source error.
    pub fn state_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::State {
            message: message.into(),
            code: ErrorCode::StateWriteFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Create a stats lookup error.
    pub fn stats_lookup(message: impl Into<String>) -> Self {
        Self::StatsLookup {
            message: message.into(),
            code: ErrorCode::StatsUnavailable,
        }
    }

    /// Create a configuration error for a file that failed to parse.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            code: ErrorCode::CfgInvalidValue,
        }
    }

    /// Create a configuration error for an unrecognised file extension.
    pub fn unsupported_format(extension: Option<&str>) -> Self {
        let message = match extension {
            Some(ext) => format!("Unsupported config file format '.{}'", ext),
            None => "Config file has no extension".to_string(),
        };
        Self::Configuration {
            message,
            code: ErrorCode::CfgUnsupportedFormat,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::State { code, .. } => *code,
            Self::StatsLookup { code, .. } => *code,
            Self::Configuration { code, .. } => *code,
            Self::Io(_) => ErrorCode::IoFailed,
            Self::Serialization(_) => ErrorCode::SerializationFailed,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::State { .. } | Self::Io(_) => {
                Some("Check that the state directory exists and is writable")
            }
            Self::Configuration {
                code: ErrorCode::CfgUnsupportedFormat,
                ..
            } => Some("Use a .toml, .json, .yaml or .yml configuration file"),
            Self::Configuration { .. } => {
                Some("Check the configuration file and KITH_* environment variables")
            }
            _ => None,
        }
    }
}
