//! kith-core - Adaptive relationship-maintenance decision engine.
//!
//! Turns per-contact conversation signals into a short list of suggested
//! actions (catch up, follow up, check in...) and learns from accept/dismiss
//! feedback which kinds of action each contact responds to.
//!
//! # Example
//!
//! ```no_run
//! use kith_core::{ContactSignals, DecisionEngine, EngineConfig, FeedbackOutcome, StateTracker};
//!
//! let config = EngineConfig::default();
//! let mut tracker = StateTracker::open(&config.state.path);
//! let engine = DecisionEngine::new(config);
//!
//! let contacts = vec![ContactSignals::new("Priya", 0.4, 3)];
//! let actions = engine.run(&contacts, &mut tracker, &mut rand::thread_rng())?;
//!
//! for selected in &actions {
//!     println!("{}", kith_core::render_message(&selected.action));
//!     tracker.record_feedback(selected.id, FeedbackOutcome::Accepted)?;
//! }
//! # Ok::<(), kith_core::KithError>(())
//! ```

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod prioritization;
pub mod render;
pub mod rules;
pub mod selection;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use classify::{classify_contact, classify_missing};
pub use config::EngineConfig;
pub use engine::DecisionEngine;
pub use error::{ErrorCode, KithError, KithResult};
pub use prioritization::{prioritize, ContactSnapshot, RankedContact};
pub use render::render_message;
pub use rules::RuleEvaluator;
pub use selection::{ActionStatsSource, EpsilonGreedy};
pub use state::{
    simulate_feedback, ActionRecord, FeedbackOutcome, FeedbackStats, FeedbackStatus,
    FeedbackSummaryEntry, StateTracker,
};
pub use types::{
    ActionKind, AdvancedFeatures, AnomalyRecord, CandidateAction, ContactSignals, ContactType,
    LifeEvents, SelectedAction, SentimentDrop, SignalBundle,
};
