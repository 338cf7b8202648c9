//! File-backed state tracker.
//!
//! Holds the action log and the feedback-derived sensitivity and stats maps.
//! Every mutation is persisted before it returns, by writing a temporary
//! file next to the store and renaming it over the old one.

use chrono::{DateTime, Utc};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{KithError, KithResult};
use crate::selection::ActionStatsSource;
use crate::types::{ActionKind, CandidateAction};

use super::schema::{
    ActionRecord, FeedbackOutcome, FeedbackStats, FeedbackStatus, SensitivityMap,
    SensitivityProfile, StateDocument, StatsMap,
};

/// Sensitivity and counts for one (contact, kind) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackSummaryEntry {
    pub contact: String,
    /// Stored kind name.
    pub kind: String,
    pub sensitivity: f64,
    pub stats: FeedbackStats,
}

/// Persisted history of surfaced actions and the feedback they received.
///
/// The store file is assumed to be owned by a single process for the
/// duration of a run.
#[derive(Debug)]
pub struct StateTracker {
    path: Option<PathBuf>,
    state: StateDocument,
}

impl StateTracker {
    /// Open the store at `path`, reconstructing state from disk.
    ///
    /// A missing or empty file yields an empty store. An unreadable file is
    /// moved aside to `<path>.corrupt` and the tracker starts empty.
    /// Sensitivities outside `[0.1, 2.0]` are clamped on load.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut tracker = Self {
            path: Some(path.into()),
            state: StateDocument::default(),
        };
        tracker.load();
        tracker
    }

    /// Create a tracker that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: StateDocument::default(),
        }
    }

    /// Path of the backing store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replace in-memory state with what is on disk.
    pub fn load(&mut self) {
        let Some(path) = self.path.clone() else {
            return;
        };
        self.state = read_document(&path);
        info!(
            path = %path.display(),
            actions = self.state.actions.len(),
            "Loaded action state"
        );
    }

    /// Persist the current state.
    pub fn save(&self) -> KithResult<()> {
        match &self.path {
            Some(path) => write_document(path, &self.state),
            None => Ok(()),
        }
    }

    /// Append a pending record for a surfaced action and persist it.
    ///
    /// Returns the new record id.
    pub fn record_selected(&mut self, action: &CandidateAction) -> KithResult<u64> {
        self.record_selected_at(action, Utc::now())
    }

    /// Like [`record_selected`](Self::record_selected) with an explicit timestamp.
    pub fn record_selected_at(
        &mut self,
        action: &CandidateAction,
        timestamp: DateTime<Utc>,
    ) -> KithResult<u64> {
        self.transact(|state| {
            let id = state.next_id();
            state.actions.push(ActionRecord {
                id,
                contact: action.contact.clone(),
                kind: action.kind.as_str().to_string(),
                timestamp,
                feedback: FeedbackStatus::Pending,
            });
            debug!(
                id,
                contact = %action.contact,
                kind = %action.kind,
                "Recorded selected action"
            );
            id
        })
    }

    /// Record feedback for an action and update sensitivity and stats.
    ///
    /// Returns `Ok(false)` without changing anything when `id` is unknown.
    /// Feedback on an already resolved record overwrites it and applies the
    /// sensitivity and stats update a second time.
    pub fn record_feedback(&mut self, id: u64, outcome: FeedbackOutcome) -> KithResult<bool> {
        let Some(index) = self.state.actions.iter().position(|record| record.id == id) else {
            debug!(id, "Feedback for unknown action id");
            return Ok(false);
        };

        self.transact(|state| {
            let record = &mut state.actions[index];
            if record.feedback.is_resolved() {
                warn!(
                    id,
                    previous = %record.feedback,
                    new = %outcome,
                    "Action already had feedback; counting it again"
                );
            }
            record.feedback = outcome.into();
            let contact = record.contact.clone();
            let kind = record.kind.clone();

            let sensitivity = state.sensitivity.apply(&contact, &kind, outcome);
            let stats = state.action_stats.apply(&contact, &kind, outcome);
            debug!(
                id,
                contact = %contact,
                kind = %kind,
                sensitivity,
                accepted = stats.accepted,
                dismissed = stats.dismissed,
                "Applied feedback"
            );
        })?;
        Ok(true)
    }

    /// Accepted and dismissed counts for a pair, `(0, 0)` when unseen.
    pub fn get_stats(&self, contact: &str, kind: impl AsRef<str>) -> FeedbackStats {
        self.state.action_stats.get(contact, kind)
    }

    /// All sensitivity multipliers for a contact, empty when unseen.
    pub fn get_sensitivities(&self, contact: &str) -> SensitivityProfile {
        self.state.sensitivity.profile(contact)
    }

    /// Sensitivity multiplier for a pair, 1.0 when unseen.
    pub fn sensitivity(&self, contact: &str, kind: impl AsRef<str>) -> f64 {
        self.state.sensitivity.get(contact, kind)
    }

    /// The full action log, oldest first.
    pub fn actions(&self) -> &[ActionRecord] {
        &self.state.actions
    }

    /// Look up a record by id.
    pub fn action(&self, id: u64) -> Option<&ActionRecord> {
        self.state.actions.iter().find(|record| record.id == id)
    }

    /// Records still waiting for feedback.
    pub fn pending_actions(&self) -> impl Iterator<Item = &ActionRecord> {
        self.state.actions.iter().filter(|record| !record.feedback.is_resolved())
    }

    pub fn sensitivity_map(&self) -> &SensitivityMap {
        &self.state.sensitivity
    }

    pub fn stats_map(&self) -> &StatsMap {
        &self.state.action_stats
    }

    /// The whole store document.
    pub fn document(&self) -> &StateDocument {
        &self.state
    }

    /// One entry per (contact, kind) pair that has received feedback,
    /// ordered by contact then kind.
    pub fn feedback_summary(&self) -> Vec<FeedbackSummaryEntry> {
        self.state
            .action_stats
            .iter()
            .flat_map(|(contact, kinds)| {
                kinds.iter().map(move |(kind, stats)| FeedbackSummaryEntry {
                    contact: contact.clone(),
                    kind: kind.clone(),
                    sensitivity: self.state.sensitivity.get(contact, kind),
                    stats: *stats,
                })
            })
            .collect()
    }

    /// Apply `f` to a copy of the state and persist it; memory is only
    /// updated once the write succeeded.
    fn transact<T>(&mut self, f: impl FnOnce(&mut StateDocument) -> T) -> KithResult<T> {
        let mut next = self.state.clone();
        let out = f(&mut next);
        if let Some(path) = &self.path {
            write_document(path, &next)?;
        }
        self.state = next;
        Ok(out)
    }
}

impl ActionStatsSource for StateTracker {
    fn action_stats(&self, contact: &str, kind: ActionKind) -> KithResult<FeedbackStats> {
        Ok(self.get_stats(contact, kind))
    }
}

fn read_document(path: &Path) -> StateDocument {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return StateDocument::default(),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Could not read action state; starting fresh"
            );
            return StateDocument::default();
        }
    };

    if content.trim().is_empty() {
        return StateDocument::default();
    }

    match serde_json::from_str::<StateDocument>(&content) {
        Ok(mut document) => {
            if !document.ids_are_dense() {
                warn!(path = %path.display(), "Action ids are not dense; keeping log as-is");
            }
            let clamped = document.sensitivity.clamp_to_bounds();
            if clamped > 0 {
                warn!(path = %path.display(), clamped, "Clamped out-of-range sensitivities");
            }
            document
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Action state is corrupt; starting fresh");
            quarantine(path);
            StateDocument::default()
        }
    }
}

fn quarantine(path: &Path) {
    let mut aside = path.as_os_str().to_owned();
    aside.push(".corrupt");
    if let Err(e) = fs::rename(path, &aside) {
        warn!(path = %path.display(), error = %e, "Could not move corrupt action state aside");
    }
}

fn write_document(path: &Path, document: &StateDocument) -> KithResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, document)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| {
        KithError::state_with_source(format!("failed to replace {}", path.display()), e.error)
    })?;
    Ok(())
}
