//! Subcommand handlers.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use kith_core::{
    classify_missing, render_message, simulate_feedback, ContactSignals, DecisionEngine,
    EngineConfig, FeedbackOutcome, KithError, StateTracker,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

pub struct RunOptions {
    pub signals: PathBuf,
    pub epsilon: Option<f64>,
    pub seed: Option<u64>,
    pub json: bool,
    pub simulate_feedback: bool,
}

/// Evaluate the contacts in a signals file and print the chosen actions.
pub fn run(config: EngineConfig, opts: RunOptions) -> Result<()> {
    let raw = std::fs::read_to_string(&opts.signals)
        .with_context(|| format!("failed to read signals from {}", opts.signals.display()))?;
    let mut contacts: Vec<ContactSignals> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid signals in {}", opts.signals.display()))?;
    classify_missing(&mut contacts, &config.contacts.types);

    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let accept_probability = config.feedback.simulated_accept_probability;
    let mut tracker = StateTracker::open(&config.state.path);
    let mut engine = DecisionEngine::new(config);
    if let Some(epsilon) = opts.epsilon {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(KithError::out_of_range("--epsilon", epsilon, "[0, 1]").into());
        }
        engine = engine.with_epsilon(epsilon);
    }

    let actions = engine.run(&contacts, &mut tracker, &mut rng)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&actions)?);
    } else if actions.is_empty() {
        println!("No actions today.");
    } else {
        for selected in &actions {
            println!(
                "[{}] {} ({})",
                selected.id,
                render_message(&selected.action),
                selected.action.reason
            );
            for detail in &selected.action.details {
                println!("      - {detail}");
            }
        }
    }

    if opts.simulate_feedback {
        let outcomes = simulate_feedback(&mut tracker, &actions, accept_probability, &mut rng)?;
        let accepted = outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == FeedbackOutcome::Accepted)
            .count();
        info!(accepted, dismissed = outcomes.len() - accepted, "Simulated feedback recorded");
    }
    Ok(())
}

/// Record accept/dismiss feedback for one action id.
pub fn feedback(config: &EngineConfig, id: u64, outcome: FeedbackOutcome) -> Result<()> {
    let mut tracker = StateTracker::open(&config.state.path);
    if !tracker.record_feedback(id, outcome)? {
        bail!("no action with id {id} in {}", config.state.path.display());
    }

    if let Some(record) = tracker.action(id) {
        println!(
            "Recorded {outcome} for #{id} ({} / {}); sensitivity now {:.2}",
            record.contact,
            record.kind,
            tracker.sensitivity(&record.contact, &record.kind)
        );
    }
    Ok(())
}

/// Print sensitivities and acceptance counts.
pub fn stats(config: &EngineConfig, contact: Option<&str>) -> Result<()> {
    let tracker = StateTracker::open(&config.state.path);
    let entries: Vec<_> = tracker
        .feedback_summary()
        .into_iter()
        .filter(|entry| contact.map_or(true, |c| entry.contact == c))
        .collect();

    if entries.is_empty() {
        println!("No feedback recorded yet.");
        return Ok(());
    }

    println!(
        "{:<20} {:<22} {:>11} {:>8} {:>9}",
        "CONTACT", "ACTION", "SENSITIVITY", "ACCEPTED", "DISMISSED"
    );
    for entry in entries {
        println!(
            "{:<20} {:<22} {:>11.2} {:>8} {:>9}",
            entry.contact,
            entry.kind,
            entry.sensitivity,
            entry.stats.accepted,
            entry.stats.dismissed
        );
    }
    Ok(())
}

/// Print the action log.
pub fn log(config: &EngineConfig, pending_only: bool) -> Result<()> {
    let tracker = StateTracker::open(&config.state.path);
    let records: Vec<_> = if pending_only {
        tracker.pending_actions().collect()
    } else {
        tracker.actions().iter().collect()
    };

    if records.is_empty() {
        println!("Action log is empty.");
        return Ok(());
    }

    for record in records {
        println!(
            "#{:<5} {}  {:<20} {:<22} {}",
            record.id,
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.contact,
            record.kind,
            record.feedback
        );
    }
    Ok(())
}
