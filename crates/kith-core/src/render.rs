//! Notification text for surfaced actions.

use crate::types::{ActionKind, CandidateAction};

const DEFAULT_DAYS: u64 = 7;

/// Render the user-facing message for an action.
pub fn render_message(action: &CandidateAction) -> String {
    let contact = action.contact.as_str();
    match action.kind {
        ActionKind::CatchUp => {
            format!("Hey {contact}, it's been a while! How have you been? Let's catch up soon.")
        }
        ActionKind::ReachOut => format!(
            "Hi {contact}, I noticed we haven't talked in {} days. Hope you're doing well!",
            days_of(action)
        ),
        ActionKind::FollowUpReminder => format!(
            "Reminder: You had a commitment with {contact}: '{}'. Maybe follow up?",
            first_detail(action, "something")
        ),
        ActionKind::CheckIn => format!(
            "Hey {contact}, I sense things might have been a bit off lately. Everything okay?"
        ),
        ActionKind::BalanceConversation => format!(
            "The conversation with {contact} feels one-sided. \
             Maybe reach out and share something?"
        ),
        ActionKind::ResponseTimeAlert => format!(
            "You've been taking longer than usual to reply to {contact}. \
             A quick check-in might help."
        ),
        ActionKind::SuggestApology => format!(
            "It seems there might have been a conflict with {contact}. \
             Consider sending a kind message to smooth things over."
        ),
        ActionKind::SupportCheckin => format!(
            "{contact} mentioned being stressed or unwell. A supportive message would mean a lot."
        ),
        ActionKind::Congratulate => format!(
            "{contact} had a positive event recently (birthday/achievement). \
             Send your congratulations!"
        ),
        ActionKind::ImproveFollowup => format!(
            "You often miss following up on commitments with {contact}. \
             Try to be more responsive."
        ),
        ActionKind::ProposePlan => format!(
            "Based on the missed commitment '{}', \
             suggest a concrete time: 'How about this Friday?'",
            first_detail(action, "that")
        ),
        ActionKind::RomanticCheckin => format!(
            "Late night chats with {contact} suggest intimacy. Send a sweet goodnight message."
        ),
        ActionKind::ShareMeme => {
            format!("Share a funny meme with {contact} to keep the casual vibe going.")
        }
        ActionKind::AcademicReminder => {
            format!("Remind {contact} about upcoming deadlines or offer help with work.")
        }
        ActionKind::Other => format!("Action for {contact}: {}", action.reason),
    }
}

fn first_detail<'a>(action: &'a CandidateAction, fallback: &'a str) -> &'a str {
    action.details.first().map(String::as_str).unwrap_or(fallback)
}

/// Days of silence: the `days` metadata, else the first number in the reason.
fn days_of(action: &CandidateAction) -> u64 {
    if let Some(days) = action.metadata.get("days").and_then(|v| v.as_u64()) {
        return days;
    }
    let digits: String = action
        .reason
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(DEFAULT_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_reach_out_days() {
        let from_metadata =
            CandidateAction::new(ActionKind::ReachOut, "Sister", "No messages for 22 days")
                .with_metadata("days", serde_json::json!(22));
        assert_eq!(
            render_message(&from_metadata),
            "Hi Sister, I noticed we haven't talked in 22 days. Hope you're doing well!"
        );

        let from_reason =
            CandidateAction::new(ActionKind::ReachOut, "Sister", "No messages for 15 days");
        assert!(render_message(&from_reason).contains("in 15 days"));

        let neither = CandidateAction::new(ActionKind::ReachOut, "Sister", "quiet lately");
        assert!(render_message(&neither).contains("in 7 days"));
    }

    #[test]
    fn test_commitment_snippets() {
        let reminder =
            CandidateAction::new(ActionKind::FollowUpReminder, "Varun", "Missed commitment")
                .with_details(vec!["I'll call you tomorrow".to_string()]);
        assert_eq!(
            render_message(&reminder),
            "Reminder: You had a commitment with Varun: 'I'll call you tomorrow'. Maybe follow up?"
        );

        let bare = CandidateAction::new(ActionKind::FollowUpReminder, "Varun", "Missed commitment");
        assert!(render_message(&bare).contains("'something'"));

        let plan = CandidateAction::new(ActionKind::ProposePlan, "Varun", "plan");
        assert!(render_message(&plan).starts_with("Based on the missed commitment 'that'"));
    }

    #[test]
    fn test_unknown_kind_falls_back() {
        let action = CandidateAction::new(ActionKind::Other, "Dr. Sharma", "Send the draft");
        assert_eq!(render_message(&action), "Action for Dr. Sharma: Send the draft");
    }

    #[test]
    fn test_every_known_kind_mentions_context() {
        for kind in ActionKind::iter().filter(|k| *k != ActionKind::Other) {
            let action = CandidateAction::new(kind, "Sneha", "reason")
                .with_details(vec!["let's meet".to_string()]);
            let message = render_message(&action);
            assert!(
                message.contains("Sneha") || message.contains("let's meet"),
                "{kind}: {message}"
            );
        }
    }
}
