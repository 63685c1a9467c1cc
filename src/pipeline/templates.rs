//! Outbound message templates.

use crate::config::WeddingDetails;
use crate::guests::RsvpStatus;

/// Invitation text, ending with reply instructions the classifier understands.
pub fn invitation(name: &str, wedding: &WeddingDetails) -> String {
    format!(
        "🎉 *Wedding Invitation*\n\n\
         Dear {name},\n\n\
         You are cordially invited to celebrate the wedding of\n\n\
         *{bride}* & *{groom}*\n\n\
         📅 Date: {date}\n\
         📍 Location: {location}\n\n\
         Please confirm your attendance by replying to this message.\n\n\
         Reply with:\n\
         ✅ *YES* to accept\n\
         ❌ *NO* to decline",
        bride = wedding.bride_name,
        groom = wedding.groom_name,
        date = wedding.date,
        location = wedding.location,
    )
}

/// Confirmation sent after a recorded answer. `None` for statuses that are
/// never the result of a reply.
pub fn confirmation(status: RsvpStatus, wedding: &WeddingDetails) -> Option<String> {
    match status {
        RsvpStatus::Accepted => Some(format!(
            "🎉 Wonderful! We're so excited to celebrate with you!\n\n\
             We've confirmed your attendance for the wedding of {} & {} on {}.\n\n\
             See you there! 💕",
            wedding.bride_name, wedding.groom_name, wedding.date,
        )),
        RsvpStatus::Declined => Some(format!(
            "Thank you for letting us know. We're sorry you won't be able to join us \
             for the wedding of {} & {}.\n\n\
             We'll miss you! 💕",
            wedding.bride_name, wedding.groom_name,
        )),
        RsvpStatus::Pending | RsvpStatus::NotInvited => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wedding() -> WeddingDetails {
        WeddingDetails {
            date: "05.01.2026".into(),
            location: "Garden Hall".into(),
            bride_name: "Anat".into(),
            groom_name: "David".into(),
        }
    }

    #[test]
    fn invitation_includes_details() {
        let text = invitation("Dana", &wedding());
        assert!(text.contains("Dear Dana"));
        assert!(text.contains("*Anat* & *David*"));
        assert!(text.contains("📅 Date: 05.01.2026"));
        assert!(text.contains("📍 Location: Garden Hall"));
        assert!(text.contains("*YES*"));
    }

    #[test]
    fn accepted_confirmation_mentions_date() {
        let text = confirmation(RsvpStatus::Accepted, &wedding()).unwrap();
        assert!(text.contains("Anat & David on 05.01.2026"));
    }

    #[test]
    fn declined_confirmation() {
        let text = confirmation(RsvpStatus::Declined, &wedding()).unwrap();
        assert!(text.contains("won't be able to join us"));
    }

    #[test]
    fn no_confirmation_for_unanswered_statuses() {
        assert!(confirmation(RsvpStatus::Pending, &wedding()).is_none());
        assert!(confirmation(RsvpStatus::NotInvited, &wedding()).is_none());
    }
}
