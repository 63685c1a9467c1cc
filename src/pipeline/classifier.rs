//! RSVP intent classifier: Keyword matching over free-text replies.
//!
//! Substring semantics: "nope" matches the negative keyword "no", and
//! "I'm not coming" matches the affirmative keyword "coming". Whichever
//! keyword set is checked first wins; nothing tries to disambiguate.

use regex::Regex;
use tracing::debug;

use crate::guests::RsvpStatus;

/// Keywords that accept the invitation.
pub const AFFIRMATIVE_KEYWORDS: &[&str] = &[
    "yes",
    "yep",
    "yeah",
    "accept",
    "accepting",
    "attending",
    "coming",
    "will come",
    "will be there",
    "✅",
];

/// Keywords that decline the invitation.
pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "no",
    "nope",
    "decline",
    "declining",
    "not coming",
    "can't come",
    "won't come",
    "can't make it",
    "❌",
];

/// Classified meaning of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpIntent {
    Accept,
    Decline,
    Unrecognized,
}

impl RsvpIntent {
    /// Status to record, or `None` when no action should be taken.
    pub fn status(&self) -> Option<RsvpStatus> {
        match self {
            Self::Accept => Some(RsvpStatus::Accepted),
            Self::Decline => Some(RsvpStatus::Declined),
            Self::Unrecognized => None,
        }
    }
}

/// Which keyword set is checked first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precedence {
    #[default]
    AffirmativeFirst,
    NegativeFirst,
}

/// Compiled keyword matcher.
#[derive(Debug, Clone)]
pub struct RsvpClassifier {
    affirmative: Regex,
    negative: Regex,
    precedence: Precedence,
}

impl Default for RsvpClassifier {
    fn default() -> Self {
        Self::new(Precedence::default())
    }
}

impl RsvpClassifier {
    /// Build a classifier over the built-in keyword sets.
    pub fn new(precedence: Precedence) -> Self {
        Self {
            affirmative: keyword_regex(AFFIRMATIVE_KEYWORDS),
            negative: keyword_regex(NEGATIVE_KEYWORDS),
            precedence,
        }
    }

    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    /// Classify a reply. First matching keyword set wins.
    pub fn classify(&self, text: &str) -> RsvpIntent {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return RsvpIntent::Unrecognized;
        }

        let order = match self.precedence {
            Precedence::AffirmativeFirst => [
                (&self.affirmative, RsvpIntent::Accept),
                (&self.negative, RsvpIntent::Decline),
            ],
            Precedence::NegativeFirst => [
                (&self.negative, RsvpIntent::Decline),
                (&self.affirmative, RsvpIntent::Accept),
            ],
        };

        for (regex, intent) in order {
            if let Some(m) = regex.find(&text) {
                debug!(keyword = %m.as_str(), intent = ?intent, "Reply matched RSVP keyword");
                return intent;
            }
        }

        RsvpIntent::Unrecognized
    }
}

/// Alternation of the escaped keywords. No word boundaries: plain
/// substring matching.
fn keyword_regex(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    // Escaped literals always form a valid pattern.
    Regex::new(&format!("(?i)(?:{alternation})")).unwrap()
}
