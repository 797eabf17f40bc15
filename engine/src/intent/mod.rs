//! Intent classification
//!
//! Maps a raw user message to one coarse intent with a confidence score.
//! The keyword classifier checks an ordered rule table against the
//! lower-cased message and returns the first rule that matches, so rule
//! order doubles as the tie-break policy: a message mentioning both "email"
//! and "github" is always a communication request.

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse category of a user request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Communication,
    ProfessionalPresence,
    Developer,
    LiveSearch,
    Document,
    WebNavigation,
    Chat,
}

impl IntentType {
    /// All intents, in classifier rule order followed by the chat fallback
    pub const ALL: [IntentType; 7] = [
        IntentType::Communication,
        IntentType::ProfessionalPresence,
        IntentType::Developer,
        IntentType::LiveSearch,
        IntentType::Document,
        IntentType::WebNavigation,
        IntentType::Chat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::Communication => "communication",
            IntentType::ProfessionalPresence => "professional_presence",
            IntentType::Developer => "developer",
            IntentType::LiveSearch => "live_search",
            IntentType::Document => "document",
            IntentType::WebNavigation => "web_navigation",
            IntentType::Chat => "chat",
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification outcome for one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: IntentType,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl IntentResult {
    pub fn new(intent: IntentType, confidence: f32) -> Self {
        Self { intent, confidence }
    }
}

/// Anything that can turn a message into an intent
pub trait Classifier: Send + Sync {
    fn classify(&self, message: &str) -> Result<IntentResult, EngineError>;
}

/// One keyword rule: any keyword present selects `intent` at `confidence`
struct KeywordRule {
    keywords: &'static [&'static str],
    intent: IntentType,
    confidence: f32,
}

/// Rule table. Order matters: the first match wins.
const RULES: &[KeywordRule] = &[
    KeywordRule {
        keywords: &["gmail", "email", "inbox"],
        intent: IntentType::Communication,
        confidence: 0.85,
    },
    KeywordRule {
        keywords: &["linkedin", "post"],
        intent: IntentType::ProfessionalPresence,
        confidence: 0.82,
    },
    KeywordRule {
        keywords: &["github", "repo", "repository"],
        intent: IntentType::Developer,
        confidence: 0.8,
    },
    KeywordRule {
        keywords: &["latest", "today", "news", "price", "now"],
        intent: IntentType::LiveSearch,
        confidence: 0.78,
    },
    KeywordRule {
        keywords: &["pdf", "docx", "spreadsheet", "document"],
        intent: IntentType::Document,
        confidence: 0.76,
    },
    KeywordRule {
        keywords: &["browser", "open", "navigate", "website"],
        intent: IntentType::WebNavigation,
        confidence: 0.75,
    },
];

/// Confidence reported when no rule matches
pub const CHAT_CONFIDENCE: f32 = 0.6;

/// Keyword-based intent classifier
///
/// Pure function of the message text: no side effects, no external calls,
/// never fails.
///
/// # Examples
///
/// ```
/// use edith_engine::intent::{Classifier, IntentType, KeywordClassifier};
///
/// let classifier = KeywordClassifier::new();
/// let result = classifier.classify("check my email").unwrap();
/// assert_eq!(result.intent, IntentType::Communication);
///
/// // Earlier rules win when several categories match
/// let result = classifier.classify("email me the github link").unwrap();
/// assert_eq!(result.intent, IntentType::Communication);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, message: &str) -> Result<IntentResult, EngineError> {
        let lowered = message.to_lowercase();

        let result = RULES
            .iter()
            .find(|rule| rule.keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|rule| IntentResult::new(rule.intent, rule.confidence))
            .unwrap_or(IntentResult::new(IntentType::Chat, CHAT_CONFIDENCE));

        tracing::debug!(
            "Classified message as {} ({:.2})",
            result.intent,
            result.confidence
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: &str) -> IntentResult {
        KeywordClassifier::new().classify(message).unwrap()
    }

    #[test]
    fn test_each_rule() {
        let cases = vec![
            ("any unread mail in my inbox?", IntentType::Communication, 0.85),
            ("draft a LinkedIn update", IntentType::ProfessionalPresence, 0.82),
            ("describe this repository", IntentType::Developer, 0.8),
            ("bitcoin price", IntentType::LiveSearch, 0.78),
            ("summarize the attached PDF", IntentType::Document, 0.76),
            ("navigate to the docs site", IntentType::WebNavigation, 0.75),
        ];

        for (message, intent, confidence) in cases {
            let result = classify(message);
            assert_eq!(result.intent, intent, "message: {}", message);
            assert_eq!(result.confidence, confidence, "message: {}", message);
        }
    }

    #[test]
    fn test_chat_fallback() {
        let result = classify("hello there, how are you?");
        assert_eq!(result.intent, IntentType::Chat);
        assert_eq!(result.confidence, CHAT_CONFIDENCE);
    }

    #[test]
    fn test_empty_message_is_chat() {
        assert_eq!(classify("").intent, IntentType::Chat);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("CHECK MY GMAIL").intent, IntentType::Communication);
    }

    #[test]
    fn test_first_match_wins() {
        // email (rule 1) beats github (rule 3)
        assert_eq!(
            classify("email the github maintainers").intent,
            IntentType::Communication
        );
        // post (rule 2) beats news (rule 4)
        assert_eq!(
            classify("post the latest news").intent,
            IntentType::ProfessionalPresence
        );
        // document (rule 5) beats open (rule 6)
        assert_eq!(
            classify("open this document").intent,
            IntentType::Document
        );
    }

    #[test]
    fn test_substring_matching() {
        // "now" inside "know" still fires the live search rule
        assert_eq!(classify("do you know me").intent, IntentType::LiveSearch);
        // "post" inside "postpone"
        assert_eq!(
            classify("postpone it").intent,
            IntentType::ProfessionalPresence
        );
    }

    #[test]
    fn test_intent_display() {
        assert_eq!(IntentType::ProfessionalPresence.to_string(), "professional_presence");
        assert_eq!(IntentType::Chat.to_string(), "chat");
    }

    #[test]
    fn test_intent_serde_matches_display() {
        for intent in IntentType::ALL {
            let json = serde_json::to_string(&intent).unwrap();
            assert_eq!(json, format!("\"{}\"", intent));
        }
    }
}
