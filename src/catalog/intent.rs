//! Intent catalog — keyword table mapping user input to canned responses.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Intent id of the guided-tour offer. Matching this intent can chain into
/// `ChatSession::start_tour` when the input also carries a start token.
pub const TOUR_INTENT_ID: &str = "tour";

/// A recognized user-input category with its canned responses.
///
/// Keywords are matched as lowercase substrings of the input. An intent with
/// an empty keyword set is the catalog's fallback and matches nothing
/// directly — it is returned when no other intent matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// Stable tag, e.g. `greeting`.
    pub id: String,
    /// Lowercase trigger keywords.
    pub keywords: Vec<String>,
    /// Non-empty response pool; one entry is picked at random per reply.
    pub responses: Vec<String>,
    /// Suggested follow-up intent ids, surfaced to the UI as hints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follow_up: Vec<String>,
}

impl Intent {
    /// Create an intent from string literals.
    pub fn new(id: &str, keywords: &[&str], responses: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            responses: responses.iter().map(|r| r.to_string()).collect(),
            follow_up: Vec::new(),
        }
    }

    /// Attach follow-up intent ids.
    pub fn with_follow_up(mut self, ids: &[&str]) -> Self {
        self.follow_up = ids.iter().map(|i| i.to_string()).collect();
        self
    }

    /// Whether this is the designated fallback (empty keyword set).
    pub fn is_fallback(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// Ordered, validated intent table. Declaration order is the tie-break policy:
/// `match_input` returns the first intent whose keyword appears in the input.
#[derive(Debug, Clone)]
pub struct IntentCatalog {
    intents: Vec<Intent>,
    /// Index of the fallback intent within `intents`.
    fallback: usize,
}

impl IntentCatalog {
    /// Build a catalog, validating structural invariants:
    /// unique ids, non-empty response lists, exactly one fallback.
    pub fn new(intents: Vec<Intent>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for intent in &intents {
            if !seen.insert(intent.id.clone()) {
                return Err(CatalogError::DuplicateIntent {
                    id: intent.id.clone(),
                });
            }
            if intent.responses.is_empty() {
                return Err(CatalogError::EmptyResponses {
                    id: intent.id.clone(),
                });
            }
        }

        let fallbacks: Vec<usize> = intents
            .iter()
            .enumerate()
            .filter(|(_, i)| i.is_fallback())
            .map(|(idx, _)| idx)
            .collect();
        if fallbacks.len() != 1 {
            return Err(CatalogError::FallbackCount {
                count: fallbacks.len(),
            });
        }

        Ok(Self {
            intents,
            fallback: fallbacks[0],
        })
    }

    /// The production catalog shipped with the platform.
    pub fn builtin() -> Self {
        Self::new(builtin_intents()).expect("builtin catalog is valid")
    }

    /// Match free-text input to an intent.
    ///
    /// Lowercases the input, scans intents in declaration order, and returns
    /// the first intent for which any keyword is a substring of the input.
    /// Total: unmatched input (including the empty string) yields the
    /// fallback intent.
    pub fn match_input(&self, user_input: &str) -> &Intent {
        let input = user_input.to_lowercase();

        for intent in &self.intents {
            for keyword in &intent.keywords {
                if input.contains(keyword.as_str()) {
                    return intent;
                }
            }
        }

        &self.intents[self.fallback]
    }

    /// The designated fallback intent.
    pub fn fallback(&self) -> &Intent {
        &self.intents[self.fallback]
    }

    /// All intents in declaration order.
    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }
}

impl Default for IntentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_intents() -> Vec<Intent> {
    vec![
        Intent::new(
            "greeting",
            &["hello", "hi", "hey", "greetings", "sup", "yo"],
            &[
                "Hello! Welcome to our social media platform. How can I help you today?",
                "Hi there! I'm your assistant. What would you like to know about our platform?",
            ],
        )
        .with_follow_up(&["help", "tour", "features"]),
        Intent::new(
            "help",
            &["help", "assistance", "support", "guide", "how to"],
            &[
                "I'd be happy to help! What specifically do you need assistance with?",
                "Sure thing! I can help you with navigation, posting content, finding \
                 communities, and more. What would you like help with?",
            ],
        )
        .with_follow_up(&["navigation", "posting", "communities", "features"]),
        Intent::new(
            "navigation",
            &["navigate", "find", "go to", "where is", "location"],
            &[
                "Our site has several main sections: Home, Create Post, Communities, and \
                 Profile. What would you like to find?",
                "You can navigate using the menu at the top of the page. Would you like me \
                 to explain each section?",
            ],
        ),
        Intent::new(
            "posting",
            &["post", "create", "share", "publish", "content", "write"],
            &[
                "To create a post, click the 'Create Post' option in the navigation menu. \
                 You can add a title, content, and image to your post.",
                "Creating a post is easy! Click 'Create Post', then fill out the form with \
                 your content. You can also use our AI assistant to help generate or \
                 enhance your content.",
            ],
        ),
        Intent::new(
            "communities",
            &["community", "communities", "group", "join", "forum"],
            &[
                "You can browse all communities by clicking on 'Communities' in the \
                 navigation menu. You can join existing communities or create your own!",
                "Communities are groups centered around specific topics. Browse them in \
                 the Communities section or create your own community!",
            ],
        ),
        Intent::new(
            "features",
            &["feature", "features", "what can", "functionality", "do", "capable"],
            &[
                "Our platform offers features like posting content, joining communities, \
                 AI-powered content assistance, and personalized recommendations.",
                "Some key features include: social posts with images, community creation \
                 and participation, AI-driven content suggestions, and a clean, intuitive \
                 interface.",
            ],
        ),
        Intent::new(
            "ai",
            &["ai", "artificial intelligence", "gemini", "generate", "suggestion", "assistant"],
            &[
                "We offer AI-powered content assistance when creating posts. Our AI can \
                 help generate content ideas based on topics or enhance your existing \
                 content.",
                "Our AI feature uses Gemini to help you create more engaging posts. Just \
                 type in a topic, and it will suggest content, or let it enhance what \
                 you've already written!",
            ],
        ),
        Intent::new(
            TOUR_INTENT_ID,
            &["tour", "walkthrough", "show me", "introduction", "learn"],
            &[
                "I'd be happy to give you a tour of our platform! Would you like to start?",
                "Let me show you around our platform to help you get familiar with \
                 everything!",
            ],
        ),
        Intent::new(
            "thanks",
            &["thanks", "thank you", "appreciation", "grateful", "thx"],
            &[
                "You're welcome! Is there anything else I can help you with?",
                "Happy to help! Let me know if you need anything else.",
            ],
        ),
        Intent::new(
            "bye",
            &["bye", "goodbye", "see you", "later", "farewell", "exit"],
            &[
                "Goodbye! Feel free to chat with me anytime you need assistance.",
                "See you later! I'll be here if you need help in the future.",
            ],
        ),
        Intent::new(
            "fallback",
            &[],
            &[
                "I'm not sure I understand. Could you rephrase that?",
                "Sorry, I didn't catch that. Can you ask in a different way?",
                "I'm still learning. Could you clarify what you're looking for?",
            ],
        ),
    ]
}
