// src/dialogue.rs
//! Dialogue resolver: turns one user message plus the conversation's pending-disease slot
//! into a reply.
//!
//! Rules, first match wins:
//! 1. greeting phrase anywhere in the message (substring) → fixed greeting
//! 2. tokenize on whitespace
//! 3. disease = first token the entity matcher accepts
//! 4. category = first of `CATEGORY_KEYWORDS` present as an exact token
//! 5. disease + category → that field, state untouched
//! 6. disease only → remember it, ask which field
//! 7. no disease, but one pending → substring search over the whole message;
//!    answer and forget it, or re-prompt and keep it
//! 8. fallback apology
//!
//! Step 4 looks for whole tokens while step 7 looks for substrings ("symptom" answers a
//! pending question, but does not count as a category next to a disease name).

use std::sync::Arc;

use tracing::debug;

use crate::knowledge::{DiseaseRecord, InfoField, KnowledgeBase};
use crate::matcher::EntityMatcher;

pub const GREETING_REPLY: &str = "Hello! 👋 I’m HealthBot. I can provide information on diseases, their symptoms, prevention, and care. Try asking me about dengue, malaria, or another disease.";
pub const CATEGORY_REPROMPT: &str = "Please type 'symptoms', 'prevention', or 'care'.";
pub const FALLBACK_REPLY: &str =
    "Sorry, I didn’t recognize that. Try again (e.g., 'dengue prevention').";

/// Substrings that make a message a greeting.
pub const GREETINGS: [&str; 5] = ["hello", "hi", "hey", "good morning", "good evening"];

/// Exact tokens recognized as a category next to a disease name, in priority order.
pub const CATEGORY_KEYWORDS: [&str; 5] = ["symptoms", "info", "prevention", "care", "treatment"];

/// Per-conversation memory: the disease waiting for a category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub pending_disease: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending_disease.as_deref()
    }
}

/// Which rule produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    Greeting,
    /// A record field was returned.
    Answer,
    /// A disease was recognized and is now pending.
    DiseasePrompt,
    /// A disease is pending but the message named no category.
    CategoryReprompt,
    Fallback,
}

impl ReplyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyKind::Greeting => "greeting",
            ReplyKind::Answer => "answer",
            ReplyKind::DiseasePrompt => "disease_prompt",
            ReplyKind::CategoryReprompt => "category_reprompt",
            ReplyKind::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub kind: ReplyKind,
    /// Disease the reply is about, if any.
    pub disease: Option<String>,
    /// Field answered, for `ReplyKind::Answer`.
    pub field: Option<InfoField>,
}

impl Reply {
    fn canned(kind: ReplyKind, text: &str) -> Self {
        Self {
            text: text.to_string(),
            kind,
            disease: None,
            field: None,
        }
    }

    fn answer(record: &DiseaseRecord, field: InfoField) -> Self {
        Self {
            text: record.field(field).to_string(),
            kind: ReplyKind::Answer,
            disease: Some(record.id.clone()),
            field: Some(field),
        }
    }
}

/// Map free text to a record field by substring. `None` when nothing matches.
pub fn field_for(text: &str) -> Option<InfoField> {
    if text.contains("symptom") || text.contains("info") {
        Some(InfoField::Info)
    } else if text.contains("prevent") {
        Some(InfoField::Prevention)
    } else if text.contains("care") || text.contains("treatment") {
        Some(InfoField::Care)
    } else {
        None
    }
}

pub fn is_greeting(normalized: &str) -> bool {
    GREETINGS.iter().any(|g| normalized.contains(g))
}

/// Stateless rule engine; all conversation memory lives in `ConversationState`.
#[derive(Debug, Clone)]
pub struct Resolver {
    kb: Arc<KnowledgeBase>,
    matcher: EntityMatcher,
}

impl Resolver {
    /// Matcher and lookups share `kb`'s id universe, so a matched id always resolves.
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        let matcher = EntityMatcher::new(&kb);
        Self { kb, matcher }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn matcher(&self) -> &EntityMatcher {
        &self.matcher
    }

    /// Single-turn convenience: resolve against a fresh, throwaway conversation.
    pub fn handle(&self, message: &str) -> String {
        self.resolve(message, &mut ConversationState::new()).text
    }

    pub fn resolve(&self, message: &str, state: &mut ConversationState) -> Reply {
        let text = message.to_lowercase();
        let text = text.trim();

        if is_greeting(text) {
            return Reply::canned(ReplyKind::Greeting, GREETING_REPLY);
        }

        let words: Vec<&str> = text.split_whitespace().collect();

        let disease = words
            .iter()
            .find_map(|w| self.matcher.match_token(w))
            .and_then(|id| self.kb.get(id));

        let category = CATEGORY_KEYWORDS
            .iter()
            .copied()
            .find(|kw| words.contains(kw));

        match (disease, category) {
            (Some(record), Some(cat)) => {
                if let Some(field) = field_for(cat) {
                    debug!(target: "dialogue", disease = %record.id, field = field.as_str(), "direct answer");
                    return Reply::answer(record, field);
                }
            }
            (Some(record), None) => {
                state.pending_disease = Some(record.id.clone());
                debug!(target: "dialogue", disease = %record.id, "disease pending");
                return Reply {
                    text: format!(
                        "You asked about {}. Do you want to know about 'symptoms', 'prevention', or 'care'?",
                        record.title
                    ),
                    kind: ReplyKind::DiseasePrompt,
                    disease: Some(record.id.clone()),
                    field: None,
                };
            }
            (None, _) => {}
        }

        if disease.is_none() {
            if let Some(pending) = state.pending_disease.clone() {
                let Some(record) = self.kb.get(&pending) else {
                    // Slot from another knowledge base; nothing to answer with.
                    state.pending_disease = None;
                    return Reply::canned(ReplyKind::Fallback, FALLBACK_REPLY);
                };
                return match field_for(text) {
                    Some(field) => {
                        state.pending_disease = None;
                        debug!(target: "dialogue", disease = %record.id, field = field.as_str(), "pending answered");
                        Reply::answer(record, field)
                    }
                    None => Reply {
                        disease: Some(record.id.clone()),
                        ..Reply::canned(ReplyKind::CategoryReprompt, CATEGORY_REPROMPT)
                    },
                };
            }
        }

        Reply::canned(ReplyKind::Fallback, FALLBACK_REPLY)
    }
}
