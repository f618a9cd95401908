use serde::{Deserialize, Serialize};
use strum::Display;

use crate::api::types::{HistoryMessage, HistoryRole, SourceReference};

/// Shown in place of a reply whose exchange failed.
pub const ERROR_APOLOGY: &str = "Sorry, I encountered an error. Please try again.";
/// Appended as its own message when the backend escalates to a human.
pub const HANDOFF_NOTICE: &str = "Ich verbinde Sie mit einem Mitarbeiter.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "lowercase")]
pub enum FeedbackKind {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub sources: Vec<SourceReference>,
    /// Backend identifier; assigned at most once.
    pub id: Option<i64>,
    /// `None` until feedback was accepted by the backend; never reverts.
    pub feedback: Option<FeedbackKind>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into())
    }

    fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            sources: Vec::new(),
            id: None,
            feedback: None,
        }
    }
}

impl From<HistoryMessage> for Message {
    fn from(entry: HistoryMessage) -> Self {
        let role = match entry.role {
            HistoryRole::User => Role::User,
            HistoryRole::Assistant | HistoryRole::Other => Role::Assistant,
        };
        Self {
            id: Some(entry.id),
            ..Self::new(role, entry.content)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(pub u64);

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exchange-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ExchangePhase {
    Idle,
    /// Request issued, nothing received yet.
    Sending,
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ExchangeOutcome {
    Completed,
    Failed,
    /// The host stopped reading before the stream ended.
    Abandoned,
}

/// The exchange currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveExchange {
    pub id: ExchangeId,
    pub phase: ExchangePhase,
    /// Index into `ConversationState::messages` of the message receiving tokens.
    pub message_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub session_id: Option<String>,
    pub messages: Vec<Message>,
    pub active: Option<ActiveExchange>,
    pub last_outcome: Option<(ExchangeId, ExchangeOutcome)>,
    pub(crate) next_exchange: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    /// True while an exchange is in flight; no new send is admitted.
    pub fn is_loading(&self) -> bool {
        self.active.is_some()
    }

    pub fn phase(&self) -> ExchangePhase {
        self.active.map_or(ExchangePhase::Idle, |a| a.phase)
    }

    pub fn active_message(&self) -> Option<&Message> {
        self.active.and_then(|a| self.messages.get(a.message_index))
    }

    pub(crate) fn active_message_mut(&mut self) -> Option<&mut Message> {
        let index = self.active?.message_index;
        self.messages.get_mut(index)
    }

    pub(crate) fn allocate_exchange(&mut self) -> ExchangeId {
        self.next_exchange += 1;
        ExchangeId(self.next_exchange)
    }

    /// The most recent assistant message that has a backend id.
    pub fn last_rateable_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|m| m.role == Role::Assistant && m.id.is_some())
    }

    pub fn outcome_of(&self, exchange: ExchangeId) -> Option<ExchangeOutcome> {
        self.last_outcome
            .filter(|(id, _)| *id == exchange)
            .map(|(_, outcome)| outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_entry_keeps_id_and_drops_sources() {
        let message = Message::from(HistoryMessage {
            id: 9,
            role: HistoryRole::User,
            content: "Hallo".to_string(),
            confidence_score: None,
            faq_entry_id: None,
            created_at: None,
        });
        assert_eq!(message.role, Role::User);
        assert_eq!(message.id, Some(9));
        assert!(message.sources.is_empty());
        assert_eq!(message.feedback, None);
    }

    #[test]
    fn unknown_history_role_becomes_assistant() {
        let message = Message::from(HistoryMessage {
            id: 4,
            role: HistoryRole::Other,
            content: "Agent joined".to_string(),
            confidence_score: None,
            faq_entry_id: None,
            created_at: None,
        });
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.id, Some(4));
    }

    #[test]
    fn idle_state_is_not_loading() {
        let state = ConversationState::new();
        assert!(!state.is_loading());
        assert_eq!(state.phase(), ExchangePhase::Idle);
        assert!(state.active_message().is_none());
    }

    #[test]
    fn last_rateable_skips_messages_without_id() {
        let mut state = ConversationState::new();
        let mut rated = Message::assistant("first");
        rated.id = Some(1);
        state.messages.push(rated);
        state.messages.push(Message::user("question"));
        state.messages.push(Message::assistant(HANDOFF_NOTICE));
        assert_eq!(state.last_rateable_index(), Some(0));
    }

    #[test]
    fn feedback_kind_display_is_lowercase() {
        assert_eq!(FeedbackKind::Positive.to_string(), "positive");
    }
}
