use crate::api::types::{ChatResponse, HistoryMessage};

use super::event::StreamEvent;
use super::state::ExchangeId;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The user submitted a question.
    Send {
        text: String,
        user_email: Option<String>,
    },

    /// An event observed on the transport of `exchange`.
    Stream {
        exchange: ExchangeId,
        event: StreamEvent,
    },

    /// The whole answer of a non-streaming `exchange` arrived at once.
    Answered {
        exchange: ExchangeId,
        response: ChatResponse,
    },

    /// The host stopped reading `exchange` before it ended.
    Abandon { exchange: ExchangeId },

    /// A session id read back from durable storage.
    SessionRestored { session_id: String },

    HistoryLoaded {
        session_id: String,
        messages: Vec<HistoryMessage>,
    },

    /// The stored session could not be resumed.
    HistoryUnavailable { session_id: String },

    /// Logout: forget the session.
    ResetSession,
}
