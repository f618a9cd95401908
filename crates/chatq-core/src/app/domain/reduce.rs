use tracing::{debug, warn};

use crate::api::types::{ChatRequest, ChatResponse, HistoryMessage, MetadataPayload};

use super::action::Action;
use super::effect::Effect;
use super::event::StreamEvent;
use super::state::{
    ActiveExchange, ConversationState, ERROR_APOLOGY, ExchangeId, ExchangeOutcome, ExchangePhase,
    HANDOFF_NOTICE, Message,
};

pub fn reduce(state: &mut ConversationState, action: Action) -> Vec<Effect> {
    match action {
        Action::Send { text, user_email } => handle_send(state, text, user_email),

        Action::Stream { exchange, event } => handle_stream_event(state, exchange, event),

        Action::Answered { exchange, response } => handle_answer(state, exchange, response),

        Action::Abandon { exchange } => {
            if state.active.is_some_and(|a| a.id == exchange) {
                debug!(%exchange, "Exchange abandoned");
                finish_exchange(state, exchange, ExchangeOutcome::Abandoned);
            }
            vec![]
        }

        Action::SessionRestored { session_id } => {
            if state.session_id.is_none() {
                state.session_id = Some(session_id);
            }
            vec![]
        }

        Action::HistoryLoaded {
            session_id,
            messages,
        } => handle_history_loaded(state, &session_id, messages),

        Action::HistoryUnavailable { session_id } => {
            if state.session_id.as_deref() != Some(session_id.as_str()) {
                return vec![];
            }
            state.session_id = None;
            vec![Effect::ForgetSessionId]
        }

        Action::ResetSession => {
            state.session_id = None;
            vec![Effect::ForgetSessionId]
        }
    }
}

fn handle_send(
    state: &mut ConversationState,
    text: String,
    user_email: Option<String>,
) -> Vec<Effect> {
    if state.is_loading() {
        debug!("Send rejected: an exchange is already in flight");
        return vec![];
    }
    if text.trim().is_empty() {
        debug!("Send rejected: empty question");
        return vec![];
    }

    let exchange = state.allocate_exchange();
    let request = ChatRequest {
        question: text.clone(),
        session_id: state.session_id.clone(),
        user_email,
    };

    state.messages.push(Message::user(text));
    state.messages.push(Message::assistant(String::new()));
    state.active = Some(ActiveExchange {
        id: exchange,
        phase: ExchangePhase::Sending,
        message_index: state.messages.len() - 1,
    });

    vec![Effect::OpenStream { exchange, request }]
}

fn handle_stream_event(
    state: &mut ConversationState,
    exchange: ExchangeId,
    event: StreamEvent,
) -> Vec<Effect> {
    let Some(active) = state.active.as_mut().filter(|a| a.id == exchange) else {
        debug!(%exchange, event_type = event.kind(), "Ignoring event for inactive exchange");
        return vec![];
    };
    active.phase = ExchangePhase::Streaming;

    match event {
        StreamEvent::Token { text } => {
            if let Some(message) = state.active_message_mut() {
                message.content.push_str(&text);
            }
            vec![]
        }

        StreamEvent::Metadata(metadata) => apply_metadata(state, metadata),

        StreamEvent::MessageIdAssigned { id } => {
            if let Some(message) = state.active_message_mut() {
                match message.id {
                    None => {
                        message.id = Some(id);
                        message.feedback = None;
                    }
                    Some(existing) => {
                        warn!(existing, ignored = id, "Message id already assigned");
                    }
                }
            }
            vec![]
        }

        StreamEvent::Complete => {
            finish_exchange(state, exchange, ExchangeOutcome::Completed);
            vec![]
        }

        StreamEvent::Error { description } => {
            debug!(%exchange, %description, "Exchange failed");
            if let Some(message) = state.active_message_mut() {
                message.content = ERROR_APOLOGY.to_string();
            }
            finish_exchange(state, exchange, ExchangeOutcome::Failed);
            vec![]
        }
    }
}

fn apply_metadata(state: &mut ConversationState, metadata: MetadataPayload) -> Vec<Effect> {
    let MetadataPayload {
        session_id,
        sources,
        handoff_triggered,
        ..
    } = metadata;

    if let Some(sources) = sources
        && let Some(message) = state.active_message_mut()
    {
        message.sources = sources;
    }

    if handoff_triggered {
        state.messages.push(Message::assistant(HANDOFF_NOTICE));
    }

    adopt_session(state, session_id)
}

fn handle_answer(
    state: &mut ConversationState,
    exchange: ExchangeId,
    response: ChatResponse,
) -> Vec<Effect> {
    if !state.active.is_some_and(|a| a.id == exchange) {
        debug!(%exchange, "Ignoring answer for inactive exchange");
        return vec![];
    }

    let ChatResponse {
        session_id,
        answer,
        sources,
        handoff_triggered,
        handoff_message,
        ..
    } = response;

    if let Some(message) = state.active_message_mut() {
        message.content = answer;
        message.sources = sources.unwrap_or_default();
    }

    if handoff_triggered {
        let notice = handoff_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| HANDOFF_NOTICE.to_string());
        state.messages.push(Message::assistant(notice));
    }

    let effects = adopt_session(state, session_id);
    finish_exchange(state, exchange, ExchangeOutcome::Completed);
    effects
}

fn adopt_session(state: &mut ConversationState, session_id: String) -> Vec<Effect> {
    state.session_id = Some(session_id.clone());
    vec![Effect::PersistSessionId { session_id }]
}

fn handle_history_loaded(
    state: &mut ConversationState,
    session_id: &str,
    messages: Vec<HistoryMessage>,
) -> Vec<Effect> {
    if state.is_loading() {
        debug!(session_id, "Ignoring history while an exchange is in flight");
        return vec![];
    }
    if state.session_id.as_deref() != Some(session_id) {
        debug!(session_id, "Ignoring history for a different session");
        return vec![];
    }

    state.messages = messages.into_iter().map(Message::from).collect();
    vec![]
}

fn finish_exchange(state: &mut ConversationState, exchange: ExchangeId, outcome: ExchangeOutcome) {
    state.active = None;
    state.last_outcome = Some((exchange, outcome));
}
