use futures_util::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::backend::ChatBackend;
use crate::api::error::ApiError;
use crate::api::sse::decode_frame_stream;
use crate::api::types::{ChatRequest, HandoffRequest, HandoffTicket};
use crate::app::domain::{
    Action, ConversationState, Effect, ExchangeId, ExchangeOutcome, FeedbackGate, FeedbackKind,
    FeedbackRejection, Interpretation, StreamEvent, interpret, reduce,
};
use crate::session::{SESSION_ID_KEY, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Not admitted: an exchange is in flight or the question is blank.
    Rejected,
    Finished(ExchangeOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Recorded,
    /// Refused locally; nothing was sent.
    Rejected(FeedbackRejection),
    /// Sent but not accepted; the message stays open for another attempt.
    Failed,
}

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("no active session to hand off")]
    NoSession,
    #[error("an email address is required")]
    MissingEmail,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Sole owner of one conversation's state.
///
/// Drives exchanges against a [`ChatBackend`] and mirrors the session id into
/// a [`SessionStore`]. Every mutation goes through [`reduce`] or the
/// [`FeedbackGate`].
pub struct Conversation {
    state: ConversationState,
    gate: FeedbackGate,
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn SessionStore>,
    user_email: Option<String>,
}

impl Conversation {
    pub fn new(backend: Arc<dyn ChatBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            state: ConversationState::new(),
            gate: FeedbackGate::new(),
            backend,
            store,
            user_email: None,
        }
    }

    pub fn with_user_email(mut self, user_email: Option<String>) -> Self {
        self.user_email = user_email.filter(|e| !e.trim().is_empty());
        self
    }

    /// Create a conversation and resume the stored session, if any.
    pub async fn open(backend: Arc<dyn ChatBackend>, store: Arc<dyn SessionStore>) -> Self {
        let mut conversation = Self::new(backend, store);
        conversation.resume().await;
        conversation
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.state.session_id.as_deref()
    }

    /// Adopt the stored session id, if any, without touching history.
    pub async fn restore_session(&mut self) -> Option<&str> {
        let stored = match self.store.get(SESSION_ID_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Could not read stored session id");
                None
            }
        };
        if let Some(session_id) = stored {
            self.dispatch(Action::SessionRestored { session_id }).await;
        }
        self.session_id()
    }

    /// Read the stored session id and load its history. A session whose
    /// history cannot be fetched is forgotten.
    pub async fn resume(&mut self) {
        self.restore_session().await;

        let Some(session_id) = self.state.session_id.clone() else {
            return;
        };

        match self.backend.history(&session_id).await {
            Ok(messages) => {
                info!(%session_id, count = messages.len(), "Loaded conversation history");
                self.dispatch(Action::HistoryLoaded {
                    session_id,
                    messages,
                })
                .await;
            }
            Err(e) => {
                warn!(%session_id, error = %e, "Failed to load conversation history");
                self.dispatch(Action::HistoryUnavailable { session_id })
                    .await;
            }
        }
    }

    pub async fn send(&mut self, text: &str, token: CancellationToken) -> SendOutcome {
        self.send_with(text, token, |_, _| {}).await
    }

    /// Run one exchange to its end. `observer` sees every applied event
    /// together with the state it produced.
    pub async fn send_with<F>(
        &mut self,
        text: &str,
        token: CancellationToken,
        mut observer: F,
    ) -> SendOutcome
    where
        F: FnMut(&StreamEvent, &ConversationState) + Send,
    {
        let Some((exchange, request)) = self.begin_exchange(text) else {
            return SendOutcome::Rejected;
        };

        debug!(%exchange, session_id = ?request.session_id, "Opening stream");
        let opened = tokio::select! {
            biased;
            () = token.cancelled() => None,
            res = self.backend.open_stream(&request) => Some(res),
        };

        let bytes = match opened {
            None => return self.abandon(exchange).await,
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                error!(%exchange, error = %e, "Failed to open chat stream");
                let event = StreamEvent::Error {
                    description: e.to_string(),
                };
                self.apply(exchange, event, &mut observer).await;
                return self.finished(exchange);
            }
        };

        let mut frames = decode_frame_stream(bytes);
        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => return self.abandon(exchange).await,
                next = frames.next() => next,
            };

            let event = match next {
                None => StreamEvent::Complete,
                Some(Err(e)) => {
                    error!(%exchange, error = %e, "Chat stream failed");
                    StreamEvent::Error {
                        description: e.to_string(),
                    }
                }
                Some(Ok(frame)) => match interpret(&frame) {
                    Interpretation::Event(event) => event,
                    Interpretation::Ignored => {
                        debug!(%exchange, event_type = %frame.event_type, "Ignoring frame");
                        continue;
                    }
                    Interpretation::Malformed { details } => {
                        warn!(
                            %exchange,
                            event_type = %frame.event_type,
                            %details,
                            "Dropping malformed frame"
                        );
                        continue;
                    }
                },
            };

            let terminal = matches!(event, StreamEvent::Complete | StreamEvent::Error { .. });
            self.apply(exchange, event, &mut observer).await;
            if terminal {
                break;
            }
        }

        self.finished(exchange)
    }

    /// Run one exchange without streaming: the answer is applied in one
    /// step once the backend replies.
    pub async fn ask(&mut self, text: &str, token: CancellationToken) -> SendOutcome {
        let Some((exchange, request)) = self.begin_exchange(text) else {
            return SendOutcome::Rejected;
        };

        debug!(%exchange, session_id = ?request.session_id, "Asking without stream");
        let answered = tokio::select! {
            biased;
            () = token.cancelled() => None,
            res = self.backend.ask(&request) => Some(res),
        };

        match answered {
            None => return self.abandon(exchange).await,
            Some(Ok(response)) => {
                self.dispatch(Action::Answered { exchange, response }).await;
            }
            Some(Err(e)) => {
                error!(%exchange, error = %e, "Chat request failed");
                let event = StreamEvent::Error {
                    description: e.to_string(),
                };
                self.dispatch(Action::Stream { exchange, event }).await;
            }
        }
        self.finished(exchange)
    }

    /// Submit feedback for the message at `index`.
    pub async fn submit_feedback(
        &mut self,
        index: usize,
        kind: FeedbackKind,
        comment: Option<String>,
    ) -> FeedbackOutcome {
        let request = match self.gate.begin(&self.state, index, kind, comment) {
            Ok(request) => request,
            Err(rejection) => {
                debug!(index, %rejection, "Feedback rejected");
                return FeedbackOutcome::Rejected(rejection);
            }
        };

        let message_id = request.message_id;
        let accepted = match self.backend.submit_feedback(&request).await {
            Ok(()) => {
                info!(message_id, feedback = %kind, "Feedback recorded");
                true
            }
            Err(e) => {
                error!(message_id, error = %e, "Failed to submit feedback");
                false
            }
        };

        self.gate
            .settle(&mut self.state, message_id, kind, accepted);
        if accepted {
            FeedbackOutcome::Recorded
        } else {
            FeedbackOutcome::Failed
        }
    }

    /// Ask for a human to follow up on the current session.
    pub async fn request_handoff(
        &self,
        name: Option<String>,
        email: &str,
        phone: Option<String>,
    ) -> Result<HandoffTicket, HandoffError> {
        let session_id = self
            .state
            .session_id
            .clone()
            .ok_or(HandoffError::NoSession)?;
        if email.trim().is_empty() {
            return Err(HandoffError::MissingEmail);
        }

        let request = HandoffRequest {
            session_id,
            name: name.filter(|n| !n.trim().is_empty()),
            email: email.trim().to_string(),
            phone: phone.filter(|p| !p.trim().is_empty()),
        };
        let ticket = self.backend.request_handoff(&request).await?;
        info!(ticket_id = ticket.id, session_id = %request.session_id, "Handoff requested");
        Ok(ticket)
    }

    /// Forget the session here and in durable storage.
    pub async fn reset_session(&mut self) {
        self.dispatch(Action::ResetSession).await;
    }

    fn begin_exchange(&mut self, text: &str) -> Option<(ExchangeId, ChatRequest)> {
        let effects = reduce(
            &mut self.state,
            Action::Send {
                text: text.to_string(),
                user_email: self.user_email.clone(),
            },
        );
        effects.into_iter().find_map(|effect| match effect {
            Effect::OpenStream { exchange, request } => Some((exchange, request)),
            _ => None,
        })
    }

    async fn apply<F>(&mut self, exchange: ExchangeId, event: StreamEvent, observer: &mut F)
    where
        F: FnMut(&StreamEvent, &ConversationState),
    {
        let seen = event.clone();
        self.dispatch(Action::Stream { exchange, event }).await;
        observer(&seen, &self.state);
    }

    async fn abandon(&mut self, exchange: ExchangeId) -> SendOutcome {
        info!(%exchange, "Exchange cancelled by host");
        self.dispatch(Action::Abandon { exchange }).await;
        self.finished(exchange)
    }

    fn finished(&self, exchange: ExchangeId) -> SendOutcome {
        let outcome = self
            .state
            .outcome_of(exchange)
            .unwrap_or(ExchangeOutcome::Abandoned);
        SendOutcome::Finished(outcome)
    }

    async fn dispatch(&mut self, action: Action) {
        for effect in reduce(&mut self.state, action) {
            self.execute(effect).await;
        }
    }

    async fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::PersistSessionId { session_id } => {
                if let Err(e) = self.store.set(SESSION_ID_KEY, &session_id).await {
                    warn!(%session_id, error = %e, "Could not persist session id");
                }
            }
            Effect::ForgetSessionId => {
                if let Err(e) = self.store.remove(SESSION_ID_KEY).await {
                    warn!(error = %e, "Could not remove stored session id");
                }
            }
            Effect::OpenStream { exchange, .. } => {
                // Requests are issued by `send_with` and `ask`, which own the exchange.
                warn!(%exchange, "Unexpected exchange request outside of send");
            }
        }
    }
}
