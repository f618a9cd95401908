//! Test utilities for chatq-core
//!
//! A scripted [`ChatBackend`] that needs no network, plus helpers for
//! building event-stream bodies. Public so the CLI crate can use them too.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::bytes::Bytes;

use crate::api::backend::{ByteStream, ChatBackend};
use crate::api::error::ApiError;
use crate::api::types::{
    ChatRequest, ChatResponse, FeedbackRequest, HandoffRequest, HandoffTicket, HistoryMessage,
    HistoryRole,
};

/// What the next `open_stream` call answers with.
enum ScriptedStream {
    Body(Vec<Vec<u8>>),
    Refusal(u16),
    Broken {
        chunks: Vec<Vec<u8>>,
        details: String,
    },
    Hanging(Vec<Vec<u8>>),
}

#[derive(Default)]
struct Recorded {
    chat: Vec<ChatRequest>,
    ask: Vec<ChatRequest>,
    feedback: Vec<FeedbackRequest>,
    history: Vec<String>,
    handoff: Vec<HandoffRequest>,
}

/// Backend answering from a queue of scripted responses and recording every
/// request it receives. An exchange with nothing scripted gets an empty body;
/// a non-streaming ask with nothing scripted gets a 404.
pub struct ScriptedBackend {
    streams: Arc<Mutex<VecDeque<ScriptedStream>>>,
    answers: Arc<Mutex<VecDeque<Result<ChatResponse, u16>>>>,
    history: Arc<Mutex<Result<Vec<HistoryMessage>, u16>>>,
    feedback_failures: Arc<Mutex<usize>>,
    recorded: Arc<Mutex<Recorded>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            streams: Arc::new(Mutex::new(VecDeque::new())),
            answers: Arc::new(Mutex::new(VecDeque::new())),
            history: Arc::new(Mutex::new(Ok(Vec::new()))),
            feedback_failures: Arc::new(Mutex::new(0)),
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    /// Queue a response body delivered as the given chunks, then closed.
    pub async fn push_stream(&self, chunks: Vec<Vec<u8>>) {
        self.streams
            .lock()
            .await
            .push_back(ScriptedStream::Body(chunks));
    }

    /// Queue a non-success status for the next exchange.
    pub async fn push_refusal(&self, status: u16) {
        self.streams
            .lock()
            .await
            .push_back(ScriptedStream::Refusal(status));
    }

    /// Queue a body that fails with a transport error after its chunks.
    pub async fn push_broken_stream(&self, chunks: Vec<Vec<u8>>, details: &str) {
        self.streams.lock().await.push_back(ScriptedStream::Broken {
            chunks,
            details: details.to_string(),
        });
    }

    /// Queue a body that delivers its chunks and then never ends.
    pub async fn push_hanging_stream(&self, chunks: Vec<Vec<u8>>) {
        self.streams
            .lock()
            .await
            .push_back(ScriptedStream::Hanging(chunks));
    }

    /// Queue the answer to the next non-streaming ask; `Err` carries the
    /// status code.
    pub async fn push_answer(&self, answer: Result<ChatResponse, u16>) {
        self.answers.lock().await.push_back(answer);
    }

    /// A plain answer with no sources and no handoff.
    pub fn answer(session_id: &str, text: &str) -> ChatResponse {
        ChatResponse {
            session_id: session_id.to_string(),
            answer: text.to_string(),
            confidence_score: None,
            sources: None,
            handoff_triggered: false,
            handoff_message: None,
        }
    }

    /// Make the next `count` feedback submissions fail with a 500.
    pub async fn fail_next_feedback(&self, count: usize) {
        *self.feedback_failures.lock().await = count;
    }

    /// History answer for every session; `Err` carries the status code.
    pub async fn set_history(&self, history: Result<Vec<HistoryMessage>, u16>) {
        *self.history.lock().await = history;
    }

    /// A history entry; `role` is the wire name, `USER` or anything else
    /// for the assistant.
    pub fn history_entry(id: i64, role: &str, content: &str) -> HistoryMessage {
        let role = if role.eq_ignore_ascii_case("user") {
            HistoryRole::User
        } else {
            HistoryRole::Assistant
        };
        HistoryMessage {
            id,
            role,
            content: content.to_string(),
            confidence_score: None,
            faq_entry_id: None,
            created_at: None,
        }
    }

    pub async fn chat_requests(&self) -> Vec<ChatRequest> {
        self.recorded.lock().await.chat.clone()
    }

    pub async fn ask_requests(&self) -> Vec<ChatRequest> {
        self.recorded.lock().await.ask.clone()
    }

    pub async fn feedback_requests(&self) -> Vec<FeedbackRequest> {
        self.recorded.lock().await.feedback.clone()
    }

    pub async fn history_requests(&self) -> Vec<String> {
        self.recorded.lock().await.history.clone()
    }

    pub async fn handoff_requests(&self) -> Vec<HandoffRequest> {
        self.recorded.lock().await.handoff.clone()
    }
}

fn chunk_stream(chunks: Vec<Vec<u8>>) -> impl futures_core::Stream<Item = Result<Bytes, ApiError>> {
    stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
}

fn scripted_status(status: u16, details: &str) -> ApiError {
    ApiError::Status {
        status,
        details: details.to_string(),
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ApiError> {
        self.recorded.lock().await.chat.push(request.clone());

        let scripted = self
            .streams
            .lock()
            .await
            .pop_front()
            .unwrap_or(ScriptedStream::Body(Vec::new()));

        let body: ByteStream = match scripted {
            ScriptedStream::Body(chunks) => Box::pin(chunk_stream(chunks)),
            ScriptedStream::Refusal(status) => {
                return Err(scripted_status(status, "scripted refusal"));
            }
            ScriptedStream::Broken { chunks, details } => Box::pin(
                chunk_stream(chunks).chain(stream::once(async move {
                    Err(ApiError::Stream { details })
                })),
            ),
            ScriptedStream::Hanging(chunks) => {
                Box::pin(chunk_stream(chunks).chain(stream::pending()))
            }
        };
        Ok(body)
    }

    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.recorded.lock().await.ask.push(request.clone());
        self.answers
            .lock()
            .await
            .pop_front()
            .unwrap_or(Err(404))
            .map_err(|status| scripted_status(status, "scripted answer failure"))
    }

    async fn history(&self, session_id: &str) -> Result<Vec<HistoryMessage>, ApiError> {
        self.recorded
            .lock()
            .await
            .history
            .push(session_id.to_string());
        self.history
            .lock()
            .await
            .clone()
            .map_err(|status| scripted_status(status, "scripted history failure"))
    }

    async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<(), ApiError> {
        self.recorded.lock().await.feedback.push(request.clone());

        let mut failures = self.feedback_failures.lock().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(scripted_status(500, "scripted feedback failure"));
        }
        Ok(())
    }

    async fn request_handoff(&self, request: &HandoffRequest) -> Result<HandoffTicket, ApiError> {
        self.recorded.lock().await.handoff.push(request.clone());
        Ok(HandoffTicket {
            id: 1,
            status: Some("OPEN".to_string()),
        })
    }
}

/// Encode `(event type, data)` pairs as one event-stream body.
pub fn sse_frames(frames: &[(&str, &str)]) -> Vec<u8> {
    frames
        .iter()
        .map(|(event_type, data)| format!("event:{event_type}\ndata:{data}\n\n"))
        .collect::<String>()
        .into_bytes()
}
