use async_trait::async_trait;
use futures_core::Stream;
use std::pin::Pin;
use tokio_util::bytes::Bytes;

use crate::api::error::ApiError;
use crate::api::types::{
    ChatRequest, ChatResponse, FeedbackRequest, HandoffRequest, HandoffTicket, HistoryMessage,
};

/// Raw response body of a streaming exchange: forward-only, read once.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

/// The chat backend as seen by a conversation.
#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    /// Start a streaming exchange. Failing to connect or a non-success
    /// status is an error here; failures after that surface inside the
    /// returned stream.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ApiError>;

    /// Ask in one round trip; the whole answer arrives at once.
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;

    /// Messages stored for a session, oldest first.
    async fn history(&self, session_id: &str) -> Result<Vec<HistoryMessage>, ApiError>;

    async fn submit_feedback(&self, request: &FeedbackRequest) -> Result<(), ApiError>;

    async fn request_handoff(&self, request: &HandoffRequest) -> Result<HandoffTicket, ApiError>;
}
