//! Request and response bodies exchanged with the chat backend.
//!
//! Field names follow the backend's camelCase JSON.

use serde::{Deserialize, Serialize};

use crate::app::domain::FeedbackKind;

/// Body of `POST /stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

/// A citation attached to an answer. Opaque to the client beyond display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub id: i64,
}

/// Answer of the non-streaming `POST {base}` exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub session_id: String,
    pub answer: String,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub sources: Option<Vec<SourceReference>>,
    #[serde(default)]
    pub handoff_triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_message: Option<String>,
}

/// Payload of a `metadata` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    pub session_id: String,
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub sources: Option<Vec<SourceReference>>,
    #[serde(default)]
    pub handoff_triggered: bool,
}

/// Payload of a `messageId` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIdPayload {
    pub message_id: i64,
}

/// Body of `POST /feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub message_id: i64,
    pub feedback_type: FeedbackKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryRole {
    User,
    Assistant,
    /// Any role the client does not know; shown as an assistant message.
    #[serde(other)]
    Other,
}

/// One entry of `GET /history/{sessionId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    pub id: i64,
    pub role: HistoryRole,
    pub content: String,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub faq_entry_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /handoff`: contact details for a human follow-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffRequest {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The support ticket created for a handoff. Only the fields the client
/// shows are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffTicket {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
}
