//! At-most-once feedback per message.
//!
//! A submission passes through [`FeedbackGate::begin`], which checks the
//! target message locally and marks its id as in flight, and is closed by
//! [`FeedbackGate::settle`] once the backend answered. Only a successful
//! settle records the verdict on the message; a failed one leaves it unset
//! so the caller may try again.

use std::collections::HashSet;
use thiserror::Error;

use crate::api::types::FeedbackRequest;

use super::state::{ConversationState, FeedbackKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FeedbackRejection {
    #[error("no message at index {0}")]
    UnknownMessage(usize),
    #[error("message has no backend id yet")]
    MissingId,
    #[error("feedback already given ({0})")]
    AlreadyGiven(FeedbackKind),
    #[error("feedback for message {0} is already being submitted")]
    InFlight(i64),
}

#[derive(Debug, Default)]
pub struct FeedbackGate {
    in_flight: HashSet<i64>,
}

impl FeedbackGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a submission for the message at `index`, or say why not. No
    /// request may be sent unless this returns `Ok`.
    pub fn begin(
        &mut self,
        state: &ConversationState,
        index: usize,
        kind: FeedbackKind,
        comment: Option<String>,
    ) -> Result<FeedbackRequest, FeedbackRejection> {
        let message = state
            .messages
            .get(index)
            .ok_or(FeedbackRejection::UnknownMessage(index))?;
        let message_id = message.id.ok_or(FeedbackRejection::MissingId)?;
        if let Some(given) = message.feedback {
            return Err(FeedbackRejection::AlreadyGiven(given));
        }
        if !self.in_flight.insert(message_id) {
            return Err(FeedbackRejection::InFlight(message_id));
        }

        Ok(FeedbackRequest {
            message_id,
            feedback_type: kind,
            comment: comment.filter(|c| !c.trim().is_empty()),
        })
    }

    /// Close the submission for `message_id`. On success the verdict is
    /// written to every message carrying that id; returns whether anything
    /// was recorded.
    pub fn settle(
        &mut self,
        state: &mut ConversationState,
        message_id: i64,
        kind: FeedbackKind,
        accepted: bool,
    ) -> bool {
        if !self.in_flight.remove(&message_id) || !accepted {
            return false;
        }

        let mut recorded = false;
        for message in state
            .messages
            .iter_mut()
            .filter(|m| m.id == Some(message_id) && m.feedback.is_none())
        {
            message.feedback = Some(kind);
            recorded = true;
        }
        recorded
    }

    pub fn is_in_flight(&self, message_id: i64) -> bool {
        self.in_flight.contains(&message_id)
    }
}
