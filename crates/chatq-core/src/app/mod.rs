pub mod conversation;
pub mod domain;

pub use conversation::{Conversation, FeedbackOutcome, HandoffError, SendOutcome};
