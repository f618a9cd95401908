pub mod action;
pub mod effect;
pub mod event;
pub mod feedback;
pub mod reduce;
pub mod state;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use effect::Effect;
pub use event::{FrameKind, Interpretation, StreamEvent, interpret};
pub use feedback::{FeedbackGate, FeedbackRejection};
pub use reduce::reduce;
pub use state::{
    ActiveExchange, ConversationState, ERROR_APOLOGY, ExchangeId, ExchangeOutcome, ExchangePhase,
    FeedbackKind, HANDOFF_NOTICE, Message, Role,
};
