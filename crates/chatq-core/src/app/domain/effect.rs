use crate::api::types::ChatRequest;

use super::state::ExchangeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenStream {
        exchange: ExchangeId,
        request: ChatRequest,
    },

    PersistSessionId { session_id: String },

    ForgetSessionId,
}
