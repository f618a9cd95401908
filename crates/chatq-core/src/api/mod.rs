pub mod backend;
pub mod client;
pub mod error;
pub mod sse;
pub mod types;

pub use backend::{ByteStream, ChatBackend};
pub use client::HttpBackend;
pub use error::ApiError;
pub use sse::{Frame, FrameDecoder, FrameStream, decode_frame_stream};
pub use types::{
    ChatRequest, ChatResponse, FeedbackRequest, HandoffRequest, HandoffTicket, HistoryMessage, HistoryRole,
    MessageIdPayload, MetadataPayload, SourceReference,
};
