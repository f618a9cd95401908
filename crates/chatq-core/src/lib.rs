// Streaming chat client core: wire protocol, conversation state and feedback

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod session;
pub mod test_utils;

pub use error::{Error, Result};
