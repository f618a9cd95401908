pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

pub use chatq_core::{api, app, config, session};
