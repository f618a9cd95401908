//! Cross-component tests for the domain layer.
//!
//! - `property`: invariants that must hold for arbitrary inputs
//! - `pipeline`: wire bytes through decoder, interpreter and reducer

mod pipeline;
