//! sparkfx library crate
//!
//! Exposes the generation pipeline and the source normalizer so tests and
//! external tooling can exercise them without going through CLI startup.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod prompt;
pub mod validate;
