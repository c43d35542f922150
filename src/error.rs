//! Error taxonomy for the generation boundary.
//!
//! Only request-side failures are errors. Validator outcomes (extraction
//! failure, compile diagnostics, missing toolchain) are verdict states carried
//! in the returned text, never `Err` — the user still gets the code back.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    /// Signing the endpoint URL failed (bad endpoint, hashing/encoding issue).
    #[error("request signing failed: {0}")]
    Auth(String),

    /// The WebSocket connection could not be opened or broke mid-stream.
    #[error("connection failed: {0}")]
    Transport(String),

    /// The service answered with a non-zero error code.
    #[error("service error {code}: {message}")]
    Upstream { code: i64, message: String },

    /// The wait bound elapsed before any content arrived.
    #[error("timed out after {seconds}s with no content received")]
    TimeoutPartial { seconds: u64 },

    /// The stream terminated normally but produced no code.
    #[error("the model produced no code")]
    Empty,
}

impl GenerateError {
    /// One human-readable failure line for the presentation side. No error
    /// crosses the generation boundary in any other form.
    pub fn user_message(&self) -> String {
        format!("generation failed: {self}")
    }
}
