//! Generation pipeline: prompt → signed URL → stream aggregation → compile
//! validation.
//!
//! All signing/transport/upstream failures collapse into one
//! [`GenerateError`] at this boundary. Compile problems are not errors: the
//! verdict text carries the diagnostic report above the unmodified candidate
//! source so the user can still inspect the code.

use std::time::Duration;

use crate::client::{self, ChatRequest};
use crate::config::Config;
use crate::error::GenerateError;
use crate::format::cleanup;
use crate::validate::{self, Rejection, Validation};
use crate::{auth, prompt};

/// Default upper bound on the streaming wait. Bounds aggregation only; the
/// compile step that follows is not under it.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct Generation {
    /// Rendered verdict: the source unchanged when it compiles, otherwise a
    /// diagnostic report above the original source.
    pub text: String,
    pub compiles: bool,
    /// True when the wait bound elapsed and partial output was accepted.
    pub partial: bool,
}

/// Run one generation end to end.
pub async fn generate(
    config: &Config,
    description: &str,
    wait: Duration,
) -> Result<Generation, GenerateError> {
    let user_prompt = prompt::build_prompt(description);
    let url = auth::signed_ws_url(&config.endpoint, &config.api_key, &config.api_secret)?;
    let request = ChatRequest::new(config, prompt::SYSTEM_PROMPT, &user_prompt);

    let aggregated = client::aggregate(&url, &request, wait).await?;

    let code = cleanup::strip_fences(&aggregated.text).trim().to_string();
    if code.is_empty() {
        return Err(if aggregated.timed_out {
            GenerateError::TimeoutPartial {
                seconds: wait.as_secs(),
            }
        } else {
            GenerateError::Empty
        });
    }
    if aggregated.timed_out {
        tracing::warn!("wait bound elapsed; accepting partial output as final");
    }

    let verdict = run_validation(code).await;
    Ok(Generation {
        compiles: verdict.compiles(),
        text: verdict.render(),
        partial: aggregated.timed_out,
    })
}

/// Compilation runs off the async path. A panic inside the blocking task is
/// absorbed into the wrapped-exception verdict, keeping the "never raises
/// past this boundary" contract.
async fn run_validation(code: String) -> Validation {
    let source = code.clone();
    match tokio::task::spawn_blocking(move || validate::validate(&code)).await {
        Ok(verdict) => verdict,
        Err(join_err) => Validation {
            source,
            rejection: Some(Rejection::Internal(join_err.to_string())),
        },
    }
}
