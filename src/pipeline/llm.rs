//! Image captioning through the configured VLM provider.
//!
//! All prompt text lives in [`crate::prompts`]; this module only builds the
//! request and retries it.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! concurrent load. Exponential backoff (`retry_backoff_ms * 2^attempt`)
//! with 500 ms base and 3 retries waits 500 ms → 1 s → 2 s. A single wait is
//! capped at [`MAX_BACKOFF_MS`].

use crate::config::EngineConfig;
use crate::error::ConverterError;
use crate::prompts::{caption_user_message, CAPTION_SYSTEM_PROMPT, DEFAULT_CAPTION_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Upper bound for one backoff sleep.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Ask the provider to describe one image.
///
/// Returns the trimmed caption. Fails with [`ConverterError::Llm`] once
/// `config.max_retries` retries are used up.
pub async fn caption_image(
    provider: &Arc<dyn LLMProvider>,
    image: ImageData,
    filename: Option<&str>,
    config: &EngineConfig,
) -> Result<String, ConverterError> {
    let start = Instant::now();
    let prompt = config.llm_prompt.as_deref().unwrap_or(DEFAULT_CAPTION_PROMPT);

    let messages = vec![
        ChatMessage::system(CAPTION_SYSTEM_PROMPT),
        ChatMessage::user_with_images(&caption_user_message(prompt, filename), vec![image]),
    ];
    let options = build_options(config);

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Caption: retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "Caption: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                return Ok(response.content.trim().to_string());
            }
            Err(e) => {
                let err_msg = format!("{}", e);
                warn!("Caption: attempt {} failed: {}", attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
        }
    }

    Err(ConverterError::Llm {
        retries: config.max_retries,
        detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
    })
}

/// Wait before retry number `attempt` (1-based).
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

/// Build `CompletionOptions` from the engine config.
fn build_options(config: &EngineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let config = EngineConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1_000);
        assert_eq!(backoff_ms(500, 3), 2_000);
        assert_eq!(backoff_ms(500, 65), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(u64::MAX, 100), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(0, 100), 0);
    }
}
