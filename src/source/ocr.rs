//! Vision-model OCR fallback for documents without a text layer.
//!
//! Only the first page is transcribed: identity blocks live there, and one
//! call per scanned document keeps cost and latency predictable.
//!
//! ## Retry strategy
//!
//! Transient provider failures (429, 5xx, timeouts) are retried with
//! exponential backoff: `retry_backoff_ms * 2^(attempt-1)`, so 500 ms → 1 s
//! → 2 s with the defaults. Each attempt is bounded by `api_timeout_secs`.

use crate::config::BatchConfig;
use crate::error::RenameError;
use crate::prompts::OCR_SYSTEM_PROMPT;
use crate::source::cleanup::clean_transcription;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Model used when a provider is named without a model.
pub const DEFAULT_OCR_MODEL: &str = "gpt-4.1-nano";

/// A configured transcriber.
#[derive(Clone)]
pub struct VisionOcr {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    call_timeout: Duration,
}

impl std::fmt::Debug for VisionOcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionOcr")
            .field("provider", &"<dyn LLMProvider>")
            .field("max_retries", &self.max_retries)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl VisionOcr {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &BatchConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            call_timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    /// Resolve the provider from `config` and build the transcriber.
    pub fn from_config(config: &BatchConfig) -> Result<Self, RenameError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    /// Transcribe one page image. Returns the last error message when every
    /// attempt fails.
    pub async fn transcribe(&self, image: ImageData) -> Result<String, String> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(OCR_SYSTEM_PROMPT),
            ChatMessage::user_with_images("", vec![image]),
        ];
        let options = self.options();

        let mut last_err = String::from("no attempt made");
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "OCR retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(self.call_timeout, self.provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "OCR: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(clean_transcription(&response.content));
                }
                Ok(Err(e)) => {
                    last_err = e.to_string();
                    warn!("OCR attempt {} failed: {}", attempt + 1, last_err);
                }
                Err(_) => {
                    last_err = format!("timed out after {}s", self.call_timeout.as_secs());
                    warn!("OCR attempt {} {}", attempt + 1, last_err);
                }
            }
        }
        Err(format!(
            "OCR failed after {} attempts: {}",
            self.max_retries + 1,
            last_err
        ))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Resolve the vision provider, most specific first:
///
/// 1. a pre-built provider on the config
/// 2. `provider_name` + `model` (default [`DEFAULT_OCR_MODEL`])
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set
/// 4. auto-detection from API key variables
pub fn resolve_provider(config: &BatchConfig) -> Result<Arc<dyn LLMProvider>, RenameError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_OCR_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    let (llm, _embedding) =
        ProviderFactory::from_env().map_err(|e| RenameError::OcrProviderUnavailable {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be detected from the environment.\n\
                 Set OPENAI_API_KEY or ANTHROPIC_API_KEY, or pass --provider.\n\
                 Error: {e}"
            ),
        })?;
    info!("OCR provider auto-detected");
    Ok(llm)
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, RenameError> {
    info!(provider = name, model, "OCR provider");
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        RenameError::OcrProviderUnavailable {
            provider: name.to_string(),
            hint: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 3), 2000);
        assert_eq!(backoff_ms(u64::MAX, 4), u64::MAX);
    }
}
