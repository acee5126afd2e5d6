//! Paragraph translation through a chat-completion endpoint.
//!
//! The module is layered the same way as the rest of the pipeline:
//! - [`CompletionClient`]: one prompt in, one completion out (the HTTP seam)
//! - [`ChatClient`]: the `reqwest` implementation with bearer auth
//! - [`Pacer`]: minimum spacing between the starts of consecutive calls
//! - [`Translator`]: builds the prompt, paces, retries, and maps the result
//!   into a [`TranslationOutcome`]
//!
//! [`Translator::translate`] never fails: errors come back as an outcome
//! carrying a failure placeholder so callers can persist partial progress.

use crate::config::{resolve_api_key, ApiSettings, Settings};
use crate::error::{ConfigError, TranslateError};
use crate::retry::RetryPolicy;
use crate::state::failure_placeholder;
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, warn};

/// Send one prompt, receive the completion text.
pub trait CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, TranslateError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// HTTP client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatClient {
    http: Client,
    settings: ApiSettings,
    api_key: String,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.settings.endpoint)
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// Build a client; a missing or blank key is [`ConfigError::MissingApiKey`].
    pub fn new(settings: &ApiSettings, api_key: Option<String>) -> Result<Self, ConfigError> {
        let api_key = resolve_api_key(api_key)?;
        let http = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            http,
            settings: settings.clone(),
            api_key,
        })
    }
}

impl CompletionClient for ChatClient {
    #[instrument(level = "debug", skip_all, fields(model = %self.settings.model))]
    async fn complete(&self, prompt: &str) -> Result<String, TranslateError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .http
            .post(&self.settings.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(TranslateError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| TranslateError::UnexpectedResponse(format!("{e}: {}", truncate_for_log(&body, 200))))?;
        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| TranslateError::UnexpectedResponse(truncate_for_log(&body, 200)))
    }
}

/// Enforces a minimum interval between the starts of consecutive calls.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: Mutex::new(None),
        }
    }

    /// Wait until a call may start, then record the start time.
    pub async fn wait(&self) {
        let mut last = self.last_start.lock().await;
        if let Some(prev) = *last {
            let since = prev.elapsed();
            if since < self.interval {
                sleep(self.interval - since).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Result of translating one paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    pub success: bool,
    /// The translation, or a failure placeholder built from the input.
    pub translated: String,
    pub error: Option<String>,
}

impl TranslationOutcome {
    fn success(translated: String) -> Self {
        Self {
            success: true,
            translated,
            error: None,
        }
    }

    fn failure(original: &str, error: String) -> Self {
        Self {
            success: false,
            translated: failure_placeholder(original),
            error: Some(error),
        }
    }
}

/// Instruction sent with every paragraph.
pub fn build_prompt(text: &str) -> String {
    format!(
        "Translate the following English text into Simplified Chinese.\n\
         Requirements:\n\
         1. Preserve the meaning and tone of the original.\n\
         2. Write natural, idiomatic Chinese.\n\
         3. Render technical terms with their accepted Chinese equivalents.\n\
         4. Reply with the translation only, without notes or explanations.\n\
         \n\
         English text:\n\
         {text}"
    )
}

/// Paced, retrying paragraph translator.
#[derive(Debug)]
pub struct Translator<C> {
    client: C,
    pacer: Pacer,
    retry: RetryPolicy,
}

impl<C: CompletionClient> Translator<C> {
    pub fn new(client: C, min_interval: Duration, retry: RetryPolicy) -> Self {
        Self {
            client,
            pacer: Pacer::new(min_interval),
            retry,
        }
    }

    pub fn from_settings(client: C, settings: &Settings) -> Self {
        Self::new(
            client,
            settings.api.min_interval(),
            RetryPolicy::from(&settings.retry),
        )
    }

    #[cfg(test)]
    pub(crate) fn client(&self) -> &C {
        &self.client
    }

    /// Translate one paragraph. Failures are returned, never raised.
    #[instrument(level = "debug", skip_all, fields(chars = text.chars().count()))]
    pub async fn translate(&self, text: &str) -> TranslationOutcome {
        let prompt = build_prompt(text);
        let max = self.retry.attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.pacer.wait().await;
            let t0 = Instant::now();
            match self.client.complete(&prompt).await {
                Ok(translated) => {
                    debug!(attempt, elapsed_ms = t0.elapsed().as_millis() as u64, "Translated paragraph");
                    return TranslationOutcome::success(translated);
                }
                Err(e) if attempt < max && e.is_retryable() => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        max,
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        ?delay,
                        error = %e,
                        "Translation attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    warn!(attempt, max, error = %e, "Translation failed");
                    return TranslationOutcome::failure(text, e.to_string());
                }
            }
        }
    }
}
