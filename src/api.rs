//! LLM API interaction with exponential backoff retry logic.
//!
//! This module provides the interface to the OpenAI-compatible chat
//! completions endpoint used for event extraction. It includes automatic
//! retry logic with exponential backoff and jitter to handle transient
//! failures gracefully.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`Ask`]: Core trait defining async LLM interaction
//! - [`ChatClient`]: Talks the chat-completions protocol over reqwest
//! - [`RetryAsk`]: Decorator that adds retry logic to any `Ask` implementation
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Per-request timeout for model calls.
const CHAT_TIMEOUT: StdDuration = StdDuration::from_secs(60);

/// Trait for async LLM interaction.
///
/// Implementors take a prompt and return the model's text reply. The trait
/// seam keeps the pipeline testable with canned collaborators and lets
/// decorators (like retry logic) wrap any backend.
pub trait Ask {
    /// Send a prompt to the model and receive its text reply.
    async fn ask(&self, prompt: &str) -> Result<String, Box<dyn Error>>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    /// Build a client against `base_url` (without the `/chat/completions`
    /// suffix), authenticating with `api_key` and querying `model`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, Box<dyn Error>> {
        let http = reqwest::Client::builder().timeout(CHAT_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl Ask for ChatClient {
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ChatResponse = response.json().await?;
        let dt = t0.elapsed();

        match parsed.choices.into_iter().next() {
            Some(choice) => {
                info!(elapsed_ms = dt.as_millis() as u128, "Chat completion succeeded");
                Ok(choice.message.content)
            }
            None => {
                warn!(elapsed_ms = dt.as_millis() as u128, "Chat completion returned no choices");
                Err("chat completion response contained no choices".into())
            }
        }
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Ask`]
/// implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: Ask,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Ask for RetryAsk<T>
where
    T: Ask,
{
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(prompt).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fails a fixed number of times, then succeeds.
    struct Flaky {
        failures_left: Mutex<usize>,
    }

    impl Ask for Flaky {
        async fn ask(&self, _prompt: &str) -> Result<String, Box<dyn Error>> {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                Err("transient".into())
            } else {
                Ok("ok".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let flaky = Flaky {
            failures_left: Mutex::new(2),
        };
        let api = RetryAsk::new(flaky, 3, StdDuration::from_millis(1));
        let reply = api.ask("hola").await.unwrap();
        assert_eq!(reply, "ok");
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let flaky = Flaky {
            failures_left: Mutex::new(usize::MAX),
        };
        let api = RetryAsk::new(flaky, 2, StdDuration::from_millis(1));
        assert!(api.ask("hola").await.is_err());
    }
}
