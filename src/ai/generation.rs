//! Generation Client
//!
//! Turns `DocRequest`s into validated documentation text. Owns the request
//! worker pool, retry with exponential backoff, and malformed-output handling.
//! Failures never escape a request: each one comes back as a
//! `GenerationFailure` next to the successful results.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use futures::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::prompt::{DocRequest, Prompt};
use super::provider::{DocProvider, LlmResponse, SharedProvider, TokenUsage};
use super::validation::{DocTextValidator, RejectReason};
use crate::config::LlmConfig;
use crate::constants::generation;
use crate::types::{ErrorCategory, LlmError};

/// Pool and retry tuning
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    /// In-flight requests at most
    pub concurrency: usize,
    /// Attempts per request, first try included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Extra full requests after the output fails validation
    pub invalid_output_retries: u32,
    pub max_output_chars: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_secs(config.max_delay_secs),
            invalid_output_retries: generation::INVALID_OUTPUT_RETRIES,
            max_output_chars: generation::MAX_OUTPUT_CHARS,
        }
    }
}

/// How a request ended without usable text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Retryable errors until the attempt budget ran out
    RetriesExhausted { category: ErrorCategory },
    /// Error that retrying cannot fix (auth, bad request, token limit)
    NonRetryable { category: ErrorCategory },
    /// Output kept failing validation
    Rejected { reason: RejectReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationFailure {
    #[serde(flatten)]
    pub kind: FailureKind,
    pub message: String,
    pub attempts: u32,
}

impl std::fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            FailureKind::RetriesExhausted { category } => write!(
                f,
                "gave up after {} attempts ({}): {}",
                self.attempts, category, self.message
            ),
            FailureKind::NonRetryable { category } => {
                write!(f, "{} error: {}", category, self.message)
            }
            FailureKind::Rejected { reason } => {
                write!(f, "rejected output after {} attempts: {}", self.attempts, reason)
            }
        }
    }
}

impl GenerationFailure {
    fn from_error(err: &LlmError, attempts: u32) -> Self {
        let kind = if err.is_retryable() {
            FailureKind::RetriesExhausted {
                category: err.category,
            }
        } else {
            FailureKind::NonRetryable {
                category: err.category,
            }
        };
        Self {
            kind,
            message: err.message.clone(),
            attempts,
        }
    }
}

/// Outcome for one declaration
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub file_path: String,
    pub index: usize,
    pub qualified_name: String,
    /// Backend calls made, retries included
    pub attempts: u32,
    pub usage: TokenUsage,
    pub outcome: Result<String, GenerationFailure>,
}

/// Results of one dispatch, possibly cut short by cancellation
#[derive(Debug, Default)]
pub struct GenerationBatch {
    pub results: Vec<GenerationResult>,
    pub cancelled: bool,
}

pub struct GenerationClient {
    provider: SharedProvider,
    settings: GenerationSettings,
    validator: DocTextValidator,
}

impl GenerationClient {
    pub fn new(provider: SharedProvider, settings: GenerationSettings) -> Self {
        Self {
            validator: DocTextValidator::new(settings.max_output_chars),
            provider,
            settings,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate documentation for one declaration.
    pub async fn generate(&self, request: &DocRequest) -> GenerationResult {
        let label = request.label();
        let prompt = request.to_prompt();
        let attempts = AtomicU32::new(0);
        let mut usage = TokenUsage::default();
        let mut rejected = None;

        for round in 0..=self.settings.invalid_output_retries {
            let response = self.request_with_retry(&prompt, &attempts, &label).await;
            let response = match response {
                Ok(response) => response,
                Err(err) => {
                    let failure =
                        GenerationFailure::from_error(&err, attempts.load(Ordering::Relaxed));
                    warn!("Generation failed for {}: {}", label, failure);
                    return self.finish(request, &attempts, usage, Err(failure));
                }
            };
            usage += response.usage;

            match self.validator.process(&response.content) {
                Ok(text) => {
                    debug!(
                        "Generated {} chars for {} ({} attempts)",
                        text.len(),
                        label,
                        attempts.load(Ordering::Relaxed)
                    );
                    return self.finish(request, &attempts, usage, Ok(text));
                }
                Err(reason) => {
                    warn!(
                        "Rejected output for {} (round {}): {}",
                        label,
                        round + 1,
                        reason
                    );
                    rejected = Some(reason);
                }
            }
        }

        let reason = rejected.unwrap_or(RejectReason::Empty);
        let failure = GenerationFailure {
            kind: FailureKind::Rejected { reason },
            message: reason.to_string(),
            attempts: attempts.load(Ordering::Relaxed),
        };
        self.finish(request, &attempts, usage, Err(failure))
    }

    fn finish(
        &self,
        request: &DocRequest,
        attempts: &AtomicU32,
        usage: TokenUsage,
        outcome: Result<String, GenerationFailure>,
    ) -> GenerationResult {
        GenerationResult {
            file_path: request.file_path.clone(),
            index: request.index,
            qualified_name: request.qualified_name.clone(),
            attempts: attempts.load(Ordering::Relaxed),
            usage,
            outcome,
        }
    }

    /// One logical request: retried with jittered exponential backoff while
    /// the error category allows it.
    async fn request_with_retry(
        &self,
        prompt: &Prompt,
        attempts: &AtomicU32,
        label: &str,
    ) -> Result<LlmResponse, LlmError> {
        let provider: &dyn DocProvider = self.provider.as_ref();
        let max_delay = self.settings.max_delay;

        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.settings.base_delay)
            .with_max_delay(max_delay)
            .with_factor(generation::BACKOFF_FACTOR)
            .with_max_times(self.settings.max_attempts.saturating_sub(1) as usize)
            .with_jitter();

        (move || async move {
            attempts.fetch_add(1, Ordering::Relaxed);
            provider.complete(prompt).await
        })
        .retry(backoff)
        .sleep(tokio::time::sleep)
        .when(|err: &LlmError| err.is_retryable())
        .adjust(move |err: &LlmError, delay: Option<Duration>| {
            // Honor a server-sent hint, within the configured ceiling
            delay.map(|d| match err.retry_after {
                Some(hint) => d.max(hint).min(max_delay),
                None => d,
            })
        })
        .notify(|err: &LlmError, delay: Duration| {
            warn!("Retrying {} in {:?}: {}", label, delay, err);
        })
        .await
    }

    /// Run every request through a bounded pool.
    ///
    /// Cancellation stops dispatch and abandons in-flight requests; results
    /// already received are returned.
    pub async fn generate_all(
        &self,
        requests: Vec<DocRequest>,
        cancel: &CancellationToken,
    ) -> GenerationBatch {
        let mut batch = GenerationBatch {
            results: Vec::with_capacity(requests.len()),
            cancelled: false,
        };
        if requests.is_empty() {
            return batch;
        }
        if cancel.is_cancelled() {
            batch.cancelled = true;
            return batch;
        }

        let mut stream = futures::stream::iter(requests)
            .map(|request| async move { self.generate(&request).await })
            .buffer_unordered(self.settings.concurrency);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(
                        "Generation cancelled with {} results received",
                        batch.results.len()
                    );
                    batch.cancelled = true;
                    break;
                }
                next = stream.next() => match next {
                    Some(result) => batch.results.push(result),
                    None => break,
                },
            }
        }

        batch
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ai::prompt::ContextWindow;
    use crate::analyzer::parser::{Language, Parser, TypeScriptParser};
    use crate::types::LineIndex;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    /// Replays scripted responses, then a fixed fallback
    pub(crate) struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String, LlmError>>>,
        fallback: String,
        pub calls: AtomicU32,
    }

    impl ScriptedProvider {
        pub(crate) fn new(script: Vec<Result<String, LlmError>>, fallback: &str) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback: fallback.to_string(),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl DocProvider for ScriptedProvider {
        async fn complete(&self, _prompt: &Prompt) -> Result<LlmResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(text)) => Ok(LlmResponse::content_only(text)),
                Some(Err(e)) => Err(e),
                None => Ok(LlmResponse::content_only(self.fallback.clone())),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> crate::types::Result<bool> {
            Ok(true)
        }
    }

    /// Tracks the highest number of concurrent calls
    struct SlowProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl DocProvider for SlowProvider {
        async fn complete(&self, _prompt: &Prompt) -> Result<LlmResponse, LlmError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(LlmResponse::content_only("Does things."))
        }

        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow"
        }

        async fn health_check(&self) -> crate::types::Result<bool> {
            Ok(true)
        }
    }

    pub(crate) fn fast_settings() -> GenerationSettings {
        GenerationSettings {
            concurrency: 2,
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            invalid_output_retries: 1,
            max_output_chars: 4_000,
        }
    }

    fn requests(count: usize) -> Vec<DocRequest> {
        let content: String = (0..count)
            .map(|i| format!("function f{}(a: number) {{\n  return a;\n}}\n", i))
            .collect();
        let decls = TypeScriptParser::new(Language::TypeScript)
            .unwrap()
            .parse("a.ts", &content)
            .unwrap()
            .declarations;
        let index = LineIndex::new(&content);
        decls
            .iter()
            .enumerate()
            .map(|(i, d)| {
                DocRequest::new(
                    "a.ts",
                    Language::TypeScript,
                    &content,
                    &index,
                    d,
                    i,
                    ContextWindow::default(),
                )
            })
            .collect()
    }

    fn client(provider: Arc<dyn DocProvider>) -> GenerationClient {
        GenerationClient::new(provider, fast_settings())
    }

    fn transient() -> LlmError {
        LlmError::new(ErrorCategory::Transient, "503 overloaded")
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let provider = Arc::new(ScriptedProvider::new(vec![], "Returns its input."));
        let result = client(provider.clone()).generate(&requests(1)[0]).await;

        assert_eq!(result.outcome.unwrap(), "Returns its input.");
        assert_eq!(result.attempts, 1);
        assert_eq!(result.qualified_name, "f0");
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![Err(transient()), Err(transient())],
            "Returns its input.",
        ));
        let result = client(provider.clone()).generate(&requests(1)[0]).await;

        assert!(result.outcome.is_ok());
        assert_eq!(result.attempts, 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![Err(transient()), Err(transient()), Err(transient()), Err(transient())],
            "unused",
        ));
        let result = client(provider).generate(&requests(1)[0]).await;
        let failure = result.outcome.unwrap_err();

        assert_eq!(
            failure.kind,
            FailureKind::RetriesExhausted {
                category: ErrorCategory::Transient
            }
        );
        assert_eq!(failure.attempts, 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![Err(LlmError::new(ErrorCategory::Auth, "bad key"))],
            "unused",
        ));
        let result = client(provider.clone()).generate(&requests(1)[0]).await;
        let failure = result.outcome.unwrap_err();

        assert_eq!(
            failure.kind,
            FailureKind::NonRetryable {
                category: ErrorCategory::Auth
            }
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_output_requested_once_more() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![Ok("oops */".to_string())],
            "Returns its input.",
        ));
        let result = client(provider.clone()).generate(&requests(1)[0]).await;
        assert_eq!(result.outcome.unwrap(), "Returns its input.");
        assert_eq!(result.attempts, 2);

        let provider = Arc::new(ScriptedProvider::new(vec![], "   "));
        let result = client(provider.clone()).generate(&requests(1)[0]).await;
        let failure = result.outcome.unwrap_err();
        assert_eq!(
            failure.kind,
            FailureKind::Rejected {
                reason: RejectReason::Empty
            }
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pool_is_bounded() {
        let provider = Arc::new(SlowProvider {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::from_millis(20),
        });
        let client = client(provider.clone());
        let batch = client
            .generate_all(requests(6), &CancellationToken::new())
            .await;

        assert!(!batch.cancelled);
        assert_eq!(batch.results.len(), 6);
        assert!(provider.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_cancellation_abandons_requests() {
        let provider = Arc::new(SlowProvider {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::from_secs(30),
        });
        let client = client(provider);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let batch = client.generate_all(requests(4), &cancel).await;
        assert!(batch.cancelled);
        assert!(batch.results.is_empty());
    }
}
