//! The request orchestrator: one turn in, one reply or one classified error out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mysa_config::AppConfig;
use mysa_core::{Provider, ProviderRequest, RequestParams, ServiceError};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::prompt::PromptBuilder;
use crate::retry::RetryPolicy;

/// Everything the orchestrator needs besides the backend itself.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    /// Wall-clock budget for a single dispatch.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub prompt: PromptBuilder,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let orchestrator = &config.orchestrator;
        Self {
            model: config.provider.model.clone(),
            temperature: config.provider.temperature,
            max_output_tokens: config.provider.max_output_tokens,
            timeout: orchestrator.timeout(),
            retry: RetryPolicy::new(orchestrator.max_retries, orchestrator.backoff_base()),
            prompt: PromptBuilder::from_config(&config.persona, orchestrator.history_window),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// How many automatic retries a call has already consumed.
///
/// A fresh state starts the full retry budget; `respond` always uses one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
}

impl RetryState {
    pub fn fresh() -> Self {
        Self::default()
    }
}

/// Sends conversation turns to the model backend.
///
/// Holds no per-request state; concurrent calls are independent.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>, settings: OrchestratorSettings) -> Self {
        Self { provider, settings }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, OrchestratorSettings::from_config(config))
    }

    /// Answer one turn, retrying transient failures.
    pub async fn respond(&self, params: &RequestParams) -> Result<String, ServiceError> {
        self.respond_from(params, RetryState::fresh()).await
    }

    /// Re-run a turn that already failed, with a new retry budget.
    pub async fn retry_last_request(&self, params: &RequestParams) -> Result<String, ServiceError> {
        info!(mode = %params.mode(), "Manual retry requested");
        self.respond_from(params, RetryState::fresh()).await
    }

    /// Answer one turn, continuing from `state` retries already spent.
    pub async fn respond_from(
        &self,
        params: &RequestParams,
        state: RetryState,
    ) -> Result<String, ServiceError> {
        let policy = self.settings.retry;
        let mut attempt = state.attempt;

        loop {
            let err = match self.attempt_once(params).await {
                Ok(text) => return Ok(text),
                Err(err) => err,
            };

            if !err.retryable || !policy.allows(attempt) {
                warn!(
                    kind = %err.kind,
                    retryable = err.retryable,
                    retries = attempt,
                    "Request failed"
                );
                return Err(err);
            }

            let delay = policy.delay_for(attempt);
            attempt += 1;
            warn!(
                attempt,
                max_retries = policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                kind = %err.kind,
                "Retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// A single dispatch: build, race against the timeout, validate.
    async fn attempt_once(&self, params: &RequestParams) -> Result<String, ServiceError> {
        let prompt = self.settings.prompt.build(params);
        debug!(
            mode = %params.mode(),
            history = params.messages().len(),
            prompt_bytes = prompt.len(),
            "Prepared request"
        );

        let request = ProviderRequest {
            model: self.settings.model.clone(),
            prompt,
            temperature: self.settings.temperature,
            max_output_tokens: self.settings.max_output_tokens,
        };

        let started = Instant::now();
        // Dropping the losing future cancels the in-flight HTTP call.
        let response =
            match tokio::time::timeout(self.settings.timeout, self.provider.complete(request)).await {
                Err(_) => {
                    debug!(timeout_ms = self.settings.timeout.as_millis() as u64, "Dispatch timed out");
                    return Err(ServiceError::timeout());
                }
                Ok(Err(e)) => {
                    debug!(provider = self.provider.name(), error = %e, "Dispatch failed");
                    return Err(classify(&e));
                }
                Ok(Ok(response)) => response,
            };

        let text = response.text.trim();
        if text.is_empty() {
            debug!(provider = self.provider.name(), "Backend returned empty text");
            return Err(ServiceError::invalid_response());
        }

        debug!(
            provider = self.provider.name(),
            model = %response.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = text.len(),
            "Dispatch succeeded"
        );
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mysa_core::{ConversationMode, ProviderError, ProviderResponse, ServiceErrorKind};
    use std::sync::Mutex;

    /// Replays scripted outcomes in order, repeating the last one.
    struct MockProvider {
        outcomes: Mutex<Vec<Result<String, ProviderError>>>,
        prompts: Mutex<Vec<String>>,
        delay: Duration,
    }

    impl MockProvider {
        fn new(outcomes: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Self::slow(outcomes, Duration::ZERO)
        }

        fn slow(outcomes: Vec<Result<String, ProviderError>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes),
                prompts: Mutex::new(Vec::new()),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.prompts.lock().unwrap().push(request.prompt);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let outcome = {
                let mut outcomes = self.outcomes.lock().unwrap();
                if outcomes.len() > 1 {
                    outcomes.remove(0)
                } else {
                    outcomes[0].clone()
                }
            };
            outcome.map(|text| ProviderResponse {
                text,
                model: request.model,
                finish_reason: Some("STOP".into()),
                usage: None,
            })
        }
    }

    fn params() -> RequestParams {
        RequestParams::new(ConversationMode::Food, vec![], "Where is Mylari?", "## Food Mode").unwrap()
    }

    #[tokio::test]
    async fn trims_successful_reply() {
        let provider = MockProvider::new(vec![Ok("  Try Mylari.\n".into())]);
        let orchestrator = Orchestrator::new(provider.clone(), OrchestratorSettings::default());

        assert_eq!(orchestrator.respond(&params()).await.unwrap(), "Try Mylari.");
        assert_eq!(provider.calls(), 1);
        assert!(provider.prompts.lock().unwrap()[0].contains("Where is Mylari?"));
    }

    #[tokio::test(start_paused = true)]
    async fn whitespace_reply_is_invalid_response() {
        let provider = MockProvider::new(vec![Ok("   ".into())]);
        let orchestrator = Orchestrator::new(provider.clone(), OrchestratorSettings::default());

        let err = orchestrator.respond(&params()).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::InvalidResponse);
        assert!(err.retryable);
        // Retryable, so the full budget was spent.
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn quota_fails_on_first_attempt() {
        let provider = MockProvider::new(vec![Err(ProviderError::QuotaExceeded("daily limit".into()))]);
        let orchestrator = Orchestrator::new(provider.clone(), OrchestratorSettings::default());

        let started = tokio::time::Instant::now();
        let err = orchestrator.respond(&params()).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Quota);
        assert!(!err.retryable);
        assert_eq!(provider.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_exponentially() {
        let provider = MockProvider::new(vec![Err(ProviderError::Network("connection reset".into()))]);
        let orchestrator = Orchestrator::new(provider.clone(), OrchestratorSettings::default());

        let started = tokio::time::Instant::now();
        let err = orchestrator.respond(&params()).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Network);
        assert_eq!(provider.calls(), 3);
        // 1 s + 2 s of backoff.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failure() {
        let provider = MockProvider::new(vec![
            Err(ProviderError::Network("reset".into())),
            Ok("Vinayaka Mylari, Nazarbad.".into()),
        ]);
        let orchestrator = Orchestrator::new(provider.clone(), OrchestratorSettings::default());

        assert_eq!(orchestrator.respond(&params()).await.unwrap(), "Vinayaka Mylari, Nazarbad.");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn respond_from_spent_budget_does_not_retry() {
        let provider = MockProvider::new(vec![Err(ProviderError::Network("reset".into()))]);
        let orchestrator = Orchestrator::new(provider.clone(), OrchestratorSettings::default());

        let err = orchestrator
            .respond_from(&params(), RetryState { attempt: 2 })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Network);
        assert!(err.retryable);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let provider = MockProvider::slow(vec![Ok("late".into())], Duration::from_secs(40));
        let settings = OrchestratorSettings {
            retry: RetryPolicy::none(),
            ..OrchestratorSettings::default()
        };
        let orchestrator = Orchestrator::new(provider.clone(), settings);

        let started = tokio::time::Instant::now();
        let err = orchestrator.respond(&params()).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Timeout);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_kinds_dispatch_once() {
        let cases = [
            (ProviderError::AuthenticationFailed("bad key".into()), ServiceErrorKind::Credential),
            (ProviderError::QuotaExceeded("daily limit".into()), ServiceErrorKind::Quota),
            (ProviderError::ContentFiltered("SAFETY".into()), ServiceErrorKind::ContentFiltered),
        ];

        for (backend_error, kind) in cases {
            let provider = MockProvider::new(vec![Err(backend_error)]);
            let orchestrator = Orchestrator::new(provider.clone(), OrchestratorSettings::default());

            let started = tokio::time::Instant::now();
            let err = orchestrator.respond(&params()).await.unwrap_err();
            assert_eq!(err.kind, kind);
            assert!(!err.retryable);
            assert_eq!(provider.calls(), 1, "{kind} was dispatched more than once");
            assert_eq!(started.elapsed(), Duration::ZERO, "{kind} waited for a backoff");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unstructured_quota_text_is_not_retried() {
        let provider = MockProvider::new(vec![Err(ProviderError::ApiError {
            status_code: 400,
            message: "Quota exceeded for this project".into(),
        })]);
        let orchestrator = Orchestrator::new(provider.clone(), OrchestratorSettings::default());

        let err = orchestrator.respond(&params()).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Quota);
        assert!(!err.retryable);
        assert_eq!(provider.calls(), 1);
    }

    /// Takes 40 s for the first `slow_calls` dispatches, then answers at once.
    struct SlowThenFast {
        calls: Mutex<u32>,
        slow_calls: u32,
    }

    #[async_trait]
    impl Provider for SlowThenFast {
        fn name(&self) -> &str {
            "slow-then-fast"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call <= self.slow_calls {
                tokio::time::sleep(Duration::from_secs(40)).await;
            }
            Ok(ProviderResponse {
                text: "Dasara lights start at 7 pm.".into(),
                model: request.model,
                finish_reason: None,
                usage: None,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_then_independent_success() {
        let provider = Arc::new(SlowThenFast {
            calls: Mutex::new(0),
            slow_calls: 3,
        });
        let orchestrator = Orchestrator::new(provider.clone(), OrchestratorSettings::default());

        let started = tokio::time::Instant::now();
        let err = orchestrator.respond(&params()).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Timeout);
        assert!(err.retryable);
        // Three 30 s attempts with 1 s and 2 s of backoff between them.
        assert_eq!(started.elapsed(), Duration::from_secs(93));
        assert_eq!(*provider.calls.lock().unwrap(), 3);

        let reply = orchestrator.respond(&params()).await.unwrap();
        assert_eq!(reply, "Dasara lights start at 7 pm.");
    }

    #[tokio::test]
    async fn healthy_backend_answers_breakfast_question() {
        let provider = MockProvider::new(vec![Ok("Hotel Mylari opens at 7 am for dosa.".into())]);
        let orchestrator = Orchestrator::new(provider, OrchestratorSettings::default());
        let params =
            RequestParams::new(ConversationMode::Food, vec![], "Best breakfast spot?", "<doc>").unwrap();

        let reply = orchestrator.respond(&params).await.unwrap();
        assert!(!reply.is_empty());
        assert!(!reply.to_lowercase().contains("error"));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_retry_gets_a_fresh_budget() {
        let provider = MockProvider::new(vec![
            Err(ProviderError::Timeout("slow".into())),
            Err(ProviderError::Timeout("slow".into())),
            Err(ProviderError::Timeout("slow".into())),
            Ok("Chamundi Hill at sunrise.".into()),
        ]);
        let orchestrator = Orchestrator::new(provider.clone(), OrchestratorSettings::default());

        let err = orchestrator.respond(&params()).await.unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::Timeout);
        assert_eq!(provider.calls(), 3);

        let reply = orchestrator.retry_last_request(&params()).await.unwrap();
        assert_eq!(reply, "Chamundi Hill at sunrise.");
        assert_eq!(provider.calls(), 4);
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::default();
        config.orchestrator.timeout_ms = 5_000;
        config.orchestrator.max_retries = 4;
        config.provider.model = "gemini-2.0-flash".into();

        let settings = OrchestratorSettings::from_config(&config);
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.retry.max_retries, 4);
        assert_eq!(settings.model, "gemini-2.0-flash");
    }
}
