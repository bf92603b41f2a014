//! Construction and process-wide caching of the model handle.

use crate::providers::GeminiProvider;
use crate::{CompleteResponse, Error, LLMProvider, LLMRequest, Prompt};
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

const DEFAULT_VERTEX_LOCATION: &str = "us-central1";
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(8);

/// Fixed generation parameters baked into a [`ModelHandle`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    /// `None` means no output limit.
    pub max_output_tokens: Option<u32>,
    /// `None` means a call waits for the provider indefinitely.
    pub timeout: Option<Duration>,
    /// Extra attempts after a transient failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further retry.
    pub retry_backoff: Duration,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_output_tokens: None,
            timeout: None,
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl ModelSettings {
    /// Default settings, with the model id taken from `GEMINI_MODEL` when set.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(model) = env::var("GEMINI_MODEL") {
            if !model.trim().is_empty() {
                settings.model = model.trim().to_string();
            }
        }
        settings
    }
}

/// Credentials for reaching Gemini.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Generative Language API key.
    ApiKey(String),
    /// Vertex AI with an explicit access token.
    VertexToken {
        project_id: String,
        location: String,
        access_token: String,
    },
    /// Vertex AI with Application Default Credentials.
    VertexAdc { project_id: String, location: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Credentials::VertexToken {
                project_id,
                location,
                ..
            } => f
                .debug_struct("VertexToken")
                .field("project_id", project_id)
                .field("location", location)
                .finish_non_exhaustive(),
            Credentials::VertexAdc {
                project_id,
                location,
            } => f
                .debug_struct("VertexAdc")
                .field("project_id", project_id)
                .field("location", location)
                .finish(),
        }
    }
}

impl Credentials {
    /// Resolve credentials from the process environment.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve credentials from `lookup`, in order of preference:
    /// `GOOGLE_API_KEY` / `GEMINI_API_KEY`, then `VERTEX_ACCESS_TOKEN` with
    /// `GOOGLE_CLOUD_PROJECT`, then `GOOGLE_CLOUD_PROJECT` alone (ADC).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = var("GOOGLE_API_KEY").or_else(|| var("GEMINI_API_KEY")) {
            return Some(Credentials::ApiKey(api_key));
        }

        let project_id = var("GOOGLE_CLOUD_PROJECT")?;
        let location =
            var("GOOGLE_CLOUD_REGION").unwrap_or_else(|| DEFAULT_VERTEX_LOCATION.to_string());

        match var("VERTEX_ACCESS_TOKEN") {
            Some(access_token) => Some(Credentials::VertexToken {
                project_id,
                location,
                access_token,
            }),
            None => Some(Credentials::VertexAdc {
                project_id,
                location,
            }),
        }
    }
}

/// Shared, immutable handle to the remote generation model.
pub struct ModelHandle {
    settings: ModelSettings,
    provider: Box<dyn LLMProvider>,
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl ModelHandle {
    pub fn new(settings: ModelSettings, provider: Box<dyn LLMProvider>) -> Self {
        Self { settings, provider }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Build the provider request for `prompt` with this handle's parameters.
    pub fn request_for(&self, prompt: &Prompt) -> LLMRequest {
        LLMRequest::from_prompt(&self.settings.model, prompt)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_output_tokens)
    }

    /// Run one generation, retrying transient failures up to `max_retries` times.
    pub async fn invoke(&self, prompt: &Prompt) -> Result<CompleteResponse, Error> {
        let request = self.request_for(prompt);
        let mut attempt = 0;

        loop {
            match self.attempt(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    tracing::warn!(
                        provider = self.provider.name(),
                        attempt,
                        max_retries = self.settings.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(&self, request: &LLMRequest) -> Result<CompleteResponse, Error> {
        self.provider.generate(request).await?.buffer().await
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.settings
            .retry_backoff
            .saturating_mul(1 << attempt.min(4))
            .min(MAX_RETRY_BACKOFF)
    }
}

/// Builds the [`ModelHandle`] on first use and hands out the same instance afterwards.
pub struct ModelClientFactory {
    settings: ModelSettings,
    credentials: Option<Credentials>,
    base_url: Option<String>,
    handle: OnceCell<Arc<ModelHandle>>,
}

impl ModelClientFactory {
    pub fn new(settings: ModelSettings, credentials: Option<Credentials>) -> Self {
        Self {
            settings,
            credentials,
            base_url: None,
            handle: OnceCell::new(),
        }
    }

    /// Factory configured from the environment (`GEMINI_MODEL`, credentials,
    /// `GEMINI_BASE_URL`). Nothing is validated until the first handle is requested.
    pub fn from_env() -> Self {
        let factory = Self::new(ModelSettings::from_env(), Credentials::from_env());
        match env::var("GEMINI_BASE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => factory.with_base_url(base_url),
            _ => factory,
        }
    }

    /// Factory that always returns `handle`.
    pub fn with_handle(handle: ModelHandle) -> Self {
        Self {
            settings: handle.settings().clone(),
            credentials: None,
            base_url: None,
            handle: OnceCell::new_with(Some(Arc::new(handle))),
        }
    }

    /// Point the provider at `base_url` instead of Google.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Get the process-wide model handle, building it on the first call.
    ///
    /// Every failure is an [`Error::Config`]: missing credentials, unavailable
    /// Application Default Credentials, or HTTP client setup. A failed build is
    /// not cached.
    pub async fn model_handle(&self) -> Result<Arc<ModelHandle>, Error> {
        self.handle
            .get_or_try_init(|| self.build_handle())
            .await
            .cloned()
    }

    async fn build_handle(&self) -> Result<Arc<ModelHandle>, Error> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            Error::config(
                "No Gemini credentials found. Set GOOGLE_API_KEY, or GOOGLE_CLOUD_PROJECT for Vertex AI",
            )
        })?;

        let timeout = self.settings.timeout;
        let provider = match credentials {
            Credentials::ApiKey(api_key) => GeminiProvider::with_api_key(api_key.clone(), timeout)?,
            Credentials::VertexToken {
                project_id,
                location,
                access_token,
            } => GeminiProvider::vertex(
                project_id.clone(),
                location.clone(),
                access_token.clone(),
                timeout,
            )?,
            Credentials::VertexAdc {
                project_id,
                location,
            } => GeminiProvider::vertex_with_adc(project_id.clone(), location.clone(), timeout)
                .await?,
        };
        let provider = match &self.base_url {
            Some(base_url) => provider.with_base_url(base_url.clone()),
            None => provider,
        };

        tracing::info!(
            model = %self.settings.model,
            target = ?provider.target(),
            max_retries = self.settings.max_retries,
            "Model handle created"
        );

        Ok(Arc::new(ModelHandle::new(
            self.settings.clone(),
            Box::new(provider),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Response;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with `error` for the first `failures` calls, then answers "ok".
    struct FlakyProvider {
        calls: Arc<AtomicU32>,
        failures: u32,
        error: fn() -> Error,
    }

    #[async_trait::async_trait]
    impl LLMProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn generate(&self, _request: &LLMRequest) -> Result<Response, Error> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err((self.error)())
            } else {
                Ok(Response::from_text("ok"))
            }
        }
    }

    fn fast_settings() -> ModelSettings {
        ModelSettings {
            retry_backoff: Duration::ZERO,
            ..ModelSettings::default()
        }
    }

    fn flaky(failures: u32, error: fn() -> Error) -> (ModelHandle, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let provider = FlakyProvider {
            calls: calls.clone(),
            failures,
            error,
        };
        (ModelHandle::new(fast_settings(), Box::new(provider)), calls)
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = ModelSettings::default();
        assert_eq!(settings.model, "gemini-1.5-pro");
        assert_eq!(settings.temperature, 0.0);
        assert_eq!(settings.max_output_tokens, None);
        assert_eq!(settings.timeout, None);
        assert_eq!(settings.max_retries, 2);
    }

    #[test]
    fn test_credentials_prefer_api_key() {
        let creds = Credentials::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "key"),
            ("GOOGLE_CLOUD_PROJECT", "proj"),
        ]));
        assert_eq!(creds, Some(Credentials::ApiKey("key".to_string())));

        let creds = Credentials::from_lookup(lookup(&[("GEMINI_API_KEY", "alt")]));
        assert_eq!(creds, Some(Credentials::ApiKey("alt".to_string())));
    }

    #[test]
    fn test_credentials_vertex() {
        let creds = Credentials::from_lookup(lookup(&[
            ("GOOGLE_CLOUD_PROJECT", "proj"),
            ("VERTEX_ACCESS_TOKEN", "tok"),
            ("GOOGLE_CLOUD_REGION", "europe-west1"),
        ]));
        assert_eq!(
            creds,
            Some(Credentials::VertexToken {
                project_id: "proj".to_string(),
                location: "europe-west1".to_string(),
                access_token: "tok".to_string(),
            })
        );

        let creds = Credentials::from_lookup(lookup(&[("GOOGLE_CLOUD_PROJECT", "proj")]));
        assert_eq!(
            creds,
            Some(Credentials::VertexAdc {
                project_id: "proj".to_string(),
                location: "us-central1".to_string(),
            })
        );
    }

    #[test]
    fn test_credentials_absent() {
        assert_eq!(Credentials::from_lookup(lookup(&[])), None);
        assert_eq!(
            Credentials::from_lookup(lookup(&[("GOOGLE_API_KEY", "  ")])),
            None
        );
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials::ApiKey("secret".to_string());
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[tokio::test]
    async fn test_handle_is_cached() {
        let factory = ModelClientFactory::new(
            ModelSettings::default(),
            Some(Credentials::ApiKey("test-key".to_string())),
        );

        let first = factory.model_handle().await.unwrap();
        let second = factory.model_handle().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.settings(), second.settings());
        assert_eq!(second.settings().temperature, 0.0);
        assert_eq!(second.settings().max_retries, 2);
        assert_eq!(second.model(), "gemini-1.5-pro");
    }

    #[tokio::test]
    async fn test_missing_credentials_is_config_error() {
        let factory = ModelClientFactory::new(ModelSettings::default(), None);
        let err = factory.model_handle().await.unwrap_err();
        assert!(err.is_config());

        // Not cached: the second call fails the same way.
        assert!(factory.model_handle().await.unwrap_err().is_config());
    }

    fn prompt() -> Prompt {
        Prompt::system("be brief").with_user("hi")
    }

    #[test]
    fn test_request_for_uses_settings() {
        let (handle, _) = flaky(0, || Error::RateLimit);
        let request = handle.request_for(&prompt());
        assert_eq!(request.model, "gemini-1.5-pro");
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, None);
        assert_eq!(request.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let (handle, calls) = flaky(2, || Error::RateLimit);
        let response = handle.invoke(&prompt()).await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (handle, calls) = flaky(10, || Error::timeout("upstream timeout"));
        let err = handle.invoke(&prompt()).await.unwrap_err();
        assert_eq!(err.to_string(), "upstream timeout");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let (handle, calls) = flaky(10, || Error::auth("API key not valid"));
        assert!(matches!(
            handle.invoke(&prompt()).await,
            Err(Error::Auth(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let handle = ModelHandle::new(
            ModelSettings {
                retry_backoff: Duration::from_secs(1),
                ..ModelSettings::default()
            },
            Box::new(FlakyProvider {
                calls: Arc::new(AtomicU32::new(0)),
                failures: 0,
                error: || Error::RateLimit,
            }),
        );
        assert_eq!(handle.backoff(0), Duration::from_secs(1));
        assert_eq!(handle.backoff(1), Duration::from_secs(2));
        assert_eq!(handle.backoff(10), MAX_RETRY_BACKOFF);
    }
}
