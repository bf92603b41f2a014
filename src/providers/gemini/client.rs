use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::types::*;
use crate::provider::LLMProvider;
use crate::sse_stream::SseStreamExt;
use crate::types::{FinishReason, Role};
use crate::{Error, LLMRequest, Response, StreamEvent};

const GENERATIVE_LANGUAGE_URL: &str = "https://generativelanguage.googleapis.com";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Authentication method for the Gemini provider.
pub enum GeminiAuth {
    /// Generative Language API key (sent as `x-goog-api-key`)
    ApiKey(String),
    /// Vertex AI access token (passed as Bearer header)
    AccessToken(String),
    /// Vertex AI with Application Default Credentials
    ApplicationDefault(Arc<dyn gcp_auth::TokenProvider>),
}

impl fmt::Debug for GeminiAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeminiAuth::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            GeminiAuth::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            GeminiAuth::ApplicationDefault(_) => f.write_str("ApplicationDefault"),
        }
    }
}

/// Which Google API surface serves the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiTarget {
    GenerativeLanguage,
    Vertex { project_id: String, location: String },
}

/// Google Gemini provider, over either the Generative Language API or Vertex AI.
#[derive(Debug)]
pub struct GeminiProvider {
    client: Client,
    target: GeminiTarget,
    auth: GeminiAuth,
    base_url: Option<String>,
}

impl GeminiProvider {
    /// Create a provider for the Generative Language API.
    ///
    /// `timeout` of `None` lets a request wait indefinitely.
    pub fn with_api_key(api_key: String, timeout: Option<Duration>) -> Result<Self, Error> {
        Ok(Self {
            client: build_client(timeout)?,
            target: GeminiTarget::GenerativeLanguage,
            auth: GeminiAuth::ApiKey(api_key),
            base_url: None,
        })
    }

    /// Create a Vertex AI provider authenticated with an access token.
    pub fn vertex(
        project_id: String,
        location: String,
        access_token: String,
        timeout: Option<Duration>,
    ) -> Result<Self, Error> {
        Ok(Self {
            client: build_client(timeout)?,
            target: GeminiTarget::Vertex {
                project_id,
                location,
            },
            auth: GeminiAuth::AccessToken(access_token),
            base_url: None,
        })
    }

    /// Create a Vertex AI provider using Application Default Credentials.
    pub async fn vertex_with_adc(
        project_id: String,
        location: String,
        timeout: Option<Duration>,
    ) -> Result<Self, Error> {
        let token_provider = gcp_auth::provider()
            .await
            .map_err(|e| Error::config(format!("Application Default Credentials unavailable: {e}")))?;

        Ok(Self {
            client: build_client(timeout)?,
            target: GeminiTarget::Vertex {
                project_id,
                location,
            },
            auth: GeminiAuth::ApplicationDefault(token_provider),
            base_url: None,
        })
    }

    /// Send requests to `base_url` instead of Google (for testing and proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn target(&self) -> &GeminiTarget {
        &self.target
    }

    /// Get the streaming endpoint for `model`.
    fn endpoint(&self, model: &str) -> String {
        match &self.target {
            GeminiTarget::GenerativeLanguage => {
                let base = self.base_url.as_deref().unwrap_or(GENERATIVE_LANGUAGE_URL);
                format!(
                    "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
                    base.trim_end_matches('/'),
                    model
                )
            }
            GeminiTarget::Vertex {
                project_id,
                location,
            } => {
                let base = match &self.base_url {
                    Some(base) => base.trim_end_matches('/').to_string(),
                    None => format!("https://{location}-aiplatform.googleapis.com"),
                };
                format!(
                    "{base}/v1/projects/{project_id}/locations/{location}/publishers/google/models/{model}:streamGenerateContent?alt=sse"
                )
            }
        }
    }

    /// Convert an internal request to the Gemini wire format.
    fn convert_request(request: &LLMRequest) -> GeminiRequest {
        let mut contents = Vec::new();
        let mut system_parts = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::System => system_parts.push(GeminiPart::text(msg.content.clone())),
                Role::User => contents.push(GeminiContent::text(Some("user"), msg.content.clone())),
            }
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: system_parts,
            })
        };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: Some(GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }),
        }
    }

    /// Map a non-success HTTP status to an error.
    fn error_for_status(status: StatusCode, body: &str, model: &str) -> Error {
        let message = serde_json::from_str::<GeminiErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.trim().to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::auth(message),
            StatusCode::NOT_FOUND => Error::ModelNotAvailable(format!("{model}: {message}")),
            StatusCode::TOO_MANY_REQUESTS => Error::RateLimit,
            StatusCode::BAD_REQUEST => Error::InvalidRequest(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Error::timeout(message),
            _ => Error::provider("Gemini", format!("API error ({status}): {message}")),
        }
    }

    /// Convert one streamed chunk into stream events.
    fn convert_chunk(chunk: GeminiResponse) -> Result<Vec<StreamEvent>, Error> {
        if let Some(error) = chunk.error {
            return Err(Error::provider("Gemini", error.message));
        }

        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(Error::Blocked(reason));
        }

        let mut events = Vec::new();

        match chunk.candidates.into_iter().next() {
            Some(candidate) => {
                let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
                for part in parts {
                    if part.thought == Some(true) {
                        continue;
                    }
                    if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                        events.push(StreamEvent::ContentDelta { delta: text });
                    }
                }

                // Only the final chunk carries a finish reason.
                if let Some(reason) = candidate.finish_reason {
                    events.push(StreamEvent::Done {
                        finish_reason: map_finish_reason(&reason),
                        usage: chunk.usage_metadata.map(Into::into).unwrap_or_default(),
                    });
                }
            }
            None => {
                if let Some(usage) = chunk.usage_metadata {
                    events.push(StreamEvent::Done {
                        finish_reason: FinishReason::Stop,
                        usage: usage.into(),
                    });
                }
            }
        }

        Ok(events)
    }
}

fn build_client(timeout: Option<Duration>) -> Result<Client, Error> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(client_build_error)
}

fn client_build_error(error: reqwest::Error) -> Error {
    Error::config(format!("Failed to build HTTP client: {error}"))
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        other => FinishReason::Other(other.to_string()),
    }
}

fn map_transport_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::timeout(error.to_string())
    } else {
        Error::Http(error)
    }
}

#[async_trait::async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn generate(&self, request: &LLMRequest) -> Result<Response, Error> {
        let gemini_request = Self::convert_request(request);
        let endpoint = self.endpoint(&request.model);

        let request_builder = self.client.post(&endpoint).json(&gemini_request);
        let request_builder = match &self.auth {
            GeminiAuth::ApiKey(key) => request_builder.header("x-goog-api-key", key),
            GeminiAuth::AccessToken(token) => request_builder.bearer_auth(token),
            GeminiAuth::ApplicationDefault(token_provider) => {
                let token = token_provider
                    .token(&[CLOUD_PLATFORM_SCOPE])
                    .await
                    .map_err(|e| Error::auth(format!("Failed to get ADC token: {e}")))?;
                request_builder.bearer_auth(token.as_str())
            }
        };

        tracing::debug!(model = %request.model, target = ?self.target, "Sending Gemini request");

        let response = request_builder.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.map_err(map_transport_error)?;
            tracing::warn!(%status, model = %request.model, "Gemini request failed");
            return Err(Self::error_for_status(status, &body, &request.model));
        }

        let event_stream = Box::pin(response.bytes_stream())
            .sse_events()
            .map(|sse_result| {
                let sse_event = match sse_result {
                    Ok(sse_event) => sse_event,
                    Err(e) => return vec![Err(e)],
                };

                let data = sse_event.data.trim();
                if data.is_empty() || sse_event.is_done() {
                    return vec![];
                }

                match serde_json::from_str::<GeminiResponse>(data) {
                    Ok(chunk) => match Self::convert_chunk(chunk) {
                        Ok(events) => events.into_iter().map(Ok).collect(),
                        Err(e) => vec![Err(e)],
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "Unparseable Gemini stream chunk");
                        vec![Err(Error::Serialization(e))]
                    }
                }
            })
            .flat_map(futures_util::stream::iter);

        Ok(Response::from_stream(event_stream))
    }
}
