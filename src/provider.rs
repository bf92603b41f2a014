use crate::{Error, LLMRequest, Response};

/// A remote model that can generate text for a request.
/// Responses are streamed; `response.buffer().await` collects them.
#[async_trait::async_trait]
pub trait LLMProvider: Send + Sync + 'static {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Issue one generation call.
    async fn generate(&self, request: &LLMRequest) -> Result<Response, Error>;
}
