use std::sync::Arc;

use super::prompt::build_prompt;
use crate::factory::ModelHandle;
use crate::Error;

/// Prompt builder, model handle and text extraction composed into one call.
///
/// There is no timeout here: with the default settings a call waits for the
/// provider for as long as it takes.
#[derive(Debug, Clone)]
pub struct ResponsePipeline {
    handle: Arc<ModelHandle>,
}

impl ResponsePipeline {
    pub fn new(handle: Arc<ModelHandle>) -> Self {
        Self { handle }
    }

    /// Answer `question` with one round trip to the model.
    pub async fn generate(&self, question: &str) -> Result<String, Error> {
        let prompt = build_prompt(question);
        let response = self.handle.invoke(&prompt).await?;

        tracing::debug!(
            model = self.handle.model(),
            finish_reason = ?response.finish_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Generation finished"
        );

        Ok(response.into_text())
    }
}
