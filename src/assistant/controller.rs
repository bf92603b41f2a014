use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::pipeline::ResponsePipeline;
use crate::factory::ModelClientFactory;
use crate::Error;

/// Prefix of every user-visible failure message.
pub const FAILURE_PREFIX: &str = "An error occurred: ";

/// What a settled interaction shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Model text, to be rendered as-is.
    Response(String),
    /// Failure message, always starting with [`FAILURE_PREFIX`].
    Failure(String),
}

impl Outcome {
    fn failure(error: &Error) -> Self {
        Outcome::Failure(format!("{FAILURE_PREFIX}{error}"))
    }
}

/// State of one interaction cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionState {
    /// No question submitted.
    Idle,
    /// Generation in flight.
    Pending,
    Settled(Outcome),
}

/// Drives one interaction per call. Holds nothing between calls except the
/// factory's cached model handle.
#[derive(Clone)]
pub struct InteractionController {
    factory: Arc<ModelClientFactory>,
}

impl InteractionController {
    pub fn new(factory: Arc<ModelClientFactory>) -> Self {
        Self { factory }
    }

    /// Answer `question`, returning the final state (`Idle` or `Settled`).
    ///
    /// Generation failures settle as [`Outcome::Failure`]. Failures to build the
    /// model handle, always [`Error::Config`], are returned as `Err`.
    pub async fn run(&self, question: &str) -> Result<InteractionState, Error> {
        self.run_observed(question, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_transition` with every state entered.
    pub async fn run_observed(
        &self,
        question: &str,
        mut on_transition: impl FnMut(&InteractionState) + Send,
    ) -> Result<InteractionState, Error> {
        if question.is_empty() {
            tracing::debug!("Empty question, staying idle");
            return Ok(InteractionState::Idle);
        }

        let span = tracing::info_span!(
            "interaction",
            id = %Uuid::new_v4(),
            question_len = question.len()
        );

        async move {
            let handle = self.factory.model_handle().await?;
            let pipeline = ResponsePipeline::new(handle);

            on_transition(&InteractionState::Pending);
            tracing::info!("Generating response");

            let outcome = match pipeline.generate(question).await {
                Ok(text) => {
                    tracing::info!(response_len = text.len(), "Response ready");
                    Outcome::Response(text)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Generation failed");
                    Outcome::failure(&e)
                }
            };

            let settled = InteractionState::Settled(outcome);
            on_transition(&settled);
            Ok::<_, Error>(settled)
        }
        .instrument(span)
        .await
    }
}
