//! Response handling for model generations.

use crate::{Error, FinishReason, StreamEvent, Usage};
use futures_util::stream::Stream;
use std::pin::Pin;

/// A complete, buffered response from a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteResponse {
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl CompleteResponse {
    /// Consume the response, keeping only the generated text.
    pub fn into_text(self) -> String {
        self.content
    }
}

/// Response from a generation that can be streamed or buffered.
pub struct Response {
    stream: Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>,
}

impl Response {
    /// Create a new response from a stream of events.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<StreamEvent, Error>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
        }
    }

    /// Create an already-complete response holding `text`.
    pub fn from_text(text: impl Into<String>) -> Self {
        let events = vec![
            Ok(StreamEvent::ContentDelta { delta: text.into() }),
            Ok(StreamEvent::Done {
                finish_reason: FinishReason::Stop,
                usage: Usage::default(),
            }),
        ];
        Self::from_stream(futures_util::stream::iter(events))
    }

    /// Drain the stream into a [`CompleteResponse`], stopping at the first `Done`.
    pub async fn buffer(self) -> Result<CompleteResponse, Error> {
        use futures_util::StreamExt;

        let mut stream = self.stream;
        let mut accumulator = crate::accumulator::ResponseAccumulator::new();

        while let Some(event_result) = stream.next().await {
            let event = event_result?;
            let done = event.is_done();
            accumulator.process_event(event);
            if done {
                break;
            }
        }

        Ok(accumulator.finalize())
    }
}
