//! Delta accumulation logic for streaming responses.

use crate::types::{FinishReason, StreamEvent, Usage};
use crate::CompleteResponse;

/// Accumulates streaming deltas into a complete response.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    content: String,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Transport and provider failures never reach the
    /// accumulator; they end the stream as `Err` items instead.
    pub fn process_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::ContentDelta { delta } => {
                self.content.push_str(&delta);
            }
            StreamEvent::Done {
                finish_reason,
                usage,
            } => {
                self.finish_reason = Some(finish_reason);
                self.usage = Some(usage);
            }
        }
    }

    /// A stream that ended without `Done` counts as a normal stop.
    pub fn finalize(self) -> CompleteResponse {
        CompleteResponse {
            content: self.content,
            finish_reason: self.finish_reason.unwrap_or(FinishReason::Stop),
            usage: self.usage.unwrap_or_default(),
        }
    }
}
