//! A single-page generative AI assistant backed by Google Gemini.
//!
//! A question typed into the page is wrapped in a fixed system instruction,
//! sent to Gemini (Generative Language API or Vertex AI), and the answer or
//! an error message is rendered back into the page.

pub mod accumulator;
pub mod assistant;
pub mod config;
pub mod error;
pub mod factory;
pub mod provider;
pub mod providers;
pub mod response;
pub mod sse_stream;
pub mod types;
pub mod web;

// Re-export core types for easy usage
pub use accumulator::ResponseAccumulator;
pub use assistant::{build_prompt, InteractionController, InteractionState, Outcome, ResponsePipeline};
pub use error::Error;
pub use factory::{Credentials, ModelClientFactory, ModelHandle, ModelSettings};
pub use provider::LLMProvider;
pub use providers::GeminiProvider;
pub use response::*;
pub use sse_stream::SseEvent;
pub use types::*;
