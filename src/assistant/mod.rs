//! Question answering: prompt construction, the generation pipeline, and the
//! per-request interaction state machine.

pub mod controller;
pub mod pipeline;
pub mod prompt;

pub use controller::{InteractionController, InteractionState, Outcome, FAILURE_PREFIX};
pub use pipeline::ResponsePipeline;
pub use prompt::{build_prompt, SYSTEM_INSTRUCTION};
