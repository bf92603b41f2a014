//! Core types used throughout the crate.

pub mod message;
pub mod prompt;
pub mod request;
pub mod streaming;

// Re-export commonly used types
pub use message::*;
pub use prompt::*;
pub use request::*;
pub use streaming::*;
