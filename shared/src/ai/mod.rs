//! AI response pipeline: classification, model selection, generation.

pub mod classify;
pub mod generator;
pub mod models;

pub use classify::{classify_complexity, classify_priority, Complexity, Priority};
pub use generator::{BedrockInvoker, ModelInvoker, ResponseGenerator};
pub use models::{ModelConfig, SelectionStrategy};
