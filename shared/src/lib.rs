//! Shared library for the tarot reading Lambda functions.
//!
//! The core is a pipeline that turns a question (and optionally a spread of
//! drawn cards) into a structured reading. Prose comes from an external
//! chat-completions service whose output cannot be trusted to be clean JSON,
//! so every failure degrades to a fixed fallback reading instead of an error.

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod secrets;
pub mod validate;

pub use client::{DeepSeekClient, Generator};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{
    CardFact, CardReading, Diagnostics, ErrorResponse, GenerationRequest, RawGenerationOutput,
    ReadingMode, ReadingRequest, ReadingResponse, SpreadReading, StructuredReading,
};
pub use pipeline::{ReadingPipeline, Stage};
pub use prompt::{PromptBuilder, PromptTemplates};
pub use secrets::resolve_api_key;
