//! AI Integration Layer
//!
//! Backend providers, prompt construction, output validation and the
//! generation client that ties them together.

pub mod generation;
pub mod prompt;
pub mod provider;
pub mod validation;

pub use generation::{
    FailureKind, GenerationBatch, GenerationClient, GenerationFailure, GenerationResult,
    GenerationSettings,
};
pub use prompt::{ContextWindow, DocRequest, Prompt, PromptBuilder, PromptSection};
pub use provider::{
    DocProvider, ErrorCategory, ErrorClassifier, LlmError, LlmResponse, OllamaProvider,
    OpenAiProvider, ResponseMetadata, ResponseTiming, SharedProvider, TokenUsage,
    create_provider,
};
pub use validation::{DocTextValidator, RejectReason};
