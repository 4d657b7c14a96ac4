//! # AI provider adapters
//!
//! One [`AiProvider`] contract over several text-generation backends:
//!
//! | name        | adapter               | auth header          |
//! |-------------|-----------------------|----------------------|
//! | `openai`    | [`OpenAiProvider`]    | `Authorization`      |
//! | `deepseek`  | [`OpenAiProvider`]    | `Authorization`      |
//! | `anthropic` | [`AnthropicProvider`] | `x-api-key`          |
//! | `gemini`    | [`GeminiProvider`]    | `x-goog-api-key`     |
//!
//! Every adapter checks the key format before touching the network and
//! returns the text plus token usage as a [`ProviderResponse`].
//!
//! [`ProviderResponse`]: tradegen_core::ProviderResponse

pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod provider;
pub mod registry;

pub use anthropic::AnthropicProvider;
pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use provider::{AiProvider, GenerateOptions, GenerateRequest, ProviderInfo};
pub use registry::ProviderRegistry;
