//! Trade-generation steps
//!
//! ```text
//! fetchPrices → buildMarketContext → generatePrompt → callAIProvider
//!     → parseResponse → validateTrades → enrichGlassBox
//! ```
//!
//! Each step reads earlier outputs through the typed keys in [`keys`] and
//! returns its own; [`standard_pipeline`] wires them into a
//! [`PipelineRunner`](tradegen_core::PipelineRunner).

pub mod call;
pub mod enrich;
pub mod error;
pub mod keys;
pub mod market;
pub mod parse;
pub mod pipeline;
pub mod prices;
pub mod prompt;
pub mod validate;

pub use call::CallProvider;
pub use enrich::{EnrichGlassBox, FinalResult, GenerationOutcome, GenerationSummary, GlassBoxData};
pub use error::PriceError;
pub use market::{BuildMarketContext, FetchPrices, MarketContext};
pub use parse::{extract_json, parse_content, ParseResponse, ParsedTrades, SkippedEntry};
pub use pipeline::{standard_pipeline, standard_steps, PipelineDeps};
pub use prices::{HttpPriceSource, PriceSource, StaticPriceSource, DEFAULT_WATCHLIST};
pub use prompt::{GeneratePrompt, Prompt};
pub use validate::{CheckedTrade, ValidateTrades, ValidatedTrades};
