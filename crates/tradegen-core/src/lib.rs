//! Tradegen Core: Step contract, Pipeline Runner and Data Model
//!
//! The runner executes a fixed, ordered list of named steps against one
//! [`ExecutionContext`]. Steps never call each other; they read earlier
//! outputs through typed [`StepKey`]s and return their own output as JSON.
//!
//! # Execution model
//!
//! ```text
//! for each step (registration order):
//!     cancelled? ─ yes → Aborted
//!     attempt ── race(work, timeout, cancel)
//!        │ ok  → results[step] = output
//!        │ err → retry (≤ max_retries, capped exponential backoff)
//!        └ exhausted → optional ? continue : Failed (terminal)
//! ```
//!
//! `execute` never returns an error; callers inspect
//! [`ExecutionContext::error`] and [`ExecutionContext::status`].

pub mod cancel;
pub mod context;
pub mod data_model;
pub mod error;
pub mod events;
pub mod results;
pub mod runner;
pub mod step;

pub use cancel::{cancellation, CancelHandle, CancelSignal};
pub use context::{
    ExecutionContext, ExecutionStatus, ExecutionView, PipelineFailure, StepOutcome, StepRecord,
};
pub use data_model::{
    ApiKey, ConfidenceFactor, Direction, GenerationConfig, PipelineInput, ProviderResponse,
    Strategy, TokenUsage, Trade,
};
pub use error::{AssemblyError, PipelineError, StepError};
pub use events::{EventBus, EventKind, PipelineEvent, SubscriptionId};
pub use results::{StepKey, StepResults};
pub use runner::{PipelineConfig, PipelineRunner, RetryPolicy};
pub use step::{to_output, Step, StepContext, StepDefinition};

pub use tradegen_telemetry as telemetry;

/// Engine version
pub const TRADEGEN_VERSION: &str = "1.0.0";
