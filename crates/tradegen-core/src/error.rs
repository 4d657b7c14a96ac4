//! Unified Error Model
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tradegen_telemetry::redact_secret;

/// Terminal error attached to an execution context
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineError {
    #[error("TIMEOUT/{step}: exceeded {timeout_ms}ms")]
    Timeout { step: String, timeout_ms: u64 },

    #[error("PROVIDER/{provider}: {message}")]
    Provider {
        provider: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        message: String,
    },

    #[error("STEP/{step}: {message}")]
    Step { step: String, message: String },

    #[error("ABORTED/{reason}")]
    Aborted { reason: String },
}

impl PipelineError {
    /// Attribute a step body's error to the step that raised it
    pub fn from_step(step: &str, error: StepError) -> Self {
        match error {
            StepError::Provider {
                provider,
                status,
                message,
                ..
            } => PipelineError::Provider {
                provider,
                status,
                message,
            },
            other => PipelineError::Step {
                step: step.to_string(),
                message: other.to_string(),
            },
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::Timeout { .. })
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, PipelineError::Aborted { .. })
    }

    /// Strip a known secret out of every message field
    pub fn redacted(self, secret: &str) -> Self {
        match self {
            PipelineError::Provider {
                provider,
                status,
                message,
            } => PipelineError::Provider {
                provider,
                status,
                message: redact_secret(&message, secret),
            },
            PipelineError::Step { step, message } => PipelineError::Step {
                step,
                message: redact_secret(&message, secret),
            },
            PipelineError::Aborted { reason } => PipelineError::Aborted {
                reason: redact_secret(&reason, secret),
            },
            timeout @ PipelineError::Timeout { .. } => timeout,
        }
    }
}

/// Failure returned by a step body
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    /// Generic, transient failure; retried
    #[error("STEP/{0}")]
    Failed(String),

    /// A result this step depends on is absent or undecodable
    #[error("INPUT/{0}")]
    MissingInput(String),

    /// The AI backend rejected or garbled the call
    #[error("PROVIDER/{provider}: {message}")]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
        retryable: bool,
    },

    /// Unrecoverable; never retried
    #[error("FATAL/{0}")]
    Fatal(String),
}

impl StepError {
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        StepError::Fatal(message.into())
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            StepError::Failed(_) => true,
            StepError::Provider { retryable, .. } => *retryable,
            StepError::MissingInput(_) | StepError::Fatal(_) => false,
        }
    }
}

/// Error raised while assembling a pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("ASSEMBLY/duplicate step name '{0}'")]
    DuplicateStep(String),

    #[error("ASSEMBLY/index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}
