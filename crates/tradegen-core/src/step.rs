//! Step contract: one named, retryable unit of work
use crate::cancel::CancelSignal;
use crate::data_model::PipelineInput;
use crate::error::StepError;
use crate::results::{StepKey, StepResults};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tradegen_telemetry::Telemetry;

/// Work performed by a step.
///
/// Bodies must be idempotent: after a timeout the previous attempt's
/// future is dropped, but side effects it already produced are not rolled
/// back before the retry.
#[async_trait]
pub trait Step: Send + Sync {
    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<Value, StepError>;
}

/// View of the execution handed to a running step.
///
/// Earlier results are read-only; the step's own output is stored by the
/// orchestrator from the returned value.
pub struct StepContext<'a> {
    pub execution_id: &'a str,
    pub step: &'a str,
    /// 1-based attempt number
    pub attempt: u32,
    pub input: &'a PipelineInput,
    pub results: &'a StepResults,
    pub telemetry: &'a mut Telemetry,
    pub cancel: &'a CancelSignal,
}

impl<'a> StepContext<'a> {
    /// Output of an earlier step, if it completed and decodes as `T`
    pub fn get<T: DeserializeOwned>(&self, key: &StepKey<T>) -> Option<T> {
        self.results.get(key)
    }

    /// Output of an earlier step this step cannot run without
    pub fn require<T: DeserializeOwned>(&self, key: &StepKey<T>) -> Result<T, StepError> {
        match self.results.try_get(key) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(StepError::MissingInput(format!(
                "result '{}' is not available",
                key.name()
            ))),
            Err(e) => Err(StepError::MissingInput(format!(
                "result '{}' could not be decoded: {}",
                key.name(),
                e
            ))),
        }
    }

    pub fn info<T: Serialize + ?Sized>(&mut self, message: &str, data: &T) {
        self.telemetry.info(self.step, message, data);
    }

    pub fn warn<T: Serialize + ?Sized>(&mut self, message: &str, data: &T) {
        self.telemetry.warn(self.step, message, data);
    }

    pub fn debug<T: Serialize + ?Sized>(&mut self, message: &str, data: &T) {
        self.telemetry.debug(self.step, message, data);
    }
}

/// Serialize a step's output
pub fn to_output<T: Serialize>(value: &T) -> Result<Value, StepError> {
    serde_json::to_value(value).map_err(|e| StepError::fatal(format!("unserializable output: {e}")))
}

/// A step declaration, fixed once the pipeline is assembled
#[derive(Clone)]
pub struct StepDefinition {
    pub name: String,
    pub description: String,
    pub work: Arc<dyn Step>,
    /// Failure does not abort the pipeline
    pub optional: bool,
    pub timeout: Duration,
    /// Additional attempts after the first
    pub max_retries: u32,
}

impl StepDefinition {
    /// Required step with a 30s timeout and no retries
    pub fn new(name: impl Into<String>, work: impl Step + 'static) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            work: Arc::new(work),
            optional: false,
            timeout: Duration::from_secs(30),
            max_retries: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl std::fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("StepDefinition")
            .field("name", &self.name)
            .field("optional", &self.optional)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
