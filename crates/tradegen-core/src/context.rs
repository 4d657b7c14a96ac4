//! Execution Context: per-run state threaded through all steps
use crate::data_model::PipelineInput;
use crate::error::PipelineError;
use crate::results::StepResults;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tradegen_telemetry::{Telemetry, TelemetrySummary};

/// Lifecycle of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Aborted,
}

/// How a single step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Failed,
    /// Never attempted: an earlier required step failed or the run was cancelled
    Skipped,
    /// Interrupted by cancellation mid-attempt
    Aborted,
}

/// One entry of the append-only step log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub outcome: StepOutcome,
    pub attempts: u32,
    pub duration_ms: u64,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PipelineError>,
    pub finished_at: DateTime<Utc>,
}

/// Terminal error together with the step that raised it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub error: PipelineError,
}

/// The unit of work.
///
/// Fields are only written by the orchestrator while `execute` runs; the
/// value handed back to the caller exposes read accessors only.
#[derive(Debug)]
pub struct ExecutionContext {
    pub(crate) execution_id: String,
    pub(crate) input: PipelineInput,
    pub(crate) results: StepResults,
    pub(crate) log: Vec<StepRecord>,
    pub(crate) telemetry: Telemetry,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
    pub(crate) current_step: Option<String>,
    pub(crate) completed_steps: Vec<String>,
    pub(crate) failed_steps: Vec<String>,
    pub(crate) error: Option<PipelineFailure>,
    pub(crate) status: ExecutionStatus,
}

impl ExecutionContext {
    pub(crate) fn new(execution_id: String, input: PipelineInput, telemetry: Telemetry) -> Self {
        Self {
            execution_id,
            input,
            results: StepResults::new(),
            log: Vec::new(),
            telemetry,
            started_at: Utc::now(),
            ended_at: None,
            current_step: None,
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            error: None,
            status: ExecutionStatus::Running,
        }
    }

    pub(crate) fn finish(&mut self, status: ExecutionStatus) {
        self.status = status;
        self.current_step = None;
        self.ended_at = Some(Utc::now());
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn input(&self) -> &PipelineInput {
        &self.input
    }

    pub fn results(&self) -> &StepResults {
        &self.results
    }

    pub fn log(&self) -> &[StepRecord] {
        &self.log
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Step running right now; `None` once execution returned
    pub fn current_step(&self) -> Option<&str> {
        self.current_step.as_deref()
    }

    pub fn completed_steps(&self) -> &[String] {
        &self.completed_steps
    }

    pub fn failed_steps(&self) -> &[String] {
        &self.failed_steps
    }

    /// Terminal error, if the run failed or was aborted
    pub fn error(&self) -> Option<&PipelineFailure> {
        self.error.as_ref()
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    pub fn duration_ms(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Attempts recorded for a step, 0 if it never ran
    pub fn attempts(&self, step: &str) -> u32 {
        self.log
            .iter()
            .filter(|r| r.step == step)
            .map(|r| r.attempts)
            .sum()
    }

    /// Serializable, redacted view for callers and HTTP responses
    pub fn view(&self) -> ExecutionView {
        ExecutionView {
            execution_id: self.execution_id.clone(),
            status: self.status,
            strategy: self.input.strategy.name.clone(),
            provider: self.input.config.ai_provider.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            completed_steps: self.completed_steps.clone(),
            failed_steps: self.failed_steps.clone(),
            error: self.error.clone(),
            log: self.log.clone(),
            results: self.results.clone(),
            telemetry: self.telemetry.summary(),
        }
    }
}

/// Snapshot of a finished execution
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionView {
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub strategy: String,
    pub provider: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub completed_steps: Vec<String>,
    pub failed_steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PipelineFailure>,
    pub log: Vec<StepRecord>,
    pub results: StepResults,
    pub telemetry: TelemetrySummary,
}
