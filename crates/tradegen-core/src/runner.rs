//! Pipeline Runner: sequential steps with per-step timeout, retry and events
use crate::cancel::CancelSignal;
use crate::context::{ExecutionContext, ExecutionStatus, PipelineFailure, StepOutcome, StepRecord};
use crate::data_model::PipelineInput;
use crate::error::{AssemblyError, PipelineError, StepError};
use crate::events::{EventBus, EventKind, PipelineEvent, SubscriptionId};
use crate::step::{StepContext, StepDefinition};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::Instrument;
use tradegen_telemetry::{redact_secret, StepStatus, Telemetry, TelemetryConfig};

const PIPELINE: &str = "pipeline";

/// Exponential backoff between attempts, capped at `max_delay_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): `base × 2^(retry-1)`, capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(32);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
        }
    }
}

/// Runner-wide settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub retry: RetryPolicy,
    pub telemetry: TelemetryConfig,
}

/// How a single attempt ended. A timed-out attempt's future is dropped,
/// so a late result is discarded rather than admitted.
enum Attempt {
    Done(Value),
    Failed(StepError),
    TimedOut,
    Cancelled,
}

/// How one step's attempts ended
struct StepRun {
    result: Result<Value, PipelineError>,
    attempts: u32,
}

/// Runs registered steps, in registration order, against a fresh context
#[derive(Debug)]
pub struct PipelineRunner {
    steps: Vec<StepDefinition>,
    events: EventBus,
    config: PipelineConfig,
}

impl PipelineRunner {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            steps: Vec::new(),
            events: EventBus::new(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Append a step
    pub fn add_step(&mut self, step: StepDefinition) -> Result<&mut Self, AssemblyError> {
        self.ensure_unique(&step.name)?;
        self.steps.push(step);
        Ok(self)
    }

    /// Insert a step before position `index`
    pub fn insert_step(
        &mut self,
        index: usize,
        step: StepDefinition,
    ) -> Result<&mut Self, AssemblyError> {
        if index > self.steps.len() {
            return Err(AssemblyError::IndexOutOfBounds {
                index,
                len: self.steps.len(),
            });
        }
        self.ensure_unique(&step.name)?;
        self.steps.insert(index, step);
        Ok(self)
    }

    /// Remove a step by name
    pub fn remove_step(&mut self, name: &str) -> Option<StepDefinition> {
        let index = self.steps.iter().position(|s| s.name == name)?;
        Some(self.steps.remove(index))
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, listener)
    }

    pub fn once<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        self.events.once(kind, listener)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.events.off(id)
    }

    /// Run every step. Never fails: the returned context describes the outcome.
    pub async fn execute(&self, input: PipelineInput) -> ExecutionContext {
        self.execute_with_cancel(input, CancelSignal::never()).await
    }

    /// Run every step, stopping early when `cancel` fires
    pub async fn execute_with_cancel(
        &self,
        input: PipelineInput,
        cancel: CancelSignal,
    ) -> ExecutionContext {
        let execution_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "execution",
            execution_id = %execution_id,
            provider = %input.config.ai_provider,
        );
        self.drive(execution_id, input, cancel).instrument(span).await
    }

    async fn drive(
        &self,
        execution_id: String,
        input: PipelineInput,
        cancel: CancelSignal,
    ) -> ExecutionContext {
        let secret = input.config.api_key.expose().to_string();
        let telemetry = Telemetry::with_config(&execution_id, self.config.telemetry.clone());
        let mut ctx = ExecutionContext::new(execution_id, input, telemetry);

        let step_names: Vec<String> = self.steps.iter().map(|s| s.name.clone()).collect();
        ctx.telemetry.info(
            PIPELINE,
            "pipeline started",
            &json!({
                "strategy": ctx.input.strategy.name,
                "provider": ctx.input.config.ai_provider,
                "steps": step_names,
            }),
        );
        self.events.emit(&PipelineEvent::PipelineStart {
            execution_id: ctx.execution_id.clone(),
            strategy: ctx.input.strategy.name.clone(),
            steps: step_names,
        });

        for (index, step) in self.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                skip_remaining(&mut ctx, &self.steps[index..]);
                self.abort(&mut ctx, None, "cancelled before step start");
                return ctx;
            }

            ctx.current_step = Some(step.name.clone());
            ctx.telemetry.start_step(&step.name);
            self.events.emit(&PipelineEvent::StepStart {
                execution_id: ctx.execution_id.clone(),
                step: step.name.clone(),
                index,
            });

            let run = self.run_step(step, &mut ctx, &cancel, &secret).await;

            match run.result {
                Ok(value) => {
                    let duration_ms = ctx.telemetry.end_step(&step.name, StepStatus::Completed);
                    ctx.results.insert(step.name.clone(), value);
                    ctx.completed_steps.push(step.name.clone());
                    ctx.log.push(record(step, StepOutcome::Completed, run.attempts, duration_ms, None));
                    ctx.telemetry.info(
                        &step.name,
                        "step completed",
                        &json!({ "duration_ms": duration_ms, "attempts": run.attempts }),
                    );
                    self.events.emit(&PipelineEvent::StepComplete {
                        execution_id: ctx.execution_id.clone(),
                        step: step.name.clone(),
                        duration_ms,
                        attempts: run.attempts,
                    });
                }
                Err(error) if error.is_aborted() => {
                    let duration_ms = ctx.telemetry.end_step(&step.name, StepStatus::Skipped);
                    ctx.log.push(record(
                        step,
                        StepOutcome::Aborted,
                        run.attempts,
                        duration_ms,
                        Some(error.clone()),
                    ));
                    skip_remaining(&mut ctx, &self.steps[index + 1..]);
                    self.abort(&mut ctx, Some(&step.name), "cancelled during step");
                    return ctx;
                }
                Err(error) => {
                    let duration_ms = ctx.telemetry.end_step(&step.name, StepStatus::Failed);
                    ctx.failed_steps.push(step.name.clone());
                    ctx.log.push(record(
                        step,
                        StepOutcome::Failed,
                        run.attempts,
                        duration_ms,
                        Some(error.clone()),
                    ));
                    ctx.telemetry.error(
                        &step.name,
                        "step failed",
                        &json!({
                            "error": error.to_string(),
                            "attempts": run.attempts,
                            "optional": step.optional,
                        }),
                    );
                    self.events.emit(&PipelineEvent::StepError {
                        execution_id: ctx.execution_id.clone(),
                        step: step.name.clone(),
                        error: error.to_string(),
                        attempts: run.attempts,
                        optional: step.optional,
                    });

                    if step.optional {
                        ctx.telemetry.warn(
                            &step.name,
                            "optional step failed, continuing",
                            &Value::Null,
                        );
                        continue;
                    }

                    self.events.emit(&PipelineEvent::PipelineError {
                        execution_id: ctx.execution_id.clone(),
                        step: Some(step.name.clone()),
                        error: error.to_string(),
                    });
                    ctx.telemetry.error(
                        PIPELINE,
                        "pipeline aborted by required step",
                        &json!({ "step": step.name }),
                    );
                    skip_remaining(&mut ctx, &self.steps[index + 1..]);
                    ctx.error = Some(PipelineFailure {
                        step: Some(step.name.clone()),
                        error,
                    });
                    ctx.finish(ExecutionStatus::Failed);
                    return ctx;
                }
            }
        }

        ctx.finish(ExecutionStatus::Completed);
        let duration_ms = ctx.duration_ms();
        ctx.telemetry.info(
            PIPELINE,
            "pipeline completed",
            &json!({
                "duration_ms": duration_ms,
                "completed": ctx.completed_steps.len(),
                "failed": ctx.failed_steps.len(),
            }),
        );
        self.events.emit(&PipelineEvent::PipelineComplete {
            execution_id: ctx.execution_id.clone(),
            duration_ms,
            completed_steps: ctx.completed_steps.clone(),
            failed_steps: ctx.failed_steps.clone(),
        });
        ctx
    }

    /// Attempt a step up to `1 + max_retries` times
    async fn run_step(
        &self,
        step: &StepDefinition,
        ctx: &mut ExecutionContext,
        cancel: &CancelSignal,
        secret: &str,
    ) -> StepRun {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let outcome = {
                let mut step_ctx = StepContext {
                    execution_id: &ctx.execution_id,
                    step: &step.name,
                    attempt,
                    input: &ctx.input,
                    results: &ctx.results,
                    telemetry: &mut ctx.telemetry,
                    cancel,
                };
                let work = step
                    .work
                    .run(&mut step_ctx)
                    .instrument(tracing::info_span!("step", step = %step.name, attempt));
                let attempt_outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Attempt::Cancelled,
                    res = tokio::time::timeout(step.timeout, work) => match res {
                        Ok(Ok(value)) => Attempt::Done(value),
                        Ok(Err(error)) => Attempt::Failed(error),
                        Err(_) => Attempt::TimedOut,
                    },
                };
                attempt_outcome
            };

            let (error, retryable) = match outcome {
                Attempt::Done(value) => {
                    return StepRun {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Attempt::Cancelled => {
                    return StepRun {
                        result: Err(PipelineError::Aborted {
                            reason: format!("cancelled during '{}'", step.name),
                        }),
                        attempts: attempt,
                    }
                }
                Attempt::TimedOut => (
                    PipelineError::Timeout {
                        step: step.name.clone(),
                        timeout_ms: millis(step.timeout),
                    },
                    true,
                ),
                Attempt::Failed(error) => {
                    let retryable = error.is_retryable();
                    (
                        PipelineError::from_step(&step.name, error).redacted(secret),
                        retryable,
                    )
                }
            };

            if !retryable || attempt > step.max_retries {
                return StepRun {
                    result: Err(error),
                    attempts: attempt,
                };
            }

            let retry = attempt;
            let delay = self.config.retry.delay_for(retry);
            let message = redact_secret(&error.to_string(), secret);
            ctx.telemetry.warn(
                &step.name,
                "retrying step",
                &json!({
                    "retry": retry,
                    "max_retries": step.max_retries,
                    "delay_ms": millis(delay),
                    "error": message,
                }),
            );
            self.events.emit(&PipelineEvent::StepRetry {
                execution_id: ctx.execution_id.clone(),
                step: step.name.clone(),
                retry,
                max_retries: step.max_retries,
                delay_ms: millis(delay),
                error: message,
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return StepRun {
                        result: Err(PipelineError::Aborted {
                            reason: format!("cancelled while backing off '{}'", step.name),
                        }),
                        attempts: attempt,
                    };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn abort(&self, ctx: &mut ExecutionContext, step: Option<&str>, reason: &str) {
        let error = PipelineError::Aborted {
            reason: reason.to_string(),
        };
        ctx.telemetry
            .warn(PIPELINE, "pipeline cancelled", &json!({ "step": step, "reason": reason }));
        self.events.emit(&PipelineEvent::PipelineError {
            execution_id: ctx.execution_id.clone(),
            step: step.map(str::to_string),
            error: error.to_string(),
        });
        ctx.error = Some(PipelineFailure {
            step: step.map(str::to_string),
            error,
        });
        ctx.finish(ExecutionStatus::Aborted);
    }

    fn ensure_unique(&self, name: &str) -> Result<(), AssemblyError> {
        if self.steps.iter().any(|s| s.name == name) {
            return Err(AssemblyError::DuplicateStep(name.to_string()));
        }
        Ok(())
    }
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn record(
    step: &StepDefinition,
    outcome: StepOutcome,
    attempts: u32,
    duration_ms: u64,
    error: Option<PipelineError>,
) -> StepRecord {
    StepRecord {
        step: step.name.clone(),
        outcome,
        attempts,
        duration_ms,
        optional: step.optional,
        error,
        finished_at: Utc::now(),
    }
}

/// Log the steps an early stop left unattempted
fn skip_remaining(ctx: &mut ExecutionContext, rest: &[StepDefinition]) {
    for step in rest {
        ctx.log.push(record(step, StepOutcome::Skipped, 0, 0, None));
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
