//! The per-execution telemetry recorder
//!
//! Logging calls never fail: unserializable payloads are dropped and the
//! event is kept with an `[UNSERIALIZABLE]` marker instead.

use crate::event::{LogLevel, StepStatus, StepTiming, TelemetryEvent};
use crate::sanitize::{sanitize, UNSERIALIZABLE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

/// Recorder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Oldest events are evicted past this count
    pub max_events: usize,
    /// Events below this level are not recorded
    pub min_level: LogLevel,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_events: 10_000,
            min_level: LogLevel::Debug,
        }
    }
}

/// Aggregate view for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySummary {
    pub execution_id: String,
    pub started_at: DateTime<Utc>,
    pub total_events: usize,
    pub errors: usize,
    pub warnings: usize,
    pub total_duration_ms: u64,
    pub steps_executed: usize,
    pub steps_failed: usize,
}

/// Full timeline for persistence or audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryExport {
    pub summary: TelemetrySummary,
    pub events: Vec<TelemetryEvent>,
    pub steps: Vec<StepTiming>,
}

impl TelemetryExport {
    /// Export to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export events to JSON Lines
    pub fn to_jsonl(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Telemetry recorder owned by one execution
#[derive(Debug)]
pub struct Telemetry {
    execution_id: String,
    config: TelemetryConfig,
    started: Instant,
    started_at: DateTime<Utc>,
    events: Vec<TelemetryEvent>,
    steps: Vec<StepTiming>,
    open_steps: HashMap<String, (usize, Instant)>,
    next_seq: u64,
    errors: usize,
    warnings: usize,
}

impl Telemetry {
    /// Create a recorder with default settings
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self::with_config(execution_id, TelemetryConfig::default())
    }

    pub fn with_config(execution_id: impl Into<String>, config: TelemetryConfig) -> Self {
        Self {
            execution_id: execution_id.into(),
            config,
            started: Instant::now(),
            started_at: Utc::now(),
            events: Vec::new(),
            steps: Vec::new(),
            open_steps: HashMap::new(),
            next_seq: 0,
            errors: 0,
            warnings: 0,
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Mark the start of a step
    pub fn start_step(&mut self, step: &str) {
        let index = self.steps.len();
        self.steps.push(StepTiming {
            step: step.to_string(),
            status: StepStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
        });
        self.open_steps.insert(step.to_string(), (index, Instant::now()));
        self.debug(step, "step started", &Value::Null);
    }

    /// Close a step opened with [`Telemetry::start_step`]; returns its duration.
    ///
    /// Ending a step that was never started records a zero-length timing.
    pub fn end_step(&mut self, step: &str, status: StepStatus) -> u64 {
        let duration_ms = match self.open_steps.remove(step) {
            Some((index, started)) => {
                let duration_ms = elapsed_ms(started);
                let timing = &mut self.steps[index];
                timing.status = status;
                timing.ended_at = Some(Utc::now());
                timing.duration_ms = Some(duration_ms);
                duration_ms
            }
            None => {
                let now = Utc::now();
                self.steps.push(StepTiming {
                    step: step.to_string(),
                    status,
                    started_at: now,
                    ended_at: Some(now),
                    duration_ms: Some(0),
                });
                0
            }
        };
        self.debug(
            step,
            "step ended",
            &serde_json::json!({ "status": status, "duration_ms": duration_ms }),
        );
        duration_ms
    }

    pub fn info<T: Serialize + ?Sized>(&mut self, step: &str, message: &str, data: &T) {
        self.record(LogLevel::Info, step, message, data);
    }

    pub fn warn<T: Serialize + ?Sized>(&mut self, step: &str, message: &str, data: &T) {
        self.record(LogLevel::Warn, step, message, data);
    }

    pub fn error<T: Serialize + ?Sized>(&mut self, step: &str, message: &str, data: &T) {
        self.record(LogLevel::Error, step, message, data);
    }

    pub fn debug<T: Serialize + ?Sized>(&mut self, step: &str, message: &str, data: &T) {
        self.record(LogLevel::Debug, step, message, data);
    }

    /// Append an event. Counters track every call, including filtered ones.
    pub fn record<T: Serialize + ?Sized>(
        &mut self,
        level: LogLevel,
        step: &str,
        message: &str,
        data: &T,
    ) {
        match level {
            LogLevel::Error => self.errors += 1,
            LogLevel::Warn => self.warnings += 1,
            _ => {}
        }
        if level < self.config.min_level {
            return;
        }

        let data = match sanitize(data) {
            Some(Value::Null) => None,
            Some(value) => Some(value),
            None => Some(Value::String(UNSERIALIZABLE.to_string())),
        };

        mirror_to_tracing(&self.execution_id, level, step, message, data.as_ref());

        self.events.push(TelemetryEvent {
            seq: self.next_seq,
            level,
            step: step.to_string(),
            message: message.to_string(),
            data,
            timestamp: Utc::now(),
            elapsed_ms: elapsed_ms(self.started),
        });
        self.next_seq += 1;

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }

    /// Recorded events, oldest first
    pub fn events(&self) -> &[TelemetryEvent] {
        &self.events
    }

    /// Events for a single step
    pub fn events_for_step(&self, step: &str) -> Vec<&TelemetryEvent> {
        self.events.iter().filter(|e| e.step == step).collect()
    }

    pub fn step_timings(&self) -> &[StepTiming] {
        &self.steps
    }

    /// Aggregate counts for display
    pub fn summary(&self) -> TelemetrySummary {
        let finished = |s: &&StepTiming| s.status != StepStatus::Running;
        TelemetrySummary {
            execution_id: self.execution_id.clone(),
            started_at: self.started_at,
            total_events: self.events.len(),
            errors: self.errors,
            warnings: self.warnings,
            total_duration_ms: elapsed_ms(self.started),
            steps_executed: self.steps.iter().filter(finished).count(),
            steps_failed: self
                .steps
                .iter()
                .filter(|s| s.status == StepStatus::Failed)
                .count(),
        }
    }

    /// Full timeline
    pub fn export(&self) -> TelemetryExport {
        TelemetryExport {
            summary: self.summary(),
            events: self.events.clone(),
            steps: self.steps.clone(),
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn mirror_to_tracing(
    execution_id: &str,
    level: LogLevel,
    step: &str,
    message: &str,
    data: Option<&Value>,
) {
    let data = data.map(|d| d.to_string()).unwrap_or_default();
    match level {
        LogLevel::Debug => tracing::debug!(execution_id, step, data = %data, "{}", message),
        LogLevel::Info => tracing::info!(execution_id, step, data = %data, "{}", message),
        LogLevel::Warn => tracing::warn!(execution_id, step, data = %data, "{}", message),
        LogLevel::Error => tracing::error!(execution_id, step, data = %data, "{}", message),
    }
}
