//! Prometheus counters for pipeline runs
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use tradegen_core::ExecutionContext;

pub struct Metrics {
    registry: Registry,
    executions: IntCounterVec,
    step_failures: IntCounterVec,
    duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let executions = IntCounterVec::new(
            Opts::new("tradegen_executions_total", "Pipeline executions by final status"),
            &["status"],
        )?;
        let step_failures = IntCounterVec::new(
            Opts::new("tradegen_step_failures_total", "Steps that failed after all retries"),
            &["step"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new("tradegen_execution_duration_seconds", "Wall time of pipeline executions")
                .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["provider"],
        )?;
        registry.register(Box::new(executions.clone()))?;
        registry.register(Box::new(step_failures.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        Ok(Self {
            registry,
            executions,
            step_failures,
            duration,
        })
    }

    /// Count one finished execution
    pub fn observe(&self, ctx: &ExecutionContext) {
        let status = serde_json::to_value(ctx.status())
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        self.executions.with_label_values(&[status.as_str()]).inc();
        for step in ctx.failed_steps() {
            self.step_failures.with_label_values(&[step.as_str()]).inc();
        }
        self.duration
            .with_label_values(&[ctx.input().config.ai_provider.as_str()])
            .observe(ctx.duration_ms() as f64 / 1_000.0);
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
