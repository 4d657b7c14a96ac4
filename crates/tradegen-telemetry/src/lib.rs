//! Tradegen Telemetry: leveled events, step timings and redaction
//!
//! One [`Telemetry`] recorder belongs to exactly one pipeline execution.
//! Every payload handed to it goes through [`sanitize`] first, so nothing
//! recorded (or mirrored to `tracing`) can carry credentials.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tradegen_telemetry::{StepStatus, Telemetry};
//!
//! let mut telemetry = Telemetry::new("exec-1");
//! telemetry.start_step("fetch_prices");
//! telemetry.info("fetch_prices", "prices loaded", &json!({ "apiKey": "sk-123", "count": 3 }));
//! telemetry.end_step("fetch_prices", StepStatus::Completed);
//!
//! let summary = telemetry.summary();
//! assert_eq!(summary.steps_executed, 1);
//!
//! let export = telemetry.export();
//! assert!(!serde_json::to_string(&export).unwrap().contains("sk-123"));
//! ```

pub mod event;
pub mod recorder;
pub mod sanitize;

pub use event::{LogLevel, StepStatus, StepTiming, TelemetryEvent};
pub use recorder::{Telemetry, TelemetryConfig, TelemetryExport, TelemetrySummary};
pub use sanitize::{is_sensitive_key, redact_secret, sanitize, REDACTED};
