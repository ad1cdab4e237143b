// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The history logger: the sink captured task stdout/stderr is forwarded
//! to, one line at a time, timestamped in the owning context's time zone.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Which stream a history line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryLevel {
    Stdout,
    Stderr,
}

/// Sink for a running task's captured output. The daemon wires this to a
/// file or to `tracing`; tests can wire it to a recording fake.
pub trait HistoryLogger: Send + Sync + 'static {
    fn log(&self, task: &str, level: HistoryLevel, line: &str, timestamp_ms: u64, time_zone: &str);
}

pub type SharedHistoryLogger = Arc<dyn HistoryLogger>;

/// `Arc<dyn HistoryLogger>` does not implement `Debug` on its own; this
/// newtype gives `ContextState` a `Debug` impl without requiring every
/// implementation to carry one.
#[derive(Clone)]
pub struct HistorySink(pub SharedHistoryLogger);

impl std::fmt::Debug for HistorySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HistorySink")
    }
}

impl HistorySink {
    pub fn new(logger: impl HistoryLogger) -> Self {
        Self(Arc::new(logger))
    }

    pub fn log(&self, task: &str, level: HistoryLevel, line: &str, timestamp_ms: u64, time_zone: &str) {
        self.0.log(task, level, line, timestamp_ms, time_zone);
    }
}

impl Default for HistorySink {
    fn default() -> Self {
        Self::new(TracingHistoryLogger)
    }
}

/// Forwards every line to `tracing`, with the timestamp formatted in the
/// given zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHistoryLogger;

impl HistoryLogger for TracingHistoryLogger {
    fn log(&self, task: &str, level: HistoryLevel, line: &str, timestamp_ms: u64, time_zone: &str) {
        let stamp = format_zoned(timestamp_ms, time_zone);
        match level {
            HistoryLevel::Stdout => tracing::info!(task, timestamp = %stamp, "{line}"),
            HistoryLevel::Stderr => tracing::warn!(task, timestamp = %stamp, "{line}"),
        }
    }
}

/// Format `timestamp_ms` (milliseconds since the Unix epoch) in `time_zone`
/// (an IANA zone name, e.g. `"America/New_York"`), falling back to UTC when
/// the name is not recognized.
pub fn format_zoned(timestamp_ms: u64, time_zone: &str) -> String {
    let utc = DateTime::<Utc>::from_timestamp_millis(timestamp_ms as i64).unwrap_or_default();
    match time_zone.parse::<Tz>() {
        Ok(tz) => utc.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S%.3f %Z").to_string(),
        Err(_) => utc.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
