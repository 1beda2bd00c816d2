//! Opt-in per-operation timing (`--timing` or `PARLEY_TIMING=1`).
//!
//! Samples are kept per thread and grouped by operation name when the report
//! is collected. Disabled timing costs one relaxed atomic load per call.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

pub const TIMING_ENV: &str = "PARLEY_TIMING";

thread_local! {
    static SAMPLES: RefCell<BTreeMap<&'static str, Vec<Duration>>> =
        const { RefCell::new(BTreeMap::new()) };
}

static ENABLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimingReport {
    pub operations: Vec<OpTiming>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpTiming {
    pub name: &'static str,
    pub count: usize,
    #[serde(rename = "p50_us", serialize_with = "as_micros")]
    pub p50: Duration,
    #[serde(rename = "p95_us", serialize_with = "as_micros")]
    pub p95: Duration,
    #[serde(rename = "p99_us", serialize_with = "as_micros")]
    pub p99: Duration,
}

#[must_use]
pub fn timing_enabled_from_env() -> bool {
    std::env::var(TIMING_ENV).is_ok_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

pub fn set_timing_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
    if !enabled {
        SAMPLES.with(|samples| samples.borrow_mut().clear());
    }
}

#[must_use]
pub fn is_timing_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Run `f`, recording its duration under `name` when timing is enabled.
pub fn timed<R>(name: &'static str, f: impl FnOnce() -> R) -> R {
    if !is_timing_enabled() {
        return f();
    }
    let started = Instant::now();
    let result = f();
    let elapsed = started.elapsed();
    SAMPLES.with(|samples| samples.borrow_mut().entry(name).or_default().push(elapsed));
    result
}

/// Drain this thread's samples into a report.
#[must_use]
pub fn collect_report() -> TimingReport {
    let grouped = SAMPLES.with(|samples| std::mem::take(&mut *samples.borrow_mut()));
    let operations = grouped
        .into_iter()
        .map(|(name, mut values)| {
            values.sort_unstable();
            OpTiming {
                name,
                count: values.len(),
                p50: percentile(&values, 50),
                p95: percentile(&values, 95),
                p99: percentile(&values, 99),
            }
        })
        .collect();
    TimingReport { operations }
}

impl TimingReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Fixed-width table for stderr.
    #[must_use]
    pub fn display_table(&self) -> String {
        if self.operations.is_empty() {
            return "No timing samples recorded.".to_string();
        }
        let mut out = String::from("operation                    count      p50      p95      p99\n");
        out.push_str(&"-".repeat(62));
        out.push('\n');
        for op in &self.operations {
            let _ = writeln!(
                out,
                "{:<28} {:>6} {:>8} {:>8} {:>8}",
                op.name,
                op.count,
                format_duration(op.p50),
                format_duration(op.p95),
                format_duration(op.p99)
            );
        }
        out
    }
}

/// Nearest-rank percentile over sorted samples.
fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (pct.min(100) * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();
    if micros >= 1_000_000 {
        format!("{}.{:03}s", micros / 1_000_000, (micros % 1_000_000) / 1_000)
    } else if micros >= 1_000 {
        format!("{}.{:03}ms", micros / 1_000, micros % 1_000)
    } else {
        format!("{micros}µs")
    }
}

fn as_micros<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_micros())
}
