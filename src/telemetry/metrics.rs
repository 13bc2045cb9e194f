//! Metric instrument factories for crossjob.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"crossjob"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for crossjob instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("crossjob")
}

/// Counter: job resolutions.
/// Labels: `workflow`, `decision` ("minted" | "reused" | "explicit").
pub fn jobs_resolved() -> Counter<u64> {
    meter()
        .u64_counter("crossjob.jobs.resolved")
        .with_description("Number of job id resolutions")
        .build()
}

/// Counter: saves whose first job id collided and was replaced.
/// Labels: `workflow`.
pub fn guard_remints() -> Counter<u64> {
    meter()
        .u64_counter("crossjob.guard.remints")
        .with_description("Job ids re-resolved by the duplicate-submission guard")
        .build()
}

/// Counter: workflow records saved.
/// Labels: `workflow`.
pub fn records_saved() -> Counter<u64> {
    meter()
        .u64_counter("crossjob.records.saved")
        .with_description("Number of workflow records saved")
        .build()
}

/// Counter: failed per-store reads while merging the job ledger.
/// Labels: `workflow`.
pub fn ledger_read_failures() -> Counter<u64> {
    meter()
        .u64_counter("crossjob.ledger.read_failures")
        .with_description("Job ledger store reads that failed")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("crossjob.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
