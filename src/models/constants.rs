use std::time::Duration;

/// Interval between size samples while probing a file for stability.
pub const STABILITY_SAMPLE_INTERVAL: Duration = Duration::from_secs(2);

/// Minimum number of size samples taken by a stability probe.
pub const MIN_STABILITY_SAMPLES: u64 = 2;

/// Floor applied to every SLA processing estimate, in hours.
/// Keeps tiny files from producing a zero-length estimate.
pub const MIN_ESTIMATE_HOURS: f64 = 0.01;

/// Ceiling applied to every SLA processing estimate, in hours (one year).
pub const MAX_ESTIMATE_HOURS: f64 = 24.0 * 366.0;

/// Largest accepted `processing_hours_per_gb`.
pub const MAX_HOURS_PER_GB: f64 = 1000.0;

/// Bytes per gigabyte used by the SLA estimator.
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Bytes per megabyte for human-readable sizes and the large-file threshold.
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Report file name prefixes; the date (`YYYYMMDD`) and `.log` are appended.
pub mod reports {
    pub const SUMMARY_PREFIX: &str = "ExecutionSummary_";
    pub const INCIDENT_PREFIX: &str = "IncidentReport_";

    /// Written to the incident report when the run recorded nothing.
    pub const NO_INCIDENTS_LINE: &str = "No incidents.";
}
