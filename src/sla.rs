//! Processing-time projection against the daily SLA deadline.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::clock::ZonedClock;
use crate::config::SlaConfig;
use crate::models::constants::{
    BYTES_PER_GB, BYTES_PER_MB, MAX_ESTIMATE_HOURS, MIN_ESTIMATE_HOURS,
};
use crate::models::FileArrival;

/// Result of one breach evaluation. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaEstimate {
    pub start: DateTime<Tz>,
    pub estimated_completion: DateTime<Tz>,
    pub deadline: DateTime<Tz>,
}

impl SlaEstimate {
    pub fn is_breach(&self) -> bool {
        self.estimated_completion > self.deadline
    }
}

#[derive(Debug, Clone)]
pub struct SlaEstimator {
    clock: ZonedClock,
    hours_per_gb: f64,
    deadline: NaiveTime,
    large_file_threshold_mb: u64,
}

impl SlaEstimator {
    pub fn new(clock: ZonedClock, config: &SlaConfig) -> Self {
        Self {
            clock,
            hours_per_gb: config.processing_hours_per_gb,
            deadline: config.deadline,
            large_file_threshold_mb: config.large_file_threshold_mb,
        }
    }

    /// Projected hours of processing for a file of `size_bytes`, kept
    /// within `MIN_ESTIMATE_HOURS..=MAX_ESTIMATE_HOURS`.
    pub fn processing_hours(&self, size_bytes: u64) -> f64 {
        let size_gb = size_bytes as f64 / BYTES_PER_GB;
        (size_gb * self.hours_per_gb)
            .max(MIN_ESTIMATE_HOURS)
            .min(MAX_ESTIMATE_HOURS)
    }

    pub fn estimate(&self, start: DateTime<Tz>, size_bytes: u64) -> DateTime<Tz> {
        let millis = (self.processing_hours(size_bytes) * 3_600_000.0).round() as i64;
        start + Duration::milliseconds(millis)
    }

    /// The deadline on the zone-local date of `start`.
    pub fn deadline_for(&self, start: DateTime<Tz>) -> DateTime<Tz> {
        self.clock.at(start.date_naive(), self.deadline)
    }

    pub fn evaluate(&self, start_utc: DateTime<Utc>, file: &FileArrival) -> SlaEstimate {
        let start = self.clock.to_zone(start_utc);
        SlaEstimate {
            start,
            estimated_completion: self.estimate(start, file.size_bytes),
            deadline: self.deadline_for(start),
        }
    }

    pub fn is_large(&self, size_bytes: u64) -> bool {
        size_bytes as f64 / BYTES_PER_MB > self.large_file_threshold_mb as f64
    }
}
