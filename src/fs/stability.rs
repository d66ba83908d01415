//! Decides whether a file has finished arriving.

use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::locking::can_open_for_shared_read;
use crate::models::constants::{MIN_STABILITY_SAMPLES, STABILITY_SAMPLE_INTERVAL};
use crate::shutdown::{Cancelled, ShutdownGate};

/// Samples file sizes at a fixed interval until two consecutive samples agree.
#[derive(Debug, Clone, Copy)]
pub struct StabilityProber {
    interval: Duration,
}

impl Default for StabilityProber {
    fn default() -> Self {
        Self::new(STABILITY_SAMPLE_INTERVAL)
    }
}

impl StabilityProber {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of samples a probe may take for a given stability window.
    pub fn sample_budget(min_stable_secs: u64) -> u64 {
        (min_stable_secs / 2).max(MIN_STABILITY_SAMPLES)
    }

    /// `Ok(true)` once two consecutive samples report the same size.
    ///
    /// `Ok(false)` if the file disappears or the sample budget runs out with
    /// the size still changing.
    pub fn probe(
        &self,
        path: &Path,
        min_stable_secs: u64,
        gate: &ShutdownGate,
    ) -> Result<bool, Cancelled> {
        let budget = Self::sample_budget(min_stable_secs);
        let mut previous: Option<u64> = None;

        for sample in 0..budget {
            gate.check()?;
            let size = match fs::metadata(path) {
                Ok(m) => m.len(),
                Err(_) => {
                    debug!("{} vanished during stability probe", path.display());
                    return Ok(false);
                }
            };

            if previous == Some(size) {
                return Ok(true);
            }
            previous = Some(size);

            if sample + 1 < budget {
                gate.sleep(self.interval)?;
            }
        }

        debug!(
            "{} still changing after {budget} samples",
            path.display()
        );
        Ok(false)
    }

    /// Stable and share-readable: the file may be treated as arrived.
    pub fn is_arrived(
        &self,
        path: &Path,
        min_stable_secs: u64,
        gate: &ShutdownGate,
    ) -> Result<bool, Cancelled> {
        Ok(self.probe(path, min_stable_secs, gate)? && can_open_for_shared_read(path))
    }
}
