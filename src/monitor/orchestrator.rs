//! Runs the three location monitors side by side and writes the run report.

use chrono::Utc;
use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use super::context::MonitorContext;
use super::handlers::{CutoffIntake, FormatGatedIntake, PrimaryIntake};
use super::poller::{FileHandler, LocationSpec, WindowPoller, WindowSummary};
use super::report::{write_run_report, ReportError, ReportPaths};
use crate::models::WatchRule;
use crate::shutdown::Cancelled;
use crate::{EXIT_CANCELLED, EXIT_FATAL};

pub const VENDOR_LOCATION: &str = "VendorExtractUtility";
pub const HOLD_LOCATION: &str = "HOLD";
pub const DROP_LOCATION: &str = "DROP";

pub const VENDOR_MISSED_SUBJECT: &str = "Vendor extract file missing";
pub const HOLD_MISSED_SUBJECT: &str = "No X12 files received in HOLD";
pub const DROP_MISSED_SUBJECT: &str = "No X12 files received in DROP before cutoff";

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("{} monitoring task(s) failed: {}", .0.len(), .0.join("; "))]
    Failed(Vec<String>),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Cancelled(_) => EXIT_CANCELLED,
            RunError::Report(_) | RunError::Failed(_) => EXIT_FATAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub processed: usize,
    pub incidents: Vec<String>,
    pub paths: ReportPaths,
}

pub struct MonitoringOrchestrator {
    ctx: Arc<MonitorContext>,
}

impl MonitoringOrchestrator {
    pub fn new(ctx: Arc<MonitorContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<MonitorContext> {
        &self.ctx
    }

    /// The three watched locations derived from configuration.
    pub fn locations(&self) -> [LocationSpec; 3] {
        let config = &self.ctx.config;
        let m = &config.monitoring;
        let stale_after = Duration::from_secs(m.stale_file_minutes * 60);
        let rule = |location: &str, folder: &std::path::Path, pattern: &str, end| WatchRule {
            location: location.to_string(),
            folder: folder.to_path_buf(),
            pattern: pattern.to_string(),
            window_start: m.vendor_window_start,
            window_end: end,
            stale_after,
            interchange_only: false,
            accepted_prefixes: Vec::new(),
        };

        let vendor = WatchRule {
            accepted_prefixes: m.expected_files.clone(),
            ..rule(
                VENDOR_LOCATION,
                &config.folders.vendor_extract,
                &m.vendor_pattern,
                m.vendor_window_end,
            )
        };
        let hold = WatchRule {
            interchange_only: true,
            ..rule(HOLD_LOCATION, &config.folders.hold, &m.hold_pattern, m.hold_window_end)
        };
        let drop = WatchRule {
            interchange_only: true,
            ..rule(DROP_LOCATION, &config.folders.drop, &m.drop_pattern, m.drop_cutoff)
        };

        let email = &config.email;
        [
            LocationSpec {
                rule: vendor,
                alert_recipients: email.it_ops_recipients.clone(),
                missed_subject: VENDOR_MISSED_SUBJECT.to_string(),
            },
            LocationSpec {
                rule: hold,
                alert_recipients: email.internal_recipients.clone(),
                missed_subject: HOLD_MISSED_SUBJECT.to_string(),
            },
            LocationSpec {
                rule: drop,
                alert_recipients: email.internal_recipients.clone(),
                missed_subject: DROP_MISSED_SUBJECT.to_string(),
            },
        ]
    }

    fn spawn_monitor(
        &self,
        spec: LocationSpec,
        handler: Arc<dyn FileHandler>,
    ) -> JoinHandle<Result<WindowSummary, Cancelled>> {
        let ctx = Arc::clone(&self.ctx);
        thread::spawn(move || {
            if let Err(e) = spec.rule.validate() {
                error!("Skipping monitor: {e}");
                return Ok(WindowSummary::default());
            }
            WindowPoller::new(&ctx, &spec).run(handler.as_ref())
        })
    }

    /// Monitor every location until its window closes, then write the run
    /// report. A confirmed shutdown still produces a report before
    /// [`RunError::Cancelled`] is returned. A panicking monitor does not stop
    /// the others; once everything is joined and reported the run fails with
    /// [`RunError::Failed`].
    pub fn run(&self) -> Result<RunReport, RunError> {
        info!("Outbound monitor execution started.");

        let primary = Arc::new(PrimaryIntake::new());
        let [vendor, hold, drop] = self.locations();
        let monitors = vec![
            (VENDOR_LOCATION, self.spawn_monitor(vendor, primary.clone())),
            (HOLD_LOCATION, self.spawn_monitor(hold, Arc::new(FormatGatedIntake))),
            (DROP_LOCATION, self.spawn_monitor(drop, Arc::new(CutoffIntake))),
        ];

        let mut cancelled = false;
        let mut failures = Vec::new();
        for (location, handle) in monitors {
            match handle.join() {
                Ok(Ok(summary)) => info!(
                    "{location}: finished after {} cycle(s), {} file(s) handed off",
                    summary.cycles, summary.handed_off
                ),
                Ok(Err(Cancelled)) => {
                    warn!("{location}: monitor cancelled");
                    cancelled = true;
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("{location}: monitor thread panicked: {message}");
                    failures.push(format!("{location}: {message}"));
                }
            }
        }

        let tasks = self.ctx.tasks.join_all();
        if tasks.cancelled > 0 {
            cancelled = true;
        }
        if tasks.panicked > 0 {
            failures.push(format!("{} downstream task(s) panicked", tasks.panicked));
        }

        let expected = self.ctx.config.monitoring.expected_file_count;
        if !cancelled && primary.accepted() < expected {
            warn!(
                "Expected {expected} vendor file(s), accepted {}",
                primary.accepted()
            );
        }

        let incidents = self.ctx.incidents.snapshot();
        let processed = self.ctx.processed.len();
        let written = write_run_report(
            &self.ctx.config.folders.report_output,
            Utc::now(),
            processed,
            &incidents,
        );

        if cancelled || !failures.is_empty() {
            if let Err(e) = written {
                error!(error = %e, "Report not written after an interrupted run");
            }
            if !failures.is_empty() {
                return Err(RunError::Failed(failures));
            }
            return Err(RunError::Cancelled(Cancelled));
        }

        let paths = written?;
        info!(
            "Outbound monitor execution finished: {processed} processed, {} incident(s).",
            incidents.len()
        );
        Ok(RunReport {
            processed,
            incidents,
            paths,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
