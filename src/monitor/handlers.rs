//! Business rules layered on top of the generic window poller.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::context::MonitorContext;
use super::poller::FileHandler;
use crate::models::{FileArrival, WatchRule};
use crate::shutdown::Cancelled;

/// Log an accepted file and flag it when it is large enough to threaten the SLA.
pub fn log_processing(ctx: &MonitorContext, team: &str, arrival: &FileArrival) {
    info!(
        "Processing [{team}] file {} ({:.2} MB).",
        arrival.name,
        arrival.size_mb()
    );
    if ctx.sla.is_large(arrival.size_bytes) {
        warn!(
            "Large file {} ({:.2} MB) exceeds the {} MB threshold",
            arrival.name,
            arrival.size_mb(),
            ctx.config.sla.large_file_threshold_mb
        );
    }
}

/// Primary intake: vendor extracts with an expected name prefix.
///
/// Accepted files are announced to IT-Ops and then followed into the
/// downstream folder on a separate task.
#[derive(Debug, Default)]
pub struct PrimaryIntake {
    accepted: AtomicUsize,
}

impl PrimaryIntake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl FileHandler for PrimaryIntake {
    fn handle(
        &self,
        ctx: &Arc<MonitorContext>,
        rule: &WatchRule,
        arrival: FileArrival,
    ) -> Result<(), Cancelled> {
        if !rule.accepts_name(&arrival.name) {
            warn!("Unexpected vendor file ignored: {}", arrival.name);
            return Ok(());
        }

        self.accepted.fetch_add(1, Ordering::SeqCst);
        log_processing(ctx, "IT-OPS", &arrival);
        ctx.alert(
            &ctx.config.email.it_ops_recipients,
            &format!("Vendor file received: {}", arrival.name),
            &format!(
                "{} arrived in {} ({:.2} MB).",
                arrival.name,
                rule.location,
                arrival.size_mb()
            ),
        )?;

        let wait = DownstreamWait::from_context(ctx, arrival.name.clone());
        let task_ctx = Arc::clone(ctx);
        ctx.tasks.spawn(format!("downstream-{}", arrival.name), move || {
            wait.run(&task_ctx)
        });
        Ok(())
    }
}

/// Waits for an accepted vendor file to reappear downstream, then checks
/// whether its processing can finish before the SLA deadline.
#[derive(Debug, Clone)]
pub struct DownstreamWait {
    pub file_name: String,
    pub folder: PathBuf,
}

/// How a downstream wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownstreamOutcome {
    OnTrack,
    SlaBreach,
    Missing,
}

impl DownstreamWait {
    pub fn from_context(ctx: &MonitorContext, file_name: String) -> Self {
        Self {
            file_name,
            folder: ctx.config.folders.proprietary.clone(),
        }
    }

    pub fn run(&self, ctx: &MonitorContext) -> Result<(), Cancelled> {
        self.wait(ctx).map(|_| ())
    }

    pub fn wait(&self, ctx: &MonitorContext) -> Result<DownstreamOutcome, Cancelled> {
        let deadline = ctx.clock.today_at(ctx.config.monitoring.vendor_window_end);
        let path = self.folder.join(&self.file_name);
        info!(
            "Monitoring proprietary for {} until {}",
            self.file_name,
            deadline.format("%Y-%m-%d %H:%M:%S")
        );

        while ctx.clock.now() <= deadline {
            ctx.gate.check()?;
            if path.is_file() {
                match FileArrival::capture(&path) {
                    Ok(arrival) => return self.evaluate(ctx, &arrival),
                    Err(e) => {
                        error!(error = %e, "Proprietary monitoring error for {}", self.file_name)
                    }
                }
            }
            ctx.gate.sleep(ctx.config.runtime.poll_interval())?;
        }

        let email = &ctx.config.email;
        ctx.alert(
            &email.internal_recipients,
            "Proprietary file missing",
            &format!("File not moved to proprietary folder: {}", self.file_name),
        )?;
        ctx.incidents
            .record(format!("Proprietary missing: {}", self.file_name));
        Ok(DownstreamOutcome::Missing)
    }

    fn evaluate(
        &self,
        ctx: &MonitorContext,
        arrival: &FileArrival,
    ) -> Result<DownstreamOutcome, Cancelled> {
        log_processing(ctx, "INTERNAL", arrival);

        let estimate = ctx.sla.evaluate(Utc::now(), arrival);
        if !estimate.is_breach() {
            info!(
                "{} on track: estimated completion {} within SLA {}",
                arrival.name,
                estimate.estimated_completion.format("%H:%M"),
                estimate.deadline.format("%H:%M")
            );
            return Ok(DownstreamOutcome::OnTrack);
        }

        let zone = ctx.clock.tz().name();
        let subject = format!("[INCIDENT] SLA breach risk for {}", arrival.name);
        let body = format!(
            "Estimated completion {} {zone} exceeds SLA {} {zone}.",
            estimate.estimated_completion.format("%H:%M"),
            estimate.deadline.format("%H:%M")
        );
        warn!("{subject}: {body}");

        let email = &ctx.config.email;
        ctx.alert(&email.internal_recipients, &subject, &body)?;
        ctx.alert(&email.client_recipients, "[NOTICE] Processing delay", &body)?;
        ctx.incidents.record(format!("{subject} {body}"));
        Ok(DownstreamOutcome::SlaBreach)
    }
}

/// HOLD intake: interchange files modified today, logged for the internal team.
#[derive(Debug, Default)]
pub struct FormatGatedIntake;

impl FileHandler for FormatGatedIntake {
    fn handle(
        &self,
        ctx: &Arc<MonitorContext>,
        rule: &WatchRule,
        arrival: FileArrival,
    ) -> Result<(), Cancelled> {
        if rule.interchange_only && !arrival.is_interchange {
            warn!("{} file rejected (non-X12): {}", rule.location, arrival.name);
            return Ok(());
        }

        let today = ctx.clock.now().date_naive();
        if ctx.clock.to_zone(arrival.modified).date_naive() != today {
            warn!("{} file ignored (not today): {}", rule.location, arrival.name);
            return Ok(());
        }

        log_processing(ctx, "INTERNAL", &arrival);
        Ok(())
    }
}

/// DROP intake: interchange files before the cutoff, announced internally.
#[derive(Debug, Default)]
pub struct CutoffIntake;

impl FileHandler for CutoffIntake {
    fn handle(
        &self,
        ctx: &Arc<MonitorContext>,
        rule: &WatchRule,
        arrival: FileArrival,
    ) -> Result<(), Cancelled> {
        if rule.interchange_only && !arrival.is_interchange {
            return Ok(());
        }

        let zone = ctx.clock.tz().name();
        let message = format!(
            "{} received: Name={}, SizeMB={:.2}, Modified={} {zone}",
            rule.location,
            arrival.name,
            arrival.size_mb(),
            ctx.clock
                .to_zone(arrival.modified)
                .format("%Y-%m-%d %H:%M:%S")
        );
        info!("{message}");
        log_processing(ctx, "INTERNAL", &arrival);
        ctx.alert(
            &ctx.config.email.internal_recipients,
            &format!("{} file received: {}", rule.location, arrival.name),
            &message,
        )
    }
}
