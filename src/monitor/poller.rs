//! Window-gated polling of one watched location.
//!
//! A poller walks through three phases on a single thread:
//! 1. wait until the window opens,
//! 2. scan the folder once per poll interval until the window closes,
//! 3. re-list the folder and raise a "nothing arrived" incident when no
//!    matching file was modified today.
//!
//! The closing check is scan-based and ignores the processed set, so a file
//! that was handled and then removed before the window closed is reported
//! as missing.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::context::MonitorContext;
use crate::fs::{list_matching, ScannedFile};
use crate::models::{FileArrival, WatchRule};
use crate::notify::retry::{run_with_retry, RetryError};
use crate::shutdown::Cancelled;

/// Location-specific handling of a file that has passed the stability gate.
pub trait FileHandler: Send + Sync {
    fn handle(
        &self,
        ctx: &Arc<MonitorContext>,
        rule: &WatchRule,
        arrival: FileArrival,
    ) -> Result<(), Cancelled>;
}

/// A watched location: its rule plus where "nothing arrived" alerts go.
#[derive(Debug, Clone)]
pub struct LocationSpec {
    pub rule: WatchRule,
    pub alert_recipients: Vec<String>,
    pub missed_subject: String,
}

/// What happened during one window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WindowSummary {
    pub cycles: u32,
    pub handed_off: usize,
    pub missing_reported: bool,
}

enum CycleError {
    Cancelled,
    Io(io::Error),
}

impl From<Cancelled> for CycleError {
    fn from(_: Cancelled) -> Self {
        CycleError::Cancelled
    }
}

pub struct WindowPoller<'a> {
    ctx: &'a Arc<MonitorContext>,
    spec: &'a LocationSpec,
    stale_alerted: HashSet<PathBuf>,
}

impl<'a> WindowPoller<'a> {
    pub fn new(ctx: &'a Arc<MonitorContext>, spec: &'a LocationSpec) -> Self {
        Self {
            ctx,
            spec,
            stale_alerted: HashSet::new(),
        }
    }

    fn rule(&self) -> &WatchRule {
        &self.spec.rule
    }

    pub fn run(&mut self, handler: &dyn FileHandler) -> Result<WindowSummary, Cancelled> {
        let clock = self.ctx.clock;
        let location = self.rule().location.clone();
        let now = clock.now();
        let start = clock.at(now.date_naive(), self.rule().window_start);
        let end = clock.at(now.date_naive(), self.rule().window_end);

        if now < start {
            let wait = (start - now).to_std().unwrap_or_default();
            info!("{location}: waiting for window start ({}s).", wait.as_secs());
            self.ctx.gate.sleep(wait)?;
        }

        info!(
            "{location}: window open until {}",
            end.format("%Y-%m-%d %H:%M:%S %Z")
        );

        let mut summary = WindowSummary::default();
        while clock.now() <= end {
            self.ctx.gate.check()?;
            summary.cycles += 1;
            match self.scan_cycle(handler) {
                Ok(handed) => summary.handed_off += handed,
                Err(CycleError::Cancelled) => return Err(Cancelled),
                Err(CycleError::Io(e)) => {
                    error!(error = %e, "I/O monitoring issue ({location}).");
                }
            }

            let remaining = (end - clock.now()).to_std().unwrap_or_default();
            self.ctx
                .gate
                .sleep(remaining.min(self.ctx.config.runtime.poll_interval()))?;
        }

        summary.missing_reported = self.evaluate_window_close()?;
        Ok(summary)
    }

    /// List the folder, retrying transient failures per runtime settings.
    fn list(&self) -> Result<Vec<ScannedFile>, CycleError> {
        let runtime = &self.ctx.config.runtime;
        let rule = self.rule();
        run_with_retry(
            runtime.retry_count,
            runtime.retry_delay(),
            &self.ctx.gate,
            |_| list_matching(&rule.folder, &rule.pattern),
            |e, attempt| {
                warn!(
                    "{}: listing {} failed (attempt {attempt}): {e}",
                    rule.location,
                    rule.folder.display()
                )
            },
        )
        .map_err(|e| match e {
            RetryError::Cancelled(_) => CycleError::Cancelled,
            RetryError::Exhausted { last, .. } => CycleError::Io(last),
        })
    }

    fn scan_cycle(&mut self, handler: &dyn FileHandler) -> Result<usize, CycleError> {
        let files = self.list()?;
        let mut handed = 0;

        for file in files {
            if self.ctx.processed.contains(&file.path) {
                continue;
            }

            if self.is_stale(&file, Utc::now()) && self.stale_alerted.insert(file.path.clone()) {
                self.raise_stale(&file)?;
            }

            let stable_secs = self.ctx.config.runtime.partial_file_stable_secs;
            if !self
                .ctx
                .prober
                .is_arrived(&file.path, stable_secs, &self.ctx.gate)?
            {
                warn!("File still unstable or locked: {}", file.path.display());
                continue;
            }

            let arrival = match FileArrival::capture(&file.path) {
                Ok(arrival) => arrival,
                Err(e) => {
                    warn!("File vanished before capture: {} ({e})", file.path.display());
                    continue;
                }
            };

            if !self.ctx.processed.try_claim(&arrival.path) {
                debug!("{} already claimed elsewhere", arrival.path.display());
                continue;
            }

            handed += 1;
            handler.handle(self.ctx, self.rule(), arrival)?;
        }

        Ok(handed)
    }

    fn is_stale(&self, file: &ScannedFile, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.rule().stale_after) {
            Ok(threshold) => file.modified < now - threshold,
            Err(_) => false,
        }
    }

    fn raise_stale(&self, file: &ScannedFile) -> Result<(), Cancelled> {
        let rule = self.rule();
        let minutes = rule.stale_after.as_secs() / 60;
        let subject = format!("Stale file in {}", rule.location);
        let body = format!("{} has been idle for > {minutes} minutes", file.name);
        warn!("{subject}: {body}");
        self.ctx.incidents.record(format!("{subject}: {body}"));
        self.ctx.alert(&self.spec.alert_recipients, &subject, &body)
    }

    /// Returns true when a "nothing arrived" incident was raised.
    fn evaluate_window_close(&self) -> Result<bool, Cancelled> {
        let rule = self.rule();
        let today = self.ctx.clock.now().date_naive();
        let found = match list_matching(&rule.folder, &rule.pattern) {
            Ok(files) => files
                .iter()
                .any(|f| modified_in_zone(self.ctx, f).date_naive() == today),
            Err(e) => {
                error!(error = %e, "{}: closing scan failed", rule.location);
                false
            }
        };

        if found {
            info!("{}: window closed.", rule.location);
            return Ok(false);
        }

        let body = format!(
            "No eligible files arrived in {} during configured window.",
            rule.location
        );
        warn!("{}: {body}", self.spec.missed_subject);
        self.ctx.incidents.record(self.spec.missed_subject.clone());
        self.ctx
            .alert(&self.spec.alert_recipients, &self.spec.missed_subject, &body)?;
        Ok(true)
    }
}

fn modified_in_zone(ctx: &MonitorContext, file: &ScannedFile) -> DateTime<Tz> {
    ctx.clock.to_zone(file.modified)
}
