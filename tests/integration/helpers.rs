//! Shared fixtures for end-to-end monitoring runs

use chrono::{Duration as ChronoDuration, NaiveTime, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use outbound_monitor::config::AppConfig;
use outbound_monitor::fs::StabilityProber;
use outbound_monitor::monitor::{MonitorContext, MonitoringOrchestrator};
use outbound_monitor::notify::{MailMessage, MailTransport, TransportError};
use outbound_monitor::shutdown::ShutdownGate;

pub const IT_OPS: &str = "itops@example.com";
pub const INTERNAL: &str = "internal@example.com";
pub const CLIENT: &str = "client@example.com";

/// Captures every message instead of sending it.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingTransport {
    pub fn messages(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<MailMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.to.iter().any(|to| to == recipient))
            .collect()
    }
}

impl MailTransport for RecordingTransport {
    fn send(&self, message: &MailMessage, _gate: &ShutdownGate) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Window bounds relative to now in UTC, or `None` when they would cross
/// midnight and the run would be spread over two days.
pub fn window(start_offset_secs: i64, end_offset_secs: i64) -> Option<(NaiveTime, NaiveTime)> {
    let now = Utc::now();
    let start = now + ChronoDuration::seconds(start_offset_secs);
    let end = now + ChronoDuration::seconds(end_offset_secs);
    if start.date_naive() != now.date_naive() || end.date_naive() != now.date_naive() {
        return None;
    }
    Some((start.time(), end.time()))
}

/// A UTC config rooted in `root` with every window spanning `start..end`.
pub fn day_config(root: &Path, start: NaiveTime, end: NaiveTime) -> AppConfig {
    let mut config = AppConfig::default();
    config.folders.vendor_extract = root.join("vendor");
    config.folders.proprietary = root.join("proprietary");
    config.folders.hold = root.join("hold");
    config.folders.drop = root.join("drop");
    config.folders.report_output = root.join("reports");

    config.runtime.time_zone = "UTC".to_string();
    config.runtime.poll_interval_secs = 1;
    config.runtime.partial_file_stable_secs = 2;
    config.runtime.retry_count = 1;

    config.email.sender = "monitor@example.com".to_string();
    config.email.it_ops_recipients = vec![IT_OPS.to_string()];
    config.email.internal_recipients = vec![INTERNAL.to_string()];
    config.email.client_recipients = vec![CLIENT.to_string()];
    config.email.retry_count = 1;

    config.monitoring.expected_file_count = 1;
    config.monitoring.expected_files = vec!["C".to_string(), "Pend_C".to_string()];
    config.monitoring.vendor_window_start = start;
    config.monitoring.vendor_window_end = end;
    config.monitoring.hold_window_end = end;
    config.monitoring.drop_cutoff = end;

    config.validate().expect("test config should validate");
    config.ensure_folders().expect("Failed to create test folders");
    config
}

/// Records every message except those with `subject`, which panic.
pub struct PanicOnSubject {
    pub subject: String,
    pub inner: RecordingTransport,
}

impl MailTransport for PanicOnSubject {
    fn send(&self, message: &MailMessage, gate: &ShutdownGate) -> Result<(), TransportError> {
        if message.subject == self.subject {
            panic!("transport failure for '{}'", message.subject);
        }
        self.inner.send(message, gate)
    }
}

/// Orchestrator wired to `transport` and a fast prober.
pub fn orchestrator_with(
    config: AppConfig,
    gate: Arc<ShutdownGate>,
    transport: Arc<dyn MailTransport>,
) -> MonitoringOrchestrator {
    let ctx = MonitorContext::new(config, transport, gate)
        .with_prober(StabilityProber::new(Duration::from_millis(50)));
    MonitoringOrchestrator::new(Arc::new(ctx))
}

/// Orchestrator wired to a recording transport and a fast prober.
pub fn orchestrator(
    config: AppConfig,
    gate: Arc<ShutdownGate>,
) -> (MonitoringOrchestrator, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    (orchestrator_with(config, gate, transport.clone()), transport)
}
