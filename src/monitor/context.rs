//! Everything a location thread needs, shared behind one `Arc`.

use std::sync::Arc;
use tracing::error;

use super::state::{IncidentLog, ProcessedSet, TaskSet};
use crate::clock::{resolve_time_zone, ZonedClock};
use crate::config::AppConfig;
use crate::fs::StabilityProber;
use crate::notify::{MailTransport, NotifyError, Notifier};
use crate::shutdown::{Cancelled, ShutdownGate};
use crate::sla::SlaEstimator;

pub struct MonitorContext {
    pub config: AppConfig,
    pub clock: ZonedClock,
    pub notifier: Notifier,
    pub sla: SlaEstimator,
    pub prober: StabilityProber,
    pub gate: Arc<ShutdownGate>,
    pub processed: ProcessedSet,
    pub incidents: IncidentLog,
    pub tasks: TaskSet,
}

impl MonitorContext {
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn MailTransport>,
        gate: Arc<ShutdownGate>,
    ) -> Self {
        let clock = ZonedClock::new(resolve_time_zone(&config.runtime.time_zone));
        Self {
            notifier: Notifier::from_config(&config.email, transport),
            sla: SlaEstimator::new(clock, &config.sla),
            prober: StabilityProber::default(),
            processed: ProcessedSet::new(),
            incidents: IncidentLog::new(),
            tasks: TaskSet::new(),
            clock,
            config,
            gate,
        }
    }

    pub fn with_prober(mut self, prober: StabilityProber) -> Self {
        self.prober = prober;
        self
    }

    /// Send an alert; delivery failures are logged and swallowed so that
    /// monitoring carries on. Only cancellation propagates.
    pub fn alert(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), Cancelled> {
        match self.notifier.notify(recipients, subject, body, &self.gate) {
            Ok(_) => Ok(()),
            Err(NotifyError::Cancelled(c)) => Err(c),
            Err(NotifyError::Delivery(e)) => {
                error!(error = %e, "Alert delivery failed");
                Ok(())
            }
        }
    }
}
