//! Alert delivery with recipient cleanup and bounded retries.

pub mod retry;
pub mod transport;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::shutdown::{Cancelled, ShutdownGate};
use retry::{run_with_retry, RetryError};

pub use transport::{CurlSmtpTransport, LogTransport, MailMessage, MailTransport, TransportError};

/// Every attempt failed.
#[derive(Debug, Error)]
#[error("delivery of '{subject}' failed after {attempts} attempt(s): {source}")]
pub struct DeliveryError {
    pub subject: String,
    pub attempts: u32,
    #[source]
    pub source: TransportError,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent { attempts: u32 },
    /// No usable recipients; nothing was attempted.
    Skipped,
}

/// Called for every failed attempt that will be retried.
pub type RetryObserver = Box<dyn Fn(&str, &TransportError, u32) + Send + Sync>;

pub struct Notifier {
    transport: Arc<dyn MailTransport>,
    sender: String,
    retry_count: u32,
    retry_delay: Duration,
    observer: RetryObserver,
}

impl Notifier {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        sender: impl Into<String>,
        retry_count: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            transport,
            sender: sender.into(),
            retry_count,
            retry_delay,
            observer: Box::new(|subject: &str, e: &TransportError, attempt: u32| {
                warn!("Email send failed for '{subject}' (attempt {attempt}): {e}");
            }),
        }
    }

    pub fn from_config(config: &EmailConfig, transport: Arc<dyn MailTransport>) -> Self {
        Self::new(
            transport,
            config.sender.clone(),
            config.retry_count,
            config.retry_delay(),
        )
    }

    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Send `subject`/`body` to `recipients`.
    ///
    /// Blank and duplicate recipients are dropped first; an empty result is a
    /// logged no-op.
    pub fn notify(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        gate: &ShutdownGate,
    ) -> Result<NotifyOutcome, NotifyError> {
        let to = clean_recipients(recipients);
        if to.is_empty() {
            warn!("Email skipped (no recipients) for subject: {subject}");
            return Ok(NotifyOutcome::Skipped);
        }

        let message = MailMessage {
            from: self.sender.clone(),
            to,
            subject: subject.to_string(),
            body: body.to_string(),
        };

        let sent = run_with_retry(
            self.retry_count,
            self.retry_delay,
            gate,
            |attempt| self.transport.send(&message, gate).map(|()| attempt),
            |e, attempt| {
                if !matches!(e, TransportError::Cancelled(_)) {
                    (self.observer)(subject, e, attempt)
                }
            },
        );

        match sent {
            Ok(attempts) => {
                info!("Email sent: {subject} -> {}", message.to.join(","));
                Ok(NotifyOutcome::Sent { attempts })
            }
            Err(RetryError::Cancelled(c))
            | Err(RetryError::Exhausted {
                last: TransportError::Cancelled(c),
                ..
            }) => Err(c.into()),
            Err(RetryError::Exhausted { attempts, last }) => Err(DeliveryError {
                subject: subject.to_string(),
                attempts,
                source: last,
            }
            .into()),
        }
    }
}

/// Trim, drop blanks, and de-duplicate (case-insensitively) keeping first
/// occurrence order.
pub fn clean_recipients(recipients: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    recipients
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .filter(|r| seen.insert(r.to_lowercase()))
        .map(String::from)
        .collect()
}
