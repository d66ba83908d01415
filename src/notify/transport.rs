//! Mail transports: the single place a message actually leaves the process.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};
use wait_timeout::ChildExt;

use crate::config::EmailConfig;
use crate::shutdown::{Cancelled, ShutdownGate};

/// Longest a running mail command goes without a shutdown check.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    /// Plain-text RFC 5322 rendering used as the SMTP payload.
    pub fn to_rfc5322(&self) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
            self.from,
            self.to.join(", "),
            self.subject,
            self.body.replace('\n', "\r\n")
        )
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to launch mail command: {0}")]
    Spawn(#[source] io::Error),
    #[error("mail command timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    #[error("mail command exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Delivers one message to an already validated, non-empty recipient list.
///
/// Implementations that block must give up with
/// [`TransportError::Cancelled`] soon after `gate` is confirmed.
pub trait MailTransport: Send + Sync {
    fn send(&self, message: &MailMessage, gate: &ShutdownGate) -> Result<(), TransportError>;
}

/// Pick a transport from config: SMTP via curl when a host is configured,
/// otherwise log-only.
pub fn from_config(config: &EmailConfig) -> Box<dyn MailTransport> {
    if config.smtp_host.trim().is_empty() {
        Box::new(LogTransport)
    } else {
        Box::new(CurlSmtpTransport::from_config(config))
    }
}

/// Sends through `curl`'s SMTP client.
#[derive(Debug, Clone)]
pub struct CurlSmtpTransport {
    url: String,
    require_tls: bool,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

impl CurlSmtpTransport {
    pub fn from_config(config: &EmailConfig) -> Self {
        let credentials = (!config.username.trim().is_empty())
            .then(|| (config.username.clone(), config.password.clone()));
        Self {
            url: format!("smtp://{}:{}", config.smtp_host.trim(), config.smtp_port),
            require_tls: config.enable_tls,
            credentials,
            timeout: config.command_timeout(),
        }
    }

    fn command(&self, message: &MailMessage) -> Command {
        let mut cmd = Command::new("curl");
        cmd.args(["--silent", "--show-error", "--url", self.url.as_str()])
            .args(["--mail-from", message.from.as_str()]);
        for rcpt in &message.to {
            cmd.args(["--mail-rcpt", rcpt.as_str()]);
        }
        if self.require_tls {
            cmd.arg("--ssl-reqd");
        }
        if let Some((user, password)) = &self.credentials {
            cmd.arg("--user").arg(format!("{user}:{password}"));
        }
        cmd.args(["--upload-file", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl MailTransport for CurlSmtpTransport {
    fn send(&self, message: &MailMessage, gate: &ShutdownGate) -> Result<(), TransportError> {
        gate.check()?;
        let mut child = self.command(message).spawn().map_err(TransportError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.to_rfc5322().as_bytes())
                .map_err(TransportError::Spawn)?;
        }

        let status = wait_cancellable(&mut child, self.timeout, gate)?;
        if status.success() {
            return Ok(());
        }

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        Err(TransportError::Failed {
            code: status.code(),
            stderr: stderr.trim().to_string(),
        })
    }
}

/// Wait for `child` in short slices, killing it on timeout or on a
/// confirmed shutdown.
fn wait_cancellable(
    child: &mut Child,
    timeout: Duration,
    gate: &ShutdownGate,
) -> Result<ExitStatus, TransportError> {
    let started = Instant::now();
    loop {
        if gate.is_cancelled() {
            warn!("Mail command interrupted by shutdown");
            let _ = child.kill();
            let _ = child.wait();
            return Err(Cancelled.into());
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TransportError::TimedOut(timeout));
        }

        let slice = CANCEL_CHECK_INTERVAL.min(timeout - elapsed);
        if let Some(status) = child.wait_timeout(slice).map_err(TransportError::Spawn)? {
            return Ok(status);
        }
    }
}

/// Dry-run transport: records the message in the log and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl MailTransport for LogTransport {
    fn send(&self, message: &MailMessage, _gate: &ShutdownGate) -> Result<(), TransportError> {
        info!(
            to = %message.to.join(","),
            "Notification (no SMTP host configured): {} | {}",
            message.subject,
            message.body
        );
        Ok(())
    }
}
