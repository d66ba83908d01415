pub mod clock;
pub mod config;
pub mod fs;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod shutdown;
pub mod sla;

use std::sync::Arc;

use config::AppConfig;
use monitor::{MonitorContext, MonitoringOrchestrator, RunError, RunReport};
use notify::MailTransport;
use shutdown::ShutdownGate;

/// Process exit code for a clean run.
pub const EXIT_OK: i32 = 0;
/// Process exit code for an unhandled fatal error.
pub const EXIT_FATAL: i32 = 1;
/// Process exit code when the run was cancelled.
pub const EXIT_CANCELLED: i32 = 2;

/// Run one monitoring day with an explicit transport and shutdown gate.
pub fn run_monitoring(
    config: AppConfig,
    transport: Arc<dyn MailTransport>,
    gate: Arc<ShutdownGate>,
) -> Result<RunReport, RunError> {
    let ctx = Arc::new(MonitorContext::new(config, transport, gate));
    MonitoringOrchestrator::new(ctx).run()
}

/// Map a run result to the process exit code.
pub fn exit_code(result: &Result<RunReport, RunError>) -> i32 {
    match result {
        Ok(_) => EXIT_OK,
        Err(e) => e.exit_code(),
    }
}
