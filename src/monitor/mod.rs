//! Monitoring engine: per-location pollers, their handlers, and the
//! orchestrator that runs them for one day.

mod context;
pub mod handlers;
pub mod orchestrator;
pub mod poller;
pub mod report;
pub mod state;


pub use context::MonitorContext;
pub use handlers::{CutoffIntake, DownstreamOutcome, DownstreamWait, FormatGatedIntake, PrimaryIntake};
pub use orchestrator::{MonitoringOrchestrator, RunError, RunReport};
pub use poller::{FileHandler, LocationSpec, WindowPoller, WindowSummary};
pub use report::{write_run_report, ReportError, ReportPaths};
pub use state::{IncidentLog, ProcessedSet, TaskOutcome, TaskSet};
