//! Daily execution summary and incident report files.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::fs::locked_write;
use crate::models::constants::reports::{INCIDENT_PREFIX, NO_INCIDENTS_LINE, SUMMARY_PREFIX};

#[derive(Debug, Error)]
#[error("failed to write report {}: {source}", path.display())]
pub struct ReportError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub summary: PathBuf,
    pub incidents: PathBuf,
}

pub fn summary_path(dir: &Path, at: DateTime<Utc>) -> PathBuf {
    dir.join(format!("{SUMMARY_PREFIX}{}.log", at.format("%Y%m%d")))
}

pub fn incident_path(dir: &Path, at: DateTime<Utc>) -> PathBuf {
    dir.join(format!("{INCIDENT_PREFIX}{}.log", at.format("%Y%m%d")))
}

pub fn render_summary(finished: DateTime<Utc>, processed: usize, incidents: usize) -> String {
    format!(
        "Execution ended UTC: {}\nProcessed files count: {processed}\nIncident count: {incidents}\n",
        finished.to_rfc3339_opts(SecondsFormat::Micros, true)
    )
}

pub fn render_incidents(incidents: &[String]) -> String {
    if incidents.is_empty() {
        return format!("{NO_INCIDENTS_LINE}\n");
    }
    let mut out = String::new();
    for incident in incidents {
        // One incident per line
        out.push_str(&incident.replace(['\r', '\n'], " "));
        out.push('\n');
    }
    out
}

/// Write both report files into `dir`, creating it if needed.
pub fn write_run_report(
    dir: &Path,
    finished: DateTime<Utc>,
    processed: usize,
    incidents: &[String],
) -> Result<ReportPaths, ReportError> {
    fs::create_dir_all(dir).map_err(|source| ReportError {
        path: dir.to_path_buf(),
        source,
    })?;

    let paths = ReportPaths {
        summary: summary_path(dir, finished),
        incidents: incident_path(dir, finished),
    };

    let write = |path: &Path, content: String| {
        locked_write(path, &content).map_err(|source| ReportError {
            path: path.to_path_buf(),
            source,
        })
    };
    write(
        &paths.summary,
        render_summary(finished, processed, incidents.len()),
    )?;
    write(&paths.incidents, render_incidents(incidents))?;

    Ok(paths)
}
