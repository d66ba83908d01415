//! End-to-end monitoring days against temporary folders

use std::fs::{self, File};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{NaiveTime, Utc};
use serial_test::serial;
use tempfile::TempDir;

use outbound_monitor::monitor::orchestrator::{
    DROP_MISSED_SUBJECT, HOLD_MISSED_SUBJECT, VENDOR_MISSED_SUBJECT,
};
use outbound_monitor::monitor::report::summary_path;
use outbound_monitor::monitor::RunError;
use outbound_monitor::shutdown::{GateState, ShutdownGate};
use outbound_monitor::{exit_code, EXIT_CANCELLED, EXIT_FATAL, EXIT_OK};

use super::helpers::{
    day_config, orchestrator, orchestrator_with, window, PanicOnSubject, RecordingTransport,
    CLIENT, INTERNAL, IT_OPS,
};

const GB: u64 = 1024 * 1024 * 1024;

fn last_second() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap()
}

#[test]
#[serial]
fn test_empty_day_reports_each_location_missing_once() {
    let Some((start, end)) = window(-1, 3) else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let config = day_config(temp.path(), start, end);
    let (orchestrator, transport) = orchestrator(config, Arc::new(ShutdownGate::new()));

    let result = orchestrator.run();
    assert_eq!(exit_code(&result), EXIT_OK);
    let report = result.unwrap();

    let mut incidents = report.incidents.clone();
    incidents.sort();
    let mut expected = vec![
        DROP_MISSED_SUBJECT.to_string(),
        HOLD_MISSED_SUBJECT.to_string(),
        VENDOR_MISSED_SUBJECT.to_string(),
    ];
    expected.sort();
    assert_eq!(incidents, expected);
    assert_eq!(report.processed, 0);

    let it_ops = transport.sent_to(IT_OPS);
    assert_eq!(it_ops.len(), 1);
    assert_eq!(it_ops[0].subject, VENDOR_MISSED_SUBJECT);
    assert_eq!(transport.sent_to(INTERNAL).len(), 2);
    assert!(transport.sent_to(CLIENT).is_empty());

    let summary = fs::read_to_string(&report.paths.summary).unwrap();
    assert!(summary.contains("Processed files count: 0"));
    assert!(summary.contains("Incident count: 3"));
    let incident_file = fs::read_to_string(&report.paths.incidents).unwrap();
    assert_eq!(incident_file.lines().count(), 3);
}

#[test]
#[serial]
fn test_vendor_file_on_track_is_processed_without_vendor_incident() {
    // The SLA estimate for a small file lands well inside a minute.
    if window(-1, 120).is_none() {
        return;
    }
    let Some((start, end)) = window(-1, 4) else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let mut config = day_config(temp.path(), start, end);
    config.sla.deadline = last_second();

    let name = format!("C_{}.txt", Utc::now().format("%Y%m%d"));
    fs::write(config.folders.vendor_extract.join(&name), "claims\n").unwrap();
    fs::write(config.folders.proprietary.join(&name), "claims\n").unwrap();
    fs::write(config.folders.vendor_extract.join("unexpected.txt"), "x").unwrap();

    let (orchestrator, transport) = orchestrator(config, Arc::new(ShutdownGate::new()));
    let report = orchestrator.run().unwrap();

    // Unexpected names are claimed too, then dropped by the intake.
    assert_eq!(report.processed, 2);
    assert!(!report.incidents.iter().any(|i| i == VENDOR_MISSED_SUBJECT));
    assert!(!report.incidents.iter().any(|i| i.contains("Proprietary missing")));
    assert!(!report.incidents.iter().any(|i| i.contains("SLA breach")));

    let it_ops = transport.sent_to(IT_OPS);
    assert_eq!(it_ops.len(), 1);
    assert_eq!(it_ops[0].subject, format!("Vendor file received: {name}"));
    assert!(transport.sent_to(CLIENT).is_empty());
}

#[test]
#[serial]
fn test_large_vendor_file_raises_sla_breach() {
    let Some((start, end)) = window(-1, 4) else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let mut config = day_config(temp.path(), start, end);
    // Deadline already passed: any estimate breaches.
    config.sla.deadline = start;

    let name = format!("Pend_C_{}.txt", Utc::now().format("%Y%m%d"));
    fs::write(config.folders.vendor_extract.join(&name), "pending\n").unwrap();
    let sparse = File::create(config.folders.proprietary.join(&name)).unwrap();
    sparse.set_len(3 * GB).unwrap();
    drop(sparse);

    let (orchestrator, transport) = orchestrator(config, Arc::new(ShutdownGate::new()));
    let report = orchestrator.run().unwrap();

    let breaches: Vec<_> = report
        .incidents
        .iter()
        .filter(|i| i.starts_with(&format!("[INCIDENT] SLA breach risk for {name}")))
        .collect();
    assert_eq!(breaches.len(), 1);

    let internal: Vec<String> = transport
        .sent_to(INTERNAL)
        .into_iter()
        .map(|m| m.subject)
        .collect();
    assert!(internal.contains(&format!("[INCIDENT] SLA breach risk for {name}")));

    let client = transport.sent_to(CLIENT);
    assert_eq!(client.len(), 1);
    assert_eq!(client[0].subject, "[NOTICE] Processing delay");
}

#[test]
#[serial]
fn test_missing_proprietary_copy_is_an_incident() {
    let Some((start, end)) = window(-1, 3) else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let config = day_config(temp.path(), start, end);
    let name = format!("C_{}.txt", Utc::now().format("%Y%m%d"));
    fs::write(config.folders.vendor_extract.join(&name), "claims\n").unwrap();

    let (orchestrator, transport) = orchestrator(config, Arc::new(ShutdownGate::new()));
    let report = orchestrator.run().unwrap();

    assert!(report
        .incidents
        .contains(&format!("Proprietary missing: {name}")));
    assert!(transport
        .sent_to(INTERNAL)
        .iter()
        .any(|m| m.subject == "Proprietary file missing"));
}

#[test]
#[serial]
fn test_second_termination_request_cancels_run() {
    let Some((start, end)) = window(-1, 30) else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let config = day_config(temp.path(), start, end);
    let report_dir = config.folders.report_output.clone();
    let gate = Arc::new(ShutdownGate::new());
    let (orchestrator, _transport) = orchestrator(config, gate.clone());

    let handle = thread::spawn(move || orchestrator.run());

    thread::sleep(Duration::from_millis(300));
    gate.request();
    assert_eq!(gate.state(), GateState::Armed);

    // A single request only arms the gate.
    thread::sleep(Duration::from_millis(1500));
    assert!(!handle.is_finished());

    let confirmed_at = Instant::now();
    gate.request();
    let result = handle.join().unwrap();

    assert!(confirmed_at.elapsed() < Duration::from_secs(2));
    assert_eq!(exit_code(&result), EXIT_CANCELLED);
    assert!(summary_path(&report_dir, Utc::now()).exists());
}

#[test]
#[serial]
fn test_vendor_file_arriving_mid_window_is_picked_up() {
    if window(-1, 120).is_none() {
        return;
    }
    let Some((start, end)) = window(-1, 5) else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let mut config = day_config(temp.path(), start, end);
    config.sla.deadline = last_second();

    let name = format!("C_{}.txt", Utc::now().format("%Y%m%d"));
    let vendor = config.folders.vendor_extract.join(&name);
    let proprietary = config.folders.proprietary.join(&name);
    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(1500));
        fs::write(&vendor, "claims\n").unwrap();
        fs::write(&proprietary, "claims\n").unwrap();
    });

    let (orchestrator, transport) = orchestrator(config, Arc::new(ShutdownGate::new()));
    let report = orchestrator.run().unwrap();
    writer.join().unwrap();

    assert_eq!(report.processed, 1);
    assert!(!report.incidents.iter().any(|i| i == VENDOR_MISSED_SUBJECT));
    let it_ops: Vec<String> = transport
        .sent_to(IT_OPS)
        .into_iter()
        .map(|m| m.subject)
        .collect();
    assert_eq!(it_ops, vec![format!("Vendor file received: {name}")]);
}

#[test]
#[serial]
fn test_panicking_monitor_fails_run_after_others_finish() {
    let Some((start, end)) = window(-1, 3) else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let config = day_config(temp.path(), start, end);
    let report_dir = config.folders.report_output.clone();
    let transport = Arc::new(PanicOnSubject {
        subject: HOLD_MISSED_SUBJECT.to_string(),
        inner: RecordingTransport::default(),
    });

    let result = orchestrator_with(config, Arc::new(ShutdownGate::new()), transport.clone()).run();

    assert_eq!(exit_code(&result), EXIT_FATAL);
    match &result {
        Err(RunError::Failed(failures)) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].starts_with("HOLD"));
        }
        other => panic!("expected a failed run, got {other:?}"),
    }

    // The other locations still ran to completion
    let it_ops = transport.inner.sent_to(IT_OPS);
    assert_eq!(it_ops.len(), 1);
    assert_eq!(it_ops[0].subject, VENDOR_MISSED_SUBJECT);
    assert!(transport
        .inner
        .sent_to(INTERNAL)
        .iter()
        .any(|m| m.subject == DROP_MISSED_SUBJECT));

    let summary = fs::read_to_string(summary_path(&report_dir, Utc::now())).unwrap();
    assert!(summary.contains("Incident count: 3"));
}
