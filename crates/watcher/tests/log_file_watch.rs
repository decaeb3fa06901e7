//! End-to-end tests against a real notification provider

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tail_watcher::{watch_log_file, DedupConfig, DedupEvents, FsEvent, Op};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(5);

fn append(path: &Path, line: &str) {
    let mut file = OpenOptions::new().append(true).create(true).open(path).unwrap();
    writeln!(file, "{}", line).unwrap();
}

/// Collect events until `quiet` passes without a new one
fn collect_for(dedup: &DedupEvents, quiet: Duration) -> Vec<FsEvent> {
    let mut events = Vec::new();
    while let Ok(event) = dedup.events().recv_timeout(quiet) {
        events.push(event);
    }
    events
}

/// Drain on a helper thread so a stuck shutdown fails the test instead of hanging it
fn drain_with_timeout(dedup: DedupEvents) -> Vec<FsEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (events, _) = dedup.drain();
        let _ = tx.send(events);
    });
    rx.recv_timeout(TIMEOUT).expect("dedup loop did not stop after close")
}

#[test]
fn test_new_file_yields_write_then_create() {
    let tmp = TempDir::new().unwrap();
    let log = tmp.path().join("0.log");

    let (dir_watcher, dedup) = watch_log_file(&log, &DedupConfig::default()).unwrap();
    fs::write(&log, "hello\n").unwrap();

    let first = dedup.events().recv_timeout(TIMEOUT).unwrap();
    let second = dedup.events().recv_timeout(TIMEOUT).unwrap();
    assert_eq!(first.op, Op::Write);
    assert_eq!(second.op, Op::Create);
    assert_eq!(first.path, second.path);
    assert!(first.is_named("0.log"));

    dir_watcher.close();
    drain_with_timeout(dedup);
}

#[test]
fn test_other_files_are_filtered() {
    let tmp = TempDir::new().unwrap();
    let log = tmp.path().join("0.log");
    let other = tmp.path().join("1.log");
    fs::write(&log, "").unwrap();
    fs::write(&other, "").unwrap();

    let (dir_watcher, dedup) = watch_log_file(&log, &DedupConfig::default()).unwrap();
    for i in 0..5 {
        append(&other, &format!("noise {}", i));
    }
    append(&log, "signal");

    let event = dedup.events().recv_timeout(TIMEOUT).unwrap();
    assert_eq!(event.op, Op::Write);
    assert!(event.is_named("0.log"));

    let rest = collect_for(&dedup, Duration::from_millis(300));
    assert!(rest.iter().all(|e| e.is_named("0.log")));

    dir_watcher.close();
    drain_with_timeout(dedup);
}

#[test]
fn test_burst_of_appends_is_coalesced() {
    let tmp = TempDir::new().unwrap();
    let log = tmp.path().join("0.log");
    fs::write(&log, "").unwrap();

    let (dir_watcher, dedup) = watch_log_file(&log, &DedupConfig::default()).unwrap();

    let start = Instant::now();
    for i in 0..50 {
        append(&log, &format!("line {}", i));
    }
    let burst = start.elapsed();

    let events = collect_for(&dedup, Duration::from_millis(400));
    let writes = events.iter().filter(|e| e.op == Op::Write).count();
    assert!(writes >= 1, "expected at least one write, got {:?}", events);
    if burst < Duration::from_millis(100) {
        assert_eq!(writes, 1, "burst of {:?} was not coalesced: {:?}", burst, events);
    }

    dir_watcher.close();
    drain_with_timeout(dedup);
}

#[test]
fn test_remove_is_forwarded() {
    let tmp = TempDir::new().unwrap();
    let log = tmp.path().join("0.log");
    fs::write(&log, "").unwrap();

    let (dir_watcher, dedup) = watch_log_file(&log, &DedupConfig::default()).unwrap();
    fs::remove_file(&log).unwrap();

    let events = collect_for(&dedup, Duration::from_millis(500));
    assert!(
        events.iter().any(|e| e.op == Op::Remove && e.is_named("0.log")),
        "no remove in {:?}",
        events
    );

    dir_watcher.close();
    drain_with_timeout(dedup);
}

#[test]
fn test_close_ends_stream() {
    let tmp = TempDir::new().unwrap();
    let log = tmp.path().join("0.log");

    let (dir_watcher, dedup) = watch_log_file(&log, &DedupConfig::default()).unwrap();
    assert_eq!(dir_watcher.dir(), tmp.path());
    assert_eq!(dedup.target(), "0.log");

    dir_watcher.close();
    let remaining = drain_with_timeout(dedup);
    assert!(remaining.is_empty());
}
