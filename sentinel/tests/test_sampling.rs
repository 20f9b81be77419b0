mod common;

use std::time::Duration;

use common::{FakeProc, PAGE_SIZE};
use sentinel::domain::{Pid, SampleError};
use sentinel::monitor::{Monitor, MonitorSettings};
use sentinel::procfs::ProcFs;
use sentinel::render::TextRenderer;
use sentinel::sampling::{Ranker, Sampler, SortColumn, SortOrder};
use sentinel::shutdown::CancellationToken;

fn sampler_for(proc: &FakeProc) -> Sampler<ProcFs> {
    Sampler::new(ProcFs::with_root(proc.root()).page_size(PAGE_SIZE))
}

#[test]
fn test_cpu_share_between_two_ticks() {
    let proc = FakeProc::new(1000, 1_000_000);
    proc.add_process(7, "busy", 'R', 100, 2500);
    let mut sampler = sampler_for(&proc);

    sampler.tick().unwrap();
    let entry = sampler.table().get(Pid(7)).unwrap();
    assert!(entry.cpu_percent().abs() < f64::EPSILON, "first observation has no share");

    proc.add_process(7, "busy", 'R', 140, 2500);
    proc.set_system_busy(1400);
    sampler.tick().unwrap();

    let entry = sampler.table().get(Pid(7)).unwrap();
    assert!((entry.cpu_percent() - 10.0).abs() < 1e-9);
    // 2500 pages * 4 KiB = 10000 kB of 1_000_000 kB
    assert_eq!(entry.resident_kb(), 10_000);
    assert!((entry.memory_percent() - 1.0).abs() < 1e-9);
    assert_eq!(entry.identity().command.as_str(), "/usr/bin/busy --flag");
}

#[test]
fn test_vanished_process_removed_after_tick() {
    let proc = FakeProc::new(1000, 1_000_000);
    proc.add_process(7, "short", 'S', 10, 1);
    proc.add_process(8, "long", 'S', 10, 1);
    let mut sampler = sampler_for(&proc);
    sampler.tick().unwrap();
    assert_eq!(sampler.table().len(), 2);

    proc.remove_process(7);
    let summary = sampler.tick().unwrap();
    assert!(!sampler.table().contains(Pid(7)));
    assert!(sampler.table().contains(Pid(8)));
    assert_eq!(summary.total_task_count, 1);
}

#[test]
fn test_listed_but_unreadable_process_dropped_same_tick() {
    let proc = FakeProc::new(1000, 1_000_000);
    proc.add_process(1, "init", 'S', 10, 1);
    proc.add_listed_only(99);
    let mut sampler = sampler_for(&proc);

    let summary = sampler.tick().unwrap();
    assert!(!sampler.table().contains(Pid(99)));
    assert_eq!(summary.vanished_count, 1);
    assert_eq!(summary.total_task_count, 1);
}

#[test]
fn test_missing_root_is_fatal() {
    let proc = FakeProc::new(1000, 1_000_000);
    let mut sampler = Sampler::new(ProcFs::with_root(proc.root().join("gone")));
    assert!(matches!(sampler.tick(), Err(SampleError::EnumerationUnavailable(_))));
    assert!(sampler.table().is_empty());
}

#[test]
fn test_unreadable_system_counter_freezes_cpu() {
    let proc = FakeProc::new(1000, 1_000_000);
    proc.add_process(7, "busy", 'R', 100, 1);
    let mut sampler = sampler_for(&proc);
    sampler.tick().unwrap();

    proc.add_process(7, "busy", 'R', 140, 1);
    proc.set_system_busy(1400);
    sampler.tick().unwrap();
    assert!((sampler.table().get(Pid(7)).unwrap().cpu_percent() - 10.0).abs() < 1e-9);

    proc.add_process(7, "busy", 'R', 500, 1);
    proc.break_system_stat();
    sampler.tick().unwrap();
    assert!((sampler.table().get(Pid(7)).unwrap().cpu_percent() - 10.0).abs() < 1e-9);

    // Recovery measures against the last good system reading (1400)
    proc.add_process(7, "busy", 'R', 600, 1);
    proc.set_system_busy(2400);
    sampler.tick().unwrap();
    assert!((sampler.table().get(Pid(7)).unwrap().cpu_percent() - 10.0).abs() < 1e-9);
}

#[test]
fn test_summary_counts_running_and_reads_load() {
    let proc = FakeProc::new(1000, 1_000_000);
    proc.add_process(1, "init", 'S', 10, 1);
    proc.add_process(2, "spin", 'R', 10, 1);
    proc.add_process(3, "spin2", 'R', 10, 1);
    let mut sampler = sampler_for(&proc);

    let summary = sampler.tick().unwrap();
    assert_eq!(summary.total_task_count, 3);
    assert_eq!(summary.running_task_count, 2);
    assert!((summary.load_averages.one - 0.5).abs() < f64::EPSILON);
    assert!((summary.uptime_seconds - 3725.1).abs() < 1e-9);
}

#[test]
fn test_ranker_budget_and_order() {
    let proc = FakeProc::new(1000, 1_000_000);
    for (pid, rss) in [(1, 10), (2, 300), (3, 20), (4, 200)] {
        proc.add_process(pid, &format!("p{pid}"), 'S', 10, rss);
    }
    let mut sampler = sampler_for(&proc);
    sampler.tick().unwrap();

    let ranker = Ranker::new(2).with_order(SortOrder::descending(SortColumn::Rss));
    let rows = ranker.rank(sampler.table());
    let pids: Vec<u32> = rows.iter().map(|row| row.pid.0).collect();
    assert_eq!(pids, vec![2, 4]);
}

#[test]
fn test_monitor_text_output_with_iteration_limit() {
    let proc = FakeProc::new(1000, 1_000_000);
    proc.add_process(42, "sshd", 'S', 10, 1);
    let settings = MonitorSettings { interval: Duration::from_millis(1), iterations: Some(2) };
    let mut monitor =
        Monitor::new(sampler_for(&proc), Ranker::new(10), TextRenderer::new(Vec::new()), settings);

    let ticks = monitor.run(&CancellationToken::new()).unwrap();
    assert_eq!(ticks, 2);

    let output = String::from_utf8(monitor.renderer().get_ref().clone()).unwrap();
    assert_eq!(output.matches("Tasks: 1 total, 0 running").count(), 2);
    assert!(output.contains("/usr/bin/sshd --flag"));
    assert!(output.contains("Uptime: 01:02:05"));
}

#[test]
fn test_monitor_stops_on_fatal_enumeration() {
    let proc = FakeProc::new(1000, 1_000_000);
    let sampler = Sampler::new(ProcFs::with_root(proc.root().join("gone")));
    let settings = MonitorSettings { interval: Duration::from_millis(1), iterations: None };
    let mut monitor = Monitor::new(sampler, Ranker::new(10), TextRenderer::new(Vec::new()), settings);

    let err = monitor.run(&CancellationToken::new()).unwrap_err();
    assert!(err.downcast_ref::<SampleError>().is_some());
    assert!(monitor.renderer().get_ref().is_empty());
}
