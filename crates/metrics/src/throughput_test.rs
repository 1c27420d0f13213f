//! Tests for listener throughput accounting

use super::*;

#[test]
fn test_registers_all_names() {
    let counter = ThroughputCounter::new();
    let names = counter.metric_set().names();

    for name in [
        READ_BYTES,
        READ_PACKETS,
        WRITTEN_BYTES,
        READ_BYTES_1SEC,
        WRITTEN_BYTES_1SEC,
        READ_TRUNCATED,
        READ_DISCARDED,
    ] {
        assert!(names.iter().any(|n| n == name), "missing {}", name);
    }
}

#[test]
fn test_fresh_set_per_counter() {
    let a = ThroughputCounter::new();
    let b = ThroughputCounter::new();
    assert!(!Arc::ptr_eq(a.metric_set(), b.metric_set()));
}

#[test]
fn test_record_read() {
    let counter = ThroughputCounter::new();
    counter.record_read(100);
    counter.record_read(1008);

    assert_eq!(counter.read_bytes(), 1108);
    assert_eq!(counter.read_packets(), 2);
    assert_eq!(counter.metric_set().value(READ_BYTES), Some(1108));
    assert_eq!(counter.metric_set().value(READ_PACKETS), Some(2));
}

#[test]
fn test_record_written() {
    let counter = ThroughputCounter::new();
    counter.record_written(64);
    assert_eq!(counter.written_bytes(), 64);
    assert_eq!(counter.read_bytes(), 0);
}

#[test]
fn test_oversize_counters() {
    let counter = ThroughputCounter::new();
    counter.record_truncated();
    counter.record_discarded();
    counter.record_discarded();

    let snapshot = counter.snapshot();
    assert_eq!(snapshot.get(READ_TRUNCATED), 1);
    assert_eq!(snapshot.get(READ_DISCARDED), 2);
}

#[test]
fn test_tick_reports_delta() {
    let counter = ThroughputCounter::new();

    counter.record_read(300);
    counter.record_written(200);
    counter.tick();
    assert_eq!(counter.metric_set().value(READ_BYTES_1SEC), Some(300));
    assert_eq!(counter.metric_set().value(WRITTEN_BYTES_1SEC), Some(200));

    counter.record_read(50);
    counter.tick();
    assert_eq!(counter.metric_set().value(READ_BYTES_1SEC), Some(50));
    assert_eq!(counter.metric_set().value(WRITTEN_BYTES_1SEC), Some(0));

    // Totals stay monotonic
    assert_eq!(counter.read_bytes(), 350);
}

#[test]
fn test_concurrent_reads() {
    let counter = Arc::new(ThroughputCounter::new());
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let counter = Arc::clone(&counter);
            std::thread::spawn(move || {
                for _ in 0..500 {
                    counter.record_read(10);
                }
            })
        })
        .collect();

    for w in workers {
        w.join().unwrap();
    }

    assert_eq!(counter.read_packets(), 2000);
    assert_eq!(counter.read_bytes(), 20000);
}
