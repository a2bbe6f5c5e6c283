//! Many threads reporting through shared stores and limiters.

use error_reporting::infrastructure::mocks::{MockClock, RecordingSink};
use error_reporting::{
    ErrorReportingUtility, ExceptionInfo, LogStore, OwnerId, Properties, RateLimiter, Traceback,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, UNIX_EPOCH};

#[test]
fn test_shared_root_history_stays_bounded() {
    let store = Arc::new(LogStore::new());
    let limiter = Arc::new(RateLimiter::default());
    let mut handles = vec![];

    for worker in 0..8 {
        let store = Arc::clone(&store);
        let limiter = Arc::clone(&limiter);
        handles.push(thread::spawn(move || {
            let utility = ErrorReportingUtility::builder()
                .with_owner(OwnerId::Root)
                .with_store(store)
                .with_limiter(limiter)
                .with_sink(Arc::new(RecordingSink::new()))
                .with_properties(Properties::new(15, false, ["Unauthorized"]).unwrap())
                .build()
                .unwrap();

            for i in 0..100 {
                utility.raising(
                    &ExceptionInfo::new("Error", format!("{}-{}", worker, i), Traceback::empty()),
                    None,
                );
                assert!(utility.get_log_entries().len() <= 15);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(OwnerId::Root), 15);
}

#[test]
fn test_shared_limiter_admits_exactly_one_burst() {
    let store = Arc::new(LogStore::new());
    let limiter = Arc::new(RateLimiter::default());
    let clock = MockClock::new(UNIX_EPOCH + Duration::from_secs(5_000_000));
    let sink = RecordingSink::new();
    let mut handles = vec![];

    for _ in 0..8 {
        let utility = ErrorReportingUtility::builder()
            .with_owner(OwnerId::Root)
            .with_store(Arc::clone(&store))
            .with_limiter(Arc::clone(&limiter))
            .with_clock(Arc::new(clock.clone()))
            .with_sink(Arc::new(sink.clone()))
            .build()
            .unwrap();
        handles.push(thread::spawn(move || {
            for _ in 0..25 {
                utility.raising(&ExceptionInfo::new("Burst", "x", Traceback::empty()), None);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // Same instant for everyone: exactly the default burst of 5 gets through.
    assert_eq!(sink.count(), 5);
    assert_eq!(limiter.tracked_types(), 1);
}

#[test]
fn test_shared_utility_across_threads() {
    let sink = RecordingSink::new();
    let utility = Arc::new(
        ErrorReportingUtility::builder()
            .with_sink(Arc::new(sink.clone()))
            .build()
            .unwrap(),
    );
    let mut handles = vec![];

    for worker in 0..4 {
        let utility = Arc::clone(&utility);
        handles.push(thread::spawn(move || {
            for i in 0..10 {
                utility.raising(
                    &ExceptionInfo::new(format!("Error{}", worker), i.to_string(), Traceback::empty()),
                    None,
                );
            }
            if worker == 0 {
                utility.set_properties(20, true, ["Unauthorized"]).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(utility.get_log_entries().len(), 20);
    assert_eq!(utility.metrics().records_appended(), 40);
    assert!(sink.count() <= 20);
}
