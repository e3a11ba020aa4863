use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mysql_middleware::prelude::*;
use mysql_middleware::test_utils::{
    StubDriver, StubEvent, StubLog, executed_statements, new_log,
};

fn plain_pool(config: PoolConfig, log: &StubLog) -> MysqlPool<StubDriver> {
    let mut next = 0usize;
    let log = log.clone();
    MysqlPool::with_driver(config, move || {
        let driver = StubDriver::new(next, log.clone());
        next += 1;
        driver
    })
}

#[test]
fn connect_brings_up_all_connections_with_zero_counters() {
    let log = new_log();
    let pool = plain_pool(PoolConfig::default(), &log);

    assert!(pool.connect("localhost", "user", "pw", "db", 3306));
    assert!(pool.get_last_error().is_none());

    let stats = pool.get_connection_stats();
    assert_eq!(stats.connections.len(), 17);
    assert!(stats.connections.iter().all(|c| c.is_ready));
    assert!(stats.connections.iter().all(|c| c.queries_processed == 0));
    assert!(stats.connections.iter().all(|c| c.queries_errored == 0));
    assert_eq!(stats.connections.iter().filter(|c| c.is_background).count(), 1);
    assert!(stats.connections.last().unwrap().is_background);
    assert_eq!(stats.queries_processed, 0);
    assert_eq!(stats.queries_errored, 0);
    assert_eq!(stats.background_queue_length, 0);

    assert!(pool.close());
}

#[test]
fn connect_finishes_without_blocking_on_the_background_session() {
    let log = new_log();
    let pool = plain_pool(PoolConfig::default(), &log);

    // Run connect on its own thread so a re-lock of the background session
    // mutex shows up as a timeout instead of hanging the suite.
    let (tx, rx) = std::sync::mpsc::channel();
    thread::spawn(move || {
        let ok = pool.connect("localhost", "user", "pw", "db", 3306);
        let _ = tx.send((ok, pool));
    });
    let (ok, pool) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("connect did not finish");
    assert!(ok);
    pool.close();
}

#[test]
fn sequential_queries_visit_every_connection_once_before_repeating() {
    let log = new_log();
    let pool = plain_pool(PoolConfig::default(), &log);
    assert!(pool.connect("localhost", "user", "pw", "db", 3306));

    for _ in 0..16 {
        pool.query("SELECT 1;", &[]);
    }

    let mut labels: Vec<usize> = executed_statements(&log)
        .into_iter()
        .map(|(label, _)| label)
        .collect();
    labels.sort_unstable();
    assert_eq!(labels, (0..16).collect::<Vec<_>>());

    let stats = pool.get_connection_stats();
    assert_eq!(stats.queries_processed, 16);
    let foreground = &stats.connections[..16];
    assert!(foreground.iter().all(|c| c.queries_processed == 1));
    pool.close();
}

#[test]
fn selection_skips_the_busy_connection() {
    let log = new_log();
    let slow = Duration::from_millis(600);
    let pool = {
        let mut next = 0usize;
        let log = log.clone();
        MysqlPool::with_driver(PoolConfig::default(), move || {
            let driver =
                StubDriver::new(next, log.clone()).with_delay_on("SLOW", slow);
            next += 1;
            driver
        })
    };
    let pool = Arc::new(pool);
    assert!(pool.connect("localhost", "user", "pw", "db", 3306));

    // Occupies connection 0 for the whole delay.
    let slow_pool = Arc::clone(&pool);
    let slow_thread = thread::spawn(move || {
        slow_pool.query("SELECT 'SLOW';", &[]);
    });
    thread::sleep(Duration::from_millis(100));

    // Enough fast queries to wrap the cursor past the busy slot.
    let started = Instant::now();
    for _ in 0..16 {
        pool.query("SELECT 1;", &[]);
    }
    assert!(started.elapsed() < slow, "fast queries must not wait on the busy session");

    let fast_labels: Vec<usize> = executed_statements(&log)
        .into_iter()
        .filter(|(_, statement)| !statement.contains("SLOW"))
        .map(|(label, _)| label)
        .collect();
    assert_eq!(fast_labels.len(), 16);
    assert!(fast_labels.iter().all(|label| *label != 0));

    slow_thread.join().unwrap();
    pool.close();
}

#[test]
fn foreground_connect_failure_does_not_abort_remaining_connections() {
    let log = new_log();
    let pool = {
        let mut next = 0usize;
        let log = log.clone();
        MysqlPool::with_driver(PoolConfig::default(), move || {
            let mut driver = StubDriver::new(next, log.clone());
            if next == 3 {
                driver = driver.with_connect_failure();
            }
            next += 1;
            driver
        })
    };

    assert!(!pool.connect("localhost", "user", "pw", "db", 3306));

    let error = pool.get_last_error().expect("connect failure recorded");
    assert!(error.message.contains("Database connection failed"));

    // Every session, including the ones after the failed slot and the
    // background one, still saw a connect attempt.
    let attempts = log
        .lock()
        .iter()
        .filter(|event| matches!(event, StubEvent::Connected(_)))
        .count();
    assert_eq!(attempts, 17);

    // The pool stays usable on the surviving connections.
    pool.query("SELECT 1;", &[]);
    assert_eq!(pool.get_connection_stats().queries_processed, 1);
    pool.close();
}

#[test]
fn background_option_failure_leaves_worker_unstarted() {
    let log = new_log();
    let pool = {
        let mut next = 0usize;
        let log = log.clone();
        MysqlPool::with_driver(PoolConfig::default().with_pool_size(2), move || {
            let mut driver = StubDriver::new(next, log.clone());
            if next == 2 {
                // The third session is the background connection.
                driver = driver.with_configure_failure();
            }
            next += 1;
            driver
        })
    };

    assert!(!pool.connect("localhost", "user", "pw", "db", 3306));
    pool.query_detach("SELECT 1;", &[]);
    thread::sleep(Duration::from_millis(400));
    // No worker, so the task is still queued.
    assert_eq!(pool.get_connection_stats().background_queue_length, 1);
    pool.close();
}
