//! The connection pool and the public query-dispatch surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, bounded};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::background::{self, BackgroundQueue, BackgroundTask};
use crate::config::PoolConfig;
use crate::connection::PoolConnection;
use crate::driver::{ConnectParams, SessionDriver, SessionOpts};
use crate::error::{ErrorSink, LastError, MysqlMiddlewareError};
use crate::executor;
use crate::stats::{self, PoolStats};
use crate::types::{ResultSet, RowValues};

/// State shared between callers and the background worker.
pub(crate) struct PoolShared<D> {
    pub(crate) connections: Vec<PoolConnection<D>>,
    pub(crate) background: PoolConnection<D>,
    pub(crate) cursor: AtomicUsize,
    pub(crate) processed: AtomicU64,
    pub(crate) errored: AtomicU64,
    pub(crate) queue: BackgroundQueue,
    pub(crate) sink: ErrorSink,
    pub(crate) config: PoolConfig,
}

/// Fixed-size pool of foreground connections plus one dedicated background
/// connection with its own worker thread.
///
/// Callers either run statements synchronously through [`MysqlPool::query`]
/// or enqueue them with [`MysqlPool::query_detach`] and observe the outcome
/// later through [`MysqlPool::get_connection_stats`] and
/// [`MysqlPool::get_last_error`]. Failures never surface as errors from these
/// methods.
pub struct MysqlPool<D: SessionDriver> {
    shared: Arc<PoolShared<D>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
}

impl<D: SessionDriver + 'static> MysqlPool<D> {
    /// Build a pool whose sessions come from `factory` (N foreground plus one
    /// background). Nothing connects until [`MysqlPool::connect`].
    pub fn with_driver(config: PoolConfig, mut factory: impl FnMut() -> D) -> Self {
        let size = config.pool_size.max(1);
        let connections = (0..size)
            .map(|_| PoolConnection::new(factory()))
            .collect::<Vec<_>>();
        let background = PoolConnection::new(factory());
        Self {
            shared: Arc::new(PoolShared {
                connections,
                background,
                cursor: AtomicUsize::new(0),
                processed: AtomicU64::new(0),
                errored: AtomicU64::new(0),
                queue: BackgroundQueue::default(),
                sink: ErrorSink::new(),
                config,
            }),
            worker: Mutex::new(None),
            shutdown_tx: Mutex::new(None),
        }
    }

    /// Configure and connect every pooled session.
    ///
    /// A foreground failure is recorded in the error sink and flips the
    /// result, but initialization continues for the remaining connections.
    /// The background worker starts as soon as the background session's
    /// option setup succeeds, independent of the foreground outcome.
    /// Returns true only if every foreground connection and the background
    /// connection came up.
    pub fn connect(
        &self,
        host: &str,
        user: &str,
        password: &str,
        database: &str,
        port: u16,
    ) -> bool {
        let params = ConnectParams {
            host: host.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
            port,
        };
        let opts = self.shared.config.session_opts();

        let mut foreground_ok = true;
        for conn in &self.shared.connections {
            if !init_connection(conn, &opts, &params, &self.shared.sink) {
                foreground_ok = false;
            }
        }

        // Bound to a local so the guard drops before connect re-locks the
        // background session.
        let configured = self.shared.background.session.lock().configure(&opts);
        let background_ok = match configured {
            Ok(()) => {
                self.start_worker();
                match self.shared.background.session.lock().connect(&params) {
                    Ok(()) => true,
                    Err(err) => {
                        self.shared
                            .sink
                            .report(MysqlMiddlewareError::Connection(err.to_string()).to_string());
                        false
                    }
                }
            }
            Err(err) => {
                self.shared
                    .sink
                    .report(MysqlMiddlewareError::ConnectionInit(err.to_string()).to_string());
                false
            }
        };

        info!(
            pool_size = self.shared.connections.len(),
            foreground_ok, background_ok, "pool connect finished"
        );
        foreground_ok && background_ok
    }

    /// Shut the worker down, then close every session.
    ///
    /// The worker is signalled and joined before any connection is closed, so
    /// it never executes against a closed session. Close failures are logged
    /// and recorded in the sink but do not flip the result.
    pub fn close(&self) -> bool {
        self.stop_worker();

        for conn in &self.shared.connections {
            if let Err(err) = conn.session.lock().close() {
                warn!(error = %err, "connection close failed");
                self.shared.sink.report(format!("Close failed: {err}"));
            }
        }
        if let Err(err) = self.shared.background.session.lock().close() {
            warn!(error = %err, "background connection close failed");
            self.shared.sink.report(format!("Close failed: {err}"));
        }
        info!("pool closed");
        true
    }

    /// Run a statement synchronously; failures land in the sink and the
    /// counters, never in the return value.
    pub fn query(&self, template: &str, params: &[RowValues]) -> ResultSet {
        let conn = self.select();
        self.shared.processed.fetch_add(1, Ordering::Relaxed);
        conn.note_dispatch();
        debug!(template, params = params.len(), "dispatching query");
        executor::run(conn, template, params, &self.shared.sink, &self.shared.errored)
    }

    /// Capture the statement and parameters and return immediately.
    ///
    /// The background worker runs the task later; its outcome is observable
    /// only through counters and the error sink.
    pub fn query_detach(&self, template: &str, params: &[RowValues]) {
        self.shared
            .queue
            .push(BackgroundTask::new(template, params.to_vec()));
        debug!(template, "queued background statement");
    }

    /// Best-effort snapshot: every foreground connection, the background
    /// connection, the aggregate counters, and the current queue depth.
    pub fn get_connection_stats(&self) -> PoolStats {
        let shared = &self.shared;
        let mut connections = Vec::with_capacity(shared.connections.len() + 1);
        for conn in &shared.connections {
            connections.push(stats::connection_info(
                &conn.metrics_snapshot(),
                !conn.is_busy(),
                false,
            ));
        }
        connections.push(stats::connection_info(
            &shared.background.metrics_snapshot(),
            !shared.background.is_busy(),
            true,
        ));
        PoolStats {
            connections,
            queries_processed: shared.processed.load(Ordering::Relaxed),
            queries_errored: shared.errored.load(Ordering::Relaxed),
            background_queue_length: shared.queue.len(),
        }
    }

    /// Return and clear the most recent failure, if any.
    pub fn get_last_error(&self) -> Option<LastError> {
        self.shared.sink.take()
    }

    /// Round-robin with skip-busy over the shared cursor.
    ///
    /// Probes at most N+1 slots; if every probe lands on a busy connection
    /// the last one is returned anyway and the caller serializes on its
    /// session lock. Selection itself never blocks.
    fn select(&self) -> &PoolConnection<D> {
        let n = self.shared.connections.len();
        let mut idx = self.shared.cursor.fetch_add(1, Ordering::Relaxed) % n;
        let mut tries = 0;
        while tries < n + 1 && self.shared.connections[idx].is_busy() {
            idx = self.shared.cursor.fetch_add(1, Ordering::Relaxed) % n;
            tries += 1;
        }
        &self.shared.connections[idx]
    }

    fn start_worker(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        let (tx, rx) = bounded::<()>(1);
        *self.shutdown_tx.lock() = Some(tx);
        let shared = Arc::clone(&self.shared);
        *worker = Some(std::thread::spawn(move || {
            background::worker_loop(shared, rx);
        }));
    }

    fn stop_worker(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.worker.lock().take()
            && handle.join().is_err()
        {
            warn!("background worker panicked");
        }
    }
}

impl<D: SessionDriver> Drop for MysqlPool<D> {
    fn drop(&mut self) {
        // Mirrors stop_worker; Drop cannot rely on the D: 'static methods.
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

fn init_connection<D: SessionDriver>(
    conn: &PoolConnection<D>,
    opts: &SessionOpts,
    params: &ConnectParams,
    sink: &ErrorSink,
) -> bool {
    let mut session = conn.session.lock();
    if let Err(err) = session.configure(opts) {
        sink.report(MysqlMiddlewareError::ConnectionInit(err.to_string()).to_string());
        return false;
    }
    if let Err(err) = session.connect(params) {
        sink.report(MysqlMiddlewareError::Connection(err.to_string()).to_string());
        return false;
    }
    true
}

#[cfg(feature = "mysql")]
impl MysqlPool<crate::mysql::MysqlDriver> {
    /// Pool backed by the real `mysql`-crate driver.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self::with_driver(config, crate::mysql::MysqlDriver::default)
    }
}
