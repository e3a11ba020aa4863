use serde::Serialize;

use crate::connection::ConnMetrics;

/// Operational view of one pooled connection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub queries_processed: u64,
    pub queries_errored: u64,
    /// Running mean of per-statement wall time, in seconds
    pub avg_query_secs: f64,
    /// Cumulative wall time spent executing, in seconds
    pub busy_secs: f64,
    /// Not currently executing a statement
    pub is_ready: bool,
    /// True for the dedicated background connection
    pub is_background: bool,
}

/// Best-effort snapshot over the whole pool.
///
/// Fields are sampled independently, not under one global lock; suitable for
/// monitoring, not precise accounting.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    /// One entry per foreground connection, then one for the background
    /// connection
    pub connections: Vec<ConnectionInfo>,
    pub queries_processed: u64,
    pub queries_errored: u64,
    pub background_queue_length: usize,
}

impl PoolStats {
    /// Serialize the snapshot for telemetry export.
    ///
    /// # Errors
    /// Returns the underlying serialization error, which does not occur for
    /// this shape in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub(crate) fn connection_info(
    metrics: &ConnMetrics,
    is_ready: bool,
    is_background: bool,
) -> ConnectionInfo {
    ConnectionInfo {
        queries_processed: metrics.queries_processed,
        queries_errored: metrics.queries_errored,
        avg_query_secs: metrics.avg_query_secs,
        busy_secs: metrics.busy_secs,
        is_ready,
        is_background,
    }
}
