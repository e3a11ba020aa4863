//! Thread-based MySQL/MariaDB connection-pool middleware.
//!
//! A fixed set of persistent connections is multiplexed across concurrent
//! caller threads with round-robin skip-busy selection, plus one dedicated
//! background connection whose worker drains a fire-and-forget task queue.
//! Parameters are substituted textually into `?` placeholders after
//! injection-safe escaping, result rows are decoded into a closed set of
//! value kinds, and coarse telemetry (per-connection load, last error) is
//! available through snapshots.
//!
//! Failures never cross the query surface as errors: `query` returns a table
//! (empty when nothing was decoded), `connect` a boolean, and the detail
//! lands in the error sink
//! read by [`MysqlPool::get_last_error`](pool::MysqlPool::get_last_error).
//!
//! The underlying client is consumed only through the
//! [`SessionDriver`](driver::SessionDriver) seam; enable the `mysql` feature
//! for the driver backed by the `mysql` crate:
//!
//! ```rust,no_run
//! # #[cfg(feature = "mysql")] {
//! use mysql_middleware::prelude::*;
//!
//! let pool = MysqlPool::new(PoolConfig::default());
//! if pool.connect("localhost", "app", "secret", "appdb", 3306) {
//!     let rows = pool.query("SELECT * FROM ?;", &[RowValues::from("users")]);
//!     pool.query_detach("INSERT INTO audit (what) VALUES ('?');", &[RowValues::from("login")]);
//!     println!("{} rows, {:?}", rows.len(), pool.get_connection_stats());
//! }
//! pool.close();
//! # }
//! ```

mod background;
mod connection;
mod executor;

pub mod config;
pub mod driver;
pub mod error;
pub mod pool;
pub mod stats;
pub mod types;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{PoolConfig, ServerFlavor};
pub use error::{DriverError, ErrorSink, LastError, MysqlMiddlewareError};
pub use pool::MysqlPool;
pub use stats::{ConnectionInfo, PoolStats};
pub use types::{ResultSet, RowValues, SqlRow};

/// Convenient imports for common functionality.
pub mod prelude {
    pub use crate::config::{PoolConfig, ServerFlavor};
    pub use crate::driver::{
        ConnectParams, FieldMeta, FieldType, RowsCursor, SessionDriver, SessionOpts, StreamedRow,
    };
    pub use crate::error::{DriverError, LastError, MysqlMiddlewareError};
    pub use crate::pool::MysqlPool;
    pub use crate::stats::{ConnectionInfo, PoolStats};
    pub use crate::types::{ResultSet, RowValues, SqlRow};
}
