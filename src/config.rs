use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::SessionOpts;

/// Server flavor; the two spell the statement-time-cap variable differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerFlavor {
    MySql,
    MariaDb,
}

impl ServerFlavor {
    fn statement_time_variable(self) -> &'static str {
        match self {
            ServerFlavor::MySql => "max_execution_time",
            ServerFlavor::MariaDb => "max_statement_time",
        }
    }
}

/// Pool configuration.
///
/// ```rust
/// use mysql_middleware::config::PoolConfig;
///
/// let config = PoolConfig::default().with_pool_size(8);
/// assert_eq!(config.pool_size, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of foreground connections; fixed for the pool's lifetime
    pub pool_size: usize,
    /// Worker sleep when the background queue is empty, in milliseconds
    pub drain_interval_ms: u64,
    /// Server-side statement execution cap, in milliseconds
    pub statement_time_cap_ms: u32,
    /// Connection character set
    pub charset: String,
    /// Ask the client to re-establish dropped sessions transparently
    pub auto_reconnect: bool,
    /// Spelling of the statement-time-cap session variable
    pub flavor: ServerFlavor,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 16,
            drain_interval_ms: 250,
            statement_time_cap_ms: 3000,
            charset: "utf8mb4".to_string(),
            auto_reconnect: true,
            flavor: ServerFlavor::MySql,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval_ms = interval.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_statement_time_cap_ms(mut self, cap_ms: u32) -> Self {
        self.statement_time_cap_ms = cap_ms;
        self
    }

    #[must_use]
    pub fn with_flavor(mut self, flavor: ServerFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    #[must_use]
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub(crate) fn session_opts(&self) -> SessionOpts {
        SessionOpts {
            charset: self.charset.clone(),
            init_command: format!(
                "SET NAMES {}, @@SESSION.{}={}",
                self.charset,
                self.flavor.statement_time_variable(),
                self.statement_time_cap_ms
            ),
            auto_reconnect: self.auto_reconnect,
        }
    }
}
