//! Scripted session driver for exercising the pool without a database server.
//!
//! Enabled through the `test-utils` feature; the crate's own integration
//! tests pull it in via a path dev-dependency.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::driver::{
    ConnectParams, FieldMeta, FieldType, RowsCursor, SessionDriver, SessionOpts, StreamedRow,
    escape_literal,
};
use crate::error::DriverError;

/// What a [`StubDriver`] session has been asked to do, tagged with its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubEvent {
    Configured(usize),
    Connected(usize),
    Executed(usize, String),
    Closed(usize),
}

/// Shared event log across every session created by one factory.
pub type StubLog = Arc<Mutex<Vec<StubEvent>>>;

/// Fresh empty event log.
#[must_use]
pub fn new_log() -> StubLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Collect the statements executed so far, in order.
#[must_use]
pub fn executed_statements(log: &StubLog) -> Vec<(usize, String)> {
    log.lock()
        .iter()
        .filter_map(|event| match event {
            StubEvent::Executed(label, statement) => Some((*label, statement.clone())),
            _ => None,
        })
        .collect()
}

/// One canned result set served for every executed statement.
#[derive(Debug, Clone, Default)]
pub struct StubResult {
    pub fields: Vec<FieldMeta>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl StubResult {
    /// All-text table helper: column names plus rows of cell text.
    #[must_use]
    pub fn text_table(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            fields: columns
                .iter()
                .map(|name| FieldMeta::new(*name, FieldType::VarString, false))
                .collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| Some((*cell).to_string())).collect())
                .collect(),
        }
    }
}

/// Scripted driver: logs every call, serves a canned result, and can be told
/// to fail or stall at each step of the session lifecycle.
pub struct StubDriver {
    label: usize,
    log: StubLog,
    canned: StubResult,
    fail_configure: bool,
    fail_connect: bool,
    fail_escape: bool,
    execute_error: Option<String>,
    stream_error: Option<(usize, String)>,
    delay: Option<Duration>,
    delay_marker: Option<String>,
}

impl StubDriver {
    #[must_use]
    pub fn new(label: usize, log: StubLog) -> Self {
        Self {
            label,
            log,
            canned: StubResult::default(),
            fail_configure: false,
            fail_connect: false,
            fail_escape: false,
            execute_error: None,
            stream_error: None,
            delay: None,
            delay_marker: None,
        }
    }

    #[must_use]
    pub fn label(&self) -> usize {
        self.label
    }

    #[must_use]
    pub fn with_result(mut self, result: StubResult) -> Self {
        self.canned = result;
        self
    }

    #[must_use]
    pub fn with_configure_failure(mut self) -> Self {
        self.fail_configure = true;
        self
    }

    #[must_use]
    pub fn with_connect_failure(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    #[must_use]
    pub fn with_escape_failure(mut self) -> Self {
        self.fail_escape = true;
        self
    }

    #[must_use]
    pub fn with_execute_error(mut self, message: impl Into<String>) -> Self {
        self.execute_error = Some(message.into());
        self
    }

    /// Fail the row stream after yielding `rows` rows.
    #[must_use]
    pub fn with_stream_failure_after(mut self, rows: usize, message: impl Into<String>) -> Self {
        self.stream_error = Some((rows, message.into()));
        self
    }

    /// Sleep inside every execute call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep only when the statement contains `marker`.
    #[must_use]
    pub fn with_delay_on(mut self, marker: impl Into<String>, delay: Duration) -> Self {
        self.delay = Some(delay);
        self.delay_marker = Some(marker.into());
        self
    }
}

impl SessionDriver for StubDriver {
    fn configure(&mut self, _opts: &SessionOpts) -> Result<(), DriverError> {
        self.log.lock().push(StubEvent::Configured(self.label));
        if self.fail_configure {
            return Err(DriverError::new("option setup rejected"));
        }
        Ok(())
    }

    fn connect(&mut self, _params: &ConnectParams) -> Result<(), DriverError> {
        self.log.lock().push(StubEvent::Connected(self.label));
        if self.fail_connect {
            return Err(DriverError::new("Access denied for user"));
        }
        Ok(())
    }

    fn escape(&mut self, raw: &str) -> Result<String, DriverError> {
        if self.fail_escape {
            return Err(DriverError::new("escape rejected"));
        }
        Ok(escape_literal(raw))
    }

    fn execute(&mut self, statement: &str) -> Result<Box<dyn RowsCursor + '_>, DriverError> {
        self.log
            .lock()
            .push(StubEvent::Executed(self.label, statement.to_string()));
        if let Some(delay) = self.delay {
            let applies = self
                .delay_marker
                .as_ref()
                .is_none_or(|marker| statement.contains(marker.as_str()));
            if applies {
                thread::sleep(delay);
            }
        }
        if let Some(message) = &self.execute_error {
            return Err(DriverError(message.clone()));
        }
        Ok(Box::new(StubCursor {
            fields: Arc::new(self.canned.fields.clone()),
            rows: self.canned.rows.clone().into_iter(),
            fail_after: self.stream_error.clone(),
            yielded: 0,
        }))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.log.lock().push(StubEvent::Closed(self.label));
        Ok(())
    }
}

struct StubCursor {
    fields: Arc<Vec<FieldMeta>>,
    rows: std::vec::IntoIter<Vec<Option<String>>>,
    fail_after: Option<(usize, String)>,
    yielded: usize,
}

impl RowsCursor for StubCursor {
    fn next_row(&mut self) -> Result<Option<StreamedRow>, DriverError> {
        if let Some((after, message)) = &self.fail_after
            && self.yielded == *after
        {
            return Err(DriverError::new(message.clone()));
        }
        match self.rows.next() {
            Some(cells) => {
                self.yielded += 1;
                Ok(Some(StreamedRow {
                    fields: Arc::clone(&self.fields),
                    cells,
                }))
            }
            None => Ok(None),
        }
    }
}
