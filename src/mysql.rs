//! Driver backed by the pure-Rust `mysql` client.
//!
//! Session options map onto connect-time init commands; result rows are
//! streamed through `query_iter` without client-side buffering. When
//! auto-reconnect is enabled, a session whose last statement failed is
//! re-established before the next one.

use std::sync::Arc;

use ::mysql::consts::{ColumnFlags, ColumnType};
use ::mysql::prelude::Queryable;
use ::mysql::{Column, Conn, Opts, OptsBuilder};

use crate::driver::{
    ConnectParams, FieldMeta, FieldType, RowsCursor, SessionDriver, SessionOpts, StreamedRow,
};
use crate::error::DriverError;

impl From<::mysql::Error> for DriverError {
    fn from(err: ::mysql::Error) -> Self {
        DriverError(err.to_string())
    }
}

/// One MySQL/MariaDB session.
#[derive(Default)]
pub struct MysqlDriver {
    opts: Option<Opts>,
    conn: Option<Conn>,
    session_opts: Option<SessionOpts>,
    auto_reconnect: bool,
    dead: bool,
}

impl MysqlDriver {
    fn reconnect(&mut self) -> Result<(), DriverError> {
        let opts = self
            .opts
            .clone()
            .ok_or_else(|| DriverError::new("session was never connected"))?;
        self.conn = Some(Conn::new(opts)?);
        self.dead = false;
        Ok(())
    }
}

impl SessionDriver for MysqlDriver {
    fn configure(&mut self, opts: &SessionOpts) -> Result<(), DriverError> {
        self.auto_reconnect = opts.auto_reconnect;
        self.session_opts = Some(opts.clone());
        Ok(())
    }

    fn connect(&mut self, params: &ConnectParams) -> Result<(), DriverError> {
        let init = self
            .session_opts
            .as_ref()
            .map(|opts| vec![opts.init_command.clone()])
            .unwrap_or_default();
        let opts: Opts = OptsBuilder::new()
            .ip_or_hostname(Some(params.host.clone()))
            .tcp_port(params.port)
            .user(Some(params.user.clone()))
            .pass(Some(params.password.clone()))
            .db_name(Some(params.database.clone()))
            .init(init)
            .into();
        self.conn = Some(Conn::new(opts.clone())?);
        self.opts = Some(opts);
        self.dead = false;
        Ok(())
    }

    fn execute(&mut self, statement: &str) -> Result<Box<dyn RowsCursor + '_>, DriverError> {
        if self.conn.is_none() || (self.dead && self.auto_reconnect) {
            self.reconnect()?;
        }
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| DriverError::new("session not connected"))?;
        match conn.query_iter(statement) {
            Ok(result) => {
                self.dead = false;
                Ok(Box::new(MysqlCursor {
                    result,
                    fields: None,
                }))
            }
            Err(err) => {
                self.dead = true;
                Err(DriverError(err.to_string()))
            }
        }
    }

    fn close(&mut self) -> Result<(), DriverError> {
        // The client disconnects on drop.
        self.conn = None;
        Ok(())
    }
}

struct MysqlCursor<'a> {
    result: ::mysql::QueryResult<'a, 'a, 'a, ::mysql::Text>,
    fields: Option<Arc<Vec<FieldMeta>>>,
}

impl RowsCursor for MysqlCursor<'_> {
    fn next_row(&mut self) -> Result<Option<StreamedRow>, DriverError> {
        match self.result.next() {
            None => Ok(None),
            Some(Err(err)) => Err(DriverError(err.to_string())),
            Some(Ok(row)) => {
                let fields = self
                    .fields
                    .get_or_insert_with(|| {
                        Arc::new(row.columns_ref().iter().map(field_meta).collect())
                    })
                    .clone();
                let cells = (0..row.len())
                    .map(|i| row.as_ref(i).and_then(text_cell))
                    .collect();
                Ok(Some(StreamedRow { fields, cells }))
            }
        }
    }
}

fn field_meta(column: &Column) -> FieldMeta {
    let field_type = match column.column_type() {
        ColumnType::MYSQL_TYPE_TINY => FieldType::Tiny,
        ColumnType::MYSQL_TYPE_SHORT => FieldType::Short,
        ColumnType::MYSQL_TYPE_INT24 => FieldType::Int24,
        ColumnType::MYSQL_TYPE_LONG => FieldType::Long,
        ColumnType::MYSQL_TYPE_LONGLONG => FieldType::LongLong,
        ColumnType::MYSQL_TYPE_FLOAT => FieldType::Float,
        ColumnType::MYSQL_TYPE_DOUBLE => FieldType::Double,
        ColumnType::MYSQL_TYPE_STRING => FieldType::String,
        ColumnType::MYSQL_TYPE_VAR_STRING => FieldType::VarString,
        ColumnType::MYSQL_TYPE_BLOB => FieldType::Blob,
        _ => FieldType::Other,
    };
    FieldMeta::new(
        column.name_str().into_owned(),
        field_type,
        column.flags().contains(ColumnFlags::UNSIGNED_FLAG),
    )
}

fn text_cell(value: &::mysql::Value) -> Option<String> {
    use ::mysql::Value;
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::Int(n) => Some(n.to_string()),
        Value::UInt(n) => Some(n.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Double(d) => Some(d.to_string()),
        Value::Date(year, month, day, hour, minute, second, micros) => Some(format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
        )),
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if *negative { "-" } else { "" };
            let total_hours = u32::from(*hours) + days * 24;
            Some(format!(
                "{sign}{total_hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
            ))
        }
    }
}
