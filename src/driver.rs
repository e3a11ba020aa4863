//! Seam to the database client capability.
//!
//! The pool consumes the underlying MySQL/MariaDB client only through
//! [`SessionDriver`]: option setup, connect, escaping, statement execution
//! with row streaming, and close. The wire protocol, authentication, TLS,
//! and statement preparation all live behind this trait.

use std::sync::Arc;

use crate::error::DriverError;

/// Session options applied before connecting.
#[derive(Debug, Clone)]
pub struct SessionOpts {
    /// Connection character set, e.g. `utf8mb4`
    pub charset: String,
    /// Init command run on connect; carries the server-side statement time cap
    pub init_command: String,
    /// Ask the client to transparently re-establish a dropped session
    pub auto_reconnect: bool,
}

/// Parameters for establishing a session.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
}

/// Server-reported column type, reduced to the kinds the decoder handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Tiny,
    Short,
    Int24,
    Long,
    LongLong,
    Float,
    Double,
    String,
    VarString,
    Blob,
    /// Anything else (dates, json, decimals, ...) decodes as text
    Other,
}

/// Per-column metadata reported alongside streamed rows.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub name: String,
    pub field_type: FieldType,
    pub unsigned: bool,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, field_type: FieldType, unsigned: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            unsigned,
        }
    }
}

/// One streamed row: field metadata plus text-protocol cells.
///
/// `None` cells are SQL NULL. Field metadata is shared across the rows of one
/// result set.
#[derive(Debug, Clone)]
pub struct StreamedRow {
    pub fields: Arc<Vec<FieldMeta>>,
    pub cells: Vec<Option<String>>,
}

/// Streaming cursor over one statement's result rows.
///
/// Rows are pulled one at a time so large results are never buffered
/// client-side.
pub trait RowsCursor {
    /// Next row in server order, `Ok(None)` at end of stream.
    fn next_row(&mut self) -> Result<Option<StreamedRow>, DriverError>;
}

/// The database client capability consumed by the pool.
///
/// One implementor owns one session handle. All methods take `&mut self`;
/// the pool serializes access through each connection's own lock.
pub trait SessionDriver: Send {
    /// Apply session options; called once before [`SessionDriver::connect`].
    fn configure(&mut self, opts: &SessionOpts) -> Result<(), DriverError>;

    /// Establish the session.
    fn connect(&mut self, params: &ConnectParams) -> Result<(), DriverError>;

    /// Escape a value's textual form for safe inclusion in a statement
    /// literal. The default implements the MySQL client escaping rules.
    fn escape(&mut self, raw: &str) -> Result<String, DriverError> {
        Ok(escape_literal(raw))
    }

    /// Submit a statement and stream its result rows.
    fn execute(&mut self, statement: &str) -> Result<Box<dyn RowsCursor + '_>, DriverError>;

    /// Tear down the session.
    fn close(&mut self) -> Result<(), DriverError>;
}

/// Escape a string for inclusion in a MySQL statement literal.
///
/// Mirrors `mysql_real_escape_string`: NUL, newline, carriage return,
/// backslash, both quote kinds, and Ctrl-Z are backslash-escaped so embedded
/// bytes cannot terminate the surrounding literal early.
#[must_use]
pub fn escape_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\u{1a}' => out.push_str("\\Z"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unescape(escaped: &str) -> String {
        let mut out = String::with_capacity(escaped.len());
        let mut chars = escaped.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some('0') => out.push('\0'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('"') => out.push('"'),
                Some('Z') => out.push('\u{1a}'),
                Some(other) => out.push(other),
                None => {}
            }
        }
        out
    }

    #[test]
    fn escape_round_trips_original_bytes() {
        let nasty = "Rob'); DROP TABLE users;--\n\"\\\0\u{1a}";
        let escaped = escape_literal(nasty);
        assert_eq!(unescape(&escaped), nasty);
    }

    #[test]
    fn escaped_text_never_contains_bare_quote() {
        let escaped = escape_literal("it's a 'test'");
        let bytes = escaped.as_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if *b == b'\'' {
                assert!(i > 0 && bytes[i - 1] == b'\\', "bare quote at {i}");
            }
        }
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(escape_literal("users"), "users");
    }
}
