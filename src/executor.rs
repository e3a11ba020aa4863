//! The escape → substitute → execute → decode pipeline shared by the
//! synchronous and background paths.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::warn;

use crate::connection::PoolConnection;
use crate::driver::{FieldMeta, FieldType, SessionDriver, StreamedRow};
use crate::error::{ErrorSink, MysqlMiddlewareError};
use crate::types::{ResultSet, RowValues, SqlRow};

/// Run one statement on `conn` and decode the result.
///
/// Never fails outward: every failure is recorded in the sink and counted on
/// the connection and the process-wide counter. An up-front failure yields an
/// empty table; a mid-stream failure keeps the rows decoded so far.
pub(crate) fn run<D: SessionDriver>(
    conn: &PoolConnection<D>,
    template: &str,
    params: &[RowValues],
    sink: &ErrorSink,
    errored_total: &AtomicU64,
) -> ResultSet {
    let mut session = conn.session.lock();

    // Escape first; any parameter failure aborts the whole statement before
    // the server is contacted.
    let mut escaped = Vec::with_capacity(params.len());
    for param in params {
        match session.escape(&param.to_sql_literal()) {
            Ok(text) => escaped.push(text),
            Err(err) => {
                warn!(error = %err, "parameter escaping failed");
                sink.report(MysqlMiddlewareError::ParameterEscape(err.to_string()).to_string());
                errored_total.fetch_add(1, Ordering::Relaxed);
                conn.note_error();
                return ResultSet::default();
            }
        }
    }

    let statement = substitute_placeholders(template, &escaped);

    conn.set_busy(true);
    let started = Instant::now();
    let mut table = ResultSet::default();
    {
        match session.execute(&statement) {
            Ok(mut cursor) => {
                let mut decoder = RowDecoder::default();
                loop {
                    match cursor.next_row() {
                        Ok(Some(row)) => {
                            if let Some(decoded) = decoder.decode(&row) {
                                table.add_row(decoded);
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            warn!(error = %err, "result streaming failed");
                            sink.report(
                                MysqlMiddlewareError::Execution(format!(
                                    "{err} on query {statement}"
                                ))
                                .to_string(),
                            );
                            errored_total.fetch_add(1, Ordering::Relaxed);
                            conn.note_error();
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "statement execution failed");
                sink.report(
                    MysqlMiddlewareError::Execution(format!("{err} on query {statement}"))
                        .to_string(),
                );
                errored_total.fetch_add(1, Ordering::Relaxed);
                conn.note_error();
            }
        }
    }
    conn.record_completion(started.elapsed());
    conn.set_busy(false);
    table
}

/// Substitute each literal `?` with the next escaped parameter.
///
/// Placeholders beyond the parameter count reuse the last parameter; with no
/// parameters at all, `?` passes through untouched. Substitution is purely
/// textual, left to right.
pub(crate) fn substitute_placeholders(template: &str, escaped: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut next = 0usize;
    for ch in template.chars() {
        if ch == '?' && next < escaped.len() {
            out.push_str(&escaped[next]);
            if next + 1 < escaped.len() {
                next += 1;
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Decodes streamed rows, sharing one column-name allocation per result set.
#[derive(Default)]
struct RowDecoder {
    columns: Option<(Arc<Vec<String>>, Arc<HashMap<String, usize>>)>,
}

impl RowDecoder {
    /// Decode one row; zero-column rows are skipped.
    fn decode(&mut self, row: &StreamedRow) -> Option<SqlRow> {
        if row.fields.is_empty() {
            return None;
        }
        let (names, index) = self
            .columns
            .get_or_insert_with(|| {
                let names: Vec<String> =
                    row.fields.iter().map(|field| field.name.clone()).collect();
                let index: HashMap<String, usize> = names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), i))
                    .collect();
                (Arc::new(names), Arc::new(index))
            })
            .clone();
        let values = row
            .fields
            .iter()
            .zip(row.cells.iter())
            .map(|(field, cell)| decode_cell(field, cell.as_deref()))
            .collect();
        Some(SqlRow::from_parts(names, index, values))
    }
}

fn parse_numeric<T: FromStr>(text: &str, wrap: fn(T) -> RowValues) -> RowValues {
    text.parse::<T>()
        .map(wrap)
        .unwrap_or_else(|_| RowValues::Text(text.to_string()))
}

/// Map a text-protocol cell to a value kind per the server-reported type.
///
/// The unsigned column flag is honored: unsigned integer columns decode
/// through the unsigned kinds so large values keep their sign. NULL or
/// unparsable numeric cells fall back to text of the raw bytes.
fn decode_cell(field: &FieldMeta, cell: Option<&str>) -> RowValues {
    let text = cell.unwrap_or("");
    match (field.field_type, field.unsigned) {
        (FieldType::Tiny | FieldType::Short, false) => parse_numeric(text, RowValues::SmallInt),
        (FieldType::Int24, false) => parse_numeric(text, RowValues::Int),
        (FieldType::Long | FieldType::LongLong, false) => parse_numeric(text, RowValues::BigInt),
        (FieldType::Tiny | FieldType::Short | FieldType::Int24, true) => {
            parse_numeric(text, RowValues::UInt)
        }
        (FieldType::Long | FieldType::LongLong, true) => parse_numeric(text, RowValues::BigUInt),
        (FieldType::Float, _) => parse_numeric(text, RowValues::Float),
        (FieldType::Double, _) => parse_numeric(text, RowValues::Double),
        (FieldType::String | FieldType::VarString | FieldType::Blob | FieldType::Other, _) => {
            RowValues::Text(text.to_string())
        }
    }
}
