use std::collections::HashMap;
use std::sync::Arc;

/// Values that can be used as query parameters or decoded result cells.
///
/// The set is closed on purpose: every encode and decode site matches
/// exhaustively, so an unrecognized kind cannot pass through silently.
/// ```rust
/// use mysql_middleware::types::RowValues;
///
/// let params = vec![
///     RowValues::BigInt(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// 32-bit unsigned integer
    UInt(u32),
    /// 64-bit unsigned integer
    BigUInt(u64),
    /// 16-bit signed integer
    SmallInt(i16),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    BigInt(i64),
    /// Boolean value
    Bool(bool),
    /// Text/string value
    Text(String),
}

impl RowValues {
    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        if let RowValues::Double(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_uint(&self) -> Option<u32> {
        if let RowValues::UInt(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_big_uint(&self) -> Option<u64> {
        if let RowValues::BigUInt(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_small_int(&self) -> Option<i16> {
        if let RowValues::SmallInt(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        if let RowValues::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_big_int(&self) -> Option<i64> {
        if let RowValues::BigInt(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if let RowValues::Bool(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Canonical textual form used for placeholder substitution.
    ///
    /// Numerics render through `Display`, booleans as `1`/`0`, text as-is.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            RowValues::Float(v) => v.to_string(),
            RowValues::Double(v) => v.to_string(),
            RowValues::UInt(v) => v.to_string(),
            RowValues::BigUInt(v) => v.to_string(),
            RowValues::SmallInt(v) => v.to_string(),
            RowValues::Int(v) => v.to_string(),
            RowValues::BigInt(v) => v.to_string(),
            RowValues::Bool(v) => String::from(if *v { "1" } else { "0" }),
            RowValues::Text(v) => v.clone(),
        }
    }
}

impl From<f32> for RowValues {
    fn from(value: f32) -> Self {
        RowValues::Float(value)
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Double(value)
    }
}

impl From<u32> for RowValues {
    fn from(value: u32) -> Self {
        RowValues::UInt(value)
    }
}

impl From<u64> for RowValues {
    fn from(value: u64) -> Self {
        RowValues::BigUInt(value)
    }
}

impl From<i16> for RowValues {
    fn from(value: i16) -> Self {
        RowValues::SmallInt(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(value)
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::BigInt(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

/// A row from a query result.
///
/// Column names are shared across all rows of one result set, with a cached
/// name-to-index map to avoid repeated string comparisons.
#[derive(Debug, Clone)]
pub struct SqlRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The decoded values for this row
    pub values: Vec<RowValues>,
    #[doc(hidden)]
    column_index: Arc<HashMap<String, usize>>,
}

impl SqlRow {
    /// Create a new row, building the column-index cache from the names.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let column_index = Arc::new(
            column_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect::<HashMap<_, _>>(),
        );
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Create a row reusing an index cache already built for this result set.
    pub(crate) fn from_parts(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Get the index of a column by name, cache first then linear scan.
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index.get(column_name) {
            return Some(idx);
        }
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value by column name, or `None` if the column is absent.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value by column index, or `None` if out of bounds.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }
}

/// An ordered result table; row order is the server's result order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the statement
    pub rows: Vec<SqlRow>,
}

impl ResultSet {
    /// Create a result set with preallocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Append a row in server order.
    pub fn add_row(&mut self, row: SqlRow) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SqlRow> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a SqlRow;
    type IntoIter = std::slice::Iter<'a, SqlRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_rendering_matches_wire_text() {
        assert_eq!(RowValues::Bool(true).to_sql_literal(), "1");
        assert_eq!(RowValues::Bool(false).to_sql_literal(), "0");
        assert_eq!(RowValues::SmallInt(-7).to_sql_literal(), "-7");
        assert_eq!(
            RowValues::BigUInt(u64::MAX).to_sql_literal(),
            "18446744073709551615"
        );
        assert_eq!(RowValues::Double(2.5).to_sql_literal(), "2.5");
        assert_eq!(RowValues::Text("users".into()).to_sql_literal(), "users");
    }

    #[test]
    fn row_lookup_by_name_and_index() {
        let names = Arc::new(vec!["id".to_string(), "name".to_string()]);
        let row = SqlRow::new(names, vec![RowValues::BigInt(3), RowValues::Text("a".into())]);
        assert_eq!(row.get("id"), Some(&RowValues::BigInt(3)));
        assert_eq!(row.get_by_index(1), Some(&RowValues::Text("a".into())));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.get_by_index(9), None);
    }

    #[test]
    fn from_conversions_cover_every_kind() {
        assert_eq!(RowValues::from(1.5f32), RowValues::Float(1.5));
        assert_eq!(RowValues::from(1.5f64), RowValues::Double(1.5));
        assert_eq!(RowValues::from(5u32), RowValues::UInt(5));
        assert_eq!(RowValues::from(5u64), RowValues::BigUInt(5));
        assert_eq!(RowValues::from(5i16), RowValues::SmallInt(5));
        assert_eq!(RowValues::from(5i32), RowValues::Int(5));
        assert_eq!(RowValues::from(5i64), RowValues::BigInt(5));
        assert_eq!(RowValues::from(true), RowValues::Bool(true));
        assert_eq!(RowValues::from("x"), RowValues::Text("x".into()));
    }
}
