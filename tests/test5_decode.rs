use mysql_middleware::driver::{FieldMeta, FieldType};
use mysql_middleware::prelude::*;
use mysql_middleware::test_utils::{StubDriver, StubResult, new_log};

fn pool_with_result(result: StubResult) -> MysqlPool<StubDriver> {
    let log = new_log();
    let mut next = 0usize;
    let pool = MysqlPool::with_driver(PoolConfig::default().with_pool_size(1), move || {
        let driver = StubDriver::new(next, log.clone()).with_result(result.clone());
        next += 1;
        driver
    });
    assert!(pool.connect("localhost", "user", "pw", "db", 3306));
    pool
}

#[test]
fn integer_columns_decode_by_server_type_and_sign() {
    let result = StubResult {
        fields: vec![
            FieldMeta::new("tiny", FieldType::Tiny, false),
            FieldMeta::new("short_u", FieldType::Short, true),
            FieldMeta::new("medium", FieldType::Int24, false),
            FieldMeta::new("big", FieldType::Long, false),
            FieldMeta::new("big_u", FieldType::LongLong, true),
        ],
        rows: vec![vec![
            Some("-7".to_string()),
            Some("65535".to_string()),
            Some("-8388608".to_string()),
            Some("-2147483649".to_string()),
            Some("18446744073709551615".to_string()),
        ]],
    };
    let pool = pool_with_result(result);

    let rows = pool.query("SELECT * FROM widths;", &[]);
    assert_eq!(rows.len(), 1);
    let row = rows.iter().next().unwrap();
    assert_eq!(row.get("tiny"), Some(&RowValues::SmallInt(-7)));
    assert_eq!(row.get("short_u"), Some(&RowValues::UInt(65_535)));
    assert_eq!(row.get("medium"), Some(&RowValues::Int(-8_388_608)));
    assert_eq!(row.get("big"), Some(&RowValues::BigInt(-2_147_483_649)));
    assert_eq!(row.get("big_u"), Some(&RowValues::BigUInt(u64::MAX)));
    pool.close();
}

#[test]
fn float_double_and_string_columns_decode() {
    let result = StubResult {
        fields: vec![
            FieldMeta::new("ratio", FieldType::Float, false),
            FieldMeta::new("precise", FieldType::Double, false),
            FieldMeta::new("name", FieldType::VarString, false),
            FieldMeta::new("payload", FieldType::Blob, false),
        ],
        rows: vec![vec![
            Some("1.5".to_string()),
            Some("2.25".to_string()),
            Some("alice".to_string()),
            Some("raw bytes".to_string()),
        ]],
    };
    let pool = pool_with_result(result);

    let rows = pool.query("SELECT * FROM mixed;", &[]);
    let row = rows.iter().next().unwrap();
    assert_eq!(row.get("ratio"), Some(&RowValues::Float(1.5)));
    assert_eq!(row.get("precise"), Some(&RowValues::Double(2.25)));
    assert_eq!(row.get("name"), Some(&RowValues::Text("alice".to_string())));
    assert_eq!(
        row.get("payload"),
        Some(&RowValues::Text("raw bytes".to_string()))
    );
    pool.close();
}

#[test]
fn null_and_unparsable_numerics_fall_back_to_text() {
    let result = StubResult {
        fields: vec![
            FieldMeta::new("maybe", FieldType::Long, false),
            FieldMeta::new("garbled", FieldType::Int24, false),
        ],
        rows: vec![vec![None, Some("12abc".to_string())]],
    };
    let pool = pool_with_result(result);

    let rows = pool.query("SELECT * FROM odd;", &[]);
    let row = rows.iter().next().unwrap();
    assert_eq!(row.get("maybe"), Some(&RowValues::Text(String::new())));
    assert_eq!(
        row.get("garbled"),
        Some(&RowValues::Text("12abc".to_string()))
    );
    pool.close();
}

#[test]
fn column_lookup_works_by_name_and_index() {
    let result = StubResult::text_table(&["id", "name"], &[&["1", "alice"], &["2", "bob"]]);
    let pool = pool_with_result(result);

    let rows = pool.query("SELECT id, name FROM users;", &[]);
    assert_eq!(rows.len(), 2);
    let mut names = Vec::new();
    for row in &rows {
        assert_eq!(row.get_column_index("name"), Some(1));
        let name = row.get_by_index(1).and_then(RowValues::as_text).unwrap();
        names.push(name.to_string());
    }
    assert_eq!(names, vec!["alice", "bob"]);
    assert!(rows.iter().next().unwrap().get("missing").is_none());
    pool.close();
}
