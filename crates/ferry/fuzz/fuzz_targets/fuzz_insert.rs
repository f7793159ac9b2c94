//! Fuzz target for INSERT statement escaping.
//!
//! Any text cell must come back unchanged after a trip through the
//! in-memory store.

#![no_main]

use ferry::ingest::insert_sql;
use ferry::{CellValue, ColumnSpec, ColumnType, MockStore, Store, TableSpec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|text: String| {
    let store = MockStore::new();
    let table = TableSpec::new("fuzz", vec![ColumnSpec::new("v", ColumnType::Text)]);
    if store.execute(&table.create_table_sql()).is_err() {
        return;
    }

    let sql = insert_sql(&table, &[vec![CellValue::Text(text.clone())]]);
    store.execute(&sql).expect("escaped insert must parse");

    let rows = store.rows("fuzz").unwrap_or_default();
    assert_eq!(rows[0][0], serde_json::Value::String(text));
});
