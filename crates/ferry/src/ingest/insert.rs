//! INSERT statement building.

use crate::input::CellValue;
use crate::schema::TableSpec;
use crate::sql::{cell_literal, quote_identifier};

/// One multi-row `INSERT ... VALUES` statement for `rows`.
///
/// Each row is rendered in column order: `NULL` for missing cells, a bare
/// literal for numbers and an escaped single-quoted literal for text.
pub fn insert_sql(table: &TableSpec, rows: &[Vec<CellValue>]) -> String {
    let mut sql = format!("INSERT INTO {} VALUES ", quote_identifier(&table.name));

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            sql.push(',');
        }
        sql.push('(');
        for (j, cell) in row.iter().enumerate() {
            if j > 0 {
                sql.push(',');
            }
            sql.push_str(&cell_literal(cell));
        }
        sql.push(')');
    }

    sql
}
