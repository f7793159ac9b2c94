//! Read-only introspection statements.

use crate::sql::{identifier, quote_string};

pub fn show_tables_sql() -> String {
    "SHOW TABLES".to_string()
}

pub fn describe_table_sql(table: &str) -> String {
    format!("DESCRIBE TABLE {}", identifier(table))
}

/// Counts tables named `table` in the current database (0 or 1).
pub fn table_exists_sql(table: &str) -> String {
    format!(
        "SELECT count() FROM system.tables WHERE database = currentDatabase() AND name = {}",
        quote_string(table)
    )
}

pub fn select_all_sql(table: &str) -> String {
    format!("SELECT * FROM {}", identifier(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_escape_names() {
        assert_eq!(describe_table_sql("events"), "DESCRIBE TABLE events");
        assert_eq!(select_all_sql("my table"), "SELECT * FROM `my table`");
        assert_eq!(
            table_exists_sql("x' OR '1'='1"),
            "SELECT count() FROM system.tables WHERE database = currentDatabase() \
             AND name = 'x\\' OR \\'1\\'=\\'1'"
        );
    }
}
