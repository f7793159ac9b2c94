//! Deterministic SQL composition from a [`QuerySpec`].

use std::collections::HashSet;

use crate::error::{FerryError, Result};
use crate::sql::identifier;

use super::spec::QuerySpec;

/// Compose a read query for `spec`, optionally paginated.
///
/// Join clauses are emitted in the order supplied, directly after the base table.
pub fn compose(spec: &QuerySpec, limit: Option<u64>, offset: Option<u64>) -> Result<String> {
    validate(spec)?;

    let columns = spec
        .columns
        .iter()
        .map(|c| qualified(c, true))
        .collect::<Result<Vec<_>>>()?
        .join(", ");

    let mut query = format!("SELECT {} FROM {}", columns, single(&spec.tables[0])?);

    if spec.is_multi_table() {
        for join in &spec.join_conditions {
            let right = single(&join.right_table)?;
            query.push_str(&format!(
                " {} JOIN {} ON {}.{} = {}.{}",
                join.join_type,
                right,
                single(&join.left_table)?,
                single(&join.left_column)?,
                right,
                single(&join.right_column)?,
            ));
        }
    }

    Ok(paginate(&query, limit, offset))
}

/// Row count of an arbitrary query.
pub fn count_query(query: &str) -> String {
    format!("SELECT count() FROM ({})", query)
}

/// Append a `LIMIT`/`OFFSET` clause.
pub fn paginate(query: &str, limit: Option<u64>, offset: Option<u64>) -> String {
    match (limit, offset) {
        (Some(limit), Some(offset)) => format!("{} LIMIT {} OFFSET {}", query, limit, offset),
        (Some(limit), None) => format!("{} LIMIT {}", query, limit),
        (None, Some(offset)) => format!("{} OFFSET {} ROWS", query, offset),
        (None, None) => query.to_string(),
    }
}

/// Wrap a caller-supplied query so it can be counted and paginated.
pub fn wrap_raw_query(sql: &str) -> Result<String> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() {
        return Err(FerryError::InvalidQuery("Query is empty".to_string()));
    }
    Ok(format!("SELECT * FROM ({})", trimmed))
}

/// Reject specs that would produce broken query text.
///
/// A multi-table spec needs exactly one join per additional table, in an order
/// where each join's left table is already in scope.
pub fn validate(spec: &QuerySpec) -> Result<()> {
    if spec.tables.is_empty() {
        return Err(FerryError::InvalidQuery("At least one table is required".to_string()));
    }
    if spec.columns.is_empty() {
        return Err(FerryError::InvalidQuery("At least one column is required".to_string()));
    }
    if !spec.is_multi_table() {
        return Ok(());
    }

    let additional = &spec.tables[1..];
    if spec.join_conditions.len() != additional.len() {
        return Err(FerryError::InvalidQuery(format!(
            "Expected {} join condition(s) for {} tables, got {}",
            additional.len(),
            spec.tables.len(),
            spec.join_conditions.len()
        )));
    }

    let mut in_scope: HashSet<&str> = HashSet::new();
    in_scope.insert(spec.tables[0].as_str());

    for join in &spec.join_conditions {
        if !additional.iter().any(|t| t == &join.right_table) {
            return Err(FerryError::InvalidQuery(format!(
                "Join table '{}' is not one of the requested tables",
                join.right_table
            )));
        }
        if in_scope.contains(join.right_table.as_str()) {
            return Err(FerryError::InvalidQuery(format!(
                "Table '{}' is joined more than once",
                join.right_table
            )));
        }
        if !in_scope.contains(join.left_table.as_str()) {
            return Err(FerryError::InvalidQuery(format!(
                "Join references '{}' before it is in scope",
                join.left_table
            )));
        }
        in_scope.insert(join.right_table.as_str());
    }

    Ok(())
}

/// Render a table or column name as one identifier, dots included.
fn single(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FerryError::InvalidQuery("Identifier must not be empty".to_string()));
    }
    Ok(identifier(name))
}

/// Render a possibly dot-qualified name, quoting segments that are not plain.
fn qualified(name: &str, allow_wildcard: bool) -> Result<String> {
    let segments: Vec<&str> = name.trim().split('.').collect();
    let last = segments.len() - 1;

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let segment = segment.trim();
            if segment.is_empty() {
                Err(FerryError::InvalidQuery(format!("Invalid identifier: '{}'", name)))
            } else if segment == "*" {
                if allow_wildcard && i == last {
                    Ok("*".to_string())
                } else {
                    Err(FerryError::InvalidQuery(format!("Invalid identifier: '{}'", name)))
                }
            } else {
                Ok(identifier(segment))
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(|parts| parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{JoinCondition, JoinType};

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_table() {
        let spec = QuerySpec::table("events", cols(&["id", "name"]));
        assert_eq!(compose(&spec, None, None).unwrap(), "SELECT id, name FROM events");
        assert_eq!(
            compose(&spec, Some(1000), Some(2000)).unwrap(),
            "SELECT id, name FROM events LIMIT 1000 OFFSET 2000"
        );
        assert_eq!(compose(&spec, Some(100), None).unwrap(), "SELECT id, name FROM events LIMIT 100");
    }

    #[test]
    fn test_join_follows_from_clause() {
        let spec = QuerySpec {
            tables: cols(&["A", "B"]),
            columns: cols(&["A.id", "B.value"]),
            join_conditions: vec![JoinCondition::new(JoinType::Inner, "A", "id", "B", "a_id")],
        };
        assert_eq!(
            compose(&spec, None, None).unwrap(),
            "SELECT A.id, B.value FROM A INNER JOIN B ON A.id = B.a_id"
        );
    }

    #[test]
    fn test_join_order_preserved() {
        let spec = QuerySpec {
            tables: cols(&["A", "B", "C"]),
            columns: cols(&["*"]),
            join_conditions: vec![
                JoinCondition::new(JoinType::Left, "A", "id", "B", "a_id"),
                JoinCondition::new(JoinType::Full, "B", "id", "C", "b_id"),
            ],
        };
        assert_eq!(
            compose(&spec, Some(10), Some(0)).unwrap(),
            "SELECT * FROM A LEFT JOIN B ON A.id = B.a_id FULL JOIN C ON B.id = C.b_id LIMIT 10 OFFSET 0"
        );
    }

    #[test]
    fn test_identifiers_quoted() {
        let spec = QuerySpec::table("my table", cols(&["First Name", "t.*", "x`; DROP TABLE y"]));
        assert_eq!(
            compose(&spec, None, None).unwrap(),
            "SELECT `First Name`, t.*, `x\\`; DROP TABLE y` FROM `my table`"
        );
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        assert!(compose(&QuerySpec::table(" ", cols(&["x"])), None, None).is_err());
        assert!(compose(&QuerySpec::table("t", cols(&["a..b"])), None, None).is_err());
        assert!(compose(&QuerySpec::table("t", cols(&["*.x"])), None, None).is_err());
    }

    #[test]
    fn test_dotted_table_name_is_one_identifier() {
        let spec = QuerySpec::table("sales.2024", cols(&["*"]));
        assert_eq!(compose(&spec, None, None).unwrap(), "SELECT * FROM `sales.2024`");

        let spec = QuerySpec {
            tables: cols(&["sales.2024", "regions"]),
            columns: cols(&["region", "total"]),
            join_conditions: vec![JoinCondition::new(JoinType::Left, "sales.2024", "region_id", "regions", "id")],
        };
        assert_eq!(
            compose(&spec, None, None).unwrap(),
            "SELECT region, total FROM `sales.2024` LEFT JOIN regions ON `sales.2024`.region_id = regions.id"
        );
    }

    #[test]
    fn test_validation() {
        assert!(validate(&QuerySpec::default()).is_err());
        assert!(validate(&QuerySpec::table("t", vec![])).is_err());

        // missing join condition for B
        let spec = QuerySpec {
            tables: cols(&["A", "B"]),
            columns: cols(&["*"]),
            join_conditions: vec![],
        };
        assert!(validate(&spec).is_err());

        // join to a table outside the list
        let spec = QuerySpec {
            tables: cols(&["A", "B"]),
            columns: cols(&["*"]),
            join_conditions: vec![JoinCondition::new(JoinType::Inner, "A", "id", "C", "a_id")],
        };
        assert!(validate(&spec).is_err());

        // left table not yet in scope
        let spec = QuerySpec {
            tables: cols(&["A", "B", "C"]),
            columns: cols(&["*"]),
            join_conditions: vec![
                JoinCondition::new(JoinType::Inner, "C", "id", "B", "c_id"),
                JoinCondition::new(JoinType::Inner, "A", "id", "C", "a_id"),
            ],
        };
        assert!(validate(&spec).is_err());

        // same table joined twice
        let spec = QuerySpec {
            tables: cols(&["A", "B", "C"]),
            columns: cols(&["*"]),
            join_conditions: vec![
                JoinCondition::new(JoinType::Inner, "A", "id", "B", "a_id"),
                JoinCondition::new(JoinType::Inner, "A", "id", "B", "a_id"),
            ],
        };
        assert!(validate(&spec).is_err());
    }

    #[test]
    fn test_single_table_ignores_joins() {
        let spec = QuerySpec {
            tables: cols(&["A"]),
            columns: cols(&["id"]),
            join_conditions: vec![JoinCondition::new(JoinType::Inner, "A", "id", "B", "a_id")],
        };
        assert_eq!(compose(&spec, None, None).unwrap(), "SELECT id FROM A");
    }

    #[test]
    fn test_count_and_raw_wrapping() {
        assert_eq!(count_query("SELECT a FROM t"), "SELECT count() FROM (SELECT a FROM t)");
        assert_eq!(wrap_raw_query(" SELECT 1; ").unwrap(), "SELECT * FROM (SELECT 1)");
        assert!(wrap_raw_query(" ; ").is_err());
        assert_eq!(paginate("q", None, Some(5)), "q OFFSET 5 ROWS");
    }
}
