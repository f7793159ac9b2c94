//! In-memory store for testing.
//!
//! `MockStore` understands exactly the statement shapes this crate emits:
//! `CREATE TABLE IF NOT EXISTS`, multi-row `INSERT ... VALUES`, single-table
//! `SELECT` with `LIMIT`/`OFFSET`, `count()` over a sub-query, `SHOW TABLES`,
//! `DESCRIBE TABLE` and the `system.tables` existence lookup. Errors carry
//! ClickHouse-style `Code: N.` messages so they classify like the real thing.

use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use serde_json::{Value, json};

use crate::error::{FerryError, Result};

use super::provider::{ColumnInfo, QueryResult, Store};

#[derive(Debug, Clone, Default)]
struct MockTable {
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Default)]
struct MockState {
    tables: IndexMap<String, MockTable>,
    statements: Vec<String>,
    failures: Vec<String>,
}

/// In-memory store that interprets this crate's SQL.
#[derive(Debug, Default)]
pub struct MockStore {
    state: Mutex<MockState>,
}

impl MockStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table (builder style).
    pub fn with_table(self, name: &str, columns: &[(&str, &str)], rows: Vec<Vec<Value>>) -> Self {
        self.add_table(name, columns, rows);
        self
    }

    /// Seed or replace a table.
    pub fn add_table(&self, name: &str, columns: &[(&str, &str)], rows: Vec<Vec<Value>>) {
        let columns = columns
            .iter()
            .map(|(n, t)| ColumnInfo::new(*n, *t))
            .collect();
        self.lock()
            .tables
            .insert(name.to_string(), MockTable { columns, rows });
    }

    /// Make every statement containing `needle` fail with a connectivity error.
    pub fn fail_on(&self, needle: impl Into<String>) {
        self.lock().failures.push(needle.into());
    }

    /// Every statement received, in order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Rows currently stored in `table`.
    pub fn rows(&self, table: &str) -> Option<Vec<Vec<Value>>> {
        self.lock().tables.get(table).map(|t| t.rows.clone())
    }

    /// Columns of `table`.
    pub fn columns(&self, table: &str) -> Option<Vec<ColumnInfo>> {
        self.lock().tables.get(table).map(|t| t.columns.clone())
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, sql: &str) -> Result<QueryResult> {
        let mut state = self.lock();
        state.statements.push(sql.to_string());

        if state.failures.iter().any(|needle| sql.contains(needle.as_str())) {
            return Err(FerryError::Connection(format!("injected failure for: {}", sql)));
        }

        let mut scanner = Scanner::new(sql);
        if scanner.eat_keywords(&["CREATE", "TABLE", "IF", "NOT", "EXISTS"]) {
            create_table(&mut state, &mut scanner)
        } else if scanner.eat_keywords(&["INSERT", "INTO"]) {
            insert(&mut state, &mut scanner)
        } else if scanner.eat_keywords(&["SHOW", "TABLES"]) {
            let rows = state.tables.keys().map(|name| vec![json!(name)]).collect();
            Ok(QueryResult::new(vec![ColumnInfo::new("name", "String")], rows))
        } else if scanner.eat_keywords(&["DESCRIBE", "TABLE"]) {
            let name = scanner.table_ref()?;
            let table = lookup(&state, &name)?;
            let rows = table
                .columns
                .iter()
                .map(|c| vec![json!(c.name), json!(c.type_name)])
                .collect();
            Ok(QueryResult::new(
                vec![ColumnInfo::new("name", "String"), ColumnInfo::new("type", "String")],
                rows,
            ))
        } else if scanner.eat_keyword("SELECT") {
            select(&state, &mut scanner)
        } else {
            Err(syntax_error(sql))
        }
    }
}

impl Store for MockStore {
    fn query(&self, sql: &str) -> Result<QueryResult> {
        self.run(sql)
    }

    fn execute(&self, sql: &str) -> Result<()> {
        self.run(sql).map(|_| ())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn create_table(state: &mut MockState, scanner: &mut Scanner<'_>) -> Result<QueryResult> {
    let name = scanner.table_ref()?;
    scanner.expect_char('(')?;

    let mut columns = Vec::new();
    loop {
        let column = scanner.identifier_segment()?;
        let type_name = scanner.type_name()?;
        columns.push(ColumnInfo::new(column, type_name));
        if !scanner.eat_char(',') {
            break;
        }
    }
    scanner.expect_char(')')?;

    state
        .tables
        .entry(name)
        .or_insert_with(|| MockTable { columns, rows: Vec::new() });
    Ok(QueryResult::default())
}

fn insert(state: &mut MockState, scanner: &mut Scanner<'_>) -> Result<QueryResult> {
    let name = scanner.table_ref()?;
    if !scanner.eat_keyword("VALUES") {
        return Err(syntax_error(scanner.src));
    }
    let table = lookup(state, &name)?;

    // Validate every tuple before appending anything.
    let mut staged = Vec::new();
    loop {
        scanner.expect_char('(')?;
        let mut row = Vec::new();
        loop {
            let literal = scanner.literal()?;
            let column = table.columns.get(row.len()).ok_or_else(|| {
                FerryError::from_server_message(format!(
                    "Code: 62. DB::Exception: Too many values for table {}",
                    name
                ))
            })?;
            row.push(coerce(literal, column)?);
            if !scanner.eat_char(',') {
                break;
            }
        }
        scanner.expect_char(')')?;
        if row.len() != table.columns.len() {
            return Err(FerryError::from_server_message(format!(
                "Code: 62. DB::Exception: Expected {} values, got {}",
                table.columns.len(),
                row.len()
            )));
        }
        staged.push(row);
        if !scanner.eat_char(',') {
            break;
        }
    }

    if let Some(table) = state.tables.get_mut(&name) {
        table.rows.extend(staged);
    }
    Ok(QueryResult::default())
}

fn select(state: &MockState, scanner: &mut Scanner<'_>) -> Result<QueryResult> {
    if let Some(n) = scanner.try_number() {
        return Ok(QueryResult::new(vec![ColumnInfo::new(n.to_string(), "UInt8")], vec![vec![json!(n)]]));
    }

    let projection = Projection::parse(scanner)?;
    if !scanner.eat_keyword("FROM") {
        return Err(syntax_error(scanner.src));
    }

    let source = if scanner.eat_char('(') {
        let inner = scanner.until_closing_paren()?;
        select_subquery(state, inner)?
    } else if scanner.eat_keyword("system.tables") {
        let name = existence_lookup_name(scanner)?;
        let exists = state.tables.contains_key(&name) as u64;
        QueryResult::new(vec![ColumnInfo::new("count()", "UInt64")], vec![vec![json!(exists)]])
    } else {
        let name = scanner.table_ref()?;
        let table = lookup(state, &name)?;
        QueryResult::new(table.columns.clone(), table.rows.clone())
    };

    if scanner.peek_keyword("JOIN") || scanner.peek_keyword("INNER") || scanner.peek_keyword("LEFT") {
        return Err(FerryError::Store {
            code: None,
            message: "MockStore does not evaluate joins".to_string(),
        });
    }

    let (mut limit, mut offset) = (None, 0usize);
    if scanner.eat_keyword("LIMIT") {
        limit = Some(scanner.unsigned()?);
    }
    if scanner.eat_keyword("OFFSET") {
        offset = scanner.unsigned()?;
        scanner.eat_keyword("ROWS");
    }
    if !scanner.is_end() {
        return Err(syntax_error(scanner.src));
    }

    let projected = projection.apply(source)?;
    let rows = projected
        .rows
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect();
    Ok(QueryResult::new(projected.columns, rows))
}

fn select_subquery(state: &MockState, inner: &str) -> Result<QueryResult> {
    let mut scanner = Scanner::new(inner);
    if !scanner.eat_keyword("SELECT") {
        return Err(syntax_error(inner));
    }
    select(state, &mut scanner)
}

/// `WHERE database = currentDatabase() AND name = '<table>'`
fn existence_lookup_name(scanner: &mut Scanner<'_>) -> Result<String> {
    if !scanner.eat_keywords(&["WHERE", "database", "="]) {
        return Err(syntax_error(scanner.src));
    }
    scanner.eat_keyword("currentDatabase()");
    if !scanner.eat_keywords(&["AND", "name", "="]) {
        return Err(syntax_error(scanner.src));
    }
    match scanner.literal()? {
        Literal::Text(name) => Ok(name),
        _ => Err(syntax_error(scanner.src)),
    }
}

enum Projection {
    All,
    Count,
    Columns(Vec<Vec<String>>),
}

impl Projection {
    fn parse(scanner: &mut Scanner<'_>) -> Result<Self> {
        if scanner.eat_char('*') {
            return Ok(Projection::All);
        }
        if scanner.eat_keyword("count()") {
            return Ok(Projection::Count);
        }
        let mut columns = Vec::new();
        loop {
            columns.push(scanner.path()?);
            if !scanner.eat_char(',') {
                break;
            }
        }
        Ok(Projection::Columns(columns))
    }

    fn apply(self, source: QueryResult) -> Result<QueryResult> {
        match self {
            Projection::All => Ok(source),
            Projection::Count => Ok(QueryResult::new(
                vec![ColumnInfo::new("count()", "UInt64")],
                vec![vec![json!(source.row_count() as u64)]],
            )),
            Projection::Columns(names) => {
                let mut indices = Vec::with_capacity(names.len());
                for path in &names {
                    let bare = path.last().map(String::as_str).unwrap_or_default();
                    let index = source
                        .columns
                        .iter()
                        .position(|c| c.name == bare)
                        .ok_or_else(|| {
                            FerryError::from_server_message(format!(
                                "Code: 47. DB::Exception: Unknown identifier: {}",
                                path.join(".")
                            ))
                        })?;
                    indices.push(index);
                }
                let columns = indices.iter().map(|&i| source.columns[i].clone()).collect();
                let rows = source
                    .rows
                    .into_iter()
                    .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                    .collect();
                Ok(QueryResult::new(columns, rows))
            }
        }
    }
}

fn lookup<'a>(state: &'a MockState, name: &str) -> Result<&'a MockTable> {
    state.tables.get(name).ok_or_else(|| {
        FerryError::from_server_message(format!(
            "Code: 60. DB::Exception: Table default.{} does not exist. (UNKNOWN_TABLE)",
            name
        ))
    })
}

fn syntax_error(sql: &str) -> FerryError {
    FerryError::from_server_message(format!("Code: 62. DB::Exception: Syntax error: {}", sql))
}

enum Literal {
    Null,
    Number(f64),
    Text(String),
}

fn coerce(literal: Literal, column: &ColumnInfo) -> Result<Value> {
    let numeric = column.type_name.contains("Float") || column.type_name.contains("Int");
    match literal {
        Literal::Null => Ok(Value::Null),
        Literal::Number(n) if numeric => Ok(serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)),
        Literal::Number(n) => Ok(json!(n.to_string())),
        Literal::Text(s) if numeric => match s.trim().parse::<f64>() {
            Ok(n) => Ok(serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null)),
            Err(_) => Err(FerryError::from_server_message(format!(
                "Code: 27. DB::Exception: Cannot parse input: expected number for column {} ({}), got '{}'",
                column.name, column.type_name, s
            ))),
        },
        Literal::Text(s) => Ok(Value::String(s)),
    }
}

/// Minimal cursor over SQL text.
struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn is_end(&mut self) -> bool {
        self.skip_ws();
        self.rest().trim_end_matches(';').trim().is_empty()
    }

    fn peek_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        rest.len() >= keyword.len()
            && rest.is_char_boundary(keyword.len())
            && rest[..keyword.len()].eq_ignore_ascii_case(keyword)
            && rest[keyword.len()..]
                .chars()
                .next()
                .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    /// Consume all keywords in sequence, or none.
    fn eat_keywords(&mut self, keywords: &[&str]) -> bool {
        let start = self.pos;
        for keyword in keywords {
            if !self.eat_keyword(keyword) {
                self.pos = start;
                return false;
            }
        }
        true
    }

    fn eat_char(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, c: char) -> Result<()> {
        if self.eat_char(c) {
            Ok(())
        } else {
            Err(syntax_error(self.src))
        }
    }

    /// Dot-separated identifier segments; a quoted segment may itself contain dots.
    fn path(&mut self) -> Result<Vec<String>> {
        let mut parts = Vec::new();
        loop {
            parts.push(self.identifier_segment()?);
            if !self.rest().starts_with('.') {
                break;
            }
            self.pos += 1;
        }
        Ok(parts)
    }

    /// `table` or `database.table`; only the `default` database exists.
    fn table_ref(&mut self) -> Result<String> {
        let mut parts = self.path()?;
        match parts.len() {
            1 => Ok(parts.remove(0)),
            2 if parts[0] == "default" => Ok(parts.remove(1)),
            2 => Err(FerryError::from_server_message(format!(
                "Code: 81. DB::Exception: Database {} does not exist. (UNKNOWN_DATABASE)",
                parts[0]
            ))),
            _ => Err(syntax_error(self.src)),
        }
    }

    fn identifier_segment(&mut self) -> Result<String> {
        self.skip_ws();
        let mut chars = self.rest().char_indices();
        match chars.next() {
            Some((_, '`')) => {
                let mut out = String::new();
                let mut escaped = false;
                for (i, c) in chars {
                    if escaped {
                        out.push(c);
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '`' {
                        self.pos += i + 1;
                        return Ok(out);
                    } else {
                        out.push(c);
                    }
                }
                Err(syntax_error(self.src))
            }
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {
                let len = self
                    .rest()
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(self.rest().len());
                let ident = self.rest()[..len].to_string();
                self.pos += len;
                Ok(ident)
            }
            _ => Err(syntax_error(self.src)),
        }
    }

    /// Column type up to the next top-level `,` or `)`.
    fn type_name(&mut self) -> Result<String> {
        self.skip_ws();
        let mut depth = 0usize;
        for (i, c) in self.rest().char_indices() {
            match c {
                '(' => depth += 1,
                ')' if depth == 0 => return self.take_type(i),
                ')' => depth -= 1,
                ',' if depth == 0 => return self.take_type(i),
                _ => {}
            }
        }
        Err(syntax_error(self.src))
    }

    fn take_type(&mut self, len: usize) -> Result<String> {
        let type_name = self.rest()[..len].trim().to_string();
        self.pos += len;
        if type_name.is_empty() {
            Err(syntax_error(self.src))
        } else {
            Ok(type_name)
        }
    }

    /// Text between an already consumed `(` and its matching `)`.
    fn until_closing_paren(&mut self) -> Result<&'a str> {
        let rest = self.rest();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;

        for (i, c) in rest.char_indices() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '`' => quote = Some(c),
                '(' => depth += 1,
                ')' if depth == 0 => {
                    self.pos += i + 1;
                    return Ok(&rest[..i]);
                }
                ')' => depth -= 1,
                _ => {}
            }
        }
        Err(syntax_error(self.src))
    }

    fn try_number(&mut self) -> Option<u64> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if len == 0 || !rest[len..].trim().trim_end_matches(';').is_empty() {
            return None;
        }
        let n = rest[..len].parse().ok()?;
        self.pos += len;
        Some(n)
    }

    fn unsigned(&mut self) -> Result<usize> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let n = rest[..len].parse().map_err(|_| syntax_error(self.src))?;
        self.pos += len;
        Ok(n)
    }

    fn literal(&mut self) -> Result<Literal> {
        self.skip_ws();
        if self.eat_keyword("NULL") {
            return Ok(Literal::Null);
        }

        let rest = self.rest();
        if let Some(body) = rest.strip_prefix('\'') {
            let mut out = String::new();
            let mut escaped = false;
            for (i, c) in body.char_indices() {
                if escaped {
                    out.push(match c {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '\'' {
                    self.pos += i + 2;
                    return Ok(Literal::Text(out));
                } else {
                    out.push(c);
                }
            }
            return Err(syntax_error(self.src));
        }

        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-')))
            .unwrap_or(rest.len());
        let n = rest[..len]
            .parse::<f64>()
            .map_err(|_| syntax_error(self.src))?;
        self.pos += len;
        Ok(Literal::Number(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MockStore {
        MockStore::new().with_table(
            "people",
            &[("id", "Nullable(Float64)"), ("name", "Nullable(String)")],
            vec![
                vec![json!(1.0), json!("Ada")],
                vec![json!(2.0), json!("Bo")],
                vec![json!(3.0), json!("Cy")],
            ],
        )
    }

    #[test]
    fn test_create_is_idempotent() {
        let store = MockStore::new();
        let ddl = "CREATE TABLE IF NOT EXISTS `t` (`a` Nullable(Float64), `b c` Nullable(String)) \
                   ENGINE = MergeTree() ORDER BY tuple()";
        store.execute(ddl).unwrap();
        store.execute("INSERT INTO `t` VALUES (1,'x')").unwrap();
        store.execute(ddl).unwrap();

        let columns = store.columns("t").unwrap();
        assert_eq!(columns[1].name, "b c");
        assert_eq!(columns[0].type_name, "Nullable(Float64)");
        assert_eq!(store.rows("t").unwrap().len(), 1);
    }

    #[test]
    fn test_insert_type_mismatch_rejects_whole_statement() {
        let store = seeded();
        let err = store
            .execute("INSERT INTO `people` VALUES (4,'Di'),('five','Ed')")
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TypeMismatch);
        assert_eq!(store.rows("people").unwrap().len(), 3);
    }

    #[test]
    fn test_insert_literals() {
        let store = seeded();
        store
            .execute("INSERT INTO `people` VALUES (NULL,'O\\'Brien'),(-2.5,NULL)")
            .unwrap();
        let rows = store.rows("people").unwrap();
        assert_eq!(rows[3], vec![Value::Null, json!("O'Brien")]);
        assert_eq!(rows[4], vec![json!(-2.5), Value::Null]);
    }

    #[test]
    fn test_select_with_pagination_and_count() {
        let store = seeded();
        let page = store.query("SELECT name FROM people LIMIT 2 OFFSET 1").unwrap();
        assert_eq!(page.rows, vec![vec![json!("Bo")], vec![json!("Cy")]]);

        let count = store
            .query("SELECT count() FROM (SELECT id, name FROM people)")
            .unwrap();
        assert_eq!(count.scalar_u64().unwrap(), 3);

        let wrapped = store.query("SELECT * FROM (SELECT id FROM people) LIMIT 1 OFFSET 2").unwrap();
        assert_eq!(wrapped.rows, vec![vec![json!(3.0)]]);
    }

    #[test]
    fn test_introspection() {
        let store = seeded();
        let tables = store.query("SHOW TABLES").unwrap();
        assert_eq!(tables.rows, vec![vec![json!("people")]]);

        let described = store.query("DESCRIBE TABLE people").unwrap();
        assert_eq!(described.rows[1], vec![json!("name"), json!("Nullable(String)")]);

        let exists = store
            .query("SELECT count() FROM system.tables WHERE database = currentDatabase() AND name = 'people'")
            .unwrap();
        assert_eq!(exists.scalar_u64().unwrap(), 1);
    }

    #[test]
    fn test_errors_classify() {
        let store = seeded();
        let err = store.query("SELECT * FROM missing").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);

        let err = store.query("SELEC nonsense").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedInput);

        let err = store.query("SELECT nope FROM people").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedInput);
    }

    #[test]
    fn test_failure_injection_and_log() {
        let store = seeded();
        store.fail_on("OFFSET 1000");
        assert!(store.query("SELECT * FROM people LIMIT 1000 OFFSET 0").is_ok());
        let err = store.query("SELECT * FROM people LIMIT 1000 OFFSET 1000").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Connectivity);
        assert_eq!(store.statements().len(), 2);
    }

    #[test]
    fn test_quoted_dots_stay_in_table_name() {
        let store = MockStore::new();
        store
            .execute("CREATE TABLE IF NOT EXISTS `sales.2024` (`total` Nullable(Float64)) ENGINE = MergeTree() ORDER BY tuple()")
            .unwrap();
        store.execute("INSERT INTO `sales.2024` VALUES (12.5)").unwrap();

        let rows = store.query("SELECT * FROM `sales.2024`").unwrap();
        assert_eq!(rows.rows, vec![vec![json!(12.5)]]);
        assert!(store.query("SELECT total FROM default.`sales.2024`").is_ok());

        let err = store.query("SELECT * FROM sales.`2024`").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
        assert!(err.to_string().contains("Database sales does not exist"));
    }

    #[test]
    fn test_ping() {
        assert!(MockStore::new().ping().is_ok());
    }
}
