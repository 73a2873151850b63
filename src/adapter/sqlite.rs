use crate::adapter::{
    AdapterConfig, ConnectionHandle, DatabaseAdapter, ParameterKind, PreparedStatement, QuoteType,
};
use crate::profiling::{Profiler, ProfilerSettings};
use crate::query::where_expr;
use crate::types::{ColumnDescriptor, DeclaredType, FetchMode, ResultSet, Value};
use crate::{DbSplitError, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const DEFAULT_STATEMENT_CLASS: &str = "sqlite";

static LEADING_INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("valid integer regex"));
static LEADING_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)").expect("valid float regex")
});

/// [`DatabaseAdapter`] over a single rusqlite connection.
///
/// The connection is opened lazily on first use. A `read_only` config opens
/// the file with `SQLITE_OPEN_READ_ONLY` and leaves journal pragmas alone,
/// which is how replicas are usually configured.
pub struct SqliteAdapter {
    config: AdapterConfig,
    conn: Option<Connection>,
    handle: Option<ConnectionHandle>,
    profiler: Profiler,
    fetch_mode: FetchMode,
    statement_class: String,
}

impl SqliteAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            conn: None,
            handle: None,
            profiler: Profiler::default(),
            fetch_mode: FetchMode::default(),
            statement_class: DEFAULT_STATEMENT_CLASS.to_string(),
        }
    }

    /// Adapter whose connection is opened immediately
    pub fn connect(config: AdapterConfig) -> Result<Self> {
        let mut adapter = Self::new(config);
        adapter.open()?;
        Ok(adapter)
    }

    fn open(&mut self) -> Result<()> {
        let flags = if self.config.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };

        let conn = if self.config.dbname == ":memory:" {
            Connection::open_in_memory_with_flags(flags)?
        } else {
            Connection::open_with_flags(&self.config.dbname, flags)?
        };

        conn.busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))?;

        // Journal pragmas write to the database file
        if !self.config.read_only {
            let mut pragma_sql = String::new();
            if let Some(mode) = &self.config.journal_mode {
                pragma_sql.push_str(&format!("PRAGMA journal_mode = {};", pragma_value(mode)?));
            }
            if let Some(mode) = &self.config.synchronous {
                pragma_sql.push_str(&format!("PRAGMA synchronous = {};", pragma_value(mode)?));
            }
            if !pragma_sql.is_empty() {
                debug!("{}: {}", self.config.name, pragma_sql);
                conn.execute_batch(&pragma_sql)?;
            }
        }

        let handle = ConnectionHandle {
            id: uuid::Uuid::new_v4(),
            adapter: self.config.name.clone(),
            dbname: self.config.dbname.clone(),
            opened_at: Utc::now(),
        };
        info!(
            "Opened {} connection {} to {}{}",
            self.config.name,
            handle.id,
            self.config.dbname,
            if self.config.read_only { " (read-only)" } else { "" }
        );

        self.conn = Some(conn);
        self.handle = Some(handle);
        Ok(())
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.conn.is_none() {
            self.open()?;
        }
        Ok(())
    }

    fn execute_control(&mut self, sql: &str) -> Result<()> {
        self.ensure_open()?;
        let conn = self.conn.as_ref().ok_or_else(not_open)?;
        debug!("{}: {}", self.config.name, sql);
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn assignments(&self, values: &[(&str, Value)]) -> (String, Vec<Value>) {
        let set = values
            .iter()
            .map(|(column, _)| format!("{} = ?", self.quote_identifier(column)))
            .collect::<Vec<_>>()
            .join(", ");
        let params = values.iter().map(|(_, v)| v.clone()).collect();
        (set, params)
    }
}

fn not_open() -> DbSplitError {
    DbSplitError::Adapter("connection is not open".to_string())
}

/// Pragma values are spliced into SQL, so only bare keywords are accepted
fn pragma_value(value: &str) -> Result<&str> {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(value)
    } else {
        Err(DbSplitError::InvalidParameter(format!(
            "invalid pragma value: {:?}",
            value
        )))
    }
}

fn run_statement(conn: &Connection, sql: &str, params: &[Value]) -> Result<ResultSet> {
    let mut stmt = conn.prepare_cached(sql)?;
    let column_count = stmt.column_count();

    if column_count == 0 {
        let changed = stmt.execute(params_from_iter(params.iter()))?;
        return Ok(ResultSet::affected(changed as u64));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(Value::from(row.get_ref(i)?));
        }
        out.push(values);
    }

    Ok(ResultSet::new(columns, out))
}

fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn quote_real(f: f64) -> String {
    if f.is_finite() {
        format!("{:?}", f)
    } else {
        "NULL".to_string()
    }
}

/// Leading number of the value's text form, `0` if there is none
fn quote_numeric(value: &Value, ty: QuoteType) -> String {
    match ty {
        QuoteType::Int | QuoteType::BigInt => {
            let n = match value {
                Value::Integer(i) => *i,
                Value::Real(f) => f.trunc() as i64,
                other => LEADING_INT
                    .captures(&other.to_string())
                    .and_then(|c| c[1].parse::<i64>().ok())
                    .unwrap_or(0),
            };
            n.to_string()
        }
        QuoteType::Float => {
            let f = match value {
                Value::Integer(i) => *i as f64,
                Value::Real(f) => *f,
                other => LEADING_FLOAT
                    .captures(&other.to_string())
                    .and_then(|c| c[1].parse::<f64>().ok())
                    .unwrap_or(0.0),
            };
            format!("{:.6}", f)
        }
    }
}

impl DatabaseAdapter for SqliteAdapter {
    fn get_connection(&mut self) -> Result<ConnectionHandle> {
        self.ensure_open()?;
        self.handle.clone().ok_or_else(not_open)
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn close_connection(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            if let Err((conn, e)) = conn.close() {
                self.conn = Some(conn);
                return Err(e.into());
            }
            if let Some(handle) = self.handle.take() {
                info!("Closed {} connection {}", self.config.name, handle.id);
            }
        }
        Ok(())
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        self.ensure_open()?;
        let conn = self.conn.as_ref().ok_or_else(not_open)?;

        let started_at = Utc::now();
        let start = Instant::now();
        let result = run_statement(conn, sql, params);
        self.profiler.record(sql, params, started_at, start.elapsed());
        result
    }

    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        self.ensure_open()?;
        let conn = self.conn.as_ref().ok_or_else(not_open)?;
        let stmt = conn.prepare_cached(sql)?;
        Ok(PreparedStatement {
            sql: sql.to_string(),
            parameter_count: stmt.parameter_count(),
            columns: stmt.column_names().into_iter().map(String::from).collect(),
            read_only: stmt.readonly(),
        })
    }

    fn begin_transaction(&mut self) -> Result<()> {
        self.execute_control("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.execute_control("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.execute_control("ROLLBACK")
    }

    fn insert(&mut self, table: &str, values: &[(&str, Value)]) -> Result<u64> {
        let table = self.quote_identifier(table);
        if values.is_empty() {
            let sql = format!("INSERT INTO {} DEFAULT VALUES", table);
            return Ok(self.query(&sql, &[])?.rows_affected);
        }

        let columns = values
            .iter()
            .map(|(column, _)| self.quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; values.len()].join(", ");
        let params: Vec<Value> = values.iter().map(|(_, v)| v.clone()).collect();
        let sql = format!("INSERT INTO {} ({}) VALUES ({})", table, columns, placeholders);
        Ok(self.query(&sql, &params)?.rows_affected)
    }

    fn update(
        &mut self,
        table: &str,
        values: &[(&str, Value)],
        conditions: &[&str],
    ) -> Result<u64> {
        if values.is_empty() {
            return Err(DbSplitError::InvalidParameter(
                "update requires at least one column".to_string(),
            ));
        }

        let (set, params) = self.assignments(values);
        let mut sql = format!("UPDATE {} SET {}", self.quote_identifier(table), set);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_expr(conditions));
        }
        Ok(self.query(&sql, &params)?.rows_affected)
    }

    fn delete(&mut self, table: &str, conditions: &[&str]) -> Result<u64> {
        let mut sql = format!("DELETE FROM {}", self.quote_identifier(table));
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_expr(conditions));
        }
        Ok(self.query(&sql, &[])?.rows_affected)
    }

    fn describe_table(
        &mut self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Vec<ColumnDescriptor>> {
        self.ensure_open()?;
        let conn = self.conn.as_ref().ok_or_else(not_open)?;

        // A NULL schema searches main, temp and attached databases
        let mut stmt = conn.prepare_cached(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1, ?2)",
        )?;
        let rows = stmt.query_map(rusqlite::params![table, schema], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut columns = Vec::new();
        for row in rows {
            let (cid, name, declared, notnull, default, pk) = row?;
            let ty = DeclaredType::parse(&declared);
            columns.push(ColumnDescriptor {
                schema_name: schema.map(String::from),
                table_name: table.to_string(),
                column_name: name,
                column_position: cid as u32 + 1,
                data_type: ty.name,
                default,
                nullable: notnull == 0,
                length: ty.length,
                precision: ty.precision,
                scale: ty.scale,
                primary: pk > 0,
                primary_position: (pk > 0).then_some(pk as u32),
                identity: false,
            });
        }

        // A lone INTEGER primary key aliases the rowid
        let pk_columns: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary)
            .map(|(i, _)| i)
            .collect();
        if let [only] = pk_columns[..] {
            let column = &mut columns[only];
            column.identity = column.data_type.eq_ignore_ascii_case("INTEGER");
        }

        Ok(columns)
    }

    fn list_tables(&mut self) -> Result<Vec<String>> {
        let rs = self.query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
             UNION ALL \
             SELECT name FROM sqlite_temp_master WHERE type = 'table' \
             ORDER BY name",
            &[],
        )?;
        Ok(rs
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .map(|v| v.to_string())
            .collect())
    }

    fn last_insert_id(
        &mut self,
        _table: Option<&str>,
        _primary_key: Option<&str>,
    ) -> Result<Option<i64>> {
        self.ensure_open()?;
        let conn = self.conn.as_ref().ok_or_else(not_open)?;
        Ok(Some(conn.last_insert_rowid()))
    }

    fn last_sequence_id(&mut self, _sequence: &str) -> Result<Option<i64>> {
        Ok(None)
    }

    fn next_sequence_id(&mut self, _sequence: &str) -> Result<Option<i64>> {
        Ok(None)
    }

    fn server_version(&mut self) -> Result<Option<String>> {
        self.ensure_open()?;
        let conn = self.conn.as_ref().ok_or_else(not_open)?;
        let version: String = conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?;
        Ok(Some(version))
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn set_profiler(&mut self, settings: ProfilerSettings) -> Result<()> {
        self.profiler = Profiler::new(settings);
        Ok(())
    }

    fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    fn set_fetch_mode(&mut self, mode: FetchMode) -> Result<()> {
        self.fetch_mode = mode;
        Ok(())
    }

    fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    fn set_statement_class(&mut self, class: &str) -> Result<()> {
        self.statement_class = class.to_string();
        Ok(())
    }

    fn statement_class(&self) -> &str {
        &self.statement_class
    }

    fn limit(&self, sql: &str, count: u64, offset: u64) -> Result<String> {
        if count == 0 {
            return Err(DbSplitError::InvalidParameter(format!(
                "LIMIT argument count={} is not valid",
                count
            )));
        }
        let mut sql = format!("{} LIMIT {}", sql, count);
        if offset > 0 {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        Ok(sql)
    }

    fn supports_parameters(&self, kind: ParameterKind) -> bool {
        match kind {
            ParameterKind::Positional | ParameterKind::Named => true,
        }
    }

    fn quote(&self, value: &Value, ty: Option<QuoteType>) -> String {
        if let Some(ty) = ty {
            return quote_numeric(value, ty);
        }
        match value {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => quote_real(*f),
            Value::Text(s) => quote_text(s),
            Value::Blob(b) => format!("X'{}'", hex::encode_upper(b)),
        }
    }

    fn quote_identifier_symbol(&self) -> &str {
        "\""
    }
}
