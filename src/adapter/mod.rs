//! The database adapter capability.
//!
//! [`DatabaseAdapter`] is the one surface everything in this crate speaks:
//! concrete backends implement it, and the replication router both
//! consumes it (primary and replica) and implements it, so routers can be
//! nested or swapped in wherever a plain adapter is expected.

pub mod sqlite;

pub use sqlite::SqliteAdapter;

use crate::profiling::{Profiler, ProfilerSettings};
use crate::query::Select;
use crate::types::{ColumnDescriptor, FetchMode, FetchedRow, NamedRow, OrderedMap, ResultSet, Value};
use crate::{DbSplitError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection settings of a single adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Label used in logs and connection handles ("primary", "replica", ...)
    pub name: String,
    /// Database path, `:memory:` or a SQLite URI
    pub dbname: String,
    pub read_only: bool,
    pub journal_mode: Option<String>,
    pub synchronous: Option<String>,
    pub busy_timeout_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            name: "primary".to_string(),
            dbname: ":memory:".to_string(),
            read_only: false,
            journal_mode: None,
            synchronous: None,
            busy_timeout_ms: 5_000,
        }
    }
}

impl AdapterConfig {
    pub fn new(name: impl Into<String>, dbname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dbname: dbname.into(),
            ..Default::default()
        }
    }

    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::new(name, ":memory:")
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_journal_mode(mut self, mode: impl Into<String>) -> Self {
        self.journal_mode = Some(mode.into());
        self
    }

    pub fn with_synchronous(mut self, mode: impl Into<String>) -> Self {
        self.synchronous = Some(mode.into());
        self
    }

    pub fn with_busy_timeout(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// Identifies an open connection of an adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionHandle {
    pub id: uuid::Uuid,
    pub adapter: String,
    pub dbname: String,
    pub opened_at: DateTime<Utc>,
}

/// Description of a statement the backend has compiled.
///
/// The handle is not bound to a connection; run it with
/// [`DatabaseAdapter::execute_prepared`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedStatement {
    pub sql: String,
    pub parameter_count: usize,
    pub columns: Vec<String>,
    pub read_only: bool,
}

/// Placeholder styles for `supports_parameters`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// `?`
    Positional,
    /// `:name`
    Named,
}

/// Forces numeric formatting in `quote`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteType {
    Int,
    BigInt,
    Float,
}

/// Connection, execution, transaction, mutation, metadata and
/// configuration operations of a database backend.
pub trait DatabaseAdapter: Send {
    /// Open the connection if needed and describe it
    fn get_connection(&mut self) -> Result<ConnectionHandle>;

    fn is_connected(&self) -> bool;

    fn close_connection(&mut self) -> Result<()>;

    /// Execute a statement with bound parameters
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet>;

    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement>;

    fn begin_transaction(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Insert one row, returning the affected row count
    fn insert(&mut self, table: &str, values: &[(&str, Value)]) -> Result<u64>;

    /// Update rows matching every condition; no conditions updates all rows
    fn update(&mut self, table: &str, values: &[(&str, Value)], conditions: &[&str])
        -> Result<u64>;

    /// Delete rows matching every condition; no conditions deletes all rows
    fn delete(&mut self, table: &str, conditions: &[&str]) -> Result<u64>;

    fn describe_table(&mut self, table: &str, schema: Option<&str>)
        -> Result<Vec<ColumnDescriptor>>;

    fn list_tables(&mut self) -> Result<Vec<String>>;

    fn last_insert_id(&mut self, table: Option<&str>, primary_key: Option<&str>)
        -> Result<Option<i64>>;

    /// `None` on backends without sequences
    fn last_sequence_id(&mut self, sequence: &str) -> Result<Option<i64>>;

    /// `None` on backends without sequences
    fn next_sequence_id(&mut self, sequence: &str) -> Result<Option<i64>>;

    fn server_version(&mut self) -> Result<Option<String>>;

    fn config(&self) -> &AdapterConfig;

    /// Replace profiler settings; history recorded so far is discarded
    fn set_profiler(&mut self, settings: ProfilerSettings) -> Result<()>;

    fn profiler(&self) -> &Profiler;

    fn set_fetch_mode(&mut self, mode: FetchMode) -> Result<()>;

    fn fetch_mode(&self) -> FetchMode;

    fn set_statement_class(&mut self, class: &str) -> Result<()>;

    fn statement_class(&self) -> &str;

    /// Append the backend's row limiting clause to `sql`
    fn limit(&self, sql: &str, count: u64, offset: u64) -> Result<String>;

    fn supports_parameters(&self, kind: ParameterKind) -> bool;

    /// Render `value` as a SQL literal
    fn quote(&self, value: &Value, ty: Option<QuoteType>) -> String;

    fn quote_identifier_symbol(&self) -> &str;

    /// Quote a possibly dotted identifier, `schema.table` becomes
    /// `"schema"."table"`
    fn quote_identifier(&self, ident: &str) -> String {
        let q = self.quote_identifier_symbol();
        let escaped = format!("{q}{q}");
        ident
            .split('.')
            .map(|part| format!("{q}{}{q}", part.replace(q, &escaped)))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Replace every `?` in `text` with the quoted value
    fn quote_into(&self, text: &str, value: &Value, ty: Option<QuoteType>) -> String {
        text.replace('?', &self.quote(value, ty))
    }

    /// Render a select builder against this adapter and execute it
    fn select_query(&mut self, select: &Select, params: &[Value]) -> Result<ResultSet> {
        let sql = select.assemble(&*self)?;
        self.query(&sql, params)
    }

    fn execute_prepared(
        &mut self,
        statement: &PreparedStatement,
        params: &[Value],
    ) -> Result<ResultSet> {
        if params.len() != statement.parameter_count {
            return Err(DbSplitError::InvalidParameter(format!(
                "statement expects {} parameters, {} given",
                statement.parameter_count,
                params.len()
            )));
        }
        self.query(&statement.sql, params)
    }

    /// All rows, shaped by the current fetch mode
    fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<FetchedRow>> {
        let mode = self.fetch_mode();
        self.fetch_all_with_mode(sql, params, mode)
    }

    /// All rows, shaped by `mode` instead of the current fetch mode
    fn fetch_all_with_mode(
        &mut self,
        sql: &str,
        params: &[Value],
        mode: FetchMode,
    ) -> Result<Vec<FetchedRow>> {
        Ok(self.query(sql, params)?.into_fetched(mode))
    }

    /// First row, shaped by the current fetch mode
    fn fetch_row(&mut self, sql: &str, params: &[Value]) -> Result<Option<FetchedRow>> {
        let mode = self.fetch_mode();
        self.fetch_row_with_mode(sql, params, mode)
    }

    fn fetch_row_with_mode(
        &mut self,
        sql: &str,
        params: &[Value],
        mode: FetchMode,
    ) -> Result<Option<FetchedRow>> {
        let rs = self.query(sql, params)?;
        let columns = rs.columns;
        Ok(rs
            .rows
            .into_iter()
            .next()
            .map(|row| FetchedRow::shape(&columns, row, mode)))
    }

    /// First column of the first row
    fn fetch_one(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>> {
        let rs = self.query(sql, params)?;
        Ok(rs.rows.into_iter().next().and_then(|row| row.into_iter().next()))
    }

    /// First column of every row
    fn fetch_col(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Value>> {
        let rs = self.query(sql, params)?;
        Ok(rs
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }

    /// First column as key, second as value, in row order. A repeated key
    /// keeps its first position and takes the later row's value.
    fn fetch_pairs(&mut self, sql: &str, params: &[Value]) -> Result<NamedRow> {
        let rs = self.query(sql, params)?;
        let mut pairs = NamedRow::with_capacity(rs.rows.len());
        for row in rs.rows {
            let mut cells = row.into_iter();
            let Some(key) = cells.next() else { continue };
            pairs.insert(key.to_string(), cells.next().unwrap_or_default());
        }
        Ok(pairs)
    }

    /// Rows keyed by their first column, each row mapped by column name.
    /// Row and column order are kept.
    fn fetch_assoc(&mut self, sql: &str, params: &[Value]) -> Result<OrderedMap<NamedRow>> {
        let rs = self.query(sql, params)?;
        let columns = rs.columns;
        let mut keyed = OrderedMap::with_capacity(rs.rows.len());
        for row in rs.rows {
            let Some(key) = row.first().map(|v| v.to_string()) else {
                continue;
            };
            keyed.insert(key, columns.iter().cloned().zip(row).collect());
        }
        Ok(keyed)
    }
}
