use dbsplit::adapter::{
    AdapterConfig, ConnectionHandle, DatabaseAdapter, ParameterKind, PreparedStatement, QuoteType,
};
use dbsplit::profiling::{Profiler, ProfilerSettings};
use dbsplit::session::ReplicationAdapter;
use dbsplit::types::{ColumnDescriptor, FetchMode, ResultSet, Value};
use dbsplit::{DbSplitError, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Calls seen by every adapter sharing the log, in order, as `"name.op"`
/// or `"name.op detail"`
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Operation names that make an adapter fail; shared so a test can flip
/// failures after the adapter has been moved into a router
pub type Failures = Arc<Mutex<HashSet<&'static str>>>;

/// Adapter that records every call and answers with canned data.
///
/// Row-returning calls yield a single `origin` column holding the adapter
/// name, which lets tests see where a statement ran from its result.
pub struct RecordingAdapter {
    config: AdapterConfig,
    log: CallLog,
    failures: Failures,
    connected: bool,
    profiler: Profiler,
    fetch_mode: FetchMode,
    statement_class: String,
}

#[allow(dead_code)]
impl RecordingAdapter {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            config: AdapterConfig::in_memory(name),
            log: log.clone(),
            failures: Failures::default(),
            connected: false,
            profiler: Profiler::default(),
            fetch_mode: FetchMode::default(),
            statement_class: "Statement".to_string(),
        }
    }

    pub fn failing_on(self, op: &'static str) -> Self {
        self.failures.lock().insert(op);
        self
    }

    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }

    pub fn failures(&self) -> Failures {
        self.failures.clone()
    }

    fn record(&self, op: &'static str, detail: Option<&str>) -> Result<()> {
        let entry = match detail {
            Some(detail) => format!("{}.{} {}", self.config.name, op, detail),
            None => format!("{}.{}", self.config.name, op),
        };
        self.log.lock().push(entry);
        if self.failures.lock().contains(op) {
            return Err(DbSplitError::Adapter(format!(
                "{} failed on {}",
                op, self.config.name
            )));
        }
        Ok(())
    }

    fn origin(&self) -> ResultSet {
        ResultSet::new(
            vec!["origin".to_string(), "label".to_string()],
            vec![vec![
                Value::Text(self.config.name.clone()),
                Value::Text(format!("{}-row", self.config.name)),
            ]],
        )
    }
}

impl DatabaseAdapter for RecordingAdapter {
    fn get_connection(&mut self) -> Result<ConnectionHandle> {
        self.record("get_connection", None)?;
        self.connected = true;
        Ok(ConnectionHandle {
            id: uuid::Uuid::new_v4(),
            adapter: self.config.name.clone(),
            dbname: self.config.dbname.clone(),
            opened_at: chrono::Utc::now(),
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn close_connection(&mut self) -> Result<()> {
        self.record("close_connection", None)?;
        self.connected = false;
        Ok(())
    }

    fn query(&mut self, sql: &str, _params: &[Value]) -> Result<ResultSet> {
        self.record("query", Some(sql))?;
        Ok(self.origin())
    }

    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        self.record("prepare", Some(sql))?;
        Ok(PreparedStatement {
            sql: sql.to_string(),
            parameter_count: sql.matches('?').count(),
            columns: vec!["origin".to_string(), "label".to_string()],
            read_only: true,
        })
    }

    fn begin_transaction(&mut self) -> Result<()> {
        self.record("begin_transaction", None)
    }

    fn commit(&mut self) -> Result<()> {
        self.record("commit", None)
    }

    fn rollback(&mut self) -> Result<()> {
        self.record("rollback", None)
    }

    fn insert(&mut self, table: &str, _values: &[(&str, Value)]) -> Result<u64> {
        self.record("insert", Some(table))?;
        Ok(1)
    }

    fn update(&mut self, table: &str, _values: &[(&str, Value)], _conditions: &[&str]) -> Result<u64> {
        self.record("update", Some(table))?;
        Ok(2)
    }

    fn delete(&mut self, table: &str, _conditions: &[&str]) -> Result<u64> {
        self.record("delete", Some(table))?;
        Ok(3)
    }

    fn describe_table(&mut self, table: &str, _schema: Option<&str>) -> Result<Vec<ColumnDescriptor>> {
        self.record("describe_table", Some(table))?;
        Ok(Vec::new())
    }

    fn list_tables(&mut self) -> Result<Vec<String>> {
        self.record("list_tables", None)?;
        Ok(vec![format!("{}_table", self.config.name)])
    }

    fn last_insert_id(&mut self, _table: Option<&str>, _primary_key: Option<&str>) -> Result<Option<i64>> {
        self.record("last_insert_id", None)?;
        Ok(Some(self.config.name.len() as i64))
    }

    fn last_sequence_id(&mut self, sequence: &str) -> Result<Option<i64>> {
        self.record("last_sequence_id", Some(sequence))?;
        Ok(Some(10))
    }

    fn next_sequence_id(&mut self, sequence: &str) -> Result<Option<i64>> {
        self.record("next_sequence_id", Some(sequence))?;
        Ok(Some(11))
    }

    fn server_version(&mut self) -> Result<Option<String>> {
        self.record("server_version", None)?;
        Ok(Some(format!("{}-1.0", self.config.name)))
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn set_profiler(&mut self, settings: ProfilerSettings) -> Result<()> {
        self.record("set_profiler", None)?;
        self.profiler = Profiler::new(settings);
        Ok(())
    }

    fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    fn set_fetch_mode(&mut self, mode: FetchMode) -> Result<()> {
        self.record("set_fetch_mode", None)?;
        self.fetch_mode = mode;
        Ok(())
    }

    fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    fn set_statement_class(&mut self, class: &str) -> Result<()> {
        self.record("set_statement_class", Some(class))?;
        self.statement_class = class.to_string();
        Ok(())
    }

    fn statement_class(&self) -> &str {
        &self.statement_class
    }

    fn limit(&self, sql: &str, count: u64, offset: u64) -> Result<String> {
        Ok(format!("{sql} /* {} */ LIMIT {count} OFFSET {offset}", self.config.name))
    }

    fn supports_parameters(&self, kind: ParameterKind) -> bool {
        // primaries take both styles, anything else positional only
        kind == ParameterKind::Positional || self.config.name == "primary"
    }

    fn quote(&self, value: &Value, _ty: Option<QuoteType>) -> String {
        format!("<{}:{}>", self.config.name, value)
    }

    fn quote_identifier_symbol(&self) -> &str {
        "`"
    }
}

/// Fresh shared call log
#[allow(dead_code)]
pub fn call_log() -> CallLog {
    CallLog::default()
}

/// Calls recorded so far, clearing the log
#[allow(dead_code)]
pub fn take_calls(log: &CallLog) -> Vec<String> {
    std::mem::take(&mut *log.lock())
}

/// Router over recording adapters named `primary` and `replica`, with
/// handles to each side's failure set
#[allow(dead_code)]
pub fn recording_router() -> (ReplicationAdapter, CallLog, Failures, Failures) {
    let log = call_log();
    let primary = RecordingAdapter::new("primary", &log);
    let replica = RecordingAdapter::new("replica", &log);
    let (primary_failures, replica_failures) = (primary.failures(), replica.failures());
    let router = ReplicationAdapter::with_replica(Box::new(primary), Box::new(replica));
    (router, log, primary_failures, replica_failures)
}

/// Router over a single recording adapter named `primary`
#[allow(dead_code)]
pub fn recording_primary_only() -> (ReplicationAdapter, CallLog) {
    let log = call_log();
    let router = ReplicationAdapter::primary_only(Box::new(RecordingAdapter::new("primary", &log)));
    (router, log)
}
