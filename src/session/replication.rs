use crate::adapter::{
    AdapterConfig, ConnectionHandle, DatabaseAdapter, ParameterKind, PreparedStatement, QuoteType,
};
use crate::profiling::{Profiler, ProfilerSettings};
use crate::query::{QueryTypeDetector, StatementClass};
use crate::session::{Replica, TransactionState};
use crate::types::{ColumnDescriptor, FetchMode, ResultSet, Value};
use crate::Result;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryRoute {
    /// Read outside a transaction with a replica configured
    Replica,
    /// Write, or no replica configured
    Primary,
    /// Any statement while a transaction is open
    PrimaryTransaction,
}

/// Pick the adapter for a statement.
///
/// The replica is chosen only for a read, with a replica present, outside a
/// transaction. Everything else goes to the primary.
pub fn determine_route(sql: &str, state: TransactionState, replica_present: bool) -> QueryRoute {
    if state.in_transaction() {
        return QueryRoute::PrimaryTransaction;
    }

    match QueryTypeDetector::classify(sql) {
        StatementClass::Read if replica_present => QueryRoute::Replica,
        _ => QueryRoute::Primary,
    }
}

/// Read/write splitting router over a primary and an optional replica.
///
/// Implements [`DatabaseAdapter`] itself, so it can stand in for a plain
/// adapter or be nested under another router. Reads issued outside a
/// transaction go to the replica; writes, metadata lookups and everything
/// inside a transaction go to the primary. Configuration setters and
/// connection lifecycle calls are applied to the primary first and then
/// mirrored to the replica. The mirror is not atomic: if the replica fails,
/// the error is returned after the primary has already changed.
///
/// The transaction state belongs to this router value and every call that
/// can change or depend on it takes `&mut self`, so one router serves one
/// logical session at a time. Concurrent sessions each need their own router.
pub struct ReplicationAdapter {
    primary: Box<dyn DatabaseAdapter>,
    replica: Replica,
    state: TransactionState,
}

impl ReplicationAdapter {
    pub fn new(primary: Box<dyn DatabaseAdapter>, replica: Option<Box<dyn DatabaseAdapter>>) -> Self {
        let replica = Replica::new(replica);
        info!(
            "Replication adapter over {} with replica {:?}",
            primary.config().name,
            replica
        );
        Self {
            primary,
            replica,
            state: TransactionState::default(),
        }
    }

    pub fn primary_only(primary: Box<dyn DatabaseAdapter>) -> Self {
        Self::new(primary, None)
    }

    pub fn with_replica(primary: Box<dyn DatabaseAdapter>, replica: Box<dyn DatabaseAdapter>) -> Self {
        Self::new(primary, Some(replica))
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.state
    }

    pub fn in_transaction(&self) -> bool {
        self.state.in_transaction()
    }

    pub fn has_replica(&self) -> bool {
        self.replica.is_present()
    }

    pub fn primary(&self) -> &dyn DatabaseAdapter {
        &*self.primary
    }

    pub fn replica(&self) -> Option<&dyn DatabaseAdapter> {
        self.replica.as_adapter()
    }

    /// Where `sql` would be sent right now
    pub fn route_for(&self, sql: &str) -> QueryRoute {
        determine_route(sql, self.state, self.replica.is_present())
    }

    pub fn into_parts(self) -> (Box<dyn DatabaseAdapter>, Option<Box<dyn DatabaseAdapter>>) {
        (self.primary, self.replica.into_inner())
    }

    fn target(&mut self, sql: &str) -> &mut dyn DatabaseAdapter {
        let route = self.route_for(sql);
        debug!(
            "Query route: {:?} for SQL: {}",
            route,
            sql.chars().take(100).collect::<String>()
        );

        match route {
            QueryRoute::Replica => match self.replica.as_adapter_mut() {
                Some(replica) => replica,
                None => &mut *self.primary,
            },
            QueryRoute::Primary | QueryRoute::PrimaryTransaction => &mut *self.primary,
        }
    }
}

impl DatabaseAdapter for ReplicationAdapter {
    fn get_connection(&mut self) -> Result<ConnectionHandle> {
        let handle = self.primary.get_connection()?;
        self.replica.guard(|r| r.get_connection().map(drop))?;
        Ok(handle)
    }

    /// True if either side is connected. A connected replica alone counts:
    /// the router can still serve reads even though writes need the primary.
    fn is_connected(&self) -> bool {
        self.primary.is_connected() || self.replica.is_connected()
    }

    fn close_connection(&mut self) -> Result<()> {
        self.primary.close_connection()?;
        self.replica.guard(|r| r.close_connection())
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        self.target(sql).query(sql, params)
    }

    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        self.target(sql).prepare(sql)
    }

    fn begin_transaction(&mut self) -> Result<()> {
        let outcome = self.primary.begin_transaction();
        self.state.after_begin(&outcome);
        debug!("begin_transaction -> {:?}", self.state);
        outcome
    }

    fn commit(&mut self) -> Result<()> {
        let outcome = self.primary.commit();
        self.state.after_commit(&outcome);
        debug!("commit -> {:?}", self.state);
        outcome
    }

    fn rollback(&mut self) -> Result<()> {
        let outcome = self.primary.rollback();
        self.state.after_rollback(&outcome);
        debug!("rollback -> {:?}", self.state);
        outcome
    }

    fn insert(&mut self, table: &str, values: &[(&str, Value)]) -> Result<u64> {
        self.primary.insert(table, values)
    }

    fn update(
        &mut self,
        table: &str,
        values: &[(&str, Value)],
        conditions: &[&str],
    ) -> Result<u64> {
        self.primary.update(table, values, conditions)
    }

    fn delete(&mut self, table: &str, conditions: &[&str]) -> Result<u64> {
        self.primary.delete(table, conditions)
    }

    fn describe_table(
        &mut self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Vec<ColumnDescriptor>> {
        self.primary.describe_table(table, schema)
    }

    fn list_tables(&mut self) -> Result<Vec<String>> {
        self.primary.list_tables()
    }

    fn last_insert_id(
        &mut self,
        table: Option<&str>,
        primary_key: Option<&str>,
    ) -> Result<Option<i64>> {
        self.primary.last_insert_id(table, primary_key)
    }

    fn last_sequence_id(&mut self, sequence: &str) -> Result<Option<i64>> {
        self.primary.last_sequence_id(sequence)
    }

    fn next_sequence_id(&mut self, sequence: &str) -> Result<Option<i64>> {
        self.primary.next_sequence_id(sequence)
    }

    fn server_version(&mut self) -> Result<Option<String>> {
        self.primary.server_version()
    }

    fn config(&self) -> &AdapterConfig {
        self.primary.config()
    }

    fn set_profiler(&mut self, settings: ProfilerSettings) -> Result<()> {
        self.primary.set_profiler(settings.clone())?;
        self.replica.guard(|r| r.set_profiler(settings))
    }

    fn profiler(&self) -> &Profiler {
        self.primary.profiler()
    }

    fn set_fetch_mode(&mut self, mode: FetchMode) -> Result<()> {
        self.primary.set_fetch_mode(mode)?;
        self.replica.guard(|r| r.set_fetch_mode(mode))
    }

    fn fetch_mode(&self) -> FetchMode {
        self.primary.fetch_mode()
    }

    fn set_statement_class(&mut self, class: &str) -> Result<()> {
        self.primary.set_statement_class(class)?;
        self.replica.guard(|r| r.set_statement_class(class))
    }

    fn statement_class(&self) -> &str {
        self.primary.statement_class()
    }

    fn limit(&self, sql: &str, count: u64, offset: u64) -> Result<String> {
        self.primary.limit(sql, count, offset)
    }

    fn supports_parameters(&self, kind: ParameterKind) -> bool {
        self.primary.supports_parameters(kind)
    }

    fn quote(&self, value: &Value, ty: Option<QuoteType>) -> String {
        self.primary.quote(value, ty)
    }

    fn quote_identifier_symbol(&self) -> &str {
        self.primary.quote_identifier_symbol()
    }
}
