//! Test doubles for the storage seams.
//!
//! Every mock records its calls into shared state that the test keeps a
//! handle to, and returns errors injected through builder methods.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ConfigError, ConfigSource};
use crate::storage::StorageError;
use crate::storage::connector::Connector;
use crate::storage::db::{Connection, Transaction};
use crate::storage::error::DbError;
use crate::storage::executor::Executor;
use crate::storage::inserter::Inserter;
use crate::storage::schema::SchemaPreparer;
use crate::storage::statements::StatementPreparer;
use crate::storage::types::{EventRow, SocketInfoRow, SqlValue, Statement};

/// Error a mock should report.
#[derive(Debug, Clone, Copy)]
pub enum MockError {
    /// Generic driver failure with the given message.
    Driver(&'static str),
    /// "relation already exists".
    DuplicateRelation,
}

impl MockError {
    pub fn to_db_error(self) -> DbError {
        match self {
            Self::Driver(msg) => driver_error(msg),
            Self::DuplicateRelation => {
                DbError::DuplicateRelation("relation already exists".to_string())
            }
        }
    }
}

fn driver_error(msg: &str) -> DbError {
    DbError::Driver(sqlx::Error::Protocol(msg.to_string()))
}

/// Whether `needle` appears in the message of `err` or any of its sources.
pub fn error_chain_contains(err: &(dyn std::error::Error + 'static), needle: &str) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.to_string().contains(needle) {
            return true;
        }
        current = e.source();
    }
    false
}

// --- Connection / Transaction ---

/// Calls made inside transactions.
#[derive(Debug, Default)]
pub struct MockTxRecord {
    pub executed: Vec<String>,
    pub commit_calls: usize,
    pub rollback_calls: usize,
}

/// Calls made on a [`MockConnection`].
#[derive(Debug, Default)]
pub struct MockRecord {
    /// Raw SQL passed to `execute`.
    pub executed: Vec<String>,
    /// Name and arguments passed to `execute_prepared`.
    pub executed_prepared: Vec<(String, Vec<SqlValue>)>,
    /// Name and SQL passed to `prepare`.
    pub prepared: Vec<(String, String)>,
    pub begin_calls: usize,
    pub tx: MockTxRecord,
    pub close_calls: usize,
}

#[derive(Debug, Default)]
pub struct MockConnection {
    record: Arc<Mutex<MockRecord>>,
    execute_error: Option<MockError>,
    prepare_error: Option<(usize, MockError)>,
    begin_error: Option<MockError>,
    tx_exec_error: Option<(usize, MockError)>,
    commit_error: Option<MockError>,
    rollback_error: Option<MockError>,
    close_error: Option<MockError>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `execute` and `execute_prepared` call.
    pub fn with_execute_error(mut self, err: MockError) -> Self {
        self.execute_error = Some(err);
        self
    }

    /// Fail `prepare` calls from the `from`-th one (zero based) onwards.
    pub fn with_prepare_error(mut self, from: usize, err: MockError) -> Self {
        self.prepare_error = Some((from, err));
        self
    }

    pub fn with_begin_error(mut self, err: MockError) -> Self {
        self.begin_error = Some(err);
        self
    }

    /// Fail the `index`-th statement executed in each transaction.
    pub fn with_tx_exec_error(mut self, index: usize, err: MockError) -> Self {
        self.tx_exec_error = Some((index, err));
        self
    }

    pub fn with_commit_error(mut self, err: MockError) -> Self {
        self.commit_error = Some(err);
        self
    }

    pub fn with_rollback_error(mut self, err: MockError) -> Self {
        self.rollback_error = Some(err);
        self
    }

    pub fn with_close_error(mut self, err: MockError) -> Self {
        self.close_error = Some(err);
        self
    }

    pub fn record(&self) -> Arc<Mutex<MockRecord>> {
        Arc::clone(&self.record)
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&mut self, sql: &str, _args: &[SqlValue]) -> Result<u64, DbError> {
        self.record.lock().unwrap().executed.push(sql.to_string());
        match self.execute_error {
            Some(err) => Err(err.to_db_error()),
            None => Ok(0),
        }
    }

    async fn execute_prepared(&mut self, name: &str, args: &[SqlValue]) -> Result<u64, DbError> {
        self.record
            .lock()
            .unwrap()
            .executed_prepared
            .push((name.to_string(), args.to_vec()));
        match self.execute_error {
            Some(err) => Err(err.to_db_error()),
            None => Ok(1),
        }
    }

    async fn prepare(&mut self, name: &str, sql: &str) -> Result<(), DbError> {
        let mut record = self.record.lock().unwrap();
        let index = record.prepared.len();
        record.prepared.push((name.to_string(), sql.to_string()));
        match self.prepare_error {
            Some((from, err)) if index >= from => Err(err.to_db_error()),
            _ => Ok(()),
        }
    }

    async fn begin<'c>(&'c mut self) -> Result<Box<dyn Transaction + 'c>, DbError> {
        self.record.lock().unwrap().begin_calls += 1;
        if let Some(err) = self.begin_error {
            return Err(err.to_db_error());
        }
        Ok(Box::new(MockTx {
            record: Arc::clone(&self.record),
            executed: 0,
            exec_error: self.tx_exec_error,
            commit_error: self.commit_error,
            rollback_error: self.rollback_error,
        }))
    }

    async fn close(self) -> Result<(), DbError> {
        self.record.lock().unwrap().close_calls += 1;
        match self.close_error {
            Some(err) => Err(err.to_db_error()),
            None => Ok(()),
        }
    }

    fn endpoint(&self) -> &str {
        "mock:5432"
    }
}

struct MockTx {
    record: Arc<Mutex<MockRecord>>,
    executed: usize,
    exec_error: Option<(usize, MockError)>,
    commit_error: Option<MockError>,
    rollback_error: Option<MockError>,
}

#[async_trait]
impl Transaction for MockTx {
    async fn execute_prepared(&mut self, name: &str, _args: &[SqlValue]) -> Result<u64, DbError> {
        self.record.lock().unwrap().tx.executed.push(name.to_string());
        let index = self.executed;
        self.executed += 1;
        match self.exec_error {
            Some((at, err)) if at == index => Err(err.to_db_error()),
            _ => Ok(1),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.record.lock().unwrap().tx.commit_calls += 1;
        match self.commit_error {
            Some(err) => Err(err.to_db_error()),
            None => Ok(()),
        }
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.record.lock().unwrap().tx.rollback_calls += 1;
        match self.rollback_error {
            Some(err) => Err(err.to_db_error()),
            None => Ok(()),
        }
    }
}

// --- Config source / connector ---

#[derive(Debug, Clone)]
pub struct MockConfigSource {
    result: Result<String, &'static str>,
}

impl MockConfigSource {
    /// Reports `var` as a missing environment variable.
    pub fn failing(var: &'static str) -> Self {
        Self { result: Err(var) }
    }

    pub fn returning(conn_str: &str) -> Self {
        Self {
            result: Ok(conn_str.to_string()),
        }
    }
}

impl ConfigSource for MockConfigSource {
    fn config(&self) -> Result<String, ConfigError> {
        self.result.clone().map_err(ConfigError::MissingEnvVar)
    }
}

/// Hands out one prepared [`MockConnection`].
#[derive(Debug, Default)]
pub struct MockConnector {
    conn: Mutex<Option<MockConnection>>,
    error: Option<&'static str>,
}

impl MockConnector {
    pub fn new(conn: MockConnection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            error: None,
        }
    }

    pub fn failing(msg: &'static str) -> Self {
        Self {
            conn: Mutex::new(None),
            error: Some(msg),
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&self) -> Result<MockConnection, StorageError> {
        if let Some(msg) = self.error {
            return Err(StorageError::Connect(driver_error(msg)));
        }
        self.conn
            .lock()
            .unwrap()
            .take()
            .ok_or(StorageError::Connect(DbError::Closed))
    }
}

// --- Preparers / executor ---

#[derive(Debug, Default)]
pub struct MockSchemaPreparer {
    calls: Arc<Mutex<usize>>,
    error: Option<&'static str>,
}

impl MockSchemaPreparer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(mut self, msg: &'static str) -> Self {
        self.error = Some(msg);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SchemaPreparer for MockSchemaPreparer {
    async fn create_tables(&mut self) -> Result<(), StorageError> {
        *self.calls.lock().unwrap() += 1;
        match self.error {
            Some(msg) => Err(StorageError::CreateTable {
                table: "tcp_events",
                source: driver_error(msg),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockStatementPreparer {
    names: Arc<Mutex<Vec<&'static str>>>,
    error: Option<(usize, &'static str)>,
}

impl MockStatementPreparer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail calls from the `from`-th one (zero based) onwards.
    pub fn failing_from(mut self, from: usize, msg: &'static str) -> Self {
        self.error = Some((from, msg));
        self
    }

    pub fn names(&self) -> Arc<Mutex<Vec<&'static str>>> {
        Arc::clone(&self.names)
    }
}

#[async_trait]
impl StatementPreparer for MockStatementPreparer {
    async fn prepare_statement(
        &mut self,
        _sql: &'static str,
        name: &'static str,
    ) -> Result<(), StorageError> {
        let mut names = self.names.lock().unwrap();
        let index = names.len();
        names.push(name);
        match self.error {
            Some((from, msg)) if index >= from => Err(StorageError::PrepareStatement {
                name,
                source: driver_error(msg),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockExecutorRecord {
    pub execs: Vec<Statement>,
    pub batches: Vec<Vec<Statement>>,
    pub close_calls: usize,
}

/// Records statements; fails every call when given an error.
#[derive(Debug, Default)]
pub struct MockExecutor {
    record: Arc<Mutex<MockExecutorRecord>>,
    error: Option<&'static str>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(mut self, msg: &'static str) -> Self {
        self.error = Some(msg);
        self
    }

    pub fn record(&self) -> Arc<Mutex<MockExecutorRecord>> {
        Arc::clone(&self.record)
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn exec(&mut self, name: &'static str, args: &[SqlValue]) -> Result<(), StorageError> {
        self.record
            .lock()
            .unwrap()
            .execs
            .push(Statement::new(name, args.to_vec()));
        match self.error {
            Some(msg) => Err(StorageError::Exec {
                name,
                source: driver_error(msg),
            }),
            None => Ok(()),
        }
    }

    async fn exec_multiple(&mut self, batch: &[Statement]) -> Result<(), StorageError> {
        self.record.lock().unwrap().batches.push(batch.to_vec());
        match (self.error, batch.first()) {
            (Some(msg), Some(stmt)) => Err(StorageError::TxExec {
                name: stmt.name,
                source: driver_error(msg),
            }),
            _ => Ok(()),
        }
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        self.record.lock().unwrap().close_calls += 1;
        match self.error {
            Some(msg) => Err(StorageError::Close(driver_error(msg))),
            None => Ok(()),
        }
    }
}

// --- Inserter ---

#[derive(Debug, Default)]
pub struct MockInserterRecord {
    pub prepare_calls: usize,
    pub inserts: Vec<(EventRow, Option<SocketInfoRow>)>,
    pub close_calls: usize,
}

#[derive(Debug, Default)]
pub struct MockInserter {
    record: Arc<Mutex<MockInserterRecord>>,
    prepare_error: Option<&'static str>,
    insert_error: Option<&'static str>,
    insert_delay: Option<Duration>,
}

impl MockInserter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prepare_error(mut self, msg: &'static str) -> Self {
        self.prepare_error = Some(msg);
        self
    }

    pub fn with_insert_error(mut self, msg: &'static str) -> Self {
        self.insert_error = Some(msg);
        self
    }

    /// Sleep this long inside every `insert`.
    pub fn with_insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = Some(delay);
        self
    }

    pub fn record(&self) -> Arc<Mutex<MockInserterRecord>> {
        Arc::clone(&self.record)
    }
}

#[async_trait]
impl Inserter for MockInserter {
    async fn prepare(&mut self) -> Result<(), StorageError> {
        self.record.lock().unwrap().prepare_calls += 1;
        match self.prepare_error {
            Some(msg) => Err(StorageError::PrepareStatement {
                name: "tcp_events_insert",
                source: driver_error(msg),
            }),
            None => Ok(()),
        }
    }

    async fn insert(
        &mut self,
        event: EventRow,
        socket_info: Option<SocketInfoRow>,
    ) -> Result<(), StorageError> {
        if let Some(delay) = self.insert_delay {
            tokio::time::sleep(delay).await;
        }
        self.record.lock().unwrap().inserts.push((event, socket_info));
        match self.insert_error {
            Some(msg) => Err(StorageError::Insert {
                table: "tcp_events",
                source: Box::new(StorageError::Exec {
                    name: "tcp_events_insert",
                    source: driver_error(msg),
                }),
            }),
            None => Ok(()),
        }
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        self.record.lock().unwrap().close_calls += 1;
        Ok(())
    }
}
