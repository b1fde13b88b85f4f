use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::errors::{
    DeserializationError, ExecutionError, IntoRowsResultError, MaybeFirstRowError,
    NewSessionError, RowsError, UseKeyspaceError,
};
use scylla::response::query_result::QueryRowsResult;
use scylla::statement::Consistency;

use crate::config::Config;

pub mod query;

use query::Statement;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS todos (id uuid PRIMARY KEY, owner_id uuid, title text, description text, status text, created timestamp, updated timestamp)";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The initial connection to the cluster could not be established.
    #[error("failed to connect to the cluster: {0}")]
    Connect(#[from] NewSessionError),
    /// The keyspace could not be selected.
    #[error("failed to switch to the keyspace: {0}")]
    Keyspace(#[from] UseKeyspaceError),
    /// A query failed to execute (timeout, unavailable replicas, malformed query).
    #[error("query execution failed: {0}")]
    Query(#[from] ExecutionError),
    /// A read query did not produce a rows result.
    #[error("query did not return rows: {0}")]
    NotRows(#[from] IntoRowsResultError),
    /// The rows result could not be iterated with the expected row shape.
    #[error("failed to read result rows: {0}")]
    Rows(#[from] RowsError),
    /// The first row of a point lookup could not be read.
    #[error("failed to read the first result row: {0}")]
    FirstRow(#[from] MaybeFirstRowError),
    /// A result row could not be decoded.
    #[error("failed to decode a result row: {0}")]
    Decode(#[from] DeserializationError),
}

/// A session to the cluster bound to quorum consistency, established once
/// at startup and shared for the lifetime of the process.
///
/// Every read and write goes through the same default execution profile:
/// a write succeeds only once a strict majority of replicas acknowledges
/// it, and a read returns once a strict majority agrees on the most
/// recent value. Per-query failures are returned to the caller and never
/// retried here.
pub struct Store {
    session: Session,
}

impl Store {
    /// Connects to the configured node and prepares the keyspace and
    /// table. A failure here is fatal; the service must not start
    /// without a session.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let profile = ExecutionProfile::builder()
            .consistency(Consistency::Quorum)
            .build();
        let session = SessionBuilder::new()
            .known_node(&config.db_node)
            .default_execution_profile_handle(profile.into_handle())
            .build()
            .await?;
        let store = Store { session };
        store
            .ensure_schema(&config.keyspace, config.replication_factor)
            .await?;
        Ok(store)
    }

    async fn ensure_schema(
        &self,
        keyspace: &str,
        replication_factor: u8,
    ) -> Result<(), StoreError> {
        let create_keyspace = format!(
            "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'NetworkTopologyStrategy', 'replication_factor': {}}}",
            keyspace, replication_factor
        );
        self.session.query_unpaged(create_keyspace, ()).await?;
        self.session.use_keyspace(keyspace, false).await?;
        self.session.query_unpaged(CREATE_TABLE, ()).await?;
        Ok(())
    }

    /// Executes a write statement; no result rows are returned.
    pub async fn execute(&self, statement: Statement) -> Result<(), StoreError> {
        tracing::debug!(query = %statement.interpolated(), "executing write");
        let (cql, values) = statement.into_parts();
        self.session.query_unpaged(cql, values).await?;
        Ok(())
    }

    /// Executes a read statement and returns its rows result.
    pub async fn fetch(&self, statement: Statement) -> Result<QueryRowsResult, StoreError> {
        tracing::debug!(query = %statement.interpolated(), "executing read");
        let (cql, values) = statement.into_parts();
        let result = self.session.query_unpaged(cql, values).await?;
        Ok(result.into_rows_result()?)
    }
}
