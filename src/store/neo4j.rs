//! Neo4j backend over Bolt.

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query, Txn};
use tracing::{debug, info};

use super::cypher::{self, Statement, COUNT_COLUMN, PROPS_COLUMN};
use super::{GraphStore, NodeSelector, NodeUpdate, StoreError, StoreTxn};
use crate::config::StoreConfig;
use crate::entity::{PropertyMap, StoredProperties, Value};

/// Shared, pooled driver. Cheap to clone.
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Connect and authenticate. Called once at startup.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections)
            .fetch_size(config.fetch_size);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo_config = builder
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        log_connected(config);
        Ok(Self { graph })
    }
}

// Only the endpoint is recorded; credentials never reach the log.
fn log_connected(config: &StoreConfig) {
    info!(uri = %config.uri, database = ?config.database, "connected to neo4j");
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn begin(&self) -> Result<Box<dyn StoreTxn>, StoreError> {
        let txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Box::new(Neo4jTxn { txn }))
    }

    async fn close(&self) {
        // The pool is shared by every clone of the handle; its connections
        // close once the last clone drops.
        info!("neo4j store released; pooled connections close with the last handle");
    }
}

struct Neo4jTxn {
    txn: Txn,
}

impl Neo4jTxn {
    async fn rows<F, T>(&mut self, stmt: Statement, mut decode: F) -> Result<Vec<T>, StoreError>
    where
        F: FnMut(&neo4rs::Row) -> Result<T, StoreError> + Send,
        T: Send,
    {
        debug!(cypher = %stmt.text, params = stmt.params.len(), "executing statement");
        let mut stream = self
            .txn
            .execute(to_query(&stmt))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = stream
            .next(self.txn.handle())
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            out.push(decode(&row)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl StoreTxn for Neo4jTxn {
    async fn count(&mut self, selector: &NodeSelector) -> Result<i64, StoreError> {
        let counts = self
            .rows(cypher::count(selector)?, |row| {
                row.get::<i64>(COUNT_COLUMN)
                    .map_err(|e| StoreError::Decode(e.to_string()))
            })
            .await?;
        Ok(counts.into_iter().next().unwrap_or(0))
    }

    async fn fetch(&mut self, selector: &NodeSelector) -> Result<Vec<PropertyMap>, StoreError> {
        self.rows(cypher::fetch(selector)?, decode_props).await
    }

    async fn update(&mut self, update: &NodeUpdate) -> Result<Vec<PropertyMap>, StoreError> {
        self.rows(cypher::update(update)?, decode_props).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn
            .commit()
            .await
            .map_err(|e| StoreError::Commit(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.txn
            .rollback()
            .await
            .map_err(|e| StoreError::Rollback(e.to_string()))
    }
}

fn to_query(stmt: &Statement) -> Query {
    stmt.params
        .iter()
        .fold(neo4rs::query(&stmt.text), |q, (name, value)| match value {
            Value::Int(v) => q.param(name, *v),
            Value::Str(s) => q.param(name, s.clone()),
        })
}

// Properties the snapshot cannot represent read as absent rather than
// failing the whole record.
fn decode_props(row: &neo4rs::Row) -> Result<PropertyMap, StoreError> {
    row.get::<StoredProperties>(PROPS_COLUMN)
        .map(PropertyMap::from)
        .map_err(|e| StoreError::Decode(e.to_string()))
}
