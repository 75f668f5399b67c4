//! Graph store seam.
//!
//! The update service talks to the store through [`GraphStore`] and
//! [`StoreTxn`]. Two backends exist:
//!
//! - [`Neo4jStore`]: pooled Bolt connections via `neo4rs`
//! - [`MemoryStore`]: in-process nodes, used by tests and `serve --memory`
//!
//! Every statement is matched by a static label plus a key property, and
//! every caller-supplied value travels as a query parameter. See [`cypher`].

pub mod cypher;
pub mod memory;
pub mod neo4j;

use async_trait::async_trait;
use thiserror::Error;

use crate::entity::{Assignment, PropertyMap, CHARACTER_LABEL, KEY_PROPERTY};

pub use memory::MemoryStore;
pub use neo4j::Neo4jStore;

/// Low-level store failure. Never shown to GraphQL callers.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("commit failed: {0}")]
    Commit(String),

    #[error("rollback failed: {0}")]
    Rollback(String),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("malformed record: {0}")]
    Decode(String),
}

/// Selects nodes by label and an exact key property match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSelector {
    pub label: &'static str,
    pub key_property: &'static str,
    pub key: String,
}

impl NodeSelector {
    /// Characters whose `name` equals `name`.
    pub fn character(name: &str) -> Self {
        Self {
            label: CHARACTER_LABEL,
            key_property: KEY_PROPERTY,
            key: name.to_string(),
        }
    }
}

/// Property assignments applied to every node a selector matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUpdate {
    pub selector: NodeSelector,
    pub assignments: Vec<Assignment>,
}

/// A connection factory for store transactions.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Open a transaction. The returned handle must be finished with
    /// [`StoreTxn::commit`] or [`StoreTxn::rollback`].
    async fn begin(&self) -> Result<Box<dyn StoreTxn>, StoreError>;

    /// Release pooled resources at shutdown.
    async fn close(&self) {}
}

/// An open store transaction.
#[async_trait]
pub trait StoreTxn: Send {
    /// Number of nodes the selector matches.
    async fn count(&mut self, selector: &NodeSelector) -> Result<i64, StoreError>;

    /// Properties of every matched node.
    async fn fetch(&mut self, selector: &NodeSelector) -> Result<Vec<PropertyMap>, StoreError>;

    /// Apply the assignments and return the post-update properties of every
    /// matched node. Not visible outside the transaction until commit.
    async fn update(&mut self, update: &NodeUpdate) -> Result<Vec<PropertyMap>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
