//! # Holonet
//!
//! A GraphQL API over a Neo4j character graph.
//!
//! The interesting part is [`UpdateService::update_character`]: a partial
//! update of one character, looked up by name, applied in a single store
//! transaction. Everything else wires that operation to a schema, a server
//! and a store driver.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use holonet::{build_schema, execute, MemoryStore, UpdateService};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() {
//! let store = Arc::new(MemoryStore::with_sample_data());
//! let service = UpdateService::new(store, Duration::from_secs(30));
//! let schema = build_schema(Arc::new(service));
//!
//! let json = execute(
//!     &schema,
//!     r#"mutation { updateCharacter(name: "Leia Organa", mass: 50) { name mass } }"#,
//! )
//! .await;
//! # }
//! ```

pub mod config;
pub mod daemon;
pub mod entity;
pub mod error;
pub mod graphql;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use config::Config;
pub use entity::{Change, ChangeSet, Character};
pub use error::{HolonetError, Result};
pub use graphql::{build_schema, execute, HolonetSchema};
pub use service::{ServiceError, UpdateService};
pub use store::{GraphStore, MemoryStore, Neo4jStore, StoreError};
