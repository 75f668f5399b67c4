//! Character update service.
//!
//! `update_character` looks a character up by name and applies a partial
//! update inside one store transaction:
//!
//! - no match → `Ok(None)`, transaction rolled back, nothing written
//! - one match → all requested fields written, committed, snapshot returned
//! - several matches → [`ServiceError::MultipleMatches`], rolled back
//!
//! Store failures are logged here and reported to callers only as
//! [`ServiceError::UpdateFailed`].

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::entity::{Character, ChangeSet, PropertyMap};
use crate::store::{GraphStore, NodeSelector, NodeUpdate, StoreError, StoreTxn};

/// Errors visible to API callers. Carries no store detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("character name must not be empty")]
    InvalidKey,

    #[error("{count} characters are named {name:?}; refusing to update an ambiguous match")]
    MultipleMatches { name: String, count: i64 },

    #[error("Failed to update character")]
    UpdateFailed,

    #[error("Failed to look up character")]
    LookupFailed,
}

impl ServiceError {
    /// Stable machine-readable code for API error extensions.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidKey => "INVALID_KEY",
            ServiceError::MultipleMatches { .. } => "MULTIPLE_MATCHES",
            ServiceError::UpdateFailed => "UPDATE_FAILED",
            ServiceError::LookupFailed => "LOOKUP_FAILED",
        }
    }
}

/// Result of the transactional part of an update.
#[derive(Debug)]
enum Outcome {
    Updated(Character),
    NotFound,
    Ambiguous(i64),
}

pub struct UpdateService {
    store: Arc<dyn GraphStore>,
    timeout: Duration,
}

impl UpdateService {
    pub fn new(store: Arc<dyn GraphStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Apply `changes` to the character named `name`.
    ///
    /// The transaction runs on its own task: if the caller goes away the
    /// store still sees a commit or rollback.
    pub async fn update_character(
        &self,
        name: &str,
        changes: ChangeSet,
    ) -> Result<Option<Character>, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidKey);
        }
        info!(name = %name, changes = %changes, "updating character");

        let update = NodeUpdate {
            selector: NodeSelector::character(name),
            assignments: changes.assignments(),
        };
        let store = Arc::clone(&self.store);
        let task = tokio::spawn(async move { apply_update(store.as_ref(), &update).await });

        let outcome = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(e))) => {
                error!(name = %name, error = %e, "character update failed");
                return Err(ServiceError::UpdateFailed);
            }
            Ok(Err(e)) => {
                error!(name = %name, error = %e, "character update task aborted");
                return Err(ServiceError::UpdateFailed);
            }
            Err(_) => {
                error!(
                    name = %name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "character update timed out"
                );
                return Err(ServiceError::UpdateFailed);
            }
        };

        match outcome {
            Outcome::Updated(character) => {
                debug!(name = %name, id = %character.id, "character updated");
                Ok(Some(character))
            }
            Outcome::NotFound => {
                debug!(name = %name, "no character with that name");
                Ok(None)
            }
            Outcome::Ambiguous(count) => {
                warn!(name = %name, count, "name matches several characters");
                Err(ServiceError::MultipleMatches {
                    name: name.to_string(),
                    count,
                })
            }
        }
    }

    /// Every character whose name equals `name`, read in one transaction.
    ///
    /// Like updates, the read runs on its own task so its transaction is
    /// rolled back even when the caller times out or goes away.
    pub async fn find_characters(&self, name: &str) -> Result<Vec<Character>, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidKey);
        }

        let selector = NodeSelector::character(name);
        let store = Arc::clone(&self.store);
        let task = tokio::spawn(async move { fetch(store.as_ref(), &selector).await });

        let rows = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(rows))) => rows,
            Ok(Ok(Err(e))) => {
                error!(name = %name, error = %e, "character lookup failed");
                return Err(ServiceError::LookupFailed);
            }
            Ok(Err(e)) => {
                error!(name = %name, error = %e, "character lookup task aborted");
                return Err(ServiceError::LookupFailed);
            }
            Err(_) => {
                error!(
                    name = %name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "character lookup timed out"
                );
                return Err(ServiceError::LookupFailed);
            }
        };

        Ok(rows
            .iter()
            .filter_map(|props| {
                let character = Character::from_properties(props);
                if character.is_none() {
                    warn!(name = %name, "skipping character node without a name");
                }
                character
            })
            .collect())
    }
}

/// Open a transaction, run the update, and finish the transaction on every
/// path.
async fn apply_update(store: &dyn GraphStore, update: &NodeUpdate) -> Result<Outcome, StoreError> {
    let mut txn = store.begin().await?;

    match run_update(txn.as_mut(), update).await {
        Ok(Outcome::Updated(character)) => {
            txn.commit().await?;
            Ok(Outcome::Updated(character))
        }
        Ok(other) => {
            if let Err(e) = txn.rollback().await {
                warn!(error = %e, "rollback after unmatched update failed");
            }
            Ok(other)
        }
        Err(e) => {
            if let Err(rb) = txn.rollback().await {
                warn!(error = %rb, "rollback after failed update failed");
            }
            Err(e)
        }
    }
}

async fn run_update(txn: &mut dyn StoreTxn, update: &NodeUpdate) -> Result<Outcome, StoreError> {
    let matches = txn.count(&update.selector).await?;
    match matches {
        0 => return Ok(Outcome::NotFound),
        1 => {}
        n => return Ok(Outcome::Ambiguous(n)),
    }

    let rows = txn.update(update).await?;
    if rows.len() != 1 {
        return Err(StoreError::Decode(format!(
            "update touched {} nodes, expected 1",
            rows.len()
        )));
    }
    let character = Character::from_properties(&rows[0])
        .ok_or_else(|| StoreError::Decode("character node without a name".to_string()))?;
    Ok(Outcome::Updated(character))
}

async fn fetch(store: &dyn GraphStore, selector: &NodeSelector) -> Result<Vec<PropertyMap>, StoreError> {
    let mut txn = store.begin().await?;
    let result = txn.fetch(selector).await;
    if let Err(e) = txn.rollback().await {
        warn!(error = %e, "closing read transaction failed");
    }
    result
}
