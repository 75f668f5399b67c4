//! In-memory graph store.
//!
//! Transactions stage their property assignments privately and apply them
//! in one step on commit, so readers never observe a partially applied
//! update. Assignments land on the node's properties as they stand at commit
//! time: two transactions that touch different fields of one node both keep
//! their change. Commit failures can be injected to exercise rollback paths.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

use super::{GraphStore, NodeSelector, NodeUpdate, StoreError, StoreTxn};
use crate::entity::{Assignment, Character, PropertyMap, Value, CHARACTER_LABEL};

#[derive(Debug, Clone)]
struct MemoryNode {
    label: String,
    props: PropertyMap,
}

impl MemoryNode {
    fn matches(&self, selector: &NodeSelector) -> bool {
        self.label == selector.label && key_matches(&self.props, selector)
    }
}

fn key_matches(props: &PropertyMap, selector: &NodeSelector) -> bool {
    props.get(selector.key_property).and_then(Value::as_str) == Some(selector.key.as_str())
}

fn apply(props: &mut PropertyMap, assignments: &[Assignment]) {
    for assignment in assignments {
        match &assignment.value {
            Some(value) => {
                props.insert(assignment.property.to_string(), value.clone());
            }
            None => {
                props.remove(assignment.property);
            }
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    nodes: RwLock<Vec<MemoryNode>>,
    committed_writes: AtomicUsize,
    fail_commits: AtomicBool,
}

/// Process-local store. Cloning shares the same nodes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small character set for demos.
    pub fn with_sample_data() -> Self {
        let store = Self::new();
        let sample = [
            ("Luke Skywalker", 172, 77, "fair", "blond", "blue", "19BBY", "male"),
            ("Leia Organa", 150, 49, "light", "brown", "brown", "19BBY", "female"),
            ("Han Solo", 180, 80, "fair", "brown", "brown", "29BBY", "male"),
            ("R2-D2", 96, 32, "white, blue", "n/a", "red", "33BBY", "n/a"),
        ];
        for (name, height, mass, skin, hair, eyes, born, gender) in sample {
            store.insert_character(&Character {
                id: String::new(),
                name: name.to_string(),
                height: Some(height),
                mass: Some(mass),
                skin_colors: Some(skin.to_string()),
                hair_colors: Some(hair.to_string()),
                eye_colors: Some(eyes.to_string()),
                birth_year: Some(born.to_string()),
                gender: Some(gender.to_string()),
            });
        }
        store
    }

    /// Insert a node. A missing or empty `id` property gets a fresh UUID.
    /// Returns the node's id.
    pub fn insert_node(&self, label: &str, mut props: PropertyMap) -> String {
        let id = match props.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        props.insert("id".to_string(), Value::Str(id.clone()));

        let mut nodes = self.inner.nodes.write().unwrap_or_else(|e| e.into_inner());
        nodes.push(MemoryNode {
            label: label.to_string(),
            props,
        });
        id
    }

    pub fn insert_character(&self, character: &Character) -> String {
        self.insert_node(CHARACTER_LABEL, character.to_properties())
    }

    /// Committed properties of every node matching the selector.
    pub fn nodes_matching(&self, selector: &NodeSelector) -> Vec<PropertyMap> {
        let nodes = self.inner.nodes.read().unwrap_or_else(|e| e.into_inner());
        nodes
            .iter()
            .filter(|n| n.matches(selector))
            .map(|n| n.props.clone())
            .collect()
    }

    /// Committed characters with the given name.
    pub fn characters_named(&self, name: &str) -> Vec<Character> {
        self.nodes_matching(&NodeSelector::character(name))
            .iter()
            .filter_map(Character::from_properties)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.inner.nodes.read().map(|n| n.len()).unwrap_or(0)
    }

    /// Number of commits that changed at least one node.
    pub fn committed_writes(&self) -> usize {
        self.inner.committed_writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent commit fail until reset.
    pub fn set_fail_commits(&self, fail: bool) {
        self.inner.fail_commits.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTxn>, StoreError> {
        Ok(Box::new(MemoryTxn {
            inner: Arc::clone(&self.inner),
            staged: BTreeMap::new(),
        }))
    }
}

/// Transaction over a [`MemoryStore`]. Staged assignments are keyed by node
/// position and replayed over the committed state for reads.
struct MemoryTxn {
    inner: Arc<Inner>,
    staged: BTreeMap<usize, Vec<Assignment>>,
}

impl MemoryTxn {
    /// (position, current properties) of matching nodes as seen by this
    /// transaction.
    fn visible(&self, selector: &NodeSelector) -> Result<Vec<(usize, PropertyMap)>, StoreError> {
        let nodes = self
            .inner
            .nodes
            .read()
            .map_err(|e| StoreError::Query(format!("lock error: {}", e)))?;

        let mut out = Vec::new();
        for (idx, node) in nodes.iter().enumerate() {
            if node.label != selector.label {
                continue;
            }
            let mut props = node.props.clone();
            if let Some(assignments) = self.staged.get(&idx) {
                apply(&mut props, assignments);
            }
            if key_matches(&props, selector) {
                out.push((idx, props));
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl StoreTxn for MemoryTxn {
    async fn count(&mut self, selector: &NodeSelector) -> Result<i64, StoreError> {
        Ok(self.visible(selector)?.len() as i64)
    }

    async fn fetch(&mut self, selector: &NodeSelector) -> Result<Vec<PropertyMap>, StoreError> {
        Ok(self
            .visible(selector)?
            .into_iter()
            .map(|(_, props)| props)
            .collect())
    }

    async fn update(&mut self, update: &NodeUpdate) -> Result<Vec<PropertyMap>, StoreError> {
        let mut out = Vec::new();
        for (idx, mut props) in self.visible(&update.selector)? {
            apply(&mut props, &update.assignments);
            if !update.assignments.is_empty() {
                self.staged
                    .entry(idx)
                    .or_default()
                    .extend(update.assignments.iter().cloned());
            }
            out.push(props);
        }
        Ok(out)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.inner.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Commit("injected commit failure".to_string()));
        }
        if self.staged.is_empty() {
            return Ok(());
        }

        let mut nodes = self
            .inner
            .nodes
            .write()
            .map_err(|e| StoreError::Commit(format!("lock error: {}", e)))?;
        for (idx, assignments) in &self.staged {
            if let Some(node) = nodes.get_mut(*idx) {
                apply(&mut node.props, assignments);
            }
        }
        self.inner.committed_writes.fetch_add(1, Ordering::SeqCst);
        debug!(nodes = self.staged.len(), "memory transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        debug!(staged = self.staged.len(), "memory transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mass_update(name: &str, mass: i64) -> NodeUpdate {
        NodeUpdate {
            selector: NodeSelector::character(name),
            assignments: vec![Assignment {
                property: "mass",
                value: Some(Value::Int(mass)),
            }],
        }
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_commit() {
        let store = MemoryStore::with_sample_data();
        let mut txn = store.begin().await.unwrap();

        let rows = txn.update(&mass_update("Han Solo", 85)).await.unwrap();
        assert_eq!(rows[0].get("mass"), Some(&Value::Int(85)));

        // Same transaction sees its own write, the store does not
        let seen = txn.fetch(&NodeSelector::character("Han Solo")).await.unwrap();
        assert_eq!(seen[0].get("mass"), Some(&Value::Int(85)));
        assert_eq!(store.characters_named("Han Solo")[0].mass, Some(80));

        txn.commit().await.unwrap();
        assert_eq!(store.characters_named("Han Solo")[0].mass, Some(85));
        assert_eq!(store.committed_writes(), 1);
    }

    #[tokio::test]
    async fn test_interleaved_commits_keep_both_fields() {
        let store = MemoryStore::with_sample_data();
        let mut t1 = store.begin().await.unwrap();
        let mut t2 = store.begin().await.unwrap();

        t1.update(&mass_update("Han Solo", 99)).await.unwrap();
        let rows = t2
            .update(&NodeUpdate {
                selector: NodeSelector::character("Han Solo"),
                assignments: vec![Assignment {
                    property: "gender",
                    value: Some(Value::from("droid")),
                }],
            })
            .await
            .unwrap();
        // t2 does not see t1's uncommitted mass
        assert_eq!(rows[0].get("mass"), Some(&Value::Int(80)));

        t1.commit().await.unwrap();
        t2.commit().await.unwrap();

        let han = &store.characters_named("Han Solo")[0];
        assert_eq!(han.mass, Some(99));
        assert_eq!(han.gender.as_deref(), Some("droid"));
        assert_eq!(han.birth_year.as_deref(), Some("29BBY"));
        assert_eq!(store.committed_writes(), 2);
    }

    #[tokio::test]
    async fn test_clear_in_one_txn_survives_other_commit() {
        let store = MemoryStore::with_sample_data();
        let mut t1 = store.begin().await.unwrap();
        let mut t2 = store.begin().await.unwrap();

        t1.update(&NodeUpdate {
            selector: NodeSelector::character("Leia Organa"),
            assignments: vec![Assignment {
                property: "birth_year",
                value: None,
            }],
        })
        .await
        .unwrap();
        t2.update(&mass_update("Leia Organa", 51)).await.unwrap();

        t2.commit().await.unwrap();
        t1.commit().await.unwrap();

        let leia = &store.characters_named("Leia Organa")[0];
        assert_eq!(leia.birth_year, None);
        assert_eq!(leia.mass, Some(51));
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = MemoryStore::with_sample_data();
        let mut txn = store.begin().await.unwrap();
        txn.update(&mass_update("R2-D2", 1)).await.unwrap();
        txn.rollback().await.unwrap();

        assert_eq!(store.characters_named("R2-D2")[0].mass, Some(32));
        assert_eq!(store.committed_writes(), 0);
    }

    #[tokio::test]
    async fn test_injected_commit_failure() {
        let store = MemoryStore::with_sample_data();
        store.set_fail_commits(true);

        let mut txn = store.begin().await.unwrap();
        txn.update(&mass_update("Leia Organa", 50)).await.unwrap();
        assert!(matches!(txn.commit().await, Err(StoreError::Commit(_))));
        assert_eq!(store.characters_named("Leia Organa")[0].mass, Some(49));
    }

    #[tokio::test]
    async fn test_key_match_is_exact() {
        let store = MemoryStore::with_sample_data();
        let mut txn = store.begin().await.unwrap();
        assert_eq!(txn.count(&NodeSelector::character("Luke")).await.unwrap(), 0);
        assert_eq!(
            txn.count(&NodeSelector::character("Luke Skywalker")).await.unwrap(),
            1
        );
        txn.rollback().await.unwrap();
    }

    #[test]
    fn test_insert_assigns_ids() {
        let store = MemoryStore::new();
        let id = store.insert_node(CHARACTER_LABEL, PropertyMap::new());
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let mut props = PropertyMap::new();
        props.insert("id".to_string(), Value::from("fixed"));
        assert_eq!(store.insert_node(CHARACTER_LABEL, props), "fixed");
        assert_eq!(store.node_count(), 2);
    }
}
