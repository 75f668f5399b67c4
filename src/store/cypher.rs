//! Cypher statement rendering.
//!
//! Labels and property names cannot be parameterized in Cypher, so they are
//! restricted to plain identifiers. Everything else (the lookup key and all
//! assigned values) is bound as a `$parameter`.

use super::{NodeSelector, NodeUpdate, StoreError};
use crate::entity::Value;

/// Parameter name the lookup key is bound to.
pub const KEY_PARAM: &str = "key";

/// Column holding the node's property map in fetch/update results.
pub const PROPS_COLUMN: &str = "props";

/// Column holding the match count in count results.
pub const COUNT_COLUMN: &str = "matches";

/// Cypher text plus its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<(String, Value)>,
}

/// `MATCH ... RETURN count(n)`
pub fn count(selector: &NodeSelector) -> Result<Statement, StoreError> {
    let text = format!(
        "{}\nRETURN count(n) AS {}",
        match_clause(selector)?,
        COUNT_COLUMN
    );
    Ok(Statement {
        text,
        params: vec![key_param(selector)],
    })
}

/// `MATCH ... RETURN properties(n)`
pub fn fetch(selector: &NodeSelector) -> Result<Statement, StoreError> {
    let text = format!(
        "{}\nRETURN properties(n) AS {}",
        match_clause(selector)?,
        PROPS_COLUMN
    );
    Ok(Statement {
        text,
        params: vec![key_param(selector)],
    })
}

/// `MATCH ... SET ... REMOVE ... RETURN properties(n)`
pub fn update(update: &NodeUpdate) -> Result<Statement, StoreError> {
    let mut text = match_clause(&update.selector)?;
    let mut params = vec![key_param(&update.selector)];

    let mut sets = Vec::new();
    let mut removes = Vec::new();
    for assignment in &update.assignments {
        let property = identifier(assignment.property)?;
        match &assignment.value {
            Some(value) => {
                let param = format!("p_{}", property);
                sets.push(format!("n.{} = ${}", property, param));
                params.push((param, value.clone()));
            }
            None => removes.push(format!("n.{}", property)),
        }
    }

    if !sets.is_empty() {
        text.push_str("\nSET ");
        text.push_str(&sets.join(", "));
    }
    if !removes.is_empty() {
        text.push_str("\nREMOVE ");
        text.push_str(&removes.join(", "));
    }
    text.push_str(&format!("\nRETURN properties(n) AS {}", PROPS_COLUMN));

    Ok(Statement { text, params })
}

fn match_clause(selector: &NodeSelector) -> Result<String, StoreError> {
    Ok(format!(
        "MATCH (n:{} {{{}: ${}}})",
        identifier(selector.label)?,
        identifier(selector.key_property)?,
        KEY_PARAM
    ))
}

fn key_param(selector: &NodeSelector) -> (String, Value) {
    (KEY_PARAM.to_string(), Value::Str(selector.key.clone()))
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*` only.
fn identifier(name: &str) -> Result<&str, StoreError> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Change, ChangeSet};

    #[test]
    fn test_count_statement() {
        let stmt = count(&NodeSelector::character("Luke Skywalker")).unwrap();
        assert_eq!(
            stmt.text,
            "MATCH (n:Characters {name: $key})\nRETURN count(n) AS matches"
        );
        assert_eq!(
            stmt.params,
            vec![("key".to_string(), Value::from("Luke Skywalker"))]
        );
    }

    #[test]
    fn test_update_statement_sets_and_removes() {
        let changes = ChangeSet {
            mass: Change::Set(80),
            gender: Change::Clear,
            birth_year: Change::Set("19BBY".to_string()),
        };
        let stmt = update(&NodeUpdate {
            selector: NodeSelector::character("Luke Skywalker"),
            assignments: changes.assignments(),
        })
        .unwrap();

        assert_eq!(
            stmt.text,
            "MATCH (n:Characters {name: $key})\n\
             SET n.mass = $p_mass, n.birth_year = $p_birth_year\n\
             REMOVE n.gender\n\
             RETURN properties(n) AS props"
        );
        assert_eq!(stmt.params.len(), 3);
        assert_eq!(stmt.params[1], ("p_mass".to_string(), Value::Int(80)));
    }

    #[test]
    fn test_update_without_assignments_only_matches() {
        let stmt = update(&NodeUpdate {
            selector: NodeSelector::character("Yoda"),
            assignments: Vec::new(),
        })
        .unwrap();
        assert_eq!(
            stmt.text,
            "MATCH (n:Characters {name: $key})\nRETURN properties(n) AS props"
        );
    }

    #[test]
    fn test_key_never_enters_statement_text() {
        let hostile = "x'}) DETACH DELETE n; MATCH (m {name: \"";
        let changes = ChangeSet {
            gender: Change::Set("\"}) DELETE n //".to_string()),
            ..Default::default()
        };
        let stmt = update(&NodeUpdate {
            selector: NodeSelector::character(hostile),
            assignments: changes.assignments(),
        })
        .unwrap();

        assert!(!stmt.text.contains("DELETE"));
        assert!(!stmt.text.contains(hostile));
        assert_eq!(stmt.params[0].1, Value::from(hostile));
    }

    #[test]
    fn test_rejects_non_identifier_labels() {
        let selector = NodeSelector {
            label: "Characters) DETACH DELETE (x",
            key_property: "name",
            key: "Luke".to_string(),
        };
        assert!(matches!(
            count(&selector),
            Err(StoreError::InvalidIdentifier(_))
        ));

        let selector = NodeSelector {
            label: "Characters",
            key_property: "1name",
            key: "Luke".to_string(),
        };
        assert!(fetch(&selector).is_err());
    }
}
