//! GraphQL API for Holonet.
//!
//! ## Example
//!
//! ```graphql
//! # Partial update - omitted fields are left alone
//! mutation { updateCharacter(name: "Leia Organa", mass: 50) { name mass gender birth_year } }
//!
//! # Clear a field
//! mutation { updateCharacter(name: "R2-D2", gender: null) { name gender } }
//!
//! # Re-read by name
//! { character(name: "Leia Organa") { id mass } }
//! ```

pub mod mutation;
pub mod query;
pub mod schema;

use async_graphql::{EmptySubscription, ErrorExtensions, Schema};
use std::sync::Arc;

use crate::service::{ServiceError, UpdateService};
use mutation::Mutation;
use query::Query;

/// The Holonet GraphQL schema type
pub type HolonetSchema = Schema<Query, Mutation, EmptySubscription>;

/// Build the GraphQL schema with the update service as context
pub fn build_schema(service: Arc<UpdateService>) -> HolonetSchema {
    Schema::build(Query, Mutation, EmptySubscription)
        .data(service)
        .limit_depth(5) // Prevent infinite nesting
        .limit_complexity(100) // Prevent overly complex queries
        .finish()
}

/// Execute a GraphQL query and return JSON result
pub async fn execute(schema: &HolonetSchema, query: &str) -> String {
    let result = schema.execute(query).await;
    serde_json::to_string_pretty(&result).unwrap_or_else(|_| "{}".to_string())
}

/// Service errors become GraphQL errors carrying only the public message and
/// a `code` extension.
pub(crate) fn to_graphql_error(err: ServiceError) -> async_graphql::Error {
    let code = err.code();
    async_graphql::Error::new(err.to_string()).extend_with(|_, ext| ext.set("code", code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Character;
    use crate::store::MemoryStore;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn schema_over(store: &MemoryStore) -> HolonetSchema {
        let service = UpdateService::new(Arc::new(store.clone()), Duration::from_secs(5));
        build_schema(Arc::new(service))
    }

    async fn run(schema: &HolonetSchema, query: &str) -> Value {
        serde_json::from_str(&execute(schema, query).await).unwrap()
    }

    #[tokio::test]
    async fn test_update_mutation_returns_snapshot() {
        let store = MemoryStore::with_sample_data();
        let schema = schema_over(&store);

        let result = run(
            &schema,
            r#"mutation { updateCharacter(name: "Leia Organa", mass: 50) { name mass gender birth_year } }"#,
        )
        .await;

        assert_eq!(
            result["data"]["updateCharacter"],
            json!({
                "name": "Leia Organa",
                "mass": 50,
                "gender": "female",
                "birth_year": "19BBY"
            })
        );
        assert!(result.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_name_is_null() {
        let store = MemoryStore::with_sample_data();
        let schema = schema_over(&store);

        let result = run(
            &schema,
            r#"mutation { updateCharacter(name: "Nonexistent", mass: 1) { name } }"#,
        )
        .await;

        assert_eq!(result["data"]["updateCharacter"], Value::Null);
        assert!(result.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_explicit_null_clears_field() {
        let store = MemoryStore::with_sample_data();
        let schema = schema_over(&store);

        let result = run(
            &schema,
            r#"mutation { updateCharacter(name: "R2-D2", gender: null) { gender mass } }"#,
        )
        .await;

        assert_eq!(result["data"]["updateCharacter"]["gender"], Value::Null);
        assert_eq!(result["data"]["updateCharacter"]["mass"], json!(32));
        assert_eq!(store.characters_named("R2-D2")[0].gender, None);
    }

    #[tokio::test]
    async fn test_store_failure_is_opaque() {
        let store = MemoryStore::with_sample_data();
        store.set_fail_commits(true);
        let schema = schema_over(&store);

        let result = run(
            &schema,
            r#"mutation { updateCharacter(name: "Han Solo", mass: 90) { mass } }"#,
        )
        .await;

        let error = &result["errors"][0];
        assert_eq!(error["message"], "Failed to update character");
        assert_eq!(error["extensions"]["code"], "UPDATE_FAILED");
        assert!(!result.to_string().contains("injected"));
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let store = MemoryStore::with_sample_data();
        store.insert_character(&Character {
            id: String::new(),
            name: "Han Solo".to_string(),
            height: None,
            mass: Some(70),
            skin_colors: None,
            hair_colors: None,
            eye_colors: None,
            birth_year: None,
            gender: None,
        });
        let schema = schema_over(&store);

        let result = run(
            &schema,
            r#"mutation { updateCharacter(name: "Han Solo", mass: 1) { mass } }"#,
        )
        .await;

        assert_eq!(result["errors"][0]["extensions"]["code"], "MULTIPLE_MATCHES");
        let masses: Vec<_> = store
            .characters_named("Han Solo")
            .into_iter()
            .map(|c| c.mass)
            .collect();
        assert_eq!(masses, vec![Some(80), Some(70)]);
    }

    #[tokio::test]
    async fn test_character_query() {
        let store = MemoryStore::with_sample_data();
        let schema = schema_over(&store);

        let result = run(&schema, r#"{ character(name: "Luke Skywalker") { name height hair_colors } }"#).await;
        assert_eq!(
            result["data"]["character"],
            json!([{ "name": "Luke Skywalker", "height": 172, "hair_colors": "blond" }])
        );
    }

    #[test]
    fn test_sdl_shape() {
        let schema = schema_over(&MemoryStore::new());
        let sdl = schema.sdl();
        assert!(sdl.contains("type Characters"));
        assert!(sdl.contains("updateCharacter("));
        assert!(sdl.contains("birth_year: String"));
        assert!(sdl.contains("character(name: String!): [Characters!]!"));
    }
}
