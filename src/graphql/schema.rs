//! GraphQL schema types.
//!
//! These types are returned by queries and mutations and define the shape of
//! responses. Field names stay snake_case to match the stored properties.

use async_graphql::{SimpleObject, ID};

use crate::entity;

/// A character node (scalar properties only)
#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Characters", rename_fields = "snake_case")]
pub struct Character {
    /// System-assigned identifier
    pub id: ID,
    /// Character name, used as the lookup key
    pub name: String,
    pub height: Option<i64>,
    pub mass: Option<i64>,
    pub skin_colors: Option<String>,
    pub hair_colors: Option<String>,
    pub eye_colors: Option<String>,
    pub birth_year: Option<String>,
    pub gender: Option<String>,
}

impl From<entity::Character> for Character {
    fn from(c: entity::Character) -> Self {
        Self {
            id: ID(c.id),
            name: c.name,
            height: c.height,
            mass: c.mass,
            skin_colors: c.skin_colors,
            hair_colors: c.hair_colors,
            eye_colors: c.eye_colors,
            birth_year: c.birth_year,
            gender: c.gender,
        }
    }
}
