//! GraphQL Mutation resolvers.

use async_graphql::{Context, MaybeUndefined, Object, Result};
use std::sync::Arc;

use super::schema::Character;
use super::to_graphql_error;
use crate::entity::ChangeSet;
use crate::service::UpdateService;

/// Root mutation type
pub struct Mutation;

#[Object(rename_args = "snake_case")]
impl Mutation {
    /// Update scalar properties of the character named `name`.
    ///
    /// Omitted arguments leave the stored value alone; an explicit `null`
    /// removes it. Returns `null` when no character has that name.
    async fn update_character(
        &self,
        ctx: &Context<'_>,
        name: String,
        mass: MaybeUndefined<i64>,
        gender: MaybeUndefined<String>,
        birth_year: MaybeUndefined<String>,
    ) -> Result<Option<Character>> {
        let service = ctx.data::<Arc<UpdateService>>()?;
        let changes = ChangeSet {
            mass: mass.into(),
            gender: gender.into(),
            birth_year: birth_year.into(),
        };

        let updated = service
            .update_character(&name, changes)
            .await
            .map_err(to_graphql_error)?;
        Ok(updated.map(Character::from))
    }
}
