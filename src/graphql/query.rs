//! GraphQL Query resolvers.

use async_graphql::{Context, Object, Result};
use std::sync::Arc;

use super::schema::Character;
use super::to_graphql_error;
use crate::service::UpdateService;

/// Root query type
pub struct Query;

#[Object]
impl Query {
    /// Characters whose name equals `name` exactly.
    async fn character(&self, ctx: &Context<'_>, name: String) -> Result<Vec<Character>> {
        let service = ctx.data::<Arc<UpdateService>>()?;
        let found = service
            .find_characters(&name)
            .await
            .map_err(to_graphql_error)?;
        Ok(found.into_iter().map(Character::from).collect())
    }
}
