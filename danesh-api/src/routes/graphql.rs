//! GraphQL API Routes
//!
//! Relay-style GraphQL facade over the resource registry, built with
//! async-graphql.
//!
//! Endpoints:
//! - POST /graphql - Execute GraphQL queries/mutations
//! - GET /graphql/playground - GraphiQL playground

use async_graphql::{
    Context, EmptySubscription, Enum, ErrorExtensions, InputObject, Json as GqlJson, Object,
    Result as GqlResult, Schema, SimpleObject, ID,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use danesh_core::{
    attributes_from_value, Actor, Attributes, Entity, EntityId, Filter, FilterExpr,
    FilterOperator,
};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::ApiError,
    middleware::AuthExtractor,
    pagination::{decode_global_id, encode_cursor, encode_global_id, PageWindow},
    services::ResourceRegistry,
    state::AppState,
};

/// Map any store or API error into a GraphQL error carrying `extensions.code`.
fn gql_error(err: impl Into<ApiError>) -> async_graphql::Error {
    let err: ApiError = err.into();
    err.extend()
}

fn attributes(value: GqlJson<Value>) -> GqlResult<Attributes> {
    attributes_from_value(value.0).map_err(gql_error)
}

// ============================================================================
// GRAPHQL TYPES
// ============================================================================

/// A stored entity of any type.
#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Entity")]
pub struct GqlEntity {
    /// Global id, usable with `node`.
    pub id: ID,
    /// Row id within its type.
    pub database_id: EntityId,
    pub entity_type: String,
    pub owner: Option<i64>,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
    pub attributes: GqlJson<Attributes>,
}

impl From<Entity> for GqlEntity {
    fn from(e: Entity) -> Self {
        Self {
            id: ID(encode_global_id(&e.entity_type, e.id)),
            database_id: e.id,
            entity_type: e.entity_type.to_string(),
            owner: e.owner,
            created_time: e.created_at,
            updated_time: e.updated_at,
            attributes: GqlJson(e.attributes),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct EntityEdge {
    pub cursor: String,
    pub node: GqlEntity,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct EntityConnection {
    pub edges: Vec<EntityEdge>,
    pub page_info: PageInfo,
    /// Matches before paging.
    pub total_count: i64,
}

impl EntityConnection {
    fn build(matches: Vec<Entity>, window: PageWindow) -> Self {
        let total_count = matches.len() as i64;
        let edges: Vec<EntityEdge> = matches
            .into_iter()
            .enumerate()
            .skip(window.start)
            .take(window.end - window.start)
            .map(|(offset, entity)| EntityEdge {
                cursor: encode_cursor(offset),
                node: entity.into(),
            })
            .collect();

        let page_info = PageInfo {
            has_next_page: window.has_next_page,
            has_previous_page: window.has_previous_page,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        };
        Self {
            edges,
            page_info,
            total_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Enum)]
pub enum GqlFilterOperator {
    #[default]
    Eq,
    Ne,
    Contains,
    IContains,
    IStartsWith,
}

impl From<GqlFilterOperator> for FilterOperator {
    fn from(op: GqlFilterOperator) -> Self {
        match op {
            GqlFilterOperator::Eq => FilterOperator::Eq,
            GqlFilterOperator::Ne => FilterOperator::Ne,
            GqlFilterOperator::Contains => FilterOperator::Contains,
            GqlFilterOperator::IContains => FilterOperator::IContains,
            GqlFilterOperator::IStartsWith => FilterOperator::IStartsWith,
        }
    }
}

/// One predicate; a list of them is a conjunction.
#[derive(Debug, Clone, InputObject)]
pub struct FilterInput {
    pub field: String,
    #[graphql(default)]
    pub op: GqlFilterOperator,
    pub value: GqlJson<Value>,
}

fn to_filter(inputs: Vec<FilterInput>) -> Filter {
    inputs.into_iter().fold(Filter::new(), |filter, input| {
        filter.and(FilterExpr::new(input.field, input.op.into(), input.value.0))
    })
}

#[derive(Debug, Clone, InputObject)]
pub struct CreateEntityInput {
    pub entity_type: String,
    pub attributes: GqlJson<Value>,
    pub client_mutation_id: Option<String>,
}

#[derive(Debug, Clone, InputObject)]
pub struct UpdateEntityInput {
    /// Global id of the entity.
    pub id: ID,
    pub attributes: GqlJson<Value>,
    pub client_mutation_id: Option<String>,
}

#[derive(Debug, Clone, InputObject)]
pub struct DeleteEntityInput {
    /// Global id of the entity.
    pub id: ID,
    pub client_mutation_id: Option<String>,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct EntityPayload {
    pub entity: GqlEntity,
    pub client_mutation_id: Option<String>,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct DeleteEntityPayload {
    pub deleted_id: ID,
    pub client_mutation_id: Option<String>,
}

// ============================================================================
// QUERY ROOT
// ============================================================================

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Registered entity type names.
    async fn entity_types(&self, ctx: &Context<'_>) -> GqlResult<Vec<String>> {
        let registry = ctx.data::<Arc<ResourceRegistry>>()?;
        Ok(registry.entity_types().map(ToString::to_string).collect())
    }

    /// Current entities of one type, most recent first.
    async fn entities(
        &self,
        ctx: &Context<'_>,
        entity_type: String,
        first: Option<i32>,
        after: Option<String>,
        #[graphql(default)] filter: Vec<FilterInput>,
    ) -> GqlResult<EntityConnection> {
        let registry = ctx.data::<Arc<ResourceRegistry>>()?;
        let matches = registry
            .list(&entity_type, &to_filter(filter))
            .await
            .map_err(gql_error)?;
        let window =
            PageWindow::forward(matches.len(), first, after.as_deref()).map_err(gql_error)?;
        Ok(EntityConnection::build(matches, window))
    }

    /// One current entity by type and row id.
    async fn entity(
        &self,
        ctx: &Context<'_>,
        entity_type: String,
        id: EntityId,
    ) -> GqlResult<Option<GqlEntity>> {
        let registry = ctx.data::<Arc<ResourceRegistry>>()?;
        match registry.get(&entity_type, id).await {
            Ok(entity) => Ok(Some(entity.into())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(gql_error(e)),
        }
    }

    /// One current entity by global id.
    async fn node(&self, ctx: &Context<'_>, id: ID) -> GqlResult<Option<GqlEntity>> {
        let registry = ctx.data::<Arc<ResourceRegistry>>()?;
        let (entity_type, id) = decode_global_id(&id).map_err(gql_error)?;
        match registry.get(entity_type.as_str(), id).await {
            Ok(entity) => Ok(Some(entity.into())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(gql_error(e)),
        }
    }
}

// ============================================================================
// MUTATION ROOT
// ============================================================================

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_entity(
        &self,
        ctx: &Context<'_>,
        input: CreateEntityInput,
    ) -> GqlResult<EntityPayload> {
        let registry = ctx.data::<Arc<ResourceRegistry>>()?;
        let actor = ctx.data::<Actor>()?;

        let entity = registry
            .create(&input.entity_type, attributes(input.attributes)?, actor)
            .await
            .map_err(gql_error)?;
        Ok(EntityPayload {
            entity: entity.into(),
            client_mutation_id: input.client_mutation_id,
        })
    }

    async fn update_entity(
        &self,
        ctx: &Context<'_>,
        input: UpdateEntityInput,
    ) -> GqlResult<EntityPayload> {
        let registry = ctx.data::<Arc<ResourceRegistry>>()?;
        let actor = ctx.data::<Actor>()?;
        let (entity_type, id) = decode_global_id(&input.id).map_err(gql_error)?;

        let entity = registry
            .update(entity_type.as_str(), id, attributes(input.attributes)?, actor)
            .await
            .map_err(gql_error)?;
        Ok(EntityPayload {
            entity: entity.into(),
            client_mutation_id: input.client_mutation_id,
        })
    }

    async fn delete_entity(
        &self,
        ctx: &Context<'_>,
        input: DeleteEntityInput,
    ) -> GqlResult<DeleteEntityPayload> {
        let registry = ctx.data::<Arc<ResourceRegistry>>()?;
        let actor = ctx.data::<Actor>()?;
        let (entity_type, id) = decode_global_id(&input.id).map_err(gql_error)?;

        registry
            .delete(entity_type.as_str(), id, actor)
            .await
            .map_err(gql_error)?;
        Ok(DeleteEntityPayload {
            deleted_id: input.id,
            client_mutation_id: input.client_mutation_id,
        })
    }
}

// ============================================================================
// SCHEMA & HANDLERS
// ============================================================================

/// The GraphQL schema type.
pub type DaneshSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Create the GraphQL schema.
pub fn create_schema(registry: Arc<ResourceRegistry>) -> DaneshSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(registry)
        .limit_depth(16)
        .finish()
}

/// Handler for GraphQL requests.
pub async fn graphql_handler(
    State(schema): State<DaneshSchema>,
    AuthExtractor(actor): AuthExtractor,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let request = req.into_inner().data(actor);
    schema.execute(request).await.into()
}

/// Handler for GraphiQL playground.
pub async fn graphiql_handler() -> impl IntoResponse {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// GraphQL endpoint; needs the actor middleware.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/graphql", post(graphql_handler))
}

/// Playground page; served without identity.
pub fn playground_router() -> Router<AppState> {
    Router::new().route("/graphql/playground", get(graphiql_handler))
}
