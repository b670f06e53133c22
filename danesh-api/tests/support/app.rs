use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use danesh_api::{
    create_api_router, ApiConfig, AppState, HeaderActorResolver, ResourceRegistry,
    ACTOR_ID_HEADER, ACTOR_ROLES_HEADER,
};
use danesh_test_utils::fixtures::MemoryFixture;
use serde_json::Value;
use tower::ServiceExt;

/// A router over the full catalog, backed by memory and a manual clock.
pub struct TestApp {
    pub router: Router,
    pub fixture: MemoryFixture,
    pub registry: Arc<ResourceRegistry>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_ttl(Duration::from_secs(60 * 60 * 24)).await
    }

    pub async fn with_ttl(ttl: Duration) -> Self {
        let fixture = MemoryFixture::new(ttl);
        let registry = Arc::new(
            ResourceRegistry::with_catalog(fixture.store.clone())
                .await
                .expect("catalog registers"),
        );
        let config = ApiConfig::default()
            .with_cache_ttl(ttl)
            .with_elevated_roles(vec!["Admin".to_string(), "staff".to_string()]);
        let resolver = Arc::new(HeaderActorResolver::new(config.elevated_roles.clone()));
        let state = AppState::new(registry.clone(), config, resolver);
        Self {
            router: create_api_router(state),
            fixture,
            registry,
        }
    }

    /// Send a request and return status and parsed body.
    ///
    /// `actor` is `"<id>"` or `"<id>:<roles>"`; `None` sends no identity.
    /// Empty bodies come back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        actor: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            let (id, roles) = actor.split_once(':').unwrap_or((actor, ""));
            builder = builder.header(ACTOR_ID_HEADER, id);
            if !roles.is_empty() {
                builder = builder.header(ACTOR_ROLES_HEADER, roles);
            }
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    /// Run a GraphQL document as `actor` and return the response body.
    pub async fn graphql(&self, actor: &str, query: &str, variables: Value) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/graphql",
                Some(actor),
                Some(serde_json::json!({ "query": query, "variables": variables })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "graphql transport failed: {body}");
        body
    }
}
