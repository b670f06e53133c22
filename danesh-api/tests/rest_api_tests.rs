//! End-to-end tests for the REST resource routes over the in-memory backend.

#[path = "support/app.rs"]
mod test_app;

use axum::http::{Method, StatusCode};
use serde_json::json;
use std::time::Duration;
use test_app::TestApp;

#[tokio::test]
async fn test_create_then_get_and_list() {
    let app = TestApp::new().await;

    let (status, created) = app
        .send(
            Method::POST,
            "/api/v1/post",
            Some("7"),
            Some(json!({"post_title": "Fresh bread", "post_type": "supply"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["owner"], json!(7));
    assert_eq!(created["delete_flag"], json!(false));
    assert_eq!(created["attributes"]["post_pinned"], json!(false));
    let id = created["id"].as_i64().unwrap();

    let (status, fetched) = app
        .send(Method::GET, &format!("/api/v1/post/{id}"), Some("8"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["attributes"]["post_title"], json!("Fresh bread"));

    let (status, listed) = app.send(Method::GET, "/api/v1/post", Some("8"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], json!(1));
    assert_eq!(listed["items"][0]["id"], json!(id));
}

#[tokio::test]
async fn test_list_filters_and_pages() {
    let app = TestApp::new().await;
    for (title, kind) in [
        ("Rust meetup", "post"),
        ("rusty bikes", "supply"),
        ("Need a plumber", "demand"),
        ("Rust book", "supply"),
    ] {
        let (status, _) = app
            .send(
                Method::POST,
                "/api/v1/post",
                Some("1"),
                Some(json!({"post_title": title, "post_type": kind})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .send(
            Method::GET,
            "/api/v1/post?post_title__icontains=rust&post_type=supply",
            Some("1"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(2));

    let (_, page) = app
        .send(Method::GET, "/api/v1/post?limit=2&offset=1", Some("1"), None)
        .await;
    assert_eq!(page["total"], json!(4));
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let (_, past_end) = app
        .send(Method::GET, "/api/v1/post?offset=10", Some("1"), None)
        .await;
    assert_eq!(past_end["items"], json!([]));
}

#[tokio::test]
async fn test_missing_actor_is_unauthorized() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/api/v1/post", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("UNAUTHORIZED"));

    let (status, _) = app
        .send(Method::GET, "/api/v1/post", Some("not-a-number"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn test_bad_requests() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::GET, "/api/v1/spaceship", Some("1"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("UNKNOWN_ENTITY_TYPE"));

    let (status, body) = app
        .send(Method::GET, "/api/v1/post/abc", Some("1"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("INVALID_FORMAT"));

    let (status, _) = app
        .send(Method::POST, "/api/v1/post", Some("1"), Some(json!([1, 2])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/post",
            Some("1"),
            Some(json!({"post_type": "auction"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], json!("post_type"));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/post",
            Some("1"),
            Some(json!({"colour": "red"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(Method::GET, "/api/v1/post?title__regex=x", Some("1"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("INVALID_FORMAT"));
}

#[tokio::test]
async fn test_only_owner_or_elevated_may_write() {
    let app = TestApp::new().await;
    let (_, created) = app
        .send(
            Method::POST,
            "/api/v1/product",
            Some("3"),
            Some(json!({"name": "Lamp", "price": 40})),
        )
        .await;
    let uri = format!("/api/v1/product/{}", created["id"]);

    let (status, body) = app
        .send(Method::PATCH, &uri, Some("4"), Some(json!({"price": 1})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], json!("FORBIDDEN"));

    let (status, _) = app.send(Method::DELETE, &uri, Some("4"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .send(Method::PATCH, &uri, Some("3"), Some(json!({"price": 35})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["attributes"]["price"], json!(35));
    assert_eq!(updated["attributes"]["name"], json!("Lamp"));

    let (status, _) = app
        .send(Method::PATCH, &uri, Some("9:staff"), Some(json!({"price": 30})))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_category_needs_elevated_actor() {
    let app = TestApp::new().await;
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/category",
            Some("5"),
            Some(json!({"title": "Food"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/category",
            Some("5:Admin"),
            Some(json!({"title": "Food"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_constraint_violations_conflict() {
    let app = TestApp::new().await;
    let body = json!({"name": "Danesh Co"});
    let (status, _) = app
        .send(Method::POST, "/api/v1/organization", Some("1"), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = app
        .send(Method::POST, "/api/v1/organization", Some("2"), Some(body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], json!("CONSTRAINT_VIOLATION"));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/comment",
            Some("1"),
            Some(json!({"comment_parent": 999, "text": "hi"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_actors_may_share_a_hashtag_title() {
    let app = TestApp::new().await;
    for actor in ["1", "2"] {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/v1/hashtag",
                Some(actor),
                Some(json!({"title": "rust"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "actor {actor}: {body}");
    }

    let (_, listed) = app
        .send(Method::GET, "/api/v1/hashtag?title=rust", Some("1"), None)
        .await;
    assert_eq!(listed["total"], json!(2));
}

#[tokio::test]
async fn test_profile_strength_is_server_maintained() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/profile",
            Some("21"),
            Some(json!({"bio": "hi", "profile_strength": 999})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], json!("profile_strength"));

    let (status, profile) = app
        .send(Method::POST, "/api/v1/profile", Some("21"), Some(json!({"bio": "hi"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile["attributes"]["profile_strength"], json!(10));
    let uri = format!("/api/v1/profile/{}", profile["id"]);

    let (status, body) = app
        .send(
            Method::PATCH,
            &uri,
            Some("21"),
            Some(json!({"profile_strength": 999})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], json!("profile_strength"));

    let (status, body) = app
        .send(
            Method::PATCH,
            &uri,
            Some("9:admin"),
            Some(json!({"profile_strength": 999})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (_, current) = app.send(Method::GET, &uri, Some("21"), None).await;
    assert_eq!(current["attributes"]["profile_strength"], json!(10));
}

#[tokio::test]
async fn test_second_profile_for_owner_conflicts() {
    let app = TestApp::new().await;
    let (status, _) = app
        .send(Method::POST, "/api/v1/profile", Some("22"), Some(json!({"bio": "one"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(Method::POST, "/api/v1/profile", Some("22"), Some(json!({"bio": "two"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("CONSTRAINT_VIOLATION"));

    let (status, _) = app
        .send(Method::POST, "/api/v1/profile", Some("23"), Some(json!({"bio": "three"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listed) = app
        .send(Method::GET, "/api/v1/profile?owner=22", Some("22"), None)
        .await;
    assert_eq!(listed["total"], json!(1));
}

#[tokio::test]
async fn test_out_of_range_ids_are_not_found() {
    let app = TestApp::new().await;
    for id in ["0", "-1"] {
        let uri = format!("/api/v1/post/{id}");
        let (status, body) = app.send(Method::GET, &uri, Some("1"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "GET {uri}: {body}");
        assert_eq!(body["code"], json!("ENTITY_NOT_FOUND"));

        let (status, _) = app
            .send(Method::PATCH, &uri, Some("1"), Some(json!({"post_title": "x"})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.send(Method::DELETE, &uri, Some("1"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_soft_delete_hides_row() {
    let app = TestApp::new().await;
    let (_, created) = app
        .send(
            Method::POST,
            "/api/v1/hashtag",
            Some("1"),
            Some(json!({"title": "rust"})),
        )
        .await;
    let id = created["id"].as_i64().unwrap();
    let uri = format!("/api/v1/hashtag/{id}");

    let (status, body) = app.send(Method::DELETE, &uri, Some("1"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, serde_json::Value::Null);

    let (status, body) = app.send(Method::GET, &uri, Some("1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("ENTITY_NOT_FOUND"));

    let (status, _) = app.send(Method::DELETE, &uri, Some("1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app.send(Method::GET, "/api/v1/hashtag", Some("1"), None).await;
    assert_eq!(listed["total"], json!(0));

    let raw = app
        .fixture
        .backend
        .raw_row(&danesh_api::components::HASHTAG, id)
        .unwrap();
    assert!(raw.deleted);
}

#[tokio::test]
async fn test_storage_outage_is_unavailable() {
    let app = TestApp::new().await;
    app.fixture.backend.set_available(false);

    let (status, body) = app.send(Method::GET, "/api/v1/post", Some("1"), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], json!("STORAGE_UNAVAILABLE"));

    let (status, _) = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_reads_are_served_from_cache_until_expiry() {
    let app = TestApp::with_ttl(Duration::from_secs(60)).await;
    app.send(
        Method::POST,
        "/api/v1/exchange",
        Some("1"),
        Some(json!({"name": "Tehran"})),
    )
    .await;

    app.send(Method::GET, "/api/v1/exchange", Some("1"), None).await;
    let queries = app.fixture.backend.query_count();
    app.send(Method::GET, "/api/v1/exchange", Some("1"), None).await;
    assert_eq!(app.fixture.backend.query_count(), queries);

    app.fixture.clock.advance(Duration::from_secs(61));
    app.send(Method::GET, "/api/v1/exchange", Some("1"), None).await;
    assert_eq!(app.fixture.backend.query_count(), queries + 1);

    let (status, stats) = app.send(Method::GET, "/health/cache", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(stats["hits"].as_u64().unwrap() >= 1);
}
