use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::marketplace::domain::Role;
use crate::marketplace::listings::ListingService;
use crate::marketplace::marketplace_router;

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).expect("serialize body"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request builds")
}

async fn send(router: axum::Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.expect("route executes")
}

fn listing_payload() -> Value {
    serde_json::to_value(listing_input()).expect("serialize listing")
}

#[tokio::test]
async fn register_then_login_returns_tokens() {
    let harness = build_services();

    let response = send(
        harness.router(),
        request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Camille",
                "email": "camille@example.com",
                "password": PASSWORD,
                "role": "owner"
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert!(payload["token"].as_str().is_some_and(|token| !token.is_empty()));

    let response = send(
        harness.router(),
        request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "camille@example.com", "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = read_json_body(response).await["token"]
        .as_str()
        .expect("token string")
        .to_string();

    let response = send(
        harness.router(),
        request(Method::GET, "/api/auth/me", Some(&token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile = read_json_body(response).await;
    assert_eq!(profile["role"], "owner");
    assert!(profile.get("password").is_none());
}

#[tokio::test]
async fn validation_errors_list_each_field() {
    let harness = build_services();

    let response = send(
        harness.router(),
        request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "", "email": "not-an-email", "password": "123", "role": "admin" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    let params: Vec<&str> = payload["errors"]
        .as_array()
        .expect("errors array")
        .iter()
        .filter_map(|error| error["param"].as_str())
        .collect();
    assert_eq!(params, vec!["name", "email", "password", "role"]);
}

#[tokio::test]
async fn malformed_body_is_reported_as_a_body_error() {
    let harness = build_services();

    let response = send(
        harness.router(),
        Request::post("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"email\": "))
            .expect("request builds"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["errors"][0]["param"], "body");
}

#[tokio::test]
async fn bad_credentials_share_one_message() {
    let harness = build_services();
    harness.register("Camille", "camille@example.com", Role::Owner);

    let response = send(
        harness.router(),
        request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "camille@example.com", "password": "wrong-password" })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json_body(response).await,
        json!({ "msg": "Invalid credentials" })
    );
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let harness = build_services();

    for (method, uri) in [
        (Method::POST, "/api/listings"),
        (Method::GET, "/api/auth/me"),
        (Method::GET, "/api/listings/mine"),
        (Method::GET, "/api/listings/admin/pending"),
    ] {
        let response = send(harness.router(), request(method, uri, None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let response = send(
        harness.router(),
        request(Method::GET, "/api/auth/me", Some("forged.token.value"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tenants_are_forbidden_from_creating_listings() {
    let harness = build_services();
    let (_, token) = harness.register("Theo", "theo@example.com", Role::Tenant);

    let response = send(
        harness.router(),
        request(Method::POST, "/api/listings", Some(&token), Some(listing_payload())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        read_json_body(response).await,
        json!({ "msg": "Not authorized" })
    );

    let response = send(
        harness.router(),
        Request::post("/api/listings")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from("garbage"))
            .expect("request builds"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn listing_moves_from_submission_to_the_public_feed() {
    let harness = build_services();
    let (_, owner_token) = harness.register("Camille", "camille@example.com", Role::Owner);
    let (_, admin_token) = harness.admin();

    let response = send(
        harness.router(),
        request(
            Method::POST,
            "/api/listings",
            Some(&owner_token),
            Some(json!({
                "title": "Studio by the river",
                "description": "Quiet, bright, furnished.",
                "location": "3 Quai Saint-Vincent, Lyon",
                "price": "720",
                "size": 28
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let created = read_json_body(response).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["address"], "3 Quai Saint-Vincent, Lyon");
    assert_eq!(created["price"], 720.0);
    let id = created["id"].as_str().expect("listing id").to_string();

    let feed = read_json_body(
        send(harness.router(), request(Method::GET, "/api/listings", None, None)).await,
    )
    .await;
    assert_eq!(feed, json!([]));

    let response = send(
        harness.router(),
        request(Method::GET, "/api/listings/admin/pending", Some(&admin_token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let queue = read_json_body(response).await;
    assert_eq!(queue[0]["owner"]["email"], "camille@example.com");

    let response = send(
        harness.router(),
        request(
            Method::PUT,
            &format!("/api/listings/admin/approve/{id}"),
            Some(&admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["status"], "approved");

    let feed = read_json_body(
        send(harness.router(), request(Method::GET, "/api/listings", None, None)).await,
    )
    .await;
    let feed = feed.as_array().expect("feed array");
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["id"], id.as_str());
    assert_eq!(feed[0]["owner"]["name"], "Camille");
    assert!(feed[0]["owner"].get("email").is_none());

    let response = send(
        harness.router(),
        request(Method::GET, &format!("/api/listings/{id}"), None, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn owners_update_and_delete_through_the_api() {
    let harness = build_services();
    let (owner, owner_token) = harness.register("Camille", "camille@example.com", Role::Owner);
    let (_, rival_token) = harness.register("Rival", "rival@example.com", Role::Owner);
    let listing = harness
        .listings
        .create(&owner, listing_input())
        .expect("listing created");
    let uri = format!("/api/listings/{}", listing.id);

    let response = send(
        harness.router(),
        request(Method::PUT, &uri, Some(&rival_token), Some(json!({ "price": 1 }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        harness.router(),
        request(Method::PUT, &uri, Some(&owner_token), Some(json!({ "price": 1300 }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json_body(response).await;
    assert_eq!(updated["price"], 1300.0);
    assert_eq!(updated["status"], "pending");

    let response = send(
        harness.router(),
        request(Method::DELETE, &uri, Some(&owner_token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json_body(response).await,
        json!({ "msg": "Listing deleted" })
    );

    let response = send(
        harness.router(),
        request(Method::DELETE, &uri, Some(&owner_token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn strangers_editing_with_a_broken_body_are_forbidden() {
    let harness = build_services();
    let (owner, owner_token) = harness.register("Camille", "camille@example.com", Role::Owner);
    let (_, rival_token) = harness.register("Rival", "rival@example.com", Role::Owner);
    let listing = harness
        .listings
        .create(&owner, listing_input())
        .expect("listing created");
    let uri = format!("/api/listings/{}", listing.id);

    let broken = |token: &str| {
        Request::put(uri.as_str())
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"price\": "))
            .expect("request builds")
    };

    let response = send(harness.router(), broken(&rival_token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        read_json_body(response).await,
        json!({ "msg": "Not authorized" })
    );

    let response = send(harness.router(), broken(&owner_token)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json_body(response).await["errors"][0]["param"], "body");
}

#[tokio::test]
async fn unknown_or_malformed_ids_are_not_found() {
    let harness = build_services();
    let (_, admin_token) = harness.admin();

    for uri in [
        "/api/listings/not-a-uuid",
        "/api/listings/6f1c2a9e-5b7d-4c8e-9f0a-1b2c3d4e5f60",
    ] {
        let response = send(harness.router(), request(Method::GET, uri, None, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }

    let response = send(
        harness.router(),
        request(
            Method::PUT,
            "/api/listings/admin/approve/6f1c2a9e-5b7d-4c8e-9f0a-1b2c3d4e5f60",
            Some(&admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        read_json_body(response).await,
        json!({ "msg": "Listing not found" })
    );
}

#[tokio::test]
async fn cross_verdicts_are_conflicts() {
    let harness = build_services();
    let (owner, _) = harness.register("Camille", "camille@example.com", Role::Owner);
    let (admin, admin_token) = harness.admin();
    let listing = harness.approved_listing(&owner, &admin);

    let response = send(
        harness.router(),
        request(
            Method::PUT,
            &format!("/api/listings/admin/reject/{}", listing.id),
            Some(&admin_token),
            None,
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn favorites_round_trip_through_the_api() {
    let harness = build_services();
    let (owner, _) = harness.register("Camille", "camille@example.com", Role::Owner);
    let (_, tenant_token) = harness.register("Theo", "theo@example.com", Role::Tenant);
    let (admin, _) = harness.admin();
    let listing = harness.approved_listing(&owner, &admin);
    let uri = format!("/api/auth/me/favorites/{}", listing.id);

    let response = send(
        harness.router(),
        request(Method::PUT, &uri, Some(&tenant_token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json_body(response).await["favorites"],
        json!([listing.id.to_string()])
    );

    let favorites = read_json_body(
        send(
            harness.router(),
            request(Method::GET, "/api/auth/me/favorites", Some(&tenant_token), None),
        )
        .await,
    )
    .await;
    assert_eq!(favorites[0]["title"], listing.title.as_str());

    let response = send(
        harness.router(),
        request(Method::DELETE, &uri, Some(&tenant_token), None),
    )
    .await;
    assert_eq!(read_json_body(response).await["favorites"], json!([]));
}

#[tokio::test]
async fn admin_deactivation_blocks_login() {
    let harness = build_services();
    let (owner, owner_token) = harness.register("Camille", "camille@example.com", Role::Owner);
    let (_, admin_token) = harness.admin();
    let uri = format!("/api/auth/admin/deactivate/{}", owner.id);

    let response = send(
        harness.router(),
        request(Method::PUT, &uri, Some(&owner_token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        harness.router(),
        request(Method::PUT, &uri, Some(&admin_token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["is_active"], false);

    let response = send(
        harness.router(),
        request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "camille@example.com", "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json_body(response).await,
        json!({ "msg": "This account is disabled" })
    );
}

#[tokio::test]
async fn server_errors_hide_their_cause() {
    let harness = build_services();
    let (_, token) = harness.register("Camille", "camille@example.com", Role::Owner);
    let router = marketplace_router(
        harness.auth.clone(),
        Arc::new(ListingService::new(
            Arc::new(UnavailableListings),
            harness.users.clone(),
        )),
    );

    let response = send(
        router.clone(),
        request(Method::GET, "/api/listings", None, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json_body(response).await,
        json!({ "msg": "Server error" })
    );

    let response = send(
        router,
        request(Method::POST, "/api/listings", Some(&token), Some(listing_payload())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
