//! Router-level tests for the request pipeline: authentication, role
//! checks and body validation all answer before a database connection is
//! checked out, so these run against a pool that never connects.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use qms_server::auth::rbac::Role;
use qms_server::auth::token;
use qms_server::config::QmsConfig;
use qms_server::{build_app, db, AppState};

const SECRET: &str = "integration-test-secret";

fn app() -> Router {
    let pool = db::build_pool("postgres://qms@127.0.0.1:1/unreachable", 1).expect("lazy pool");
    let config = QmsConfig {
        auth_secret: SECRET.to_string(),
        ..QmsConfig::default()
    };
    build_app(AppState::new(pool, config))
}

fn bearer(role: Role) -> String {
    let token = token::issue(SECRET, 7, role, Duration::hours(1), Utc::now()).expect("token");
    format!("Bearer {token}")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn post_json(uri: &str, auth: Option<String>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

#[tokio::test]
async fn health_reports_service() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["service"], json!("qms-server"));
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let response = app()
        .oneshot(Request::get("/api/risks").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn forged_token_is_unauthorized() {
    let forged = token::issue("some-other-secret", 7, Role::Admin, Duration::hours(1), Utc::now())
        .unwrap();
    let response = app()
        .oneshot(
            Request::get("/api/audits")
                .header(header::AUTHORIZATION, format!("Bearer {forged}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let issued = Utc::now() - Duration::hours(2);
    let expired = token::issue(SECRET, 7, Role::Admin, Duration::hours(1), issued).unwrap();
    let response = app()
        .oneshot(
            Request::get("/api/documents")
                .header(header::AUTHORIZATION, format!("Bearer {expired}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auditor_cannot_create_risk() {
    let body = r#"{"title":"Supplier insolvency","likelihood":3,"severity":4}"#;
    let response = app()
        .oneshot(post_json("/api/risks", Some(bearer(Role::Auditor)), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await, json!({ "error": "Forbidden" }));
}

#[tokio::test]
async fn worker_cannot_create_audit() {
    let body = r#"{"title":"Stores audit","auditTypeId":1}"#;
    let response = app()
        .oneshot(post_json("/api/audits", Some(bearer(Role::Worker)), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn out_of_scale_risk_is_rejected() {
    let body = r#"{"title":"Flood","likelihood":9,"severity":0}"#;
    let response = app()
        .oneshot(post_json("/api/risks", Some(bearer(Role::Admin)), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("Validation failed"));
    assert!(!body["details"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let response = app()
        .oneshot(post_json("/api/risks", Some(bearer(Role::Manager)), "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_sign_in_is_bad_request() {
    let response = app()
        .oneshot(post_json("/api/auth/signin", None, r#"{"email":"","password":""}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let response = app()
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn get_as(uri: &str, role: Role) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, bearer(role))
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn audit_year_outside_calendar_range_is_bad_request() {
    let response = app()
        .oneshot(get_as("/api/audits?year=2147483647", Role::Admin))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"], json!(["year 2147483647 is outside 1900..=9999"]));
}

#[tokio::test]
async fn huge_audit_page_is_bad_request() {
    let response = app()
        .oneshot(get_as("/api/audits?page=9223372036854775807", Role::Admin))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn review_and_calibration_routes_need_a_token() {
    for uri in [
        "/api/management-review",
        "/api/management-review/actions",
        "/api/equipment",
        "/api/calibrations/stats",
    ] {
        let response = app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn worker_cannot_schedule_management_review() {
    let body = r#"{"title":"Q3 review","scheduledAt":"2025-09-30T09:00:00Z","meetingType":"QUARTERLY","standards":["ISO9001"]}"#;
    let response = app()
        .oneshot(post_json("/api/management-review", Some(bearer(Role::Worker)), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn management_review_without_standards_is_rejected() {
    let body = r#"{"title":"Q3 review","scheduledAt":"2025-09-30T09:00:00Z","meetingType":"QUARTERLY","standards":[]}"#;
    let response = app()
        .oneshot(post_json("/api/management-review", Some(bearer(Role::Manager)), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"], json!(["At least one standard must be selected"]));
}

#[tokio::test]
async fn calibration_needs_equipment() {
    let body = r#"{"dueDate":"2025-10-01T00:00:00Z"}"#;
    let response = app()
        .oneshot(post_json("/api/calibrations", Some(bearer(Role::Admin)), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"], json!(["equipmentId is required"]));
}
