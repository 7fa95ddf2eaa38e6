//! End-to-end workflows against a real PostgreSQL database.
//!
//! Set `DATABASE_URL` to run them; without it every test returns early.
//! Tests share one database, so they run one at a time.

use std::sync::LazyLock;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

use qms_server::auth::rbac::Role;
use qms_server::auth::token;
use qms_server::config::QmsConfig;
use qms_server::services::training_service::DUPLICATE_RECORD;
use qms_server::services::user_service;
use qms_server::{build_app, db, migration, seeder, AppState};

const SECRET: &str = "workflow-test-secret";

static LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

struct Harness {
    app: Router,
    auth: String,
    admin_id: i64,
}

impl Harness {
    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, &self.auth)
            .header(header::CONTENT_TYPE, "application/json");
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, None).await
    }
}

/// Migrated, seeded database plus an admin session, or `None` when no
/// database is configured.
async fn harness() -> Option<Harness> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };
    let pool = db::build_pool(&url, 4).expect("pool");
    let admin_id = {
        let mut conn = pool.get().await.expect("connection");
        migration::run_migration(&mut conn).await.expect("migration");
        if !seeder::is_seeded(&mut conn).await.expect("seed check") {
            seeder::seed(&mut conn).await.expect("seed");
        }
        user_service::upsert_admin(&mut conn, "workflow-admin@example.com", "Workflow Admin", "correct horse")
            .await
            .expect("admin")
            .id
    };
    let token = token::issue(SECRET, admin_id, Role::Admin, Duration::hours(1), Utc::now()).expect("token");
    let config = QmsConfig {
        auth_secret: SECRET.to_string(),
        ..QmsConfig::default()
    };
    Some(Harness {
        app: build_app(AppState::new(pool, config)),
        auth: format!("Bearer {token}"),
        admin_id,
    })
}

fn unique(label: &str) -> String {
    format!("{label} {}", uuid::Uuid::new_v4().simple())
}

fn sequence(reference: &Value) -> i64 {
    reference
        .as_str()
        .and_then(|r| r.rsplit('-').next())
        .and_then(|n| n.parse().ok())
        .expect("reference sequence")
}

async fn new_audit(h: &Harness, type_id: i64) -> Value {
    let start = Utc::now();
    let body = json!({
        "auditTypeId": type_id,
        "title": unique("Stores audit"),
        "scope": "Goods-in and stores",
        "auditStandard": "ISO 9001",
        "plannedStartDate": start,
        "plannedEndDate": start + Duration::days(1),
    });
    let (status, audit) = h.post("/api/audits", body).await;
    assert_eq!(status, StatusCode::CREATED, "{audit}");
    audit
}

#[tokio::test]
async fn audit_numbers_do_not_collide_after_a_delete() {
    let _guard = LOCK.lock().await;
    let Some(h) = harness().await else { return };

    let body = json!({ "name": unique("Numbering"), "category": "INTERNAL", "frequency": "AD_HOC" });
    let (status, audit_type) = h.post("/api/audits/types", body).await;
    assert_eq!(status, StatusCode::CREATED, "{audit_type}");
    let type_id = audit_type["id"].as_i64().expect("type id");

    let first = new_audit(&h, type_id).await;
    let second = new_audit(&h, type_id).await;
    let (status, _) = h.delete(&format!("/api/audits/{}", first["id"])).await;
    assert_eq!(status, StatusCode::OK);

    let third = new_audit(&h, type_id).await;
    assert_ne!(third["auditNumber"], second["auditNumber"]);
    assert_eq!(sequence(&third["auditNumber"]), sequence(&second["auditNumber"]) + 1);
}

fn nc_case(containment: bool) -> Value {
    json!({
        "caseType": "NC",
        "title": unique("Short shot on housing"),
        "raisedBy": "Line 2 lead",
        "problemStatement": "Housings moulded short on cavity 3",
        "containmentNeeded": containment,
    })
}

#[tokio::test]
async fn containment_opens_a_linked_global_action() {
    let _guard = LOCK.lock().await;
    let Some(h) = harness().await else { return };

    let (status, case) = h.post("/api/nonconformance", nc_case(true)).await;
    assert_eq!(status, StatusCode::CREATED, "{case}");
    let actions = case["actions"].as_array().expect("actions");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["actionType"], json!("CONTAINMENT"));
    assert!(actions[0]["globalActionId"].is_i64(), "{}", actions[0]);

    let (_, plain) = h.post("/api/nonconformance", nc_case(false)).await;
    assert_eq!(plain["actions"], json!([]));
}

#[tokio::test]
async fn case_closes_only_after_its_actions_are_done() {
    let _guard = LOCK.lock().await;
    let Some(h) = harness().await else { return };

    let (_, case) = h.post("/api/nonconformance", nc_case(true)).await;
    let case_id = case["id"].as_i64().expect("case id");
    let action_id = case["actions"][0]["id"].as_i64().expect("action id");

    let close_uri = format!("/api/nonconformance/{case_id}/close");
    let (status, body) = h.post(&close_uri, json!({ "approvedBy": "QA Manager" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Cannot close: Not all actions are completed"));

    let action_uri = format!("/api/nonconformance/{case_id}/actions/{action_id}");
    let (status, _) = h.put(&action_uri, json!({ "status": "DONE" })).await;
    assert_eq!(status, StatusCode::OK);
    let (_, case) = h.get(&format!("/api/nonconformance/{case_id}")).await;
    assert_eq!(case["status"], json!("PENDING_VERIFICATION"));

    let (status, closed) = h.post(&close_uri, json!({ "approvedBy": "QA Manager" })).await;
    assert_eq!(status, StatusCode::OK, "{closed}");
    assert_eq!(closed["status"], json!("CLOSED"));
}

#[tokio::test]
async fn second_record_for_same_course_is_refused() {
    let _guard = LOCK.lock().await;
    let Some(h) = harness().await else { return };

    let (_, overview) = h.get("/api/training").await;
    let course_id = overview["courses"][0]["id"].as_i64().expect("seeded course");
    let body = json!({ "userId": h.admin_id, "courseId": course_id });

    // The first insert may already exist from an earlier run.
    let (status, _) = h.post("/api/training", body.clone()).await;
    assert!(status == StatusCode::CREATED || status == StatusCode::BAD_REQUEST);
    let (status, refused) = h.post("/api/training", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(refused["error"], json!(DUPLICATE_RECORD));
}

#[tokio::test]
async fn waste_type_in_use_cannot_be_deleted() {
    let _guard = LOCK.lock().await;
    let Some(h) = harness().await else { return };

    let (status, waste_type) = h
        .post("/api/waste-management/types", json!({ "name": unique("Solvent rags"), "category": "HAZARDOUS" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{waste_type}");
    let type_id = waste_type["id"].as_i64().expect("type id");

    let record = json!({
        "wasteTypeId": type_id,
        "quantity": 12.5,
        "unit": "KG",
        "location": "Paint shop",
        "generatedBy": "Paint shop lead",
        "generatedDate": Utc::now(),
    });
    let (status, record) = h.post("/api/waste-management/records", record).await;
    assert_eq!(status, StatusCode::CREATED, "{record}");

    let type_uri = format!("/api/waste-management/types/{type_id}");
    let (status, body) = h.delete(&type_uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Cannot delete waste type with associated records"));

    let (status, _) = h.delete(&format!("/api/waste-management/records/{}", record["id"])).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.delete(&type_uri).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn management_review_follows_its_lifecycle() {
    let _guard = LOCK.lock().await;
    let Some(h) = harness().await else { return };

    let body = json!({
        "title": unique("Q3 management review"),
        "scheduledAt": Utc::now() + Duration::days(7),
        "meetingType": "QUARTERLY",
        "standards": ["ISO9001"],
    });
    let (status, review) = h.post("/api/management-review", body).await;
    assert_eq!(status, StatusCode::CREATED, "{review}");
    assert_eq!(review["status"], json!("DRAFT"));
    let uri = format!("/api/management-review/{}", review["id"]);

    let (status, body) = h.put(&uri, json!({ "status": "COMPLETED" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid status transition from DRAFT to COMPLETED"));

    for step in ["SCHEDULED", "IN_PROGRESS"] {
        let (status, body) = h.put(&uri, json!({ "status": step })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, loaded) = h
        .post(&format!("{uri}/load-template"), json!({ "standards": ["ISO9001"] }))
        .await;
    assert_eq!(status, StatusCode::OK, "{loaded}");
    assert_eq!(loaded["summary"]["inputsCreated"], json!(11));
    let (_, again) = h
        .post(&format!("{uri}/load-template"), json!({ "standards": ["ISO9001"] }))
        .await;
    assert_eq!(again["summary"]["inputsCreated"], json!(0));

    let (status, body) = h.put(&uri, json!({ "status": "COMPLETED" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().expect("message");
    assert!(message.starts_with("Review cannot be completed: 11 input items"), "{message}");

    let (status, _) = h.delete(&uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, review) = h.get(&uri).await;
    let events: Vec<&str> = review["auditLog"]
        .as_array()
        .expect("audit log")
        .iter()
        .filter_map(|e| e["event"].as_str())
        .collect();
    assert_eq!(events.iter().filter(|e| **e == "STATUS_CHANGE").count(), 2);
    assert!(events.contains(&"CREATED"));
}

#[tokio::test]
async fn overdue_calibration_is_red() {
    let _guard = LOCK.lock().await;
    let Some(h) = harness().await else { return };

    let tag = format!("T-{}", uuid::Uuid::new_v4().simple());
    let (status, equipment) = h
        .post("/api/equipment", json!({ "name": "Torque wrench", "assetTag": tag }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{equipment}");

    let body = json!({ "equipmentId": equipment["id"], "dueDate": Utc::now() - Duration::days(3) });
    let (status, calibration) = h.post("/api/calibrations", body).await;
    assert_eq!(status, StatusCode::CREATED, "{calibration}");
    assert_eq!(calibration["rag"], json!("red"));

    let (status, _) = h.delete(&format!("/api/equipment/{}", equipment["id"])).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.get(&format!("/api/calibrations/{}", calibration["id"])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
