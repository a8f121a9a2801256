use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use whatsapp_cell::router::create_whatsapp_router;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockRows};

async fn create_test_app(config: &TestConfig) -> Router {
    create_whatsapp_router(config.to_arc())
}

fn config_with(supabase: &MockServer, gateway: &MockServer) -> TestConfig {
    let mut config = TestConfig::with_supabase_url(&supabase.uri());
    config.whatsapp_gateway_url = gateway.uri();
    config
}

#[tokio::test]
async fn test_start_connection_returns_qr() {
    let supabase = MockServer::start().await;
    let gateway = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = config_with(&supabase, &gateway);
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "qr_code": "2@abcdef=="
        })))
        .mount(&gateway)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/whatsapp_connections"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::whatsapp_connection(&user.id)
        ])))
        .mount(&supabase)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/connections")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({"session_name": "default"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let connection: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(connection["status"], json!("waiting_for_qr_scan"));
    assert!(connection["qr_code"].as_str().is_some());
}

#[tokio::test]
async fn test_send_message_through_active_connection() {
    let supabase = MockServer::start().await;
    let gateway = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = config_with(&supabase, &gateway);
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let mut connection = MockRows::whatsapp_connection(&user.id);
    connection["status"] = json!("connected");
    connection["phone_number"] = json!("5511912345678");
    let connection_id = connection["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/whatsapp_connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([connection])))
        .mount(&supabase)
        .await;

    let message_row = MockRows::whatsapp_message(&user.id, &connection_id);

    Mock::given(method("POST"))
        .and(path("/rest/v1/whatsapp_messages"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([message_row.clone()])))
        .mount(&supabase)
        .await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message_id": "gw-123"
        })))
        .mount(&gateway)
        .await;

    let mut sent = message_row.clone();
    sent["status"] = json!("sent");
    sent["sent_at"] = json!(chrono::Utc::now().to_rfc3339());

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/whatsapp_messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([sent])))
        .mount(&supabase)
        .await;

    let request_body = json!({
        "connection_id": connection_id,
        "patient_id": null,
        "to_phone": "5511987654321",
        "body": "Your consultation is tomorrow at 9am."
    });

    let request = Request::builder()
        .method("POST")
        .uri("/messages")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_gateway_failure_is_bad_gateway() {
    let supabase = MockServer::start().await;
    let gateway = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = config_with(&supabase, &gateway);
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let mut connection = MockRows::whatsapp_connection(&user.id);
    connection["status"] = json!("connected");
    connection["phone_number"] = json!("5511912345678");
    let connection_id = connection["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/whatsapp_connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([connection])))
        .mount(&supabase)
        .await;

    let message_row = MockRows::whatsapp_message(&user.id, &connection_id);

    Mock::given(method("POST"))
        .and(path("/rest/v1/whatsapp_messages"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([message_row.clone()])))
        .mount(&supabase)
        .await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(503).set_body_string("session dropped"))
        .mount(&gateway)
        .await;

    let mut failed = message_row.clone();
    failed["status"] = json!("failed");
    failed["error_message"] = json!("HTTP 503: session dropped");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/whatsapp_messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([failed])))
        .mount(&supabase)
        .await;

    let request_body = json!({
        "connection_id": connection_id,
        "to_phone": "5511987654321",
        "body": "Your consultation is tomorrow at 9am."
    });

    let request = Request::builder()
        .method("POST")
        .uri("/messages")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_send_message_on_unpaired_connection_is_conflict() {
    let supabase = MockServer::start().await;
    let gateway = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = config_with(&supabase, &gateway);
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let connection = MockRows::whatsapp_connection(&user.id);
    let connection_id = connection["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/whatsapp_connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([connection])))
        .mount(&supabase)
        .await;

    let request_body = json!({
        "connection_id": connection_id,
        "to_phone": "5511987654321",
        "body": "Hello"
    });

    let request = Request::builder()
        .method("POST")
        .uri("/messages")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_reminder_computes_send_time() {
    let supabase = MockServer::start().await;
    let gateway = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = config_with(&supabase, &gateway);
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let patient = MockRows::patient(&user.id);
    let patient_id = patient["id"].as_str().unwrap().to_string();
    let consultation_id = uuid::Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([patient])))
        .mount(&supabase)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/whatsapp_reminders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::whatsapp_reminder(&user.id, &patient_id, &consultation_id)
        ])))
        .mount(&supabase)
        .await;

    let request_body = json!({
        "patient_id": patient_id,
        "consultation_id": consultation_id,
        "message": null,
        "consultation_date": "2026-09-10T14:00:00Z",
        "hours_before": 24
    });

    let request = Request::builder()
        .method("POST")
        .uri("/reminders")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_list_due_reminders_scopes_query() {
    let supabase = MockServer::start().await;
    let gateway = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = config_with(&supabase, &gateway);
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/whatsapp_reminders"))
        .and(query_param("status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&supabase)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/reminders/due")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_dispatch_skips_reminder_for_deleted_patient() {
    let supabase = MockServer::start().await;
    let gateway = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = config_with(&supabase, &gateway);
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let patient_id = uuid::Uuid::new_v4().to_string();
    let consultation_id = uuid::Uuid::new_v4().to_string();
    let mut reminder = MockRows::whatsapp_reminder(&user.id, &patient_id, &consultation_id);
    reminder["scheduled_for"] =
        json!((chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339());

    Mock::given(method("GET"))
        .and(path("/rest/v1/whatsapp_reminders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([reminder])))
        .mount(&supabase)
        .await;

    let mut connection = MockRows::whatsapp_connection(&user.id);
    connection["status"] = json!("connected");
    connection["phone_number"] = json!("5511912345678");

    Mock::given(method("GET"))
        .and(path("/rest/v1/whatsapp_connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([connection])))
        .mount(&supabase)
        .await;

    // Patient was soft-deleted after the reminder was created
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&supabase)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/reminders/dispatch")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["sent"], json!(0));
}

#[tokio::test]
async fn test_cancel_sent_reminder_is_conflict() {
    let supabase = MockServer::start().await;
    let gateway = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = config_with(&supabase, &gateway);
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let patient_id = uuid::Uuid::new_v4().to_string();
    let consultation_id = uuid::Uuid::new_v4().to_string();
    let mut reminder = MockRows::whatsapp_reminder(&user.id, &patient_id, &consultation_id);
    reminder["status"] = json!("sent");
    reminder["sent_at"] = json!(chrono::Utc::now().to_rfc3339());
    let reminder_id = reminder["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/whatsapp_reminders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([reminder])))
        .mount(&supabase)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri(&format!("/reminders/{}/cancel", reminder_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_read_receipt_cannot_regress() {
    let supabase = MockServer::start().await;
    let gateway = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = config_with(&supabase, &gateway);
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let connection_id = uuid::Uuid::new_v4().to_string();
    let mut message = MockRows::whatsapp_message(&user.id, &connection_id);
    message["status"] = json!("read");
    let message_id = message["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/whatsapp_messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([message])))
        .mount(&supabase)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri(&format!("/messages/{}/receipt", message_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({"status": "delivered"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}
