use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use schedule_cell::router::create_schedule_router;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockRows};

async fn create_test_app(config: &TestConfig) -> Router {
    create_schedule_router(config.to_arc())
}

#[tokio::test]
async fn test_generate_slots_for_empty_day() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    // No pre-existing slots on the day
    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Insert echoes back one representative row per request
    Mock::given(method("POST"))
        .and(path("/rest/v1/schedule_slots"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::schedule_slot(&user.id)
        ])))
        .mount(&mock_server)
        .await;

    let request_body = json!({
        "date": "2026-09-01",
        "day_start": "08:00:00",
        "day_end": "12:00:00",
        "slot_minutes": 30
    });

    let request = Request::builder()
        .method("POST")
        .uri("/slots/generate")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_generate_slots_invalid_window_rejected() {
    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::default();
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let request_body = json!({
        "date": "2026-09-01",
        "day_start": "14:00:00",
        "day_end": "08:00:00",
        "slot_minutes": 30
    });

    let request = Request::builder()
        .method("POST")
        .uri("/slots/generate")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_book_available_slot() {
    let mock_server = MockServer::start().await;

    let user = TestUser::secretary("sec@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let row = MockRows::schedule_slot(&user.id);
    let slot_id = row["id"].as_str().unwrap().to_string();
    let consultation_id = uuid::Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row.clone()])))
        .mount(&mock_server)
        .await;

    let mut booked = row.clone();
    booked["status"] = json!("booked");
    booked["consultation_id"] = json!(consultation_id);

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/schedule_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([booked])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri(&format!("/slots/{}/book", slot_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({"consultation_id": consultation_id}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_double_booking_is_conflict() {
    let mock_server = MockServer::start().await;

    let user = TestUser::secretary("sec@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let mut row = MockRows::schedule_slot(&user.id);
    row["status"] = json!("booked");
    row["consultation_id"] = json!(uuid::Uuid::new_v4().to_string());
    let slot_id = row["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri(&format!("/slots/{}/book", slot_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({"consultation_id": uuid::Uuid::new_v4()}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_list_slots_filters_by_status() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_slots"))
        .and(query_param("status", "eq.available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::schedule_slot(&user.id)
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/slots?status=available")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_booked_slot_rejected() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let mut row = MockRows::schedule_slot(&user.id);
    row["status"] = json!("booked");
    let slot_id = row["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/schedule_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("DELETE")
        .uri(&format!("/slots/{}", slot_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}
