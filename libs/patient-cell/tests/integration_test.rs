use std::sync::Arc;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, header, query_param};

use patient_cell::router::create_patient_router;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockRows};

async fn create_test_app(config: &TestConfig) -> Router {
    create_patient_router(config.to_arc())
}

#[tokio::test]
async fn test_create_patient_success() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    // Duplicate-email check comes back empty
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .and(header("Authorization", format!("Bearer {}", token)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::patient(&user.id)
        ])))
        .mount(&mock_server)
        .await;

    let request_body = json!({
        "full_name": "Maria Souza",
        "email": "maria.souza@example.com",
        "phone": "11987654321",
        "cep": "01310-100"
    });

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_patient_unauthorized() {
    let config = TestConfig::default();
    let app = create_test_app(&config).await;

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(json!({"full_name": "X", "phone": "11987654321"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_patient_success() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let row = MockRows::patient(&user.id);
    let patient_id = row["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(header("Authorization", format!("Bearer {}", token)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/{}", patient_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_get_patient_not_found() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/00000000-0000-0000-0000-000000000000")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_patients_by_name() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::patient(&user.id)
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/search?name=Maria")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_patient_soft_deletes() {
    let mock_server = MockServer::start().await;

    let user = TestUser::secretary("sec@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let mut row = MockRows::patient(&user.id);
    row["deleted_at"] = json!(chrono::Utc::now().to_rfc3339());
    let patient_id = row["id"].as_str().unwrap().to_string();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("DELETE")
        .uri(&format!("/{}", patient_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_patient_invalid_phone_rejected() {
    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::default();
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let request_body = json!({
        "full_name": "Maria Souza",
        "phone": "123"
    });

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
