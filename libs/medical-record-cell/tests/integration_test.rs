use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use medical_record_cell::router::create_medical_record_router;
use shared_utils::test_utils::{TestConfig, TestUser, JwtTestUtils, MockRows};

async fn create_test_app(config: &TestConfig) -> Router {
    create_medical_record_router(config.to_arc())
}

#[tokio::test]
async fn test_create_anamnesis_success() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let patient_id = uuid::Uuid::new_v4().to_string();

    Mock::given(method("POST"))
        .and(path("/rest/v1/anamneses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::anamnesis(&user.id, &patient_id)
        ])))
        .mount(&mock_server)
        .await;

    let request_body = json!({
        "patient_id": patient_id,
        "chief_complaint": "recurring headaches",
        "allergies": ["dipyrone"]
    });

    let request = Request::builder()
        .method("POST")
        .uri("/anamneses")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_note_requires_auth() {
    let config = TestConfig::default();
    let app = create_test_app(&config).await;

    let request = Request::builder()
        .method("POST")
        .uri("/notes")
        .header("content-type", "application/json")
        .body(Body::from(json!({"patient_id": uuid::Uuid::new_v4(), "title": "t", "content": "c"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_exam_completed_transition() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let patient_id = uuid::Uuid::new_v4().to_string();
    let row = MockRows::exam(&user.id, &patient_id);
    let exam_id = row["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/exams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row.clone()])))
        .mount(&mock_server)
        .await;

    let mut completed = row.clone();
    completed["status"] = json!("completed");
    completed["performed_at"] = json!(chrono::Utc::now().to_rfc3339());
    completed["result_summary"] = json!("within normal limits");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/exams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([completed])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("PUT")
        .uri(&format!("/exams/{}", exam_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({
            "status": "completed",
            "result_summary": "within normal limits"
        }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_exam_illegal_transition_is_conflict() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let patient_id = uuid::Uuid::new_v4().to_string();
    let mut row = MockRows::exam(&user.id, &patient_id);
    row["status"] = json!("cancelled");
    let exam_id = row["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/exams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("PUT")
        .uri(&format!("/exams/{}", exam_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({"status": "completed"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_prescription_patches_consultation() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let patient_id = uuid::Uuid::new_v4().to_string();
    let consultation_id = uuid::Uuid::new_v4().to_string();

    let mut row = MockRows::prescription(&user.id, &patient_id);
    row["consultation_id"] = json!(consultation_id);

    Mock::given(method("POST"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    // The back-reference patch on the consultation row
    let consultation_patch = Mock::given(method("PATCH"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::consultation(&user.id, &patient_id)
        ])))
        .expect(1)
        .mount_as_scoped(&mock_server)
        .await;

    let request_body = json!({
        "patient_id": patient_id,
        "consultation_id": consultation_id,
        "medications": [{
            "name": "amoxicillin",
            "dosage": "500mg",
            "frequency": "8/8h"
        }],
        "valid_days": 30
    });

    let request = Request::builder()
        .method("POST")
        .uri("/prescriptions")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    drop(consultation_patch);
}

#[tokio::test]
async fn test_create_prescription_without_medications_rejected() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let request_body = json!({
        "patient_id": uuid::Uuid::new_v4(),
        "medications": []
    });

    let request = Request::builder()
        .method("POST")
        .uri("/prescriptions")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_list_expired_prescriptions_scope() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let patient_id = uuid::Uuid::new_v4().to_string();
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .and(query_param("valid_until", format!("lt.{}", today)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::prescription(&user.id, &patient_id)
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/prescriptions?expired=true")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_get_medical_record_aggregates_parts() {
    let mock_server = MockServer::start().await;

    let user = TestUser::doctor("doctor@example.com");
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let app = create_test_app(&config).await;
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(24));

    let patient = MockRows::patient(&user.id);
    let patient_id = patient["id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": patient_id }])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/anamneses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::anamnesis(&user.id, &patient_id)
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinical_notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::clinical_note(&user.id, &patient_id)
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/exams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/prescriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::prescription(&user.id, &patient_id)
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": uuid::Uuid::new_v4().to_string() }
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri(&format!("/patients/{}/record", patient_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let record: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(record["anamneses"].as_array().unwrap().len(), 1);
    assert_eq!(record["notes"].as_array().unwrap().len(), 1);
    assert_eq!(record["exams"].as_array().unwrap().len(), 0);
    assert_eq!(record["prescriptions"].as_array().unwrap().len(), 1);
    assert_eq!(record["consultation_ids"].as_array().unwrap().len(), 1);
}
