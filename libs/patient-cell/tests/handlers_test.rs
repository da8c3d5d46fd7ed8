use assert_matches::assert_matches;
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::handlers;
use patient_cell::models::{
    CreatePatientRequest, EmergencyContactInput, PatientQueryParams, UpdatePatientRequest,
};
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockRows, TestConfig, TestUser};

fn auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

fn registration_request() -> CreatePatientRequest {
    CreatePatientRequest {
        first_name: Some("Jane".to_string()),
        last_name: Some("Doe".to_string()),
        date_of_birth: Some("1990-05-15".to_string()),
        gender: Some("female".to_string()),
        email: Some("jane@example.com".to_string()),
        phone: Some("+1234567890".to_string()),
        address: None,
        emergency_contact: Some(EmergencyContactInput {
            name: Some("John Doe".to_string()),
            relationship: Some("spouse".to_string()),
            phone: Some("+0987654321".to_string()),
        }),
        blood_group: None,
        allergies: None,
        chronic_conditions: None,
    }
}

#[tokio::test]
async fn registration_returns_camel_case_fields() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let patient_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::patient_row(patient_id, "Jane", "Doe")
        ])))
        .mount(&mock_server)
        .await;

    let result = handlers::create_patient(
        State(config.to_arc()),
        auth_header(&token),
        Extension(user.to_auth_user()),
        Json(registration_request()),
    )
    .await;

    let (status, Json(body)) = result.expect("registration should succeed");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["firstName"], json!("Jane"));
    assert_eq!(body["data"]["dateOfBirth"], json!("1990-05-15"));
    assert_eq!(body["data"]["emergencyContact"]["name"], json!("John Doe"));
    // The snake_case storage shape must not leak through
    assert!(body["data"].get("first_name").is_none());
}

#[tokio::test]
async fn listing_returns_pagination_envelope() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "0-0/25")
                .set_body_json(json!([MockRows::patient_row(Uuid::new_v4(), "Jane", "Doe")])),
        )
        .mount(&mock_server)
        .await;

    let params = PatientQueryParams {
        page: Some(1),
        limit: Some(10),
        search: None,
        is_active: None,
    };

    let result = handlers::get_patients(
        State(config.to_arc()),
        Query(params),
        auth_header(&token),
        Extension(user.to_auth_user()),
    )
    .await;

    let Json(body) = result.expect("listing should succeed");
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["total"], json!(25));
    assert_eq!(body["totalPages"], json!(3));
    assert_eq!(body["currentPage"], json!(1));
}

#[tokio::test]
async fn search_filters_are_forwarded_to_storage() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "*/0")
                .set_body_json(json!([])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let params = PatientQueryParams {
        page: None,
        limit: None,
        search: Some("Jane".to_string()),
        is_active: Some(true),
    };

    let result = handlers::get_patients(
        State(config.to_arc()),
        Query(params),
        auth_header(&token),
        Extension(user.to_auth_user()),
    )
    .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn missing_patient_is_not_found() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = handlers::get_patient(
        State(config.to_arc()),
        Path(Uuid::new_v4()),
        auth_header(&token),
        Extension(user.to_auth_user()),
    )
    .await;

    let err = result.unwrap_err();
    assert_matches!(err, AppError::NotFound(msg) if msg == "Patient not found");
}

#[tokio::test]
async fn update_of_missing_patient_is_not_found_without_patching() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    // Only the existence check is mocked; a PATCH would fail the test
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = UpdatePatientRequest {
        first_name: Some("Janet".to_string()),
        last_name: None,
        date_of_birth: None,
        gender: None,
        email: None,
        phone: None,
        address: None,
        emergency_contact: None,
        blood_group: None,
        allergies: None,
        chronic_conditions: None,
        is_active: None,
    };

    let result = handlers::update_patient(
        State(config.to_arc()),
        Path(Uuid::new_v4()),
        auth_header(&token),
        Extension(user.to_auth_user()),
        Json(request),
    )
    .await;

    assert_matches!(result.unwrap_err(), AppError::NotFound(_));
}

#[tokio::test]
async fn delete_removes_an_existing_patient() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::patient_row(patient_id, "Jane", "Doe")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let result = handlers::delete_patient(
        State(config.to_arc()),
        Path(patient_id),
        auth_header(&token),
        Extension(user.to_auth_user()),
    )
    .await;

    let Json(body) = result.expect("delete should succeed");
    assert_eq!(body["message"], json!("Patient deleted successfully"));
}
