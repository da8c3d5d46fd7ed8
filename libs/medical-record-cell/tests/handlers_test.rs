use assert_matches::assert_matches;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medical_record_cell::handlers;
use medical_record_cell::models::{CreateMedicalRecordRequest, UpdateMedicalRecordRequest};
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockRows, TestConfig, TestUser};

fn auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

async fn mount_party_lookups(server: &MockServer, patient_id: Uuid, doctor_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::patient_row(patient_id, "Jane", "Doe")
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::doctor_row(doctor_id, "Dr. Test", "doctor@example.com", "Cardiology")
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn creates_a_record_for_an_existing_patient() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let patient_id = Uuid::new_v4();
    let record_id = Uuid::new_v4();

    mount_party_lookups(&mock_server, patient_id, user.id).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::medical_record_row(record_id, patient_id, user.id)
        ])))
        .mount(&mock_server)
        .await;

    let request = CreateMedicalRecordRequest {
        patient: Some(patient_id.to_string()),
        visit_date: None,
        chief_complaint: Some("Persistent cough".to_string()),
        diagnosis: Some("Acute bronchitis".to_string()),
        symptoms: Some(vec!["cough".to_string()]),
        vital_signs: None,
        prescriptions: None,
        lab_tests: None,
        notes: None,
        follow_up_date: None,
    };

    let result = handlers::create_record(
        State(config.to_arc()),
        auth_header(&token),
        Extension(user.to_auth_user()),
        Json(request),
    )
    .await;

    let (status, Json(body)) = result.expect("create should succeed");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["chiefComplaint"], json!("Persistent cough"));
    assert_eq!(body["data"]["patient"]["firstName"], json!("Jane"));
}

#[tokio::test]
async fn create_fails_for_unknown_patient() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let request = CreateMedicalRecordRequest {
        patient: Some(Uuid::new_v4().to_string()),
        visit_date: None,
        chief_complaint: Some("Headache".to_string()),
        diagnosis: Some("Migraine".to_string()),
        symptoms: None,
        vital_signs: None,
        prescriptions: None,
        lab_tests: None,
        notes: None,
        follow_up_date: None,
    };

    let result = handlers::create_record(
        State(config.to_arc()),
        auth_header(&token),
        Extension(user.to_auth_user()),
        Json(request),
    )
    .await;

    let err = result.unwrap_err();
    assert_matches!(err, AppError::NotFound(msg) if msg == "Patient not found");
}

#[tokio::test]
async fn owner_can_update_their_record() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let patient_id = Uuid::new_v4();
    let record_id = Uuid::new_v4();

    mount_party_lookups(&mock_server, patient_id, user.id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("id", format!("eq.{}", record_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::medical_record_row(record_id, patient_id, user.id)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::medical_record_row(record_id, patient_id, user.id)
        ])))
        .mount(&mock_server)
        .await;

    let request = UpdateMedicalRecordRequest {
        notes: Some("Follow-up in two weeks".to_string()),
        ..Default::default()
    };

    let result = handlers::update_record(
        State(config.to_arc()),
        Path(record_id),
        auth_header(&token),
        Extension(user.to_auth_user()),
        Json(request),
    )
    .await;

    let Json(body) = result.expect("owner update should succeed");
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn non_owner_cannot_update_a_record() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let record_id = Uuid::new_v4();
    let other_doctor = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::medical_record_row(record_id, Uuid::new_v4(), other_doctor)
        ])))
        .mount(&mock_server)
        .await;

    let request = UpdateMedicalRecordRequest {
        notes: Some("Attempted edit".to_string()),
        ..Default::default()
    };

    let result = handlers::update_record(
        State(config.to_arc()),
        Path(record_id),
        auth_header(&token),
        Extension(user.to_auth_user()),
        Json(request),
    )
    .await;

    let err = result.unwrap_err();
    assert_matches!(
        err,
        AppError::Forbidden(msg) if msg == "Not authorized to update this medical record"
    );
}

#[tokio::test]
async fn admin_can_update_any_record() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));

    let patient_id = Uuid::new_v4();
    let record_id = Uuid::new_v4();
    let other_doctor = Uuid::new_v4();

    mount_party_lookups(&mock_server, patient_id, other_doctor).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .and(query_param("id", format!("eq.{}", record_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::medical_record_row(record_id, patient_id, other_doctor)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::medical_record_row(record_id, patient_id, other_doctor)
        ])))
        .mount(&mock_server)
        .await;

    let request = UpdateMedicalRecordRequest {
        diagnosis: Some("Revised diagnosis".to_string()),
        ..Default::default()
    };

    let result = handlers::update_record(
        State(config.to_arc()),
        Path(record_id),
        auth_header(&token),
        Extension(admin.to_auth_user()),
        Json(request),
    )
    .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn only_admins_can_delete_records() {
    let config = TestConfig::default();
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let result = handlers::delete_record(
        State(config.to_arc()),
        Path(Uuid::new_v4()),
        auth_header(&token),
        Extension(user.to_auth_user()),
    )
    .await;

    let err = result.unwrap_err();
    assert_matches!(err, AppError::Forbidden(_));
}

#[tokio::test]
async fn admin_delete_succeeds() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(1));

    let record_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::medical_record_row(record_id, Uuid::new_v4(), Uuid::new_v4())
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let result = handlers::delete_record(
        State(config.to_arc()),
        Path(record_id),
        auth_header(&token),
        Extension(admin.to_auth_user()),
    )
    .await;

    let Json(body) = result.expect("admin delete should succeed");
    assert_eq!(body["message"], json!("Medical record deleted successfully"));
}

#[tokio::test]
async fn patient_history_includes_patient_header() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doc@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    mount_party_lookups(&mock_server, patient_id, doctor_id).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::medical_record_row(Uuid::new_v4(), patient_id, doctor_id)
        ])))
        .mount(&mock_server)
        .await;

    let result = handlers::get_patient_history(
        State(config.to_arc()),
        Path(patient_id),
        auth_header(&token),
        Extension(user.to_auth_user()),
    )
    .await;

    let Json(body) = result.expect("history should succeed");
    assert_eq!(body["data"]["patient"]["name"], json!("Jane Doe"));
    assert_eq!(body["count"], json!(1));
}
