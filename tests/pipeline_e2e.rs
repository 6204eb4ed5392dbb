//! End-to-end tests driving the validation pipeline through real routes
//!
//! These tests verify the complete flow from HTTP request to response: the
//! extractor runs the pipeline, handlers only see vetted data, and rejected
//! requests come back with the documented status and message shape.

use axum::Router;
use axum::routing::{any, get, post};
use axum_test::TestServer;
use gatehouse::prelude::*;
use std::sync::{Arc, OnceLock};

// =============================================================================
// Test Routes
// =============================================================================

struct CreateUser;

impl GuardedRoute for CreateUser {
    fn validation_config() -> Arc<ValidationConfig> {
        static CONFIG: OnceLock<Arc<ValidationConfig>> = OnceLock::new();
        Arc::clone(CONFIG.get_or_init(|| {
            Arc::new(presets::create(
                FieldRules::new()
                    .field("name", Rule::Required)
                    .field("name", Rule::MinLength(2))
                    .field("email", Rule::Email),
            ))
        }))
    }
}

async fn create_user(vetted: Vetted<CreateUser>) -> Json<Value> {
    Json(vetted.body().cloned().unwrap_or_default())
}

struct GetUser;

impl GuardedRoute for GetUser {
    fn validation_config() -> Arc<ValidationConfig> {
        static CONFIG: OnceLock<Arc<ValidationConfig>> = OnceLock::new();
        Arc::clone(CONFIG.get_or_init(|| {
            Arc::new(
                presets::read()
                    .with_params_schema(FieldRules::new().field("id", Rule::Uuid)),
            )
        }))
    }
}

async fn get_user(vetted: Vetted<GetUser>) -> Json<Value> {
    Json(vetted.params.clone().unwrap_or_default())
}

struct Search;

impl GuardedRoute for Search {
    fn validation_config() -> Arc<ValidationConfig> {
        static CONFIG: OnceLock<Arc<ValidationConfig>> = OnceLock::new();
        Arc::clone(CONFIG.get_or_init(|| {
            Arc::new(
                presets::read()
                    .with_query_schema(FieldRules::new().field("q", Rule::Required)),
            )
        }))
    }
}

async fn search(vetted: Vetted<Search>) -> Json<Value> {
    Json(vetted.query.clone().unwrap_or_default())
}

struct Upload;

impl GuardedRoute for Upload {
    fn validation_config() -> Arc<ValidationConfig> {
        static CONFIG: OnceLock<Arc<ValidationConfig>> = OnceLock::new();
        Arc::clone(CONFIG.get_or_init(|| {
            Arc::new(presets::upload(
                FieldRules::new().field("title", Rule::Required),
            ))
        }))
    }
}

async fn upload(vetted: Vetted<Upload>) -> Json<Value> {
    Json(vetted.body().cloned().unwrap_or_default())
}

fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn app() -> TestServer {
    init_tracing();
    let router = Router::new()
        // `any` so the pipeline's own method gate answers, not the router.
        .route("/users", any(create_user))
        .route("/users/{id}", get(get_user))
        .route("/search", get(search))
        .route("/upload", post(upload));
    TestServer::new(router)
}

// =============================================================================
// Body validation
// =============================================================================

#[tokio::test]
async fn test_valid_create_echoes_vetted_body() {
    let server = app();
    let response = server
        .post("/users")
        .json(&json!({"name": "Ada", "email": "ada@example.com"}))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({"name": "Ada", "email": "ada@example.com"}));
}

#[tokio::test]
async fn test_schema_violations_return_422_with_all_messages() {
    let server = app();
    let response = server.post("/users").json(&json!({"email": "nope"})).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json();
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(
        body["errors"],
        json!([
            "Body validation: name - is required",
            "Body validation: email - must be a valid email address",
        ])
    );
}

#[tokio::test]
async fn test_injection_rejected_even_when_schema_valid() {
    let server = app();
    let response = server
        .post("/users")
        .json(&json!({"name": "Robert'); DROP TABLE students;--"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(
        body["errors"],
        json!(["Potential SQL injection detected in body.name"])
    );
}

#[tokio::test]
async fn test_create_sanitizes_body_strings() {
    // Disallowed but non-hostile markup passes the scan and gets rewritten.
    let server = app();
    let response = server
        .post("/users")
        .json(&json!({"name": "<article><b>Ada</b></article>"}))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({"name": "<b>Ada</b>"}));
}

#[tokio::test]
async fn test_script_markup_is_rejected_not_cleaned() {
    let server = app();
    let response = server
        .post("/users")
        .json(&json!({"name": "<script>steal()</script>Ada"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(
        body["errors"],
        json!(["Potential XSS detected in body.name"])
    );
}

#[tokio::test]
async fn test_malformed_json_returns_400() {
    let server = app();
    let response = server
        .post("/users")
        .content_type("application/json")
        .bytes("{\"name\": ".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    let message = body["errors"][0].as_str().unwrap();
    assert!(message.starts_with("Malformed request body:"), "{message}");
}

#[tokio::test]
async fn test_urlencoded_body_decodes_with_array_keys() {
    let server = app();
    let response = server
        .post("/users")
        .content_type("application/x-www-form-urlencoded")
        .bytes("name=Ada+Lovelace&email=ada%40example.com".into())
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({"name": "Ada Lovelace", "email": "ada@example.com"}));
}

// =============================================================================
// Method and size gates
// =============================================================================

#[tokio::test]
async fn test_method_gate_returns_405() {
    let server = app();
    let response = server.get("/users").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);

    let body: Value = response.json();
    assert_eq!(body["errors"], json!(["Method GET not allowed"]));
}

#[tokio::test]
async fn test_oversized_body_returns_413() {
    let server = app();
    let huge = "x".repeat(2 * 1024 * 1024);
    let response = server.post("/users").json(&json!({"name": huge})).await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    let body: Value = response.json();
    let message = body["errors"][0].as_str().unwrap();
    assert!(message.contains("exceeds maximum size"), "{message}");
}

// =============================================================================
// Query and params
// =============================================================================

#[tokio::test]
async fn test_query_injection_rejected() {
    let server = app();
    let response = server
        .get("/search")
        .add_query_param("q", "' OR 1=1 --")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(
        body["errors"],
        json!(["Potential SQL injection detected in query.q"])
    );
}

#[tokio::test]
async fn test_query_schema_enforced() {
    let server = app();
    let response = server.get("/search").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json();
    assert_eq!(body["errors"], json!(["Query validation: q - is required"]));
}

#[tokio::test]
async fn test_query_echoed_when_valid() {
    let server = app();
    let response = server.get("/search").add_query_param("q", "rust tips").await;
    response.assert_status_ok();
    response.assert_json(&json!({"q": "rust tips"}));
}

#[tokio::test]
async fn test_path_param_schema_enforced() {
    let server = app();
    let response = server.get("/users/not-a-uuid").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json();
    assert_eq!(
        body["errors"],
        json!(["Params validation: id - must be a valid UUID"])
    );
}

#[tokio::test]
async fn test_path_param_traversal_rejected() {
    let server = app();
    let response = server.get("/users/..%2F..%2Fetc").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json();
    let errors = body["errors"].as_array().unwrap();
    assert!(
        errors
            .iter()
            .any(|e| e == "Potential path traversal detected in params.id"),
        "{errors:?}"
    );
}

#[tokio::test]
async fn test_valid_path_param_echoed() {
    let server = app();
    let id = "0191d3a0-1111-7abc-8def-0123456789ab";
    let response = server.get(&format!("/users/{id}")).await;
    response.assert_status_ok();
    response.assert_json(&json!({ "id": id }));
}

// =============================================================================
// Multipart uploads
// =============================================================================

#[tokio::test]
async fn test_multipart_upload_with_file_metadata() {
    let server = app();
    let body = "--BOUND\r\n\
                Content-Disposition: form-data; name=\"title\"\r\n\
                \r\n\
                quarterly report\r\n\
                --BOUND\r\n\
                Content-Disposition: form-data; name=\"doc\"; filename=\"report.pdf\"\r\n\
                Content-Type: application/pdf\r\n\
                \r\n\
                %PDF-1.4 fake\r\n\
                --BOUND--";
    let response = server
        .post("/upload")
        .content_type("multipart/form-data; boundary=BOUND")
        .bytes(body.as_bytes().to_vec().into())
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({
        "title": "quarterly report",
        "doc": {
            "file_name": "report.pdf",
            "size": "%PDF-1.4 fake".len(),
            "content_type": "application/pdf",
        }
    }));
}

#[tokio::test]
async fn test_multipart_missing_required_field() {
    let server = app();
    let body = "--BOUND\r\n\
                Content-Disposition: form-data; name=\"other\"\r\n\
                \r\n\
                x\r\n\
                --BOUND--";
    let response = server
        .post("/upload")
        .content_type("multipart/form-data; boundary=BOUND")
        .bytes(body.as_bytes().to_vec().into())
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json();
    assert_eq!(
        body["errors"],
        json!(["Body validation: title - is required"])
    );
}
