//! The request validation pipeline
//!
//! One call, [`validate`], takes ownership of a request and resolves it to a
//! single [`ValidationResult`]: method gate, size gate, body decoding,
//! injection scan, optional sanitization, then schema validation per target.
//! Faults accumulate across steps so a rejected request reports everything
//! wrong with it, and nothing downstream of a fault can observe unvalidated
//! data.
//!
//! Routes describe themselves with a [`ValidationConfig`] (usually via a
//! [`presets`] constructor) and either call [`validate`] from middleware or
//! let the [`Vetted`] extractor drive it per handler.

pub mod config;
pub mod presets;

mod extractor;

use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::{Method, header};
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::body::{self, BodyValue, ContentKind};
use crate::fault::{Target, ValidatedData, ValidationFault, ValidationResult};
use crate::sanitize;
use crate::scan;

pub use config::{DEFAULT_MAX_BODY_SIZE, ValidationConfig};
pub use extractor::{GuardedRoute, Vetted};

/// Methods that carry a request body worth decoding.
const BODY_METHODS: &[Method] = &[Method::POST, Method::PUT, Method::PATCH];

/// Runs the full pipeline over one request.
///
/// The request is consumed: its body can only be read once, and exactly one
/// verdict comes back. `route_params` are the router's matched path
/// parameters, when the caller has them.
///
/// The body is read only when all of these hold: the method may carry one,
/// the route configured a body schema, the method gate passed, and the
/// declared size was not already over the cap. A rejected body is therefore
/// never even buffered, let alone decoded.
pub async fn validate(
    request: Request,
    config: &ValidationConfig,
    route_params: Option<&HashMap<String, String>>,
) -> ValidationResult {
    let mut faults = Vec::new();
    let mut data = ValidatedData::default();

    let method = request.method().clone();

    // Method gate.
    let method_allowed = config.allowed_methods.contains(&method);
    if !method_allowed {
        faults.push(ValidationFault::MethodNotAllowed {
            method: method.clone(),
        });
    }

    // Declared-size gate: a hostile Content-Length is rejected before any
    // body byte is read.
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let size_rejected = matches!(declared, Some(d) if d > config.max_body_size as u64);
    if size_rejected {
        faults.push(ValidationFault::BodyTooLarge {
            limit: config.max_body_size,
            declared,
        });
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let headers_json = config.headers_schema.as_ref().map(|_| {
        let mut out = Map::new();
        for (name, value) in request.headers() {
            // Header names are already lowercase; non-UTF-8 values are not
            // representable and are skipped.
            if let Ok(text) = value.to_str() {
                out.insert(name.as_str().to_string(), Value::String(text.to_string()));
            }
        }
        Value::Object(out)
    });

    let query_string = request.uri().query().unwrap_or("").to_string();

    // Body: decode, scan, sanitize, validate.
    let wants_body =
        config.body_schema.is_some() && BODY_METHODS.contains(&method) && method_allowed;
    if wants_body && !size_rejected {
        match to_bytes(request.into_body(), config.max_body_size).await {
            Ok(bytes) => {
                debug!(bytes = bytes.len(), "request body buffered");
                match ContentKind::from_header(content_type.as_deref())
                    .and_then(|kind| body::parse_body(&kind, &bytes))
                {
                    Ok(parsed) => validate_body(&parsed, config, &mut data, &mut faults),
                    Err(err) => faults.push(ValidationFault::MalformedBody {
                        message: err.to_string(),
                    }),
                }
            }
            Err(err) => {
                // The actual stream overran the cap, or transport failed
                // mid-read. Either way no decoded data escapes.
                if is_length_limit(&err) {
                    faults.push(ValidationFault::BodyTooLarge {
                        limit: config.max_body_size,
                        declared: None,
                    });
                } else {
                    faults.push(ValidationFault::Internal {
                        message: format!("body read failed: {err}"),
                    });
                }
            }
        }
    }

    // Query: parsed, scanned and schema-checked only for routes that
    // declared a query schema; without one the query string is ignored.
    // Never sanitized in place, a query string is an address, not content.
    if config.query_schema.is_some() {
        let query_json = body::pairs_to_json(&body::parse_pairs(&query_string));
        push_findings(scan::scan_json(&query_json, "query"), &mut faults);
        apply_schema(
            config.query_schema.as_deref(),
            &query_json,
            Target::Query,
            &mut faults,
            &mut data.query,
        );
    }

    // Route params, when a params schema is configured and the router
    // matched any.
    if config.params_schema.is_some() {
        if let Some(params) = route_params.filter(|params| !params.is_empty()) {
            let mut out = Map::new();
            for (key, value) in params {
                out.insert(key.clone(), Value::String(value.clone()));
            }
            let params_json = Value::Object(out);
            push_findings(scan::scan_json(&params_json, "params"), &mut faults);
            apply_schema(
                config.params_schema.as_deref(),
                &params_json,
                Target::Params,
                &mut faults,
                &mut data.params,
            );
        }
    }

    // Headers: schema only. Scanning them would drown in false positives
    // (cookies, user agents), and they never reach HTML sinks unescaped.
    if let Some(headers_json) = headers_json {
        apply_schema(
            config.headers_schema.as_deref(),
            &headers_json,
            Target::Headers,
            &mut faults,
            &mut data.headers,
        );
    }

    if faults.is_empty() {
        ValidationResult::valid(data)
    } else {
        warn!(method = %method, fault_count = faults.len(), "request failed validation");
        ValidationResult::invalid(faults)
    }
}

fn validate_body(
    parsed: &BodyValue,
    config: &ValidationConfig,
    data: &mut ValidatedData,
    faults: &mut Vec<ValidationFault>,
) {
    // Scan before sanitization: the verdict reflects what the client sent,
    // not what sanitization left behind.
    push_findings(scan::scan(parsed, "body"), faults);

    let accepted = if config.sanitize_body {
        sanitize::sanitize_body_value(parsed, sanitize::DEFAULT_MAX_DEPTH).to_json()
    } else {
        parsed.to_json()
    };

    apply_schema(
        config.body_schema.as_deref(),
        &accepted,
        Target::Body,
        faults,
        &mut data.body,
    );
}

fn push_findings(findings: Vec<scan::Finding>, faults: &mut Vec<ValidationFault>) {
    faults.extend(findings.into_iter().map(|finding| {
        ValidationFault::SecurityFinding {
            category: finding.category,
            path: finding.path,
        }
    }));
}

fn apply_schema(
    schema: Option<&dyn crate::schema::Schema>,
    value: &Value,
    target: Target,
    faults: &mut Vec<ValidationFault>,
    slot: &mut Option<Value>,
) {
    let Some(schema) = schema else {
        return;
    };
    match schema.parse(value) {
        Ok(accepted) => *slot = Some(accepted),
        Err(issues) => faults.extend(issues.into_iter().map(|issue| {
            ValidationFault::SchemaViolation {
                target,
                path: issue.path,
                message: issue.message,
            }
        })),
    }
}

/// `to_bytes` reports the limit as a wrapped [`LengthLimitError`]; walk the
/// source chain to tell it apart from transport failures.
fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = source {
        if current.downcast_ref::<LengthLimitError>().is_some() {
            return true;
        }
        source = current.source();
    }
    false
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldRules, Rule, SchemaIssue};
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn post_json(body: &str) -> Request {
        HttpRequest::builder()
            .method(Method::POST)
            .uri("/things")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn name_schema() -> FieldRules {
        FieldRules::new()
            .field("name", Rule::Required)
            .field("name", Rule::MinLength(2))
    }

    #[tokio::test]
    async fn test_valid_request_passes_with_data() {
        let config = presets::create(name_schema());
        let result = validate(post_json(r#"{"name":"Ada"}"#), &config, None).await;
        assert!(result.is_valid());
        let data = result.into_data().unwrap();
        assert_eq!(data.body, Some(json!({"name": "Ada"})));
        assert!(data.query.is_none());
    }

    #[tokio::test]
    async fn test_method_gate_rejects_and_skips_body() {
        // A schema that counts invocations proves the body is never decoded.
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let counting = move |value: &Value| -> Result<Value, Vec<SchemaIssue>> {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        };
        let config = ValidationConfig::new()
            .with_body_schema(counting)
            .with_allowed_methods(vec![Method::POST]);

        let request = HttpRequest::builder()
            .method(Method::PUT)
            .uri("/things")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Ada"}"#))
            .unwrap();
        let result = validate(request, &config, None).await;

        assert!(!result.is_valid());
        assert_eq!(result.messages(), vec!["Method PUT not allowed"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_declared_size_rejected_before_reading() {
        let config = presets::create(name_schema()).with_max_body_size(64);
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/things")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, "100000")
            .body(Body::from(r#"{"name":"Ada"}"#))
            .unwrap();
        let result = validate(request, &config, None).await;
        assert_eq!(
            result.messages(),
            vec!["Request body of 100000 bytes exceeds maximum size of 64 bytes"]
        );
    }

    #[tokio::test]
    async fn test_actual_size_rejected_during_read() {
        let config = presets::create(name_schema()).with_max_body_size(16);
        // No Content-Length header, so only the read-time cap can fire.
        let oversized = format!(r#"{{"name":"{}"}}"#, "a".repeat(64));
        let result = validate(post_json(&oversized), &config, None).await;
        assert_eq!(
            result.messages(),
            vec!["Request body exceeds maximum size of 16 bytes"]
        );
    }

    #[tokio::test]
    async fn test_aborted_body_read_is_a_single_internal_fault() {
        // A body that fails mid-stream, the way a dropped connection does.
        struct DropsMidBody {
            sent: bool,
        }

        impl http_body::Body for DropsMidBody {
            type Data = bytes::Bytes;
            type Error = std::io::Error;

            fn poll_frame(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>>
            {
                let this = self.get_mut();
                if this.sent {
                    std::task::Poll::Ready(Some(Err(std::io::Error::other("connection reset"))))
                } else {
                    this.sent = true;
                    std::task::Poll::Ready(Some(Ok(http_body::Frame::data(
                        bytes::Bytes::from_static(b"{\"name\":"),
                    ))))
                }
            }
        }

        let config = presets::create(name_schema());
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/things")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::new(DropsMidBody { sent: false }))
            .unwrap();
        let result = validate(request, &config, None).await;

        assert!(!result.is_valid());
        assert_eq!(result.faults().len(), 1);
        let message = &result.messages()[0];
        assert!(message.starts_with("Validation error:"), "{message}");
        assert!(result.data().is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_single_fault() {
        let config = presets::create(name_schema());
        let result = validate(post_json(r#"{"name": "#), &config, None).await;
        assert!(!result.is_valid());
        assert_eq!(result.faults().len(), 1);
        assert!(result.messages()[0].starts_with("Malformed request body:"));
    }

    #[tokio::test]
    async fn test_injection_fails_schema_valid_body() {
        let config = ValidationConfig::new()
            .with_body_schema(name_schema())
            .with_allowed_methods(vec![Method::POST]);
        let result = validate(
            post_json(r#"{"name":"Robert'); DROP TABLE students;--"}"#),
            &config,
            None,
        )
        .await;
        assert!(!result.is_valid());
        assert_eq!(
            result.messages(),
            vec!["Potential SQL injection detected in body.name"]
        );
    }

    #[tokio::test]
    async fn test_schema_violations_accumulate() {
        let schema = FieldRules::new()
            .field("name", Rule::Required)
            .field("email", Rule::Email);
        let config = presets::create(schema);
        let result = validate(post_json(r#"{"email":"nope"}"#), &config, None).await;
        let messages = result.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "Body validation: name - is required");
        assert_eq!(
            messages[1],
            "Body validation: email - must be a valid email address"
        );
    }

    #[tokio::test]
    async fn test_sanitization_applies_before_schema() {
        // Markup that carries no injection pattern: the scanner passes it,
        // sanitization rewrites it, and the schema sees the rewrite.
        let config = presets::create(name_schema());
        let result = validate(
            post_json(r#"{"name":"<b>Ada</b><article>x</article>"}"#),
            &config,
            None,
        )
        .await;
        assert!(result.is_valid());
        let data = result.into_data().unwrap();
        assert_eq!(data.body, Some(json!({"name": "<b>Ada</b>x"})));
    }

    #[tokio::test]
    async fn test_scan_runs_on_the_raw_body_not_the_sanitized_one() {
        // Sanitization would remove the script tag; the verdict must still
        // report what the client sent.
        let config = presets::create(name_schema());
        let result = validate(
            post_json(r#"{"name":"<script>steal()</script>Ada"}"#),
            &config,
            None,
        )
        .await;
        assert!(!result.is_valid());
        assert_eq!(
            result.messages(),
            vec!["Potential XSS detected in body.name"]
        );
    }

    #[tokio::test]
    async fn test_query_ignored_without_a_schema() {
        // Apostrophes in a tracking param must not fail a route that never
        // declared an interest in its query string.
        let config = presets::create(name_schema());
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/things?ref=O%27Brien")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Ada"}"#))
            .unwrap();
        let result = validate(request, &config, None).await;
        assert!(result.is_valid(), "{:?}", result.messages());
        assert!(result.into_data().unwrap().query.is_none());
    }

    #[tokio::test]
    async fn test_query_scanned_when_schema_configured() {
        let config = presets::read()
            .with_query_schema(FieldRules::new().field("q", Rule::Required));
        let request = HttpRequest::builder()
            .method(Method::GET)
            .uri("/things?q=%27%20OR%201%3D1%20--")
            .body(Body::empty())
            .unwrap();
        let result = validate(request, &config, None).await;
        assert_eq!(
            result.messages(),
            vec!["Potential SQL injection detected in query.q"]
        );
    }

    #[tokio::test]
    async fn test_params_ignored_without_a_schema() {
        // Shell metacharacters in a matched param are fine when the route
        // has no params schema.
        let config = presets::read();
        let params = HashMap::from([("slug".to_string(), "rock&roll".to_string())]);
        let request = HttpRequest::builder()
            .method(Method::GET)
            .uri("/things/rock%26roll")
            .body(Body::empty())
            .unwrap();
        let result = validate(request, &config, Some(&params)).await;
        assert!(result.is_valid(), "{:?}", result.messages());
        assert!(result.into_data().unwrap().params.is_none());
    }

    #[tokio::test]
    async fn test_query_schema_validates() {
        let config = presets::read()
            .with_query_schema(FieldRules::new().field("page", Rule::Required));
        let request = HttpRequest::builder()
            .method(Method::GET)
            .uri("/things")
            .body(Body::empty())
            .unwrap();
        let result = validate(request, &config, None).await;
        assert_eq!(
            result.messages(),
            vec!["Query validation: page - is required"]
        );
    }

    #[tokio::test]
    async fn test_params_scanned_and_validated() {
        let config = presets::read()
            .with_params_schema(FieldRules::new().field("id", Rule::Uuid));
        let params = HashMap::from([("id".to_string(), "../../etc".to_string())]);
        let request = HttpRequest::builder()
            .method(Method::GET)
            .uri("/things/x")
            .body(Body::empty())
            .unwrap();
        let result = validate(request, &config, Some(&params)).await;
        let messages = result.messages();
        assert!(messages.contains(&"Potential path traversal detected in params.id".to_string()));
        assert!(messages.contains(&"Params validation: id - must be a valid UUID".to_string()));
    }

    #[tokio::test]
    async fn test_headers_schema_checked_without_scanning() {
        let config = presets::read().with_headers_schema(
            FieldRules::new().field("x-api-key", Rule::Required),
        );
        let request = HttpRequest::builder()
            .method(Method::GET)
            .uri("/things")
            // A cookie full of shell metacharacters must not trip a finding.
            .header(header::COOKIE, "session=a|b;(c)")
            .body(Body::empty())
            .unwrap();
        let result = validate(request, &config, None).await;
        assert_eq!(
            result.messages(),
            vec!["Headers validation: x-api-key - is required"]
        );
    }

    #[tokio::test]
    async fn test_body_not_read_without_schema() {
        // Malformed body, but no body schema: never decoded, so no fault.
        let config = ValidationConfig::new();
        let result = validate(post_json("{not json"), &config, None).await;
        assert!(result.is_valid());
        assert!(result.into_data().unwrap().body.is_none());
    }

    #[tokio::test]
    async fn test_get_never_reads_body() {
        let config = ValidationConfig::new().with_body_schema(name_schema());
        let request = HttpRequest::builder()
            .method(Method::GET)
            .uri("/things")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let result = validate(request, &config, None).await;
        assert!(result.is_valid());
    }

    #[tokio::test]
    async fn test_multipart_without_boundary_is_malformed() {
        let config = presets::upload(FieldRules::new());
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(header::CONTENT_TYPE, "multipart/form-data")
            .body(Body::from("irrelevant"))
            .unwrap();
        let result = validate(request, &config, None).await;
        assert_eq!(
            result.messages(),
            vec!["Malformed request body: no boundary parameter in Content-Type"]
        );
    }

    #[tokio::test]
    async fn test_faults_accumulate_across_targets() {
        let config = ValidationConfig::new()
            .with_body_schema(name_schema())
            .with_query_schema(FieldRules::new().field("page", Rule::Required))
            .with_allowed_methods(vec![Method::POST]);
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/things")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"A"}"#))
            .unwrap();
        let result = validate(request, &config, None).await;
        let messages = result.messages();
        // Body fault first, then query, in step order.
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("Body validation"));
        assert!(messages[1].starts_with("Query validation"));
    }
}
