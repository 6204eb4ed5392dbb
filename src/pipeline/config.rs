//! Per-route validation configuration.

use axum::http::Method;
use std::fmt;
use std::sync::Arc;

use crate::schema::Schema;

/// Default body cap: 1 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// What one route validates. Build once per route, share via `Arc`; nothing
/// here mutates after construction.
///
/// Targets without a schema are not structure-checked, and the body is only
/// read at all when `body_schema` is set. The injection scan is not
/// configurable per route.
#[derive(Clone)]
pub struct ValidationConfig {
    pub body_schema: Option<Arc<dyn Schema>>,
    pub query_schema: Option<Arc<dyn Schema>>,
    pub params_schema: Option<Arc<dyn Schema>>,
    pub headers_schema: Option<Arc<dyn Schema>>,
    /// Rewrite body strings for an HTML sink before schema validation.
    pub sanitize_body: bool,
    /// Cap on declared and actual body size, in bytes.
    pub max_body_size: usize,
    pub allowed_methods: Vec<Method>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            body_schema: None,
            query_schema: None,
            params_schema: None,
            headers_schema: None,
            sanitize_body: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ],
        }
    }
}

impl ValidationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.body_schema = Some(Arc::new(schema));
        self
    }

    pub fn with_query_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.query_schema = Some(Arc::new(schema));
        self
    }

    pub fn with_params_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.params_schema = Some(Arc::new(schema));
        self
    }

    pub fn with_headers_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.headers_schema = Some(Arc::new(schema));
        self
    }

    pub fn with_sanitization(mut self) -> Self {
        self.sanitize_body = true;
        self
    }

    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn with_allowed_methods(mut self, methods: Vec<Method>) -> Self {
        self.allowed_methods = methods;
        self
    }
}

impl fmt::Debug for ValidationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Schemas are opaque; show which targets have one.
        f.debug_struct("ValidationConfig")
            .field("body_schema", &self.body_schema.is_some())
            .field("query_schema", &self.query_schema.is_some())
            .field("params_schema", &self.params_schema.is_some())
            .field("headers_schema", &self.headers_schema.is_some())
            .field("sanitize_body", &self.sanitize_body)
            .field("max_body_size", &self.max_body_size)
            .field("allowed_methods", &self.allowed_methods)
            .finish()
    }
}
