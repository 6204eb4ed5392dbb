//! Handler-level integration: validated data as an extractor argument.
//!
//! A route declares its rules once by implementing [`GuardedRoute`], then
//! takes `Vetted<Self>` in its handler. Extraction runs the whole pipeline;
//! a handler body therefore only ever executes against data that passed it.

use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use crate::fault::ValidatedData;

use super::config::ValidationConfig;

/// A route that knows how to validate its own requests.
///
/// The config is fetched per request; implementations normally build it once
/// into a `static`/`OnceLock` and clone the `Arc`.
pub trait GuardedRoute {
    fn validation_config() -> Arc<ValidationConfig>;
}

/// Validated request data, by construction.
///
/// `T` only selects the config; it never appears in the data. Dereferences
/// to [`ValidatedData`].
pub struct Vetted<T: GuardedRoute> {
    data: ValidatedData,
    _route: PhantomData<fn() -> T>,
}

impl<T: GuardedRoute> Vetted<T> {
    pub fn into_data(self) -> ValidatedData {
        self.data
    }

    /// The schema-accepted body, when the route configured a body schema.
    pub fn body(&self) -> Option<&Value> {
        self.data.body.as_ref()
    }
}

impl<T: GuardedRoute> Deref for Vetted<T> {
    type Target = ValidatedData;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<S, T> FromRequest<S> for Vetted<T>
where
    S: Send + Sync,
    T: GuardedRoute,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let config = T::validation_config();

        // Pull the router's matched path parameters off before handing the
        // request to the pipeline; extraction fails harmlessly on routes
        // without any.
        let (mut parts, body) = request.into_parts();
        let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
            .ok()
            .map(|Path(params)| params);
        let request = Request::from_parts(parts, body);

        let result = super::validate(request, &config, params.as_ref()).await;

        if result.is_valid() {
            Ok(Vetted {
                data: result.into_data().unwrap_or_default(),
                _route: PhantomData,
            })
        } else {
            Err(result.into_response())
        }
    }
}
