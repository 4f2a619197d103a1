//! Axum extractor for [`RequestContext`]
//!
//! The principal and the message storage come from request extensions
//! inserted by the middleware in [`super::middleware`]; both fall back to
//! their defaults when the middleware is not installed.

use axum::{
    Form, Json,
    extract::{FromRequest, Query, Request},
    http::{HeaderMap, Method, StatusCode, header::CONTENT_TYPE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;

use crate::core::ajax::XML_HTTP_REQUEST;
use crate::core::auth::Principal;
use crate::core::context::RequestContext;
use crate::core::messages::RequestMessageStorage;

/// Header ajax helpers set on XMLHttpRequest traffic
pub const X_REQUESTED_WITH: &str = "x-requested-with";

fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get(X_REQUESTED_WITH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == XML_HTTP_REQUEST)
}

fn has_form_body(parts: &Parts) -> bool {
    if parts.method == Method::GET || parts.method == Method::HEAD {
        return false;
    }
    parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"))
}

impl RequestContext {
    /// Build a context from request head data (no body)
    ///
    /// A query string that does not parse as flat key/value pairs is ignored.
    pub fn from_parts(parts: &Parts) -> Self {
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .unwrap_or_default();

        let mut ctx = RequestContext::new(parts.method.clone(), parts.uri.path())
            .with_principal(principal)
            .with_ajax(is_ajax(&parts.headers));

        if let Some(target) = parts.uri.path_and_query() {
            ctx = ctx.with_raw_target(target.as_str());
        }

        ctx.query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(query)| query)
            .unwrap_or_default();

        if let Some(storage) = parts.extensions.get::<RequestMessageStorage>() {
            ctx = ctx.with_message_storage(storage.clone());
        }
        ctx
    }
}

/// Reads urlencoded form bodies into [`RequestContext::form`]
///
/// # Usage
///
/// ```rust,ignore
/// async fn create_article(ctx: RequestContext) -> Result<Response, ViewError> {
///     let next = next_mixin.get_success_url(&ctx);
///     ...
/// }
/// ```
impl<S> FromRequest<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let mut ctx = RequestContext::from_parts(&parts);

        if has_form_body(&parts) {
            let req = Request::from_parts(parts, body);
            let Form(form) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({
                            "error": "Invalid form body",
                            "details": e.to_string()
                        })),
                    )
                        .into_response()
                })?;
            ctx.form = form;
        }

        Ok(ctx)
    }
}
