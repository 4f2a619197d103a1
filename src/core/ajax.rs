//! Separate handlers for XMLHttpRequest traffic
//!
//! Implement [`AjaxResponse`] and override `get_ajax`/`post_ajax`/... to
//! answer ajax requests differently from regular page loads.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::context::RequestContext;
use super::error::ViewError;

/// Header value browsers' ajax helpers send in `X-Requested-With`
pub const XML_HTTP_REQUEST: &str = "XMLHttpRequest";

/// Response returned for methods a view does not handle
pub fn method_not_allowed() -> Response {
    StatusCode::METHOD_NOT_ALLOWED.into_response()
}

/// A view that can answer ajax and regular requests differently
///
/// Every handler defaults to `405 Method Not Allowed`; the ajax variants
/// default to their regular counterpart.
#[async_trait]
pub trait AjaxResponse: Send + Sync {
    async fn get(&self, _ctx: &RequestContext) -> Result<Response, ViewError> {
        Ok(method_not_allowed())
    }

    async fn post(&self, _ctx: &RequestContext) -> Result<Response, ViewError> {
        Ok(method_not_allowed())
    }

    async fn put(&self, _ctx: &RequestContext) -> Result<Response, ViewError> {
        Ok(method_not_allowed())
    }

    async fn delete(&self, _ctx: &RequestContext) -> Result<Response, ViewError> {
        Ok(method_not_allowed())
    }

    async fn get_ajax(&self, ctx: &RequestContext) -> Result<Response, ViewError> {
        self.get(ctx).await
    }

    async fn post_ajax(&self, ctx: &RequestContext) -> Result<Response, ViewError> {
        self.post(ctx).await
    }

    async fn put_ajax(&self, ctx: &RequestContext) -> Result<Response, ViewError> {
        self.put(ctx).await
    }

    async fn delete_ajax(&self, ctx: &RequestContext) -> Result<Response, ViewError> {
        self.delete(ctx).await
    }

    /// Route the request to the handler for its method and ajax flag
    async fn dispatch(&self, ctx: &RequestContext) -> Result<Response, ViewError> {
        match (ctx.method.as_str(), ctx.is_ajax) {
            ("GET", true) => self.get_ajax(ctx).await,
            ("POST", true) => self.post_ajax(ctx).await,
            ("PUT", true) => self.put_ajax(ctx).await,
            ("DELETE", true) => self.delete_ajax(ctx).await,
            ("GET", false) => self.get(ctx).await,
            ("POST", false) => self.post(ctx).await,
            ("PUT", false) => self.put(ctx).await,
            ("DELETE", false) => self.delete(ctx).await,
            _ => Ok(method_not_allowed()),
        }
    }
}
