//! Request middleware
//!
//! Install with `axum::middleware::from_fn_with_state`; [`super::ServerBuilder`]
//! wires all three.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::core::access::{AccessDecision, AccessMixin};
use crate::core::auth::{Principal, PrincipalProvider};
use crate::core::context::RequestContext;
use crate::core::messages::RequestMessageStorage;

/// Resolve the principal and store it in the request extensions
///
/// Provider failures are logged and the request continues as anonymous.
pub async fn authenticate(
    State(provider): State<Arc<dyn PrincipalProvider>>,
    mut request: Request,
    next: Next,
) -> Response {
    let principal = match provider.extract_principal(request.headers()).await {
        Ok(principal) => principal,
        Err(e) => {
            tracing::warn!(error = %e, "failed to resolve principal");
            Principal::anonymous()
        }
    };
    request.extensions_mut().insert(principal);
    next.run(request).await
}

/// Give every request its own message storage
pub async fn attach_messages(mut request: Request, next: Next) -> Response {
    request
        .extensions_mut()
        .insert(RequestMessageStorage::new());
    next.run(request).await
}

/// Enforce an access policy before the handler runs
pub async fn require_access(
    State(access): State<Arc<AccessMixin>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let ctx = RequestContext::from_parts(&parts);

    match access.check(&ctx) {
        Ok(AccessDecision::Granted) => next.run(Request::from_parts(parts, body)).await,
        Ok(AccessDecision::Redirect(found)) => found.into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::{AccessPolicy, TokenPrincipalProvider};
    use axum::{
        Router,
        body::Body,
        http::{self, StatusCode, header::AUTHORIZATION},
        middleware::{from_fn, from_fn_with_state},
        routing::get,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        let provider: Arc<dyn PrincipalProvider> = Arc::new(
            TokenPrincipalProvider::new().with_token("secret", Principal::user("alice")),
        );
        let access = Arc::new(
            AccessMixin::builder("Protected", AccessPolicy::LoginRequired)
                .build()
                .unwrap(),
        );

        Router::new()
            .route(
                "/protected/",
                get(|ctx: RequestContext| async move { ctx.principal.username }),
            )
            .route_layer(from_fn_with_state(access, require_access))
            .layer(from_fn(attach_messages))
            .layer(from_fn_with_state(provider, authenticate))
    }

    #[tokio::test]
    async fn test_principal_reaches_handler() {
        let request = http::Request::builder()
            .uri("/protected/")
            .header(AUTHORIZATION, "Bearer secret")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"alice");
    }

    #[tokio::test]
    async fn test_anonymous_request_is_redirected() {
        let request = http::Request::builder()
            .uri("/protected/")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[http::header::LOCATION],
            "/accounts/login/?next=/protected/"
        );
    }
}
