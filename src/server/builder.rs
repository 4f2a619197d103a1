//! ServerBuilder for assembling view routes with their middleware

use super::middleware::{attach_messages, authenticate, require_access};
use crate::core::access::AccessMixin;
use crate::core::auth::{AnonymousProvider, PrincipalProvider};
use anyhow::Result;
use axum::{Router, middleware, routing::MethodRouter};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;

/// Builder for creating HTTP servers from view routes
///
/// Every route gets a principal and its own message storage. Routes added
/// with [`ServerBuilder::protected_route`] also run their access check
/// before the handler.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_principal_provider(TokenPrincipalProvider::new().with_token("t", alice))
///     .route("/articles/", get(list_articles))
///     .protected_route("/articles/new/", post(create_article), access)
///     .build();
/// ```
pub struct ServerBuilder {
    provider: Arc<dyn PrincipalProvider>,
    routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder treating every request as anonymous
    pub fn new() -> Self {
        Self {
            provider: Arc::new(AnonymousProvider),
            routes: Vec::new(),
        }
    }

    /// Set how principals are resolved from request headers
    pub fn with_principal_provider(mut self, provider: impl PrincipalProvider + 'static) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    /// Add an unrestricted route
    pub fn route(mut self, path: &str, handler: MethodRouter) -> Self {
        self.routes.push(Router::new().route(path, handler));
        self
    }

    /// Add a route guarded by `access`
    pub fn protected_route(mut self, path: &str, handler: MethodRouter, access: AccessMixin) -> Self {
        tracing::debug!(path, view = access.view(), policy = access.policy().name(), "protecting route");
        let router = Router::new()
            .route(path, handler)
            .route_layer(middleware::from_fn_with_state(Arc::new(access), require_access));
        self.routes.push(router);
        self
    }

    /// Add routes assembled elsewhere
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.routes.push(routes);
        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        let app = self
            .routes
            .into_iter()
            .fold(Router::new(), |app, routes| app.merge(routes));

        app.layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(self.provider, authenticate))
                .layer(middleware::from_fn(attach_messages)),
        )
    }

    /// Serve the application until Ctrl+C
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
