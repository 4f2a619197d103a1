//! Access control for views
//!
//! [`AccessMixin`] pairs an [`AccessPolicy`] with what to do on failure:
//! redirect to a login page (the default) or signal
//! [`AccessError::PermissionDenied`].

use axum::http::{HeaderValue, StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};

use super::auth::AccessPolicy;
use super::context::RequestContext;
use super::error::{AccessError, ConfigError, ViewError};

/// Default login page
pub const DEFAULT_LOGIN_URL: &str = "/accounts/login/";

/// Default query parameter carrying the page to return to
pub const DEFAULT_REDIRECT_FIELD_NAME: &str = "next";

/// A `302 Found` redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found(pub String);

impl Found {
    pub fn location(&self) -> &str {
        &self.0
    }
}

impl IntoResponse for Found {
    fn into_response(self) -> Response {
        match HeaderValue::try_from(self.0) {
            Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
            Err(_) => ViewError::Internal("redirect target is not a valid header value".into())
                .into_response(),
        }
    }
}

/// Outcome of an access check that did not signal an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Redirect(Found),
}

/// An access policy plus its failure handling
#[derive(Debug, Clone)]
pub struct AccessMixin {
    view: String,
    policy: AccessPolicy,
    login_url: String,
    redirect_field_name: String,
    raise_exception: bool,
}

impl AccessMixin {
    /// Start declaring access control for `view`
    pub fn builder(view: impl Into<String>, policy: AccessPolicy) -> AccessMixinBuilder {
        AccessMixinBuilder {
            view: view.into(),
            policy,
            login_url: Some(DEFAULT_LOGIN_URL.to_string()),
            redirect_field_name: Some(DEFAULT_REDIRECT_FIELD_NAME.to_string()),
            raise_exception: false,
        }
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn redirect_field_name(&self) -> &str {
        &self.redirect_field_name
    }

    pub fn raise_exception(&self) -> bool {
        self.raise_exception
    }

    /// Decide whether the request may proceed
    pub fn check(&self, ctx: &RequestContext) -> Result<AccessDecision, ViewError> {
        if self.policy.check(&ctx.principal) {
            tracing::debug!(
                view = %self.view,
                policy = self.policy.name(),
                user = %ctx.principal.username,
                "access granted"
            );
            return Ok(AccessDecision::Granted);
        }
        self.handle_no_permission(ctx)
    }

    /// Redirect to the login page, or signal denial when configured to raise
    pub fn handle_no_permission(&self, ctx: &RequestContext) -> Result<AccessDecision, ViewError> {
        tracing::debug!(
            view = %self.view,
            policy = self.policy.name(),
            path = %ctx.path,
            raise = self.raise_exception,
            "access denied"
        );
        if self.raise_exception {
            return Err(AccessError::PermissionDenied {
                path: ctx.path.clone(),
                reason: format!("{} check failed", self.policy.name()),
            }
            .into());
        }
        Ok(AccessDecision::Redirect(self.login_redirect(&ctx.full_path())))
    }

    /// Redirect to the login page carrying `next` as the return target
    pub fn login_redirect(&self, next: &str) -> Found {
        let encoded = urlencoding::encode(next).replace("%2F", "/");
        let separator = if self.login_url.contains('?') { '&' } else { '?' };
        Found(format!(
            "{}{}{}={}",
            self.login_url, separator, self.redirect_field_name, encoded
        ))
    }
}

/// Builder for [`AccessMixin`]; [`AccessMixinBuilder::build`] validates
pub struct AccessMixinBuilder {
    view: String,
    policy: AccessPolicy,
    login_url: Option<String>,
    redirect_field_name: Option<String>,
    raise_exception: bool,
}

impl AccessMixinBuilder {
    pub fn login_url(mut self, url: Option<&str>) -> Self {
        self.login_url = url.map(String::from);
        self
    }

    pub fn redirect_field_name(mut self, name: Option<&str>) -> Self {
        self.redirect_field_name = name.map(String::from);
        self
    }

    pub fn raise_exception(mut self, raise: bool) -> Self {
        self.raise_exception = raise;
        self
    }

    pub fn build(self) -> Result<AccessMixin, ConfigError> {
        let login_url = match self.login_url {
            Some(url) if !url.is_empty() => url,
            _ => {
                return Err(ConfigError::missing(
                    &self.view,
                    "login_url",
                    format!("Define {}.login_url", self.view),
                ));
            }
        };
        let redirect_field_name = match self.redirect_field_name {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(ConfigError::missing(
                    &self.view,
                    "redirect_field_name",
                    format!("Define {}.redirect_field_name", self.view),
                ));
            }
        };
        Ok(AccessMixin {
            view: self.view,
            policy: self.policy,
            login_url,
            redirect_field_name,
            raise_exception: self.raise_exception,
        })
    }
}
