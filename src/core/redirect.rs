//! Post-action redirect targets

use regex::Regex;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::sync::LazyLock;

use super::access::Found;
use super::context::RequestContext;
use super::error::{ConfigError, ViewError};
use crate::urls::UrlRegistry;

/// Default parameter carrying the redirect target
pub const DEFAULT_SUCCESS_URL_PARAM: &str = "next";

static URL_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("static regex"));

/// Redirects to a URL supplied by the request, falling back to a default
#[derive(Debug, Clone)]
pub struct NextMixin {
    view: String,
    success_url: Option<String>,
    default_success_url: String,
    success_url_param: String,
    success_url_context: String,
    allow_external_redirect: bool,
}

impl NextMixin {
    pub fn builder(view: impl Into<String>) -> NextMixinBuilder {
        NextMixinBuilder {
            view: view.into(),
            success_url: None,
            default_success_url: None,
            success_url_param: DEFAULT_SUCCESS_URL_PARAM.to_string(),
            success_url_context: DEFAULT_SUCCESS_URL_PARAM.to_string(),
            allow_external_redirect: false,
        }
    }

    pub fn default_success_url(&self) -> &str {
        &self.default_success_url
    }

    /// Where to go after the action
    ///
    /// A declared `success_url` always wins. Otherwise a non-empty, valid
    /// request parameter wins over the fallback.
    pub fn get_success_url(&self, ctx: &RequestContext) -> String {
        if let Some(url) = &self.success_url {
            return url.clone();
        }
        match ctx.param(&self.success_url_param) {
            Some(next) if !next.is_empty() && self.is_valid_redirect(next) => next.to_string(),
            Some(next) if !next.is_empty() => {
                tracing::warn!(view = %self.view, redirect_to = next, "rejected redirect target");
                self.default_success_url.clone()
            }
            _ => self.default_success_url.clone(),
        }
    }

    /// Whether `url` may be redirected to
    ///
    /// Unless external redirects are allowed, only URLs without a scheme or
    /// host are accepted. The URL is first normalised the way browsers read
    /// it: tabs and line breaks are dropped and `\\` counts as `/`.
    pub fn is_valid_redirect(&self, url: &str) -> bool {
        if self.allow_external_redirect {
            return true;
        }
        let url: String = url
            .trim()
            .chars()
            .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
            .map(|c| if c == '\\' { '/' } else { c })
            .collect();
        if url.chars().next().is_some_and(char::is_control) {
            return false;
        }
        !(url.starts_with("//") || URL_SCHEME.is_match(&url))
    }

    pub fn redirect(&self, ctx: &RequestContext) -> Found {
        Found(self.get_success_url(ctx))
    }

    /// Expose the computed URL to templates
    pub fn context_data(&self, ctx: &RequestContext, context: &mut Map<String, Value>) {
        context.insert(
            self.success_url_context.clone(),
            Value::String(self.get_success_url(ctx)),
        );
    }
}

/// Builder for [`NextMixin`]; [`NextMixinBuilder::build`] validates
pub struct NextMixinBuilder {
    view: String,
    success_url: Option<String>,
    default_success_url: Option<String>,
    success_url_param: String,
    success_url_context: String,
    allow_external_redirect: bool,
}

impl NextMixinBuilder {
    pub fn success_url(mut self, url: Option<&str>) -> Self {
        self.success_url = url.filter(|u| !u.is_empty()).map(String::from);
        self
    }

    pub fn default_success_url(mut self, url: Option<&str>) -> Self {
        self.default_success_url = url.map(String::from);
        self
    }

    pub fn success_url_param(mut self, param: impl Into<String>) -> Self {
        self.success_url_param = param.into();
        self
    }

    pub fn success_url_context(mut self, name: impl Into<String>) -> Self {
        self.success_url_context = name.into();
        self
    }

    pub fn allow_external_redirect(mut self, allow: bool) -> Self {
        self.allow_external_redirect = allow;
        self
    }

    pub fn build(self) -> Result<NextMixin, ConfigError> {
        let default_success_url = match self.default_success_url {
            Some(url) if !url.is_empty() => url,
            _ => {
                return Err(ConfigError::missing(
                    &self.view,
                    "default_success_url",
                    format!(
                        "Define {}.default_success_url or override {}.get_default_success_url()",
                        self.view, self.view
                    ),
                ));
            }
        };
        if self.success_url_param.is_empty() {
            return Err(ConfigError::invalid(&self.view, "success_url_param", "must not be empty"));
        }
        if self.success_url_context.is_empty() {
            return Err(ConfigError::invalid(&self.view, "success_url_context", "must not be empty"));
        }
        Ok(NextMixin {
            view: self.view,
            success_url: self.success_url,
            default_success_url,
            success_url_param: self.success_url_param,
            success_url_context: self.success_url_context,
            allow_external_redirect: self.allow_external_redirect,
        })
    }
}

/// Redirects to a named list page after success
#[derive(Debug, Clone)]
pub struct SuccessUrlRedirectList {
    view: String,
    success_list_url: String,
}

impl SuccessUrlRedirectList {
    pub fn new(view: impl Into<String>, success_list_url: Option<&str>) -> Result<Self, ConfigError> {
        let view = view.into();
        match success_list_url {
            Some(name) if !name.is_empty() => Ok(Self {
                view,
                success_list_url: name.to_string(),
            }),
            _ => Err(ConfigError::missing(
                &view,
                "success_list_url",
                format!(
                    "Define {}.success_list_url or override {}.get_success_url()",
                    view, view
                ),
            )),
        }
    }

    pub fn get_success_url(&self, urls: &UrlRegistry) -> Result<String, ConfigError> {
        urls.reverse(&self.success_list_url, &[])
            .map_err(|_| ConfigError::NoReverseMatch {
                view: self.view.clone(),
                attribute: "success_list_url".into(),
                name: self.success_list_url.clone(),
            })
    }
}

/// Redirects a freshly created object to its edit page
///
/// Deprecated: compose [`SuccessUrlRedirectList`] or a plain reverse in the
/// handler instead. Every redirect logs a deprecation warning.
#[derive(Debug, Clone)]
pub struct CreateAndRedirectToEdit {
    view: String,
    success_url_name: String,
}

impl CreateAndRedirectToEdit {
    pub fn new(view: impl Into<String>, success_url_name: Option<&str>) -> Result<Self, ConfigError> {
        let view = view.into();
        match success_url_name {
            Some(name) if !name.is_empty() => Ok(Self {
                view,
                success_url_name: name.to_string(),
            }),
            _ => Err(ConfigError::missing(
                &view,
                "success_url_name",
                "No URL to reverse. Provide a success_url_name.",
            )),
        }
    }

    /// Edit-page URL for the object with primary key `pk`
    pub fn get_success_url(&self, urls: &UrlRegistry, pk: &dyn Display) -> Result<String, ConfigError> {
        urls.reverse(&self.success_url_name, &[("pk", pk.to_string())])
            .map_err(|_| ConfigError::NoReverseMatch {
                view: self.view.clone(),
                attribute: "success_url_name".into(),
                name: self.success_url_name.clone(),
            })
    }

    pub fn redirect(&self, urls: &UrlRegistry, pk: &dyn Display) -> Result<Found, ViewError> {
        tracing::warn!(
            view = %self.view,
            "CreateAndRedirectToEdit is deprecated and will be removed in a future release"
        );
        Ok(Found(self.get_success_url(urls, pk)?))
    }
}
