//! Explicit per-request context
//!
//! Every behaviour in this crate receives the request it acts on as a
//! [`RequestContext`] argument instead of reading ambient state. Handlers get
//! one through the axum extractor in [`crate::server::extract`], tests build
//! one directly.

use axum::http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::auth::Principal;
use super::error::ConfigError;
use super::messages::RequestMessageStorage;

/// Request data the view behaviours need
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub form: HashMap<String, String>,
    pub principal: Principal,
    /// Whether the client flagged the request with `X-Requested-With: XMLHttpRequest`
    pub is_ajax: bool,
    /// Path and query exactly as they appeared in the request line
    raw_target: Option<String>,
    messages: RequestMessageStorage,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            form: HashMap::new(),
            principal: Principal::anonymous(),
            is_ajax: false,
            raw_target: None,
            messages: RequestMessageStorage::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(key.into(), value.into());
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = principal;
        self
    }

    pub fn with_ajax(mut self, is_ajax: bool) -> Self {
        self.is_ajax = is_ajax;
        self
    }

    /// Keep the request target as received, for [`Self::full_path`]
    pub fn with_raw_target(mut self, target: impl Into<String>) -> Self {
        self.raw_target = Some(target.into());
        self
    }

    pub fn with_message_storage(mut self, storage: RequestMessageStorage) -> Self {
        self.messages = storage;
        self
    }

    /// Look a parameter up in the form data, then in the query string
    pub fn param(&self, name: &str) -> Option<&str> {
        self.form
            .get(name)
            .or_else(|| self.query.get(name))
            .map(String::as_str)
    }

    /// Path plus query string, as the client requested it
    ///
    /// Contexts built without a raw target rebuild the query from
    /// [`Self::query`], sorted by key.
    pub fn full_path(&self) -> String {
        if let Some(target) = &self.raw_target {
            return target.clone();
        }
        if self.query.is_empty() {
            return self.path.clone();
        }
        let mut pairs: Vec<_> = self.query.iter().collect();
        pairs.sort();
        let qs = pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, qs)
    }

    /// Flash-message storage bound to this request
    pub fn message_storage(&self) -> &RequestMessageStorage {
        &self.messages
    }
}

/// Adds a fixed headline to the template context
#[derive(Debug, Clone)]
pub struct SetHeadline {
    headline: String,
}

impl SetHeadline {
    pub fn new(view: &str, headline: Option<&str>) -> Result<Self, ConfigError> {
        match headline {
            Some(h) if !h.is_empty() => Ok(Self {
                headline: h.to_string(),
            }),
            _ => Err(ConfigError::missing(
                view,
                "headline",
                format!("Define {}.headline", view),
            )),
        }
    }

    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn context_data(&self, context: &mut Map<String, Value>) {
        context.insert("headline".into(), Value::String(self.headline.clone()));
    }
}

/// Put the requesting principal into form keyword arguments under `user`
pub fn user_form_kwargs(ctx: &RequestContext, mut kwargs: Map<String, Value>) -> Map<String, Value> {
    let user = serde_json::to_value(&ctx.principal).unwrap_or(Value::Null);
    kwargs.insert("user".into(), user);
    kwargs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_prefers_form_over_query() {
        let ctx = RequestContext::post("/x/")
            .with_query("next", "/from-query/")
            .with_form("next", "/from-form/");
        assert_eq!(ctx.param("next"), Some("/from-form/"));

        let ctx = RequestContext::get("/x/").with_query("next", "/q/");
        assert_eq!(ctx.param("next"), Some("/q/"));
        assert_eq!(ctx.param("missing"), None);
    }

    #[test]
    fn test_full_path() {
        assert_eq!(RequestContext::get("/a/").full_path(), "/a/");
        let ctx = RequestContext::get("/a/").with_query("sort", "-age");
        assert_eq!(ctx.full_path(), "/a/?sort=-age");
    }

    #[test]
    fn test_full_path_prefers_raw_target() {
        let ctx = RequestContext::get("/a/")
            .with_query("b", "1")
            .with_query("a", "2")
            .with_raw_target("/a/?b=1&a=2&tag=x&tag=y");
        assert_eq!(ctx.full_path(), "/a/?b=1&a=2&tag=x&tag=y");
    }

    #[test]
    fn test_headline_required() {
        assert!(SetHeadline::new("HeadlineView", None).is_err());
        assert!(SetHeadline::new("HeadlineView", Some("")).is_err());

        let headline = SetHeadline::new("HeadlineView", Some("Test headline")).unwrap();
        let mut context = Map::new();
        headline.context_data(&mut context);
        assert_eq!(context["headline"], "Test headline");
    }

    #[test]
    fn test_user_form_kwargs() {
        let ctx = RequestContext::get("/form/").with_principal(Principal::user("alice"));
        let mut kwargs = Map::new();
        kwargs.insert("initial".into(), Value::Null);

        let kwargs = user_form_kwargs(&ctx, kwargs);
        assert_eq!(kwargs["user"]["username"], "alice");
        assert!(kwargs.contains_key("initial"));
    }
}
