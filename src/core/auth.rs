//! Principals, permission requirements and access policies
//!
//! A [`Principal`] is whoever is making the request. An [`AccessPolicy`]
//! decides whether that principal may use a view; the permission-based
//! policies delegate to a [`PermissionRequirement`].

use anyhow::Result;
use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use uuid::Uuid;

use super::error::ConfigError;

static PERMISSION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.:\-]+$").expect("static regex"));

/// The user (or anonymous visitor) behind a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Option<Uuid>,
    pub username: String,
    pub is_authenticated: bool,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[serde(default)]
    pub permissions: HashSet<String>,
}

impl Principal {
    /// An unauthenticated visitor with no permissions
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated, active user with no permissions
    pub fn user(username: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            username: username.into(),
            is_authenticated: true,
            is_active: true,
            ..Default::default()
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    /// Whether the principal holds a permission
    ///
    /// Inactive principals hold nothing; active superusers hold everything.
    pub fn has_perm(&self, permission: &str) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_superuser || self.permissions.contains(permission)
    }
}

/// Permissions a principal must hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionRequirement {
    /// Exactly one permission
    Single(String),

    /// Every entry of `all` and at least one entry of `any`
    ///
    /// An empty list means that side imposes no condition; construction
    /// guarantees at least one side is non-empty.
    Structured { all: Vec<String>, any: Vec<String> },
}

impl PermissionRequirement {
    /// Require a single permission
    pub fn single(view: &str, permission: &str) -> Result<Self, ConfigError> {
        validate_name(view, "permission_required", permission)?;
        Ok(PermissionRequirement::Single(permission.to_string()))
    }

    /// Require `all` of one list and `any` of another
    pub fn structured<A, B>(view: &str, all: A, any: B) -> Result<Self, ConfigError>
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        let all: Vec<String> = all.into_iter().map(Into::into).collect();
        let any: Vec<String> = any.into_iter().map(Into::into).collect();
        if all.is_empty() && any.is_empty() {
            return Err(ConfigError::invalid(
                view,
                "permissions",
                "at least one of 'all' or 'any' must list a permission",
            ));
        }
        for p in all.iter().chain(any.iter()) {
            validate_name(view, "permissions", p)?;
        }
        Ok(PermissionRequirement::Structured { all, any })
    }

    /// Parse a declared requirement
    ///
    /// Accepts a non-empty string, or an object with an `all` and/or `any`
    /// key whose values are non-empty arrays of permission names.
    pub fn from_value(view: &str, attribute: &str, value: &Value) -> Result<Self, ConfigError> {
        match value {
            Value::Null => Err(ConfigError::missing(
                view,
                attribute,
                format!("Define {}.{}", view, attribute),
            )),
            Value::String(p) => {
                validate_name(view, attribute, p)?;
                Ok(PermissionRequirement::Single(p.clone()))
            }
            Value::Object(map) => {
                if let Some(key) = map.keys().find(|k| *k != "all" && *k != "any") {
                    return Err(ConfigError::invalid(
                        view,
                        attribute,
                        format!("unexpected key '{}', expected 'all' or 'any'", key),
                    ));
                }
                if map.is_empty() {
                    return Err(ConfigError::invalid(
                        view,
                        attribute,
                        "at least one of 'all' or 'any' must be present",
                    ));
                }
                let all = match map.get("all") {
                    Some(v) => permission_list(view, attribute, "all", v)?,
                    None => Vec::new(),
                };
                let any = match map.get("any") {
                    Some(v) => permission_list(view, attribute, "any", v)?,
                    None => Vec::new(),
                };
                Ok(PermissionRequirement::Structured { all, any })
            }
            other => Err(ConfigError::invalid(
                view,
                attribute,
                format!(
                    "expected a permission name or an object with 'all'/'any', got {}",
                    type_name(other)
                ),
            )),
        }
    }

    /// Whether a principal satisfies this requirement
    pub fn is_satisfied_by(&self, principal: &Principal) -> bool {
        match self {
            PermissionRequirement::Single(p) => principal.has_perm(p),
            PermissionRequirement::Structured { all, any } => {
                let all_ok = all.iter().all(|p| principal.has_perm(p));
                let any_ok = any.is_empty() || any.iter().any(|p| principal.has_perm(p));
                all_ok && any_ok
            }
        }
    }
}

fn permission_list(
    view: &str,
    attribute: &str,
    key: &str,
    value: &Value,
) -> Result<Vec<String>, ConfigError> {
    let field = format!("{}.{}", attribute, key);
    let Value::Array(items) = value else {
        return Err(ConfigError::invalid(
            view,
            &field,
            format!("must be a list of permission names, got {}", type_name(value)),
        ));
    };
    if items.is_empty() {
        return Err(ConfigError::invalid(view, &field, "must not be empty"));
    }
    items
        .iter()
        .map(|item| match item {
            Value::String(p) => {
                validate_name(view, &field, p)?;
                Ok(p.clone())
            }
            other => Err(ConfigError::invalid(
                view,
                &field,
                format!("permission names must be strings, got {}", type_name(other)),
            )),
        })
        .collect()
}

fn validate_name(view: &str, attribute: &str, permission: &str) -> Result<(), ConfigError> {
    if permission.is_empty() {
        return Err(ConfigError::invalid(view, attribute, "permission name is empty"));
    }
    if !PERMISSION_NAME.is_match(permission) {
        return Err(ConfigError::invalid(
            view,
            attribute,
            format!("'{}' is not a valid permission name", permission),
        ));
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Who may use a view
#[derive(Debug, Clone)]
pub enum AccessPolicy {
    /// Any authenticated principal
    LoginRequired,

    /// Authenticated principal holding the given permissions
    PermissionRequired(PermissionRequirement),

    /// Authenticated superuser
    SuperuserRequired,

    /// Authenticated staff member
    StaffuserRequired,

    /// Authenticated principal accepted by a custom predicate
    CheckUser(fn(&Principal) -> bool),
}

impl AccessPolicy {
    /// Check if a principal satisfies this policy
    pub fn check(&self, principal: &Principal) -> bool {
        if !principal.is_authenticated {
            return false;
        }
        match self {
            AccessPolicy::LoginRequired => true,
            AccessPolicy::PermissionRequired(req) => req.is_satisfied_by(principal),
            AccessPolicy::SuperuserRequired => principal.is_superuser,
            AccessPolicy::StaffuserRequired => principal.is_staff,
            AccessPolicy::CheckUser(f) => f(principal),
        }
    }

    /// Short name used in logs and configuration
    pub fn name(&self) -> &'static str {
        match self {
            AccessPolicy::LoginRequired => "login_required",
            AccessPolicy::PermissionRequired(_) => "permission_required",
            AccessPolicy::SuperuserRequired => "superuser_required",
            AccessPolicy::StaffuserRequired => "staffuser_required",
            AccessPolicy::CheckUser(_) => "check_user",
        }
    }
}

/// Resolves the principal behind a request
#[async_trait]
pub trait PrincipalProvider: Send + Sync {
    async fn extract_principal(&self, headers: &HeaderMap) -> Result<Principal>;
}

/// Treats every request as anonymous (for development)
pub struct AnonymousProvider;

#[async_trait]
impl PrincipalProvider for AnonymousProvider {
    async fn extract_principal(&self, _headers: &HeaderMap) -> Result<Principal> {
        Ok(Principal::anonymous())
    }
}

/// Looks up `Authorization: Bearer <token>` in a fixed table
///
/// Unknown or missing tokens resolve to the anonymous principal.
#[derive(Default)]
pub struct TokenPrincipalProvider {
    tokens: HashMap<String, Principal>,
}

impl TokenPrincipalProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }
}

#[async_trait]
impl PrincipalProvider for TokenPrincipalProvider {
    async fn extract_principal(&self, headers: &HeaderMap) -> Result<Principal> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(Principal::anonymous());
        };
        let value = value.to_str()?;
        let principal = value
            .strip_prefix("Bearer ")
            .and_then(|token| self.tokens.get(token.trim()))
            .cloned()
            .unwrap_or_else(Principal::anonymous);
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn requirement(value: Value) -> Result<PermissionRequirement, ConfigError> {
        PermissionRequirement::from_value("TestView", "permissions", &value)
    }

    #[test]
    fn test_all_requires_every_permission() {
        let req = requirement(json!({"all": ["p1", "p2"]})).unwrap();
        assert!(!req.is_satisfied_by(&Principal::user("a").with_permissions(["p1"])));
        assert!(req.is_satisfied_by(&Principal::user("a").with_permissions(["p1", "p2"])));
    }

    #[test]
    fn test_any_requires_one_permission() {
        let req = requirement(json!({"any": ["p1", "p2"]})).unwrap();
        assert!(req.is_satisfied_by(&Principal::user("a").with_permissions(["p2"])));
        assert!(!req.is_satisfied_by(&Principal::user("a")));
    }

    #[test]
    fn test_all_and_any_combined() {
        let req = requirement(json!({
            "all": ["tests.add_article", "tests.change_article"],
            "any": ["auth.add_user", "auth.change_user"],
        }))
        .unwrap();

        let ok = Principal::user("a").with_permissions([
            "tests.add_article",
            "tests.change_article",
            "auth.change_user",
        ]);
        assert!(req.is_satisfied_by(&ok));

        let missing_any =
            Principal::user("b").with_permissions(["tests.add_article", "tests.change_article"]);
        assert!(!req.is_satisfied_by(&missing_any));

        let missing_all = Principal::user("c").with_permissions(["tests.add_article", "auth.add_user"]);
        assert!(!req.is_satisfied_by(&missing_all));
    }

    #[test]
    fn test_single_permission() {
        let req = requirement(json!("auth.add_user")).unwrap();
        assert_eq!(req, PermissionRequirement::Single("auth.add_user".into()));
        assert!(req.is_satisfied_by(&Principal::user("a").with_permissions(["auth.add_user"])));
        assert!(!req.is_satisfied_by(&Principal::user("a")));
    }

    #[test]
    fn test_invalid_shapes_are_config_errors() {
        for value in [
            json!(null),
            json!([]),
            json!({}),
            json!({"all": null}),
            json!({"all": {"a": 1}}),
            json!({"any": null}),
            json!({"any": {"a": 1}}),
            json!({"all": []}),
            json!({"all": [1]}),
            json!({"none": ["p1"]}),
            json!(""),
            json!("has space"),
        ] {
            assert!(requirement(value.clone()).is_err(), "{} should be rejected", value);
        }
    }

    #[test]
    fn test_error_names_view_and_attribute() {
        let err = requirement(json!({"all": null})).unwrap_err();
        assert_eq!(err.view(), Some("TestView"));
        assert_eq!(err.attribute(), Some("permissions.all"));
    }

    #[test]
    fn test_structured_constructor_rejects_empty() {
        let empty: [&str; 0] = [];
        assert!(PermissionRequirement::structured("V", empty, empty).is_err());
        assert!(PermissionRequirement::structured("V", ["p1"], empty).is_ok());
    }

    #[test]
    fn test_superuser_holds_everything_unless_inactive() {
        let root = Principal::user("root").superuser();
        assert!(root.has_perm("anything.at_all"));

        let mut inactive = Principal::user("root").superuser();
        inactive.is_active = false;
        assert!(!inactive.has_perm("anything.at_all"));
    }

    #[test]
    fn test_policies_reject_anonymous() {
        let anon = Principal::anonymous();
        assert!(!AccessPolicy::LoginRequired.check(&anon));
        assert!(!AccessPolicy::CheckUser(|_| true).check(&anon));
    }

    #[test]
    fn test_policy_check() {
        let user = Principal::user("u");
        assert!(AccessPolicy::LoginRequired.check(&user));
        assert!(!AccessPolicy::SuperuserRequired.check(&user));
        assert!(!AccessPolicy::StaffuserRequired.check(&user));
        assert!(AccessPolicy::StaffuserRequired.check(&user.clone().staff()));
        assert!(AccessPolicy::SuperuserRequired.check(&user.clone().superuser()));

        fn named_alice(p: &Principal) -> bool {
            p.username == "alice"
        }
        assert!(AccessPolicy::CheckUser(named_alice).check(&Principal::user("alice")));
        assert!(!AccessPolicy::CheckUser(named_alice).check(&Principal::user("bob")));
    }

    #[tokio::test]
    async fn test_token_provider() {
        let provider =
            TokenPrincipalProvider::new().with_token("secret", Principal::user("alice"));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer secret".parse().unwrap());
        let principal = provider.extract_principal(&headers).await.unwrap();
        assert_eq!(principal.username, "alice");

        headers.insert(AUTHORIZATION, "Bearer wrong".parse().unwrap());
        let principal = provider.extract_principal(&headers).await.unwrap();
        assert!(!principal.is_authenticated);
    }

    #[tokio::test]
    async fn test_anonymous_provider() {
        let principal = AnonymousProvider
            .extract_principal(&HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(principal, Principal::anonymous());
    }
}
