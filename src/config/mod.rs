//! View configuration loading and validation
//!
//! Views are declared in YAML. Nothing is validated while parsing beyond the
//! YAML shape; the `*_mixin` methods on [`ViewConfig`] validate eagerly and
//! return typed behaviours or a [`ConfigError`] naming the view and attribute.
//!
//! ```yaml
//! urls:
//!   article_list: /articles/
//!   edit_article: /articles/{pk}/edit/
//!
//! views:
//!   ArticleList:
//!     sortable:
//!       accepted_orderings: [title, [newest, -created]]
//!     access:
//!       policy: permission_required
//!       permissions: {all: [blog.view_article]}
//! ```

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::core::access::{
    AccessMixin, DEFAULT_LOGIN_URL, DEFAULT_REDIRECT_FIELD_NAME,
};
use crate::core::auth::{AccessPolicy, PermissionRequirement, Principal};
use crate::core::context::SetHeadline;
use crate::core::error::ConfigError;
use crate::core::json::{DEFAULT_CONTENT_TYPE, JsonResponseMixin};
use crate::core::messages::{DeleteMessages, FormMessages};
use crate::core::ordering::FieldSpec;
use crate::core::redirect::{
    CreateAndRedirectToEdit, DEFAULT_SUCCESS_URL_PARAM, NextMixin, SuccessUrlRedirectList,
};
use crate::core::sortable::{
    AcceptedOrdering, OrderingMixin, PrefetchRelatedMixin, SelectRelatedMixin, SortableMixin,
    UserQuerysetMixin,
};
use crate::urls::UrlRegistry;

/// Named predicates available to `check_user` policies
pub type UserChecks = HashMap<String, fn(&Principal) -> bool>;

fn default_login_url() -> Option<String> {
    Some(DEFAULT_LOGIN_URL.to_string())
}

fn default_redirect_field_name() -> Option<String> {
    Some(DEFAULT_REDIRECT_FIELD_NAME.to_string())
}

fn default_content_type() -> Option<String> {
    Some(DEFAULT_CONTENT_TYPE.to_string())
}

fn default_success_url_param() -> String {
    DEFAULT_SUCCESS_URL_PARAM.to_string()
}

/// Which access policy a view enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    LoginRequired,
    PermissionRequired,
    SuperuserRequired,
    StaffuserRequired,
    CheckUser,
}

/// Access-control declarations
///
/// `login_url` and `redirect_field_name` default when absent; an explicit
/// `null` is kept so validation can reject it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    pub policy: PolicyKind,

    /// Permission requirement, kept raw so its shape can be validated
    #[serde(default)]
    pub permissions: Value,

    /// Name of a registered predicate for `check_user`
    #[serde(default)]
    pub user_check: Option<String>,

    #[serde(default = "default_login_url")]
    pub login_url: Option<String>,

    #[serde(default = "default_redirect_field_name")]
    pub redirect_field_name: Option<String>,

    #[serde(default)]
    pub raise_exception: bool,
}

/// Client-selected sorting declarations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortableConfig {
    /// Kept raw so entry shapes can be validated
    #[serde(default)]
    pub accepted_orderings: Value,

    #[serde(default)]
    pub default_ordering: Option<String>,

    #[serde(default)]
    pub sort_parameter: Option<String>,
}

/// Redirect-after-success declarations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextConfig {
    #[serde(default)]
    pub success_url: Option<String>,

    #[serde(default)]
    pub default_success_url: Option<String>,

    #[serde(default = "default_success_url_param")]
    pub success_url_param: String,

    #[serde(default = "default_success_url_param")]
    pub success_url_context: String,

    #[serde(default)]
    pub allow_external_redirect: bool,
}

/// Declarations of a single view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub ordering: Option<FieldSpec>,

    #[serde(default)]
    pub sortable: Option<SortableConfig>,

    #[serde(default)]
    pub select_related: Option<FieldSpec>,

    #[serde(default)]
    pub prefetch_related: Option<FieldSpec>,

    #[serde(default)]
    pub user_field_name: Option<String>,

    #[serde(default)]
    pub access: Option<AccessConfig>,

    #[serde(default = "default_content_type")]
    pub content_type: Option<String>,

    #[serde(default)]
    pub next: Option<NextConfig>,

    #[serde(default)]
    pub success_list_url: Option<String>,

    #[serde(default)]
    pub success_url_name: Option<String>,

    #[serde(default)]
    pub headline: Option<String>,

    #[serde(default)]
    pub form_valid_message: String,

    #[serde(default)]
    pub form_invalid_message: String,

    #[serde(default)]
    pub delete_message: String,
}

impl ViewConfig {
    pub fn ordering_mixin(&self, view: &str) -> Result<OrderingMixin, ConfigError> {
        OrderingMixin::new(view, self.ordering.clone())
    }

    pub fn sortable_mixin(&self, view: &str) -> Result<SortableMixin, ConfigError> {
        let Some(sortable) = &self.sortable else {
            return Err(ConfigError::missing(view, "sortable", format!("Define {}.sortable", view)));
        };
        let accepted = AcceptedOrdering::parse_list(view, &sortable.accepted_orderings)?;
        SortableMixin::new(
            view,
            accepted,
            sortable.default_ordering.as_deref(),
            sortable.sort_parameter.as_deref(),
        )
    }

    pub fn select_related_mixin(&self, view: &str) -> Result<SelectRelatedMixin, ConfigError> {
        SelectRelatedMixin::new(view, self.select_related.clone())
    }

    pub fn prefetch_related_mixin(&self, view: &str) -> Result<PrefetchRelatedMixin, ConfigError> {
        PrefetchRelatedMixin::new(view, self.prefetch_related.clone())
    }

    pub fn user_queryset_mixin(&self, view: &str) -> Result<UserQuerysetMixin, ConfigError> {
        match self.user_field_name.as_deref() {
            None => Ok(UserQuerysetMixin::default()),
            Some("") => Err(ConfigError::invalid(view, "user_field_name", "must not be empty")),
            Some(name) => Ok(UserQuerysetMixin::new(name)),
        }
    }

    /// Build the access mixin; `checks` supplies `check_user` predicates
    pub fn access_mixin(&self, view: &str, checks: &UserChecks) -> Result<AccessMixin, ConfigError> {
        let Some(access) = &self.access else {
            return Err(ConfigError::missing(view, "access", format!("Define {}.access", view)));
        };

        let policy = match access.policy {
            PolicyKind::LoginRequired => AccessPolicy::LoginRequired,
            PolicyKind::SuperuserRequired => AccessPolicy::SuperuserRequired,
            PolicyKind::StaffuserRequired => AccessPolicy::StaffuserRequired,
            PolicyKind::PermissionRequired => AccessPolicy::PermissionRequired(
                PermissionRequirement::from_value(view, "permissions", &access.permissions)?,
            ),
            PolicyKind::CheckUser => {
                let name = access.user_check.as_deref().ok_or_else(|| {
                    ConfigError::missing(
                        view,
                        "user_check",
                        format!("Define {}.user_check to name a registered predicate", view),
                    )
                })?;
                let check = checks.get(name).ok_or_else(|| {
                    ConfigError::invalid(
                        view,
                        "user_check",
                        format!("no predicate named '{}' is registered", name),
                    )
                })?;
                AccessPolicy::CheckUser(*check)
            }
        };

        AccessMixin::builder(view, policy)
            .login_url(access.login_url.as_deref())
            .redirect_field_name(access.redirect_field_name.as_deref())
            .raise_exception(access.raise_exception)
            .build()
    }

    pub fn json_mixin(&self, view: &str) -> Result<JsonResponseMixin, ConfigError> {
        let mixin = JsonResponseMixin::new(view).with_content_type(self.content_type.as_deref());
        mixin.get_content_type()?;
        Ok(mixin)
    }

    pub fn next_mixin(&self, view: &str) -> Result<NextMixin, ConfigError> {
        let Some(next) = &self.next else {
            return Err(ConfigError::missing(view, "next", format!("Define {}.next", view)));
        };
        NextMixin::builder(view)
            .success_url(next.success_url.as_deref())
            .default_success_url(next.default_success_url.as_deref())
            .success_url_param(next.success_url_param.clone())
            .success_url_context(next.success_url_context.clone())
            .allow_external_redirect(next.allow_external_redirect)
            .build()
    }

    pub fn success_list_redirect(&self, view: &str) -> Result<SuccessUrlRedirectList, ConfigError> {
        SuccessUrlRedirectList::new(view, self.success_list_url.as_deref())
    }

    pub fn create_and_redirect_to_edit(
        &self,
        view: &str,
    ) -> Result<CreateAndRedirectToEdit, ConfigError> {
        CreateAndRedirectToEdit::new(view, self.success_url_name.as_deref())
    }

    pub fn headline(&self, view: &str) -> Result<SetHeadline, ConfigError> {
        SetHeadline::new(view, self.headline.as_deref())
    }

    pub fn form_messages(&self) -> FormMessages {
        FormMessages::new(self.form_valid_message.clone(), self.form_invalid_message.clone())
    }

    pub fn delete_messages(&self) -> DeleteMessages {
        DeleteMessages::new(self.delete_message.clone())
    }
}

/// Complete configuration: named URLs plus per-view declarations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewsConfig {
    #[serde(default)]
    pub urls: IndexMap<String, String>,

    #[serde(default)]
    pub views: IndexMap<String, ViewConfig>,
}

impl ViewsConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading view configuration from {}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("parsing {}", path))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Declarations of a named view
    pub fn view(&self, name: &str) -> Result<&ViewConfig, ConfigError> {
        self.views.get(name).ok_or_else(|| ConfigError::UnknownView {
            view: name.to_string(),
        })
    }

    /// Registry of the declared URL patterns
    pub fn url_registry(&self) -> Result<UrlRegistry> {
        UrlRegistry::from_patterns(&self.urls)
    }

    /// Merge several configurations; later views and URLs override earlier ones
    pub fn merge(configs: Vec<ViewsConfig>) -> Self {
        let mut merged = ViewsConfig::default();
        for config in configs {
            merged.urls.extend(config.urls);
            merged.views.extend(config.views);
        }
        merged
    }
}
