//! # viewkit
//!
//! Reusable behaviours for axum views: access control, JSON rendering,
//! client-selected sorting, redirect targets and flash messages.
//!
//! Behaviours are declared once (in code or YAML), validated when built, and
//! receive the request they act on as an explicit [`core::RequestContext`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use viewkit::prelude::*;
//!
//! let access = AccessMixin::builder(
//!     "ArticleCreate",
//!     AccessPolicy::PermissionRequired(
//!         PermissionRequirement::single("ArticleCreate", "blog.add_article")?,
//!     ),
//! )
//! .build()?;
//!
//! let app = ServerBuilder::new()
//!     .with_principal_provider(TokenPrincipalProvider::new())
//!     .protected_route("/articles/new/", post(create_article), access)
//!     .build();
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod urls;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Behaviours ===
    pub use crate::core::{
        access::{AccessDecision, AccessMixin, Found},
        ajax::AjaxResponse,
        auth::{
            AccessPolicy, AnonymousProvider, PermissionRequirement, Principal, PrincipalProvider,
            TokenPrincipalProvider,
        },
        context::{RequestContext, SetHeadline, user_form_kwargs},
        json::{JsonResponseMixin, Model, SerializeOptions},
        messages::{DeleteMessages, FormMessages, Level, Message, MessageApi, Messages},
        ordering::{FieldSpec, force_tuple, invert_order_by, parse_order_by},
        queryset::{JsonQueryset, Queryset},
        redirect::{CreateAndRedirectToEdit, NextMixin, SuccessUrlRedirectList},
        sortable::{
            AcceptedOrdering, OrderingMixin, PrefetchRelatedMixin, SelectRelatedMixin,
            SortableMixin, UserQuerysetMixin,
        },
    };

    // === Errors ===
    pub use crate::core::error::{AccessError, ConfigError, ViewError};

    // === Config ===
    pub use crate::config::{UserChecks, ViewConfig, ViewsConfig};

    // === Routing ===
    pub use crate::server::ServerBuilder;
    pub use crate::urls::UrlRegistry;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};

    // === Axum ===
    pub use axum::{
        Router,
        response::{IntoResponse, Response},
        routing::{delete, get, post, put},
    };
}
