//! Core module containing the view behaviours and the types they share

pub mod access;
pub mod ajax;
pub mod auth;
pub mod context;
pub mod error;
pub mod json;
pub mod messages;
pub mod ordering;
pub mod queryset;
pub mod redirect;
pub mod sortable;

pub use access::{AccessDecision, AccessMixin, Found};
pub use ajax::AjaxResponse;
pub use auth::{AccessPolicy, PermissionRequirement, Principal, PrincipalProvider};
pub use context::{RequestContext, SetHeadline, user_form_kwargs};
pub use error::{AccessError, ConfigError, ViewError};
pub use json::{JsonResponseMixin, Model, SerializeOptions};
pub use messages::{DeleteMessages, FormMessages, Level, Message, Messages};
pub use ordering::FieldSpec;
pub use queryset::{JsonQueryset, Queryset};
pub use redirect::{CreateAndRedirectToEdit, NextMixin, SuccessUrlRedirectList};
pub use sortable::{
    AcceptedOrdering, OrderingMixin, PrefetchRelatedMixin, SelectRelatedMixin, SortableMixin,
    UserQuerysetMixin,
};
