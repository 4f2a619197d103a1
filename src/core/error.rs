//! Typed error handling for viewkit
//!
//! Views can fail in exactly two expected ways: their static declarations are
//! wrong ([`ConfigError`]) or the current principal is not allowed in
//! ([`AccessError`]). Both convert into [`ViewError`], which renders itself as
//! a JSON error response.
//!
//! # Example
//!
//! ```rust,ignore
//! use viewkit::prelude::*;
//!
//! match access.check(&ctx) {
//!     Ok(AccessDecision::Granted) => render_page(),
//!     Ok(AccessDecision::Redirect(to_login)) => to_login.into_response(),
//!     Err(ViewError::Access(AccessError::PermissionDenied { .. })) => forbidden(),
//!     Err(e) => e.into_response(),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type for viewkit
#[derive(Debug)]
pub enum ViewError {
    /// A view's static declarations are missing or invalid
    Config(ConfigError),

    /// The principal failed an authentication or permission check
    Access(AccessError),

    /// Failure inside a delegated primitive (e.g. the JSON encoder)
    Internal(String),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::Config(e) => write!(f, "{}", e),
            ViewError::Access(e) => write!(f, "{}", e),
            ViewError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ViewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewError::Config(e) => Some(e),
            ViewError::Access(e) => Some(e),
            ViewError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ViewError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ViewError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ViewError::Access(e) => e.status_code(),
            ViewError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ViewError::Config(e) => e.error_code(),
            ViewError::Access(e) => e.error_code(),
            ViewError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    /// Whether this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, ViewError::Config(_))
    }

    /// Whether this is an access-denied signal
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ViewError::Access(AccessError::PermissionDenied { .. }))
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ViewError::Config(e) => Some(serde_json::json!({
                "view": e.view(),
                "attribute": e.attribute(),
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// A view was declared incorrectly
///
/// Every variant carries the name of the owning view and of the offending
/// attribute so the message points straight at the declaration to fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required attribute was not declared
    MissingAttribute {
        view: String,
        attribute: String,
        hint: String,
    },

    /// Attribute was declared with the wrong shape or value
    InvalidAttribute {
        view: String,
        attribute: String,
        message: String,
    },

    /// A named URL could not be reversed
    NoReverseMatch {
        view: String,
        attribute: String,
        name: String,
    },

    /// No declarations exist for the requested view
    UnknownView { view: String },

    /// Failed to parse a configuration document
    ParseError {
        file: Option<String>,
        message: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::MissingAttribute`]
    pub fn missing(view: &str, attribute: &str, hint: impl Into<String>) -> Self {
        ConfigError::MissingAttribute {
            view: view.to_string(),
            attribute: attribute.to_string(),
            hint: hint.into(),
        }
    }

    /// Shorthand for [`ConfigError::InvalidAttribute`]
    pub fn invalid(view: &str, attribute: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidAttribute {
            view: view.to_string(),
            attribute: attribute.to_string(),
            message: message.into(),
        }
    }

    /// Name of the view whose declaration is wrong
    pub fn view(&self) -> Option<&str> {
        match self {
            ConfigError::MissingAttribute { view, .. }
            | ConfigError::InvalidAttribute { view, .. }
            | ConfigError::NoReverseMatch { view, .. }
            | ConfigError::UnknownView { view } => Some(view),
            ConfigError::ParseError { .. } => None,
        }
    }

    /// Name of the offending attribute
    pub fn attribute(&self) -> Option<&str> {
        match self {
            ConfigError::MissingAttribute { attribute, .. }
            | ConfigError::InvalidAttribute { attribute, .. }
            | ConfigError::NoReverseMatch { attribute, .. } => Some(attribute),
            ConfigError::UnknownView { .. } | ConfigError::ParseError { .. } => None,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::NoReverseMatch { .. } => "NO_REVERSE_MATCH",
            _ => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingAttribute {
                view,
                attribute,
                hint,
            } => {
                write!(f, "{} is missing the {} attribute", view, attribute)?;
                if !hint.is_empty() {
                    write!(f, ". {}", hint)?;
                }
                Ok(())
            }
            ConfigError::InvalidAttribute {
                view,
                attribute,
                message,
            } => {
                write!(f, "{} has an invalid {} attribute: {}", view, attribute, message)
            }
            ConfigError::NoReverseMatch {
                view,
                attribute,
                name,
            } => {
                write!(
                    f,
                    "{}.{} names URL '{}' which is not registered",
                    view, attribute, name
                )
            }
            ConfigError::UnknownView { view } => {
                write!(f, "no view named '{}' is configured", view)
            }
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for ViewError {
    fn from(err: ConfigError) -> Self {
        ViewError::Config(err)
    }
}

// =============================================================================
// Access Errors
// =============================================================================

/// The principal may not use the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The principal failed the view's access policy
    PermissionDenied { path: String, reason: String },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::PermissionDenied { path, reason } => {
                write!(f, "Permission denied for '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for AccessError {}

impl AccessError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccessError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::PermissionDenied { .. } => "PERMISSION_DENIED",
        }
    }
}

impl From<AccessError> for ViewError {
    fn from(err: AccessError) -> Self {
        ViewError::Access(err)
    }
}

impl From<serde_json::Error> for ViewError {
    fn from(err: serde_json::Error) -> Self {
        ViewError::Internal(format!("JSON serialization failed: {}", err))
    }
}
