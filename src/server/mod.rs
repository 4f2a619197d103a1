//! Server module wiring view behaviours into axum
//!
//! - [`extract`]: `RequestContext` extractor
//! - [`middleware`]: principal resolution, message storage and access checks
//! - [`ServerBuilder`]: assembles routes with the middleware installed

pub mod builder;
pub mod extract;
pub mod middleware;

pub use builder::ServerBuilder;
