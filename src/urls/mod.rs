//! Named URL patterns and reversal

pub mod registry;

pub use registry::UrlRegistry;
