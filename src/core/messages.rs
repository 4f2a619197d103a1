//! Flash messages
//!
//! [`MessageApi`] is the message subsystem: it records leveled notifications
//! against a request. [`Messages`] binds a request to an API so views can
//! write `messages.success("Saved")` without passing the request around.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use super::context::RequestContext;

/// Message severity, ordered by numeric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug = 10,
    Info = 20,
    Success = 25,
    Warning = 30,
    Error = 40,
}

impl Level {
    /// CSS-friendly tag for the level
    pub fn tag(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A stored notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub level: Level,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extra_tags: String,
}

impl Message {
    /// Level tag followed by any extra tags
    pub fn tags(&self) -> String {
        if self.extra_tags.is_empty() {
            self.level.tag().to_string()
        } else {
            format!("{} {}", self.extra_tags, self.level.tag())
        }
    }
}

#[derive(Debug)]
struct StorageState {
    messages: Vec<Message>,
    level: Level,
}

/// Per-request message storage
///
/// Cloning shares the underlying storage, so middleware and the handler see
/// the same messages.
#[derive(Debug, Clone)]
pub struct RequestMessageStorage {
    state: Arc<Mutex<StorageState>>,
}

impl Default for RequestMessageStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestMessageStorage {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(StorageState {
                messages: Vec::new(),
                level: Level::Info,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StorageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a message; returns false when it is below the minimum level
    pub fn add(&self, level: Level, message: &str, extra_tags: &str) -> bool {
        let mut state = self.lock();
        if level < state.level {
            return false;
        }
        state.messages.push(Message {
            level,
            message: message.to_string(),
            extra_tags: extra_tags.to_string(),
        });
        true
    }

    /// Remove and return every stored message
    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut self.lock().messages)
    }

    /// Stored messages without consuming them
    pub fn peek(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn level(&self) -> Level {
        self.lock().level
    }

    pub fn set_level(&self, level: Level) {
        self.lock().level = level;
    }
}

/// The message subsystem views forward to
pub trait MessageApi: Send + Sync {
    /// Record a message; returns whether it was kept
    fn add_message(
        &self,
        request: &RequestContext,
        level: Level,
        message: &str,
        extra_tags: &str,
    ) -> bool;

    /// Consume the messages recorded for the request
    fn get_messages(&self, request: &RequestContext) -> Vec<Message>;

    fn get_level(&self, request: &RequestContext) -> Level;

    fn set_level(&self, request: &RequestContext, level: Level);
}

/// Default [`MessageApi`] backed by the request's own storage
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestMessages;

impl MessageApi for RequestMessages {
    fn add_message(
        &self,
        request: &RequestContext,
        level: Level,
        message: &str,
        extra_tags: &str,
    ) -> bool {
        request.message_storage().add(level, message, extra_tags)
    }

    fn get_messages(&self, request: &RequestContext) -> Vec<Message> {
        request.message_storage().take()
    }

    fn get_level(&self, request: &RequestContext) -> Level {
        request.message_storage().level()
    }

    fn set_level(&self, request: &RequestContext, level: Level) {
        request.message_storage().set_level(level)
    }
}

static DEFAULT_API: RequestMessages = RequestMessages;

/// A message API with the request already bound
pub struct Messages<'a> {
    request: &'a RequestContext,
    api: &'a dyn MessageApi,
}

impl<'a> Messages<'a> {
    /// Bind the request to the default message API
    pub fn new(request: &'a RequestContext) -> Self {
        Self::with_api(request, &DEFAULT_API)
    }

    pub fn with_api(request: &'a RequestContext, api: &'a dyn MessageApi) -> Self {
        Self { request, api }
    }

    pub fn add_message(&self, level: Level, message: impl AsRef<str>, extra_tags: &str) -> bool {
        self.api
            .add_message(self.request, level, message.as_ref(), extra_tags)
    }

    pub fn debug(&self, message: impl AsRef<str>) -> bool {
        self.add_message(Level::Debug, message, "")
    }

    pub fn info(&self, message: impl AsRef<str>) -> bool {
        self.add_message(Level::Info, message, "")
    }

    pub fn success(&self, message: impl AsRef<str>) -> bool {
        self.add_message(Level::Success, message, "")
    }

    pub fn warning(&self, message: impl AsRef<str>) -> bool {
        self.add_message(Level::Warning, message, "")
    }

    pub fn error(&self, message: impl AsRef<str>) -> bool {
        self.add_message(Level::Error, message, "")
    }

    pub fn get_messages(&self) -> Vec<Message> {
        self.api.get_messages(self.request)
    }

    pub fn get_level(&self) -> Level {
        self.api.get_level(self.request)
    }

    pub fn set_level(&self, level: Level) {
        self.api.set_level(self.request, level)
    }
}

/// Messages emitted after form handling
#[derive(Debug, Clone, Default)]
pub struct FormMessages {
    pub form_valid_message: String,
    pub form_invalid_message: String,
}

impl FormMessages {
    pub fn new(valid: impl Into<String>, invalid: impl Into<String>) -> Self {
        Self {
            form_valid_message: valid.into(),
            form_invalid_message: invalid.into(),
        }
    }

    /// Pass `response` through, adding a success message if one is declared
    pub fn form_valid<R>(&self, messages: &Messages<'_>, response: R) -> R {
        if !self.form_valid_message.is_empty() {
            messages.success(&self.form_valid_message);
        }
        response
    }

    /// Pass `response` through, adding an error message if one is declared
    pub fn form_invalid<R>(&self, messages: &Messages<'_>, response: R) -> R {
        if !self.form_invalid_message.is_empty() {
            messages.error(&self.form_invalid_message);
        }
        response
    }
}

/// Message emitted after a successful delete
#[derive(Debug, Clone, Default)]
pub struct DeleteMessages {
    pub delete_message: String,
}

impl DeleteMessages {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            delete_message: message.into(),
        }
    }

    pub fn deleted<R>(&self, messages: &Messages<'_>, response: R) -> R {
        if !self.delete_message.is_empty() {
            messages.success(&self.delete_message);
        }
        response
    }
}
