//! HTTP API layer for the bug tracker.
//!
//! This crate owns the wire contract in front of `bugtrack-store`: routes,
//! the `{success, data, message, error, count}` envelope, status-code
//! mapping for store errors, and the creation webhook. Storage semantics
//! stay in the store crate; handlers only translate.

pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod notify;

pub use config::{DEFAULT_BUGS_PATH, DEFAULT_PORT, Environment, ServerConfig};
pub use envelope::ApiResponse;
pub use error::{ApiError, ErrorDetail, SERVER_ERROR_MESSAGE};
pub use http::{ApiJson, AppState, ServeError, app, cors_layer, serve};
pub use notify::{Notifier, NotifyError, WEBHOOK_TIMEOUT, bug_summary};
