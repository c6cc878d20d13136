//! Axum adapter over `dataway_core::engine::Engine` (§6).
//!
//! This crate owns the one wire-level concern the rest of the stack stays
//! agnostic of: decoding an `axum::http::HeaderMap` into `RequestOptions`,
//! routing `{base}/{schema}/{entity}[/{id}]` to `Engine::handle_read` /
//! `handle_write`, and turning an `EngineError` into the `{_error, _retval}`
//! envelope with its fixed status code. No query compilation or hook logic
//! lives here.

pub mod headers;
pub mod meta;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use response::ApiError;
pub use routes::router;
pub use server::serve_with_graceful_shutdown;
pub use state::AppState;
