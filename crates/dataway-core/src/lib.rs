//! # dataway-core
//!
//! Dialect-neutral request compiler, hook pipeline, and response shaping for
//! a generic REST-over-relational query engine.
//!
//! This crate knows nothing about any particular wire protocol or SQL
//! dialect: it reflects a model once at registration (`model`), validates
//! and compiles header-decoded request options into a dialect-neutral query
//! plan (`options`, `header`, `validator`, `compiler`, `plan`), runs the
//! twelve-point hook pipeline around it (`hooks`), decomposes nested write
//! payloads (`nested_write`), memoizes COUNT results (`cache`), and shapes
//! the final response (`format`). Dialect crates (`dataway-pg`,
//! `dataway-mysql`, `dataway-sqlite`, `dataway-mongo`) implement the
//! `executor::Executor`/`executor::ConnectionProvider` seam this crate
//! defines; `dataway-manager` owns the named pool of them; `dataway-http`
//! is the axum adapter that drives `engine::Engine` per request.

pub mod cache;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod executor;
pub mod format;
pub mod header;
pub mod hooks;
pub mod model;
pub mod nested_write;
pub mod options;
pub mod plan;
pub mod prelude;
pub mod validator;
pub mod value;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use format::FormattedResponse;
pub use model::{ColumnDescriptor, ColumnType, ModelCatalog, ModelDescriptor, RelationDescriptor, RelationKind};
pub use options::RequestOptions;
pub use value::Value;

#[cfg(feature = "derive")]
pub use dataway_derive::Model;
