//! Convenient imports for typical `dataway-core` usage.
//!
//! ```ignore
//! use dataway_core::prelude::*;
//! ```
//!
//! Dialect providers additionally pull from `dataway_core::executor` to
//! implement the `Executor`/`ConnectionProvider` seam.

pub use crate::cache::{InMemoryQueryTotalCache, QueryTotalCache};
pub use crate::compiler::QueryCompiler;
pub use crate::engine::Engine;
pub use crate::error::{EngineError, EngineResult};
pub use crate::executor::{ConnectionProvider, Executor, ExecutedRows, PoolStats, Transaction};
pub use crate::format::{FormatOptions, ResponseMetadata};
pub use crate::header::{decode_headers, HeaderSource};
pub use crate::hooks::{Hook, HookContext, HookKind, HookRegistry, OperationKind};
pub use crate::model::{ColumnDescriptor, ColumnType, ModelCatalog, ModelDescriptor, RelationDescriptor, RelationKind};
pub use crate::nested_write::{NestedWriteProcessor, WriteKind, WriteStep};
pub use crate::options::{Filter, FilterOp, FilterValue, LogicOp, PreloadSpec, RequestOptions, ResponseFormat, SortDir, SortTerm};
pub use crate::plan::{CompareOp, FilterExpr, QueryPlan, SelectPlan};
pub use crate::validator::ColumnValidator;
pub use crate::value::Value;

#[cfg(feature = "derive")]
pub use dataway_derive::Model;
