//! # dataway-pg
//!
//! PostgreSQL connection provider for `dataway-core`: the fluent SQL
//! builder, eager-loading/bulk/CTE helpers, transaction and savepoint
//! support, the LISTEN/NOTIFY listener, schema introspection and
//! migrations, and the `pg_executor`/`pg_provider` glue that implements
//! `dataway_core::executor::{Executor, ConnectionProvider}` against this
//! driver. Almost all of this module set is the teacher's own Postgres ORM,
//! carried over nearly wholesale since it remains genuinely
//! Postgres-specific (parameterized placeholders, LISTEN/NOTIFY, PG types).

pub mod builder;
pub mod bulk;
pub mod check;
pub mod checked_client;
pub mod client;
pub mod condition;
pub mod cte;
pub mod eager;
pub mod error;
pub mod ident;
pub mod listen;
pub mod monitor;
pub mod pg_client;
pub mod pg_render;
pub mod qb;
pub mod query;
pub mod row;
pub mod sql;
pub mod transaction;
pub mod types;

#[cfg(feature = "migrate")]
pub mod migrate;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub mod pg_executor;

#[cfg(feature = "pool")]
pub mod pg_provider;

pub use client::GenericClient;
pub use condition::{Condition, Op};
pub use error::{PgError, PgResult};
pub use query::query;
pub use ident::{Ident, IntoIdent};
pub use row::{FromRow, ModelPk, PgType, RowExt};
pub use sql::{Sql, sql};
pub use transaction::{
    AsPgClient, Savepoint, TransactionExt, TransactionIsolation, TransactionOptions,
    begin_transaction_with,
};

#[cfg(feature = "pool")]
pub use client::PoolClient;

#[cfg(feature = "pool")]
pub use pg_executor::PgExecutor;

#[cfg(feature = "pool")]
pub use pg_provider::{PgConnectionProvider, PgDescriptorExt};

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use dataway_derive::{FromRow, InsertModel, Model, UpdateModel, ViewModel};

#[cfg(feature = "check")]
pub use pg_client::{CheckMode, PgClient, PgClientConfig};
