//! Convenient imports for direct `dataway-pg` usage (bypassing the
//! dialect-neutral engine, e.g. from a migration script or a one-off CLI
//! tool). For advanced features (monitoring, SQL linting) import from
//! [`dataway_pg::monitor`](crate::monitor) or
//! [`dataway_pg::check`](crate::check) directly.

pub use crate::sql::{FromRowStream, Query, Sql, query, sql};
pub use crate::types::{Bound, Range};
pub use crate::{FromRow, RowExt};
pub use tokio_postgres::types::Json;

pub use crate::client::{GenericClient, RowStream, StreamingClient};

pub use crate::builder::{
    Cursor, Keyset1, Keyset2, NullsOrder, OrderBy, OrderItem, Pagination, SortDir, WhereExpr,
};
pub use crate::condition::{Condition, Op};
pub use crate::cte::WithBuilder;
pub use crate::ident::{Ident, IntoIdent};

pub use crate::bulk::{DeleteManyBuilder, SetExpr, UpdateManyBuilder};

pub use crate::eager::{BelongsToMap, HasManyMap, HasOneMap, Loaded};

pub use crate::transaction::{Savepoint, TransactionExt};

pub use crate::error::{PgError, PgResult};

#[cfg(feature = "pool")]
pub use crate::pg_executor::PgExecutor;

#[cfg(feature = "pool")]
pub use crate::pg_provider::PgConnectionProvider;

#[cfg(feature = "pool")]
pub use crate::pool::{create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use crate::{InsertModel, Model, UpdateModel, ViewModel};

#[cfg(feature = "check")]
pub use crate::pg_client::{CheckMode, PgClient, PgClientConfig};
