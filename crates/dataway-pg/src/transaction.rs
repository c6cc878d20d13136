//! Transaction helpers.
//!
//! Prefer passing a transaction (`tokio_postgres::Transaction` or
//! `deadpool_postgres::Transaction`) into APIs that accept [`GenericClient`].
//! This keeps repository methods easy to compose with or without transactions.
//!
//! For ergonomic commit/rollback handling, use the [`transaction!`] macro.
//!
//! # Example
//!
//! ```ignore
//! use dataway_pg::{query, PgResult};
//! use tokio_postgres::NoTls;
//!
//! # async fn demo() -> PgResult<()> {
//! let (mut client, connection) = tokio_postgres::connect("postgres://...", NoTls).await?;
//! tokio::spawn(async move { let _ = connection.await; });
//!
//! dataway_pg::transaction!(&mut client, tx, {
//!     query("UPDATE accounts SET balance = balance - $1 WHERE id = $2")
//!         .bind(100_i64)
//!         .bind(1_i64)
//!         .execute(&tx)
//!         .await?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `dataway_pg::PgResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let mut $tx = ($client)
            .transaction()
            .await
            .map_err($crate::PgError::from_db_error)?;

        let __dataway_tx_body_result = async { $body }.await;
        match __dataway_tx_body_result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err($crate::PgError::from_db_error)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::PgError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}

use crate::client::GenericClient;
use crate::error::{PgError, PgResult};
use crate::ident::Ident;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A named `SAVEPOINT` within an open transaction.
///
/// Queries run against a `Savepoint` execute on the same underlying
/// connection as the transaction that created it; `release` and `rollback`
/// only affect the slice of work since the savepoint was taken.
pub struct Savepoint<'a> {
    tx: &'a tokio_postgres::Transaction<'a>,
    name: String,
}

impl<'a> Savepoint<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Makes the savepoint's work permanent within the enclosing transaction.
    pub async fn release(self) -> PgResult<()> {
        let ident = Ident::parse(&self.name)?;
        self.tx
            .execute(&format!("RELEASE SAVEPOINT {}", ident.to_sql()), &[])
            .await
            .map_err(PgError::from_db_error)?;
        Ok(())
    }

    /// Undoes everything done since the savepoint, without aborting the
    /// enclosing transaction.
    pub async fn rollback(self) -> PgResult<()> {
        let ident = Ident::parse(&self.name)?;
        self.tx
            .execute(&format!("ROLLBACK TO SAVEPOINT {}", ident.to_sql()), &[])
            .await
            .map_err(PgError::from_db_error)?;
        Ok(())
    }

    /// Nests a further savepoint on top of this one.
    pub async fn savepoint(&self, name: impl Into<String>) -> PgResult<Savepoint<'a>> {
        create_savepoint(self.tx, name.into()).await
    }
}

impl GenericClient for Savepoint<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<Vec<Row>> {
        GenericClient::query(self.tx, sql, params).await
    }

    async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<Row> {
        GenericClient::query_one(self.tx, sql, params).await
    }

    async fn query_opt(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<Option<Row>> {
        GenericClient::query_opt(self.tx, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<u64> {
        GenericClient::execute(self.tx, sql, params).await
    }
}

async fn create_savepoint<'a>(
    tx: &'a tokio_postgres::Transaction<'a>,
    name: String,
) -> PgResult<Savepoint<'a>> {
    let ident = Ident::parse(&name)?;
    tx.execute(&format!("SAVEPOINT {}", ident.to_sql()), &[])
        .await
        .map_err(PgError::from_db_error)?;
    Ok(Savepoint { tx, name })
}

/// Extension trait adding savepoint support to an open transaction.
pub trait TransactionExt {
    fn savepoint(
        &self,
        name: impl Into<String>,
    ) -> impl std::future::Future<Output = PgResult<Savepoint<'_>>> + Send;
}

impl TransactionExt for tokio_postgres::Transaction<'_> {
    async fn savepoint(&self, name: impl Into<String>) -> PgResult<Savepoint<'_>> {
        create_savepoint(self, name.into()).await
    }
}

/// Runs the given block inside a named savepoint on an already-open
/// transaction. Releases the savepoint on `Ok(_)`, rolls back to it on
/// `Err(_)` — the enclosing transaction is left open either way.
#[macro_export]
macro_rules! savepoint {
    ($tx:expr, $name:expr, $sp:ident, $body:block) => {{
        async {
            let $sp = $crate::TransactionExt::savepoint(&$tx, $name).await?;
            let __dataway_sp_body_result = async { $body }.await;
            match __dataway_sp_body_result {
                Ok(value) => {
                    $sp.release().await?;
                    Ok(value)
                }
                Err(error) => {
                    $sp.rollback().await?;
                    Err(error)
                }
            }
        }
        .await
    }};
}

/// Runs the given block inside an anonymous savepoint, giving it the
/// semantics of a nested transaction on top of an already-open transaction.
#[macro_export]
macro_rules! nested_transaction {
    ($tx:expr, $inner:ident, $body:block) => {{
        let __dataway_nested_name =
            format!("nested_{}", std::ptr::addr_of!($tx) as usize);
        $crate::savepoint!($tx, __dataway_nested_name, $inner, $body)
    }};
}

/// `BEGIN` isolation level, mirroring `tokio_postgres::IsolationLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionIsolation {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl From<TransactionIsolation> for tokio_postgres::IsolationLevel {
    fn from(level: TransactionIsolation) -> Self {
        match level {
            TransactionIsolation::ReadUncommitted => tokio_postgres::IsolationLevel::ReadUncommitted,
            TransactionIsolation::ReadCommitted => tokio_postgres::IsolationLevel::ReadCommitted,
            TransactionIsolation::RepeatableRead => tokio_postgres::IsolationLevel::RepeatableRead,
            TransactionIsolation::Serializable => tokio_postgres::IsolationLevel::Serializable,
        }
    }
}

/// `BEGIN` options: isolation level, read-only, deferrable. Unset fields are
/// left to the connection's session defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionOptions {
    isolation_level: Option<TransactionIsolation>,
    read_only: Option<bool>,
    deferrable: Option<bool>,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation_level(mut self, level: TransactionIsolation) -> Self {
        self.isolation_level = Some(level);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = Some(deferrable);
        self
    }
}

/// Narrows a pooled or direct client down to the `tokio_postgres::Client` that
/// can `build_transaction()`.
pub trait AsPgClient {
    fn as_pg_client_mut(&mut self) -> &mut tokio_postgres::Client;
}

impl AsPgClient for tokio_postgres::Client {
    fn as_pg_client_mut(&mut self) -> &mut tokio_postgres::Client {
        self
    }
}

#[cfg(feature = "pool")]
impl AsPgClient for deadpool_postgres::Client {
    fn as_pg_client_mut(&mut self) -> &mut tokio_postgres::Client {
        &mut *self
    }
}

/// Starts a transaction with the given isolation/read-only/deferrable
/// options (grounded in `tokio_postgres::Client::build_transaction`).
pub async fn begin_transaction_with<'a, C: AsPgClient>(
    client: &'a mut C,
    opts: TransactionOptions,
) -> PgResult<tokio_postgres::Transaction<'a>> {
    let mut builder = client.as_pg_client_mut().build_transaction();
    if let Some(level) = opts.isolation_level {
        builder = builder.isolation_level(level.into());
    }
    if let Some(read_only) = opts.read_only {
        builder = builder.read_only(read_only);
    }
    if let Some(deferrable) = opts.deferrable {
        builder = builder.deferrable(deferrable);
    }
    builder.start().await.map_err(PgError::from_db_error)
}

/// Like [`transaction!`], but starts the transaction with [`TransactionOptions`].
#[macro_export]
macro_rules! transaction_with {
    ($client:expr, $tx:ident, $opts:expr, $body:block) => {{
        let mut $tx = $crate::begin_transaction_with($client, $opts).await?;

        let __dataway_tx_body_result = async { $body }.await;
        match __dataway_tx_body_result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err($crate::PgError::from_db_error)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::PgError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}
