pub mod file_store;
pub mod mongo_store;
pub mod sql_store;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StoreBackend;
use crate::db;
use crate::errors::StoreError;
use crate::models::location_report::LocationReport;

pub use file_store::FileRecordStore;
pub use mongo_store::MongoRecordStore;
pub use sql_store::SqlRecordStore;

/// Identifier of a written record, in the terms of the backend that wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordId {
    /// Byte offset of the block inside the log file
    Offset(u64),
    Row(i64),
    Document(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Offset(offset) => write!(f, "offset {}", offset),
            RecordId::Row(id) => write!(f, "row {}", id),
            RecordId::Document(id) => write!(f, "document {}", id),
        }
    }
}

/// Append-only sink for captured reports. Every call writes a new record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn append(&self, report: &LocationReport) -> Result<RecordId, StoreError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Open the store selected in the configuration.
pub async fn build_store(backend: &StoreBackend) -> anyhow::Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match backend {
        StoreBackend::File { path } => Arc::new(FileRecordStore::new(path.clone())),
        StoreBackend::Sql { database_url } => {
            let pool = db::sqlite::init_pool(database_url).await?;
            Arc::new(SqlRecordStore::new(pool).await?)
        }
        StoreBackend::MongoDb { uri, database } => {
            let mongo = db::mongodb::get_database(uri, database).await?;
            Arc::new(MongoRecordStore::new(&mongo))
        }
    };
    Ok(store)
}
