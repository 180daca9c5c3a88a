use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::info;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::errors::StoreError;
use crate::models::location_report::LocationReport;
use crate::stores::{RecordId, RecordStore};

/// Appends each report's rendered block to an HTML log file.
pub struct FileRecordStore {
    path: PathBuf,
    // Held across open/write/close so concurrent requests never interleave
    write_lock: Mutex<()>,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn append(&self, report: &LocationReport) -> Result<RecordId, StoreError> {
        let block = report.render_html();
        let _guard = self.write_lock.lock().await;

        // The handle is dropped, and the file closed, when this scope ends
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let offset = file.metadata().await?.len();
        file.write_all(block.as_bytes()).await?;
        file.flush().await?;

        info!("Report appended to {}", self.path().display());
        Ok(RecordId::Offset(offset))
    }
}
