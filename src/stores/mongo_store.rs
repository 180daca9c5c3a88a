use async_trait::async_trait;
use log::info;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, doc};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::models::location_report::LocationReport;
use crate::stores::{RecordId, RecordStore};

const COLLECTION: &str = "ruta1";

/// Document layout of the `ruta1` collection.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LocationDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub latitude: String,
    pub longitude: String,
    pub timestamp: i64, // Milliseconds since the epoch
    pub ip: String,
    pub user_agent: String,
    pub maps_url: String,
}

impl From<&LocationReport> for LocationDocument {
    fn from(report: &LocationReport) -> Self {
        Self {
            id: None,
            latitude: report.latitude.clone(),
            longitude: report.longitude.clone(),
            timestamp: report.timestamp.timestamp_millis(),
            ip: report.ip.clone(),
            user_agent: report.user_agent.clone(),
            maps_url: report.maps_url.clone(),
        }
    }
}

/// Inserts one document per report.
pub struct MongoRecordStore {
    database: Database,
    collection: Collection<LocationDocument>,
}

impl MongoRecordStore {
    pub fn new(database: &Database) -> Self {
        Self {
            database: database.clone(),
            collection: database.collection::<LocationDocument>(COLLECTION),
        }
    }
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    async fn append(&self, report: &LocationReport) -> Result<RecordId, StoreError> {
        let result = self
            .collection
            .insert_one(LocationDocument::from(report))
            .await?;

        let id = match result.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };
        info!("Report stored in {} with id {}", COLLECTION, id);
        Ok(RecordId::Document(id))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
