use async_trait::async_trait;
use log::info;
use sqlx::SqlitePool;

use crate::db::sqlite::create_table;
use crate::errors::StoreError;
use crate::models::location_report::LocationReport;
use crate::stores::{RecordId, RecordStore};

/// Inserts one row per report into the `ruta1` table.
pub struct SqlRecordStore {
    pool: SqlitePool,
}

impl SqlRecordStore {
    /// Wrap a pool, creating the table when it is missing.
    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        create_table(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn append(&self, report: &LocationReport) -> Result<RecordId, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO ruta1 (latitude, longitude, timestamp, ip, user_agent, maps_url)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&report.latitude)
        .bind(&report.longitude)
        .bind(report.timestamp)
        .bind(&report.ip)
        .bind(&report.user_agent)
        .bind(&report.maps_url)
        .fetch_one(&self.pool)
        .await?;

        info!("Report stored in ruta1 with id {}", id);
        Ok(RecordId::Row(id))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use sqlx::Row;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::structs::send_request::SendParams;

    async fn memory_pool() -> SqlitePool {
        // A single connection, otherwise each one sees its own in-memory database
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    fn report() -> LocationReport {
        LocationReport::capture(
            SendParams {
                lat: "40.4168".into(),
                lon: "-3.7038".into(),
                agent: "TestAgent".into(),
            },
            None,
            Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn inserts_a_new_row_per_call() {
        let store = SqlRecordStore::new(memory_pool().await).await.unwrap();

        let first = store.append(&report()).await.unwrap();
        let second = store.append(&report()).await.unwrap();

        assert_eq!(first, RecordId::Row(1));
        assert_eq!(second, RecordId::Row(2));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ruta1")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn stores_every_field() {
        let store = SqlRecordStore::new(memory_pool().await).await.unwrap();
        let report = report();
        store.append(&report).await.unwrap();

        let row = sqlx::query(
            "SELECT latitude, longitude, timestamp, ip, user_agent, maps_url FROM ruta1",
        )
        .fetch_one(&store.pool)
        .await
        .unwrap();

        assert_eq!(row.get::<String, _>("latitude"), "40.4168");
        assert_eq!(row.get::<String, _>("longitude"), "-3.7038");
        assert_eq!(row.get::<DateTime<Utc>, _>("timestamp"), report.timestamp);
        assert_eq!(row.get::<String, _>("ip"), "N/A");
        assert_eq!(row.get::<String, _>("user_agent"), "TestAgent");
        assert_eq!(row.get::<String, _>("maps_url"), report.maps_url);
    }

    #[tokio::test]
    async fn table_creation_is_idempotent() {
        let pool = memory_pool().await;
        SqlRecordStore::new(pool.clone()).await.unwrap();
        let store = SqlRecordStore::new(pool).await.unwrap();

        store.ping().await.unwrap();
        assert_eq!(store.append(&report()).await.unwrap(), RecordId::Row(1));
    }
}
