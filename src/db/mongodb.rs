use anyhow::{Context, Result};
use log::info;
use mongodb::bson::doc;
use mongodb::{Client, Database};

/// Connect to MongoDB and check the server answers before serving requests.
pub async fn get_database(uri: &str, name: &str) -> Result<Database> {
    let client = Client::with_uri_str(uri)
        .await
        .context("Failed to parse MONGODB_URI")?;
    let database = client.database(name);

    database
        .run_command(doc! { "ping": 1 })
        .await
        .context("MongoDB did not answer ping")?;
    info!("Connected to MongoDB database {}", name);

    Ok(database)
}
