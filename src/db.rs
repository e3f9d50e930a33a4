use anyhow::Result;
use mongodb::{Client, options::ClientOptions};
use std::env;

pub async fn connect_to_mongo() -> Result<mongodb::Database> {
    let uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017/referral_bot".to_string());

    let client_options = ClientOptions::parse(&uri).await?;
    let client = Client::with_options(client_options)?;

    let db = client.database("referral_bot");

    // Test the connection
    db.run_command(mongodb::bson::doc! {"ping": 1}, None)
        .await?;

    Ok(db)
}
