use anyhow::Context;

use crate::config::AppConfig;
use crate::database::Store;

pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    let store = Store::connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    store.migrate().await?;
    println!("Migrations applied");
    Ok(())
}
