use anyhow::Result;
use std::time::Duration;

use crate::core::AppConfig;
use crate::jobs::{SyncMailboxes, run_periodically};
use crate::microsoft::GraphProvider;

pub async fn run(config: &AppConfig, interval_secs: Option<u64>) -> Result<()> {
    let interval = interval_secs
        .map(Duration::from_secs)
        .unwrap_or(config.sync_interval);
    let provider = GraphProvider::from_config(config);
    let job = SyncMailboxes::new(interval);

    tracing::info!(
        "Watching {} mailbox(es) every {}s",
        config.mailboxes.len(),
        interval.as_secs()
    );
    run_periodically(&job, config, &provider, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
    })
    .await;

    Ok(())
}
