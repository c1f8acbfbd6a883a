use anyhow::{Result, bail};

use crate::core::AppConfig;
use crate::jobs::sync_mailboxes::sync_once;
use crate::microsoft::GraphProvider;

pub async fn run(config: &AppConfig) -> Result<()> {
    let provider = GraphProvider::from_config(config);
    let report = sync_once(config, &provider).await;
    let summary = report.summary();

    println!(
        "Processed {} mailbox(es): {} created, {} deleted, {} ignored, {} failed",
        report.mailboxes.len(),
        summary.created,
        summary.deleted,
        summary.ignored,
        summary.failed
    );

    // Only a cycle that reached no mailbox at all counts as a failed run
    if summary.failed_mailboxes == report.mailboxes.len() {
        bail!("Every configured mailbox failed");
    }
    Ok(())
}
