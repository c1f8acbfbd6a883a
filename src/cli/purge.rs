use anyhow::{Result, bail};

use crate::core::AppConfig;
use crate::microsoft::GraphProvider;
use crate::sync::maintenance::purge_calendar;

pub async fn run(config: &AppConfig, mailbox: &str, limit: usize, yes: bool) -> Result<()> {
    if !yes {
        bail!(
            "Refusing to purge the calendar of {} without --yes",
            mailbox
        );
    }

    let provider = GraphProvider::from_config(config);
    let report = purge_calendar(&provider, mailbox, limit).await?;

    println!(
        "Deleted {} calendar item(s) from {}, {} failed",
        report.removed.len(),
        mailbox,
        report.failed.len()
    );
    for (subject, error) in &report.failed {
        println!("  {}: {}", subject, error);
    }
    Ok(())
}
