use anyhow::{Result, anyhow};
use chrono::Utc;

use crate::core::AppConfig;
use crate::microsoft::GraphProvider;
use crate::sync::maintenance::seed_demo_commands;

pub async fn run(
    config: &AppConfig,
    sender: &str,
    mailbox: Option<String>,
    count: usize,
) -> Result<()> {
    let mailbox = match mailbox {
        Some(mailbox) => mailbox,
        None => config
            .mailboxes
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("No mailbox configured"))?,
    };
    let provider = GraphProvider::from_config(config);

    let sent = seed_demo_commands(
        &provider,
        sender,
        &mailbox,
        count,
        config.time_zone,
        Utc::now(),
        &mut rand::thread_rng(),
    )
    .await?;

    println!("Sent {} demo command(s) to {}", sent.len(), mailbox);
    Ok(())
}
