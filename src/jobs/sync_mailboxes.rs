use async_trait::async_trait;
use std::time::Duration;

use super::PeriodicJob;
use crate::core::AppConfig;
use crate::provider::MailCalendarProvider;
use crate::sync::{CycleReport, SyncEngine};

#[derive(Debug)]
pub struct SyncMailboxes {
    interval: Duration,
}

impl SyncMailboxes {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for SyncMailboxes {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 5))
    }
}

/// One cycle over every configured mailbox
pub async fn sync_once(config: &AppConfig, provider: &dyn MailCalendarProvider) -> CycleReport {
    let engine = SyncEngine::from_config(config);
    let report = engine.run_cycle(provider, &config.mailboxes).await;
    for failed in report.failed_mailboxes() {
        if let Err(e) = &failed.result {
            tracing::error!("Mailbox {} was skipped: {}", failed.mailbox, e);
        }
    }
    report
}

#[async_trait]
impl PeriodicJob for SyncMailboxes {
    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_job(&self, config: &AppConfig, provider: &dyn MailCalendarProvider) {
        sync_once(config, provider).await;
    }
}
