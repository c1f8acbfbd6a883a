use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{MissedTickBehavior, interval};

use crate::core::AppConfig;
use crate::provider::MailCalendarProvider;

pub mod sync_mailboxes;

/// Shortest period `run_periodically` will tick at
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub use sync_mailboxes::SyncMailboxes;

#[async_trait]
pub trait PeriodicJob: Send + Sync {
    fn interval(&self) -> Duration;

    async fn run_job(&self, config: &AppConfig, provider: &dyn MailCalendarProvider);
}

/// Run `job` right away and then every `job.interval()` until
/// `shutdown` resolves. A run in progress is never interrupted.
/// Intervals shorter than `MIN_INTERVAL` are raised to it.
pub async fn run_periodically<F>(
    job: &dyn PeriodicJob,
    config: &AppConfig,
    provider: &dyn MailCalendarProvider,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let period = job.interval();
    if period < MIN_INTERVAL {
        tracing::warn!(
            "Interval {:?} is too short, running every {:?} instead",
            period,
            MIN_INTERVAL
        );
    }
    let mut ticker = interval(period.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down periodic job");
                break;
            }
            _ = ticker.tick() => {
                job.run_job(config, provider).await;
            }
        }
    }
}
