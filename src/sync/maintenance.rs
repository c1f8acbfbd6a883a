//! Operator helpers: seed a mailbox with demo command emails and
//! wipe a calendar.
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rand::Rng;

use crate::parse::format_timestamp;
use crate::provider::{DeleteMode, MailCalendarProvider};

/// Build one demo create command for `id`: start `id` hours after
/// `now`, lasting two hours.
pub fn demo_command(id: u32, now: DateTime<Utc>, zone: Tz) -> (String, String) {
    let start = now.with_timezone(&zone) + Duration::hours(i64::from(id));
    let end = start + Duration::hours(2);
    let subject = format!("ID:{} Workshop", id);
    let body = format!(
        "{}\r\n{}\r\nThis is a generated seminar entry with ID:{}\r\nsent by mailcal.\r\n",
        format_timestamp(&start),
        format_timestamp(&end),
        id
    );
    (subject, body)
}

/// Send `count` create commands with random ids in `10..=99` from
/// `sender` to `mailbox`. Returns the subjects sent.
pub async fn seed_demo_commands<R: Rng>(
    provider: &dyn MailCalendarProvider,
    sender: &str,
    mailbox: &str,
    count: usize,
    zone: Tz,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Vec<String>> {
    let mut sent = Vec::with_capacity(count);
    for _ in 0..count {
        let id = rng.gen_range(10..100);
        let (subject, body) = demo_command(id, now, zone);
        provider
            .send_message(sender, mailbox, &subject, &body)
            .await
            .with_context(|| format!("send demo command {:?} to {}", subject, mailbox))?;
        tracing::info!("Sent: {}", subject);
        sent.push(subject);
    }
    Ok(sent)
}

#[derive(Debug, Default)]
pub struct PurgeReport {
    pub removed: Vec<String>,
    /// Subject and error of every item that could not be deleted
    pub failed: Vec<(String, String)>,
}

/// Hard-delete up to `limit` calendar items of `mailbox`, whatever
/// their kind.
pub async fn purge_calendar(
    provider: &dyn MailCalendarProvider,
    mailbox: &str,
    limit: usize,
) -> Result<PurgeReport> {
    let calendar = provider
        .resolve_calendar(mailbox)
        .await
        .with_context(|| format!("resolve calendar for {}", mailbox))?;
    let appointments = provider
        .list_appointments(&calendar, limit)
        .await
        .with_context(|| format!("list calendar items for {}", mailbox))?;

    let mut report = PurgeReport::default();
    for appointment in appointments {
        match provider
            .delete_appointment(&appointment, DeleteMode::HardDelete)
            .await
        {
            Ok(()) => {
                tracing::info!("Deleting: {}", appointment.subject);
                report.removed.push(appointment.subject);
            }
            Err(e) => {
                tracing::warn!("Error deleting {}: {:#}", appointment.subject, e);
                report
                    .failed
                    .push((appointment.subject, format!("{:#}", e)));
            }
        }
    }
    Ok(report)
}
