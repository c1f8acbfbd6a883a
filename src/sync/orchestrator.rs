use super::SyncEngine;
use super::report::CycleReport;
use crate::provider::MailCalendarProvider;

impl SyncEngine {
    /// One pass over `mailboxes` in order. A failing mailbox is
    /// recorded in its report and the next one still runs.
    pub async fn run_cycle(
        &self,
        provider: &dyn MailCalendarProvider,
        mailboxes: &[String],
    ) -> CycleReport {
        let mut report = CycleReport::default();
        for mailbox in mailboxes {
            report
                .mailboxes
                .push(self.process_inbox(provider, mailbox).await);
        }

        let summary = report.summary();
        tracing::info!(
            mailboxes = mailboxes.len(),
            failed_mailboxes = summary.failed_mailboxes,
            created = summary.created,
            deleted = summary.deleted,
            ignored = summary.ignored,
            failed = summary.failed,
            mail_removed = summary.mail_removed,
            "Sync cycle finished"
        );
        report
    }
}
