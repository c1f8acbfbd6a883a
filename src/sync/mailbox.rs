use super::SyncEngine;
use super::report::{Disposition, ItemOutcome, ItemReport, MailboxReport};
use crate::core::{AppConfig, ProviderError, SyncError};
use crate::parse::Command;
use crate::provider::{BoundMessage, DeleteMode, FolderHandle, ItemRef, MailCalendarProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Messages fetched per mailbox per cycle
    pub max_messages: usize,
    /// How to remove a handled email, `None` keeps it in the inbox
    pub remove_processed: Option<DeleteMode>,
}

impl From<&AppConfig> for SyncOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_messages: config.message_count,
            remove_processed: config.move_emails.then_some(DeleteMode::MoveToDeleted),
        }
    }
}

impl SyncEngine {
    /// Process one mailbox's inbox. Never fails as a whole: a mailbox
    /// that can't be read is an `Err` inside the report and every
    /// message gets its own result.
    pub async fn process_inbox(
        &self,
        provider: &dyn MailCalendarProvider,
        mailbox: &str,
    ) -> MailboxReport {
        tracing::info!("GetEmails: {}", mailbox);
        let result = self.process_items(provider, mailbox).await;
        if let Err(e) = &result {
            tracing::error!(mailbox, "Skipping mailbox: {}", e);
        }
        MailboxReport {
            mailbox: mailbox.to_string(),
            result,
        }
    }

    async fn process_items(
        &self,
        provider: &dyn MailCalendarProvider,
        mailbox: &str,
    ) -> Result<Vec<ItemReport>, SyncError> {
        let inbox = provider
            .resolve_inbox(mailbox)
            .await
            .map_err(|e| ProviderError::new("resolve inbox", mailbox, e))?;
        let items = provider
            .list_items(&inbox, self.options.max_messages)
            .await
            .map_err(|e| ProviderError::new("list inbox", mailbox, e))?;

        // Resolved on the first command so mail-only batches never
        // touch the calendar
        let mut calendar = None;
        let mut reports = Vec::with_capacity(items.len());
        for item in items {
            reports.push(self.process_item(provider, &item, &mut calendar).await);
        }
        Ok(reports)
    }

    async fn process_item(
        &self,
        provider: &dyn MailCalendarProvider,
        item: &ItemRef,
        calendar: &mut Option<FolderHandle>,
    ) -> ItemReport {
        let message = match provider.bind_message(item).await {
            Ok(message) => message,
            Err(e) => {
                let err = ProviderError::new("bind message", &item.id, e);
                tracing::warn!(mailbox = %item.mailbox, "Skipping message: {}", err);
                return ItemReport {
                    item_id: item.id.clone(),
                    subject: None,
                    result: Err(err.into()),
                };
            }
        };

        tracing::info!(mailbox = %item.mailbox, sent_at = ?message.sent_at, "E-Mail: {}", message.subject);
        let result = self.handle_message(provider, &message, calendar).await;
        if let Err(e) = &result {
            tracing::warn!(
                mailbox = %item.mailbox,
                "Skipping message {:?}: {}",
                message.subject,
                e
            );
        }

        ItemReport {
            item_id: item.id.clone(),
            subject: Some(message.subject),
            result,
        }
    }

    async fn handle_message(
        &self,
        provider: &dyn MailCalendarProvider,
        message: &BoundMessage,
        calendar: &mut Option<FolderHandle>,
    ) -> Result<ItemOutcome, SyncError> {
        let command = self
            .parser
            .classify(&message.subject, &message.body, (self.clock)())?;
        if command == Command::Ignore {
            return Ok(ItemOutcome::Ignored);
        }
        tracing::debug!(mailbox = %message.item.mailbox, "Command: {}", command.kind());

        let calendar = match calendar.clone() {
            Some(calendar) => calendar,
            None => {
                let mailbox = &message.item.mailbox;
                let resolved = provider
                    .resolve_calendar(mailbox)
                    .await
                    .map_err(|e| ProviderError::new("resolve calendar", mailbox, e))?;
                *calendar = Some(resolved.clone());
                resolved
            }
        };

        // Any failure above returns early and leaves the email in the
        // inbox for the next cycle
        let outcome = self
            .synchronizer
            .apply(provider, &calendar, &command)
            .await?;
        let disposition = self.dispose(provider, message).await;

        Ok(ItemOutcome::Applied {
            outcome,
            disposition,
        })
    }

    async fn dispose(
        &self,
        provider: &dyn MailCalendarProvider,
        message: &BoundMessage,
    ) -> Disposition {
        let Some(mode) = self.options.remove_processed else {
            return Disposition::Kept;
        };

        match provider.delete_message(&message.item, mode).await {
            Ok(()) => {
                tracing::info!(mode = mode.as_str(), "Delete email: {}", message.subject);
                Disposition::Removed(mode)
            }
            Err(e) => {
                tracing::warn!("Failed to remove email {:?}: {:#}", message.subject, e);
                Disposition::RemovalFailed(format!("{:#}", e))
            }
        }
    }
}
