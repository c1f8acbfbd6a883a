//! Typed outcomes of a sync cycle.
use crate::core::SyncError;
use crate::provider::DeleteMode;

/// What the synchronizer did for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Ignored,
    Created {
        appointment_id: String,
        subject: String,
    },
    Deleted {
        match_token: String,
        removed: usize,
        /// Matches left alone (meeting invitations, recurring items,
        /// search hits that fail the match policy)
        skipped: usize,
    },
}

/// What happened to the source email after its command was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Kept,
    Removed(DeleteMode),
    RemovalFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Ignored,
    Applied {
        outcome: SyncOutcome,
        disposition: Disposition,
    },
}

#[derive(Debug)]
pub struct ItemReport {
    pub item_id: String,
    /// `None` when the message could not be bound
    pub subject: Option<String>,
    pub result: Result<ItemOutcome, SyncError>,
}

#[derive(Debug)]
pub struct MailboxReport {
    pub mailbox: String,
    pub result: Result<Vec<ItemReport>, SyncError>,
}

impl MailboxReport {
    pub fn items(&self) -> &[ItemReport] {
        match &self.result {
            Ok(items) => items,
            Err(_) => &[],
        }
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        if self.result.is_err() {
            summary.failed_mailboxes += 1;
        }
        for item in self.items() {
            summary.record(item);
        }
        summary
    }
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub mailboxes: Vec<MailboxReport>,
}

impl CycleReport {
    pub fn summary(&self) -> Summary {
        self.mailboxes
            .iter()
            .fold(Summary::default(), |acc, m| acc + m.summary())
    }

    pub fn failed_mailboxes(&self) -> impl Iterator<Item = &MailboxReport> {
        self.mailboxes.iter().filter(|m| m.result.is_err())
    }
}

/// Counters logged at the end of every cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub created: usize,
    /// Appointments removed, not delete commands seen
    pub deleted: usize,
    pub ignored: usize,
    pub failed: usize,
    pub mail_removed: usize,
    pub failed_mailboxes: usize,
}

impl Summary {
    fn record(&mut self, item: &ItemReport) {
        match &item.result {
            Err(_) => self.failed += 1,
            Ok(ItemOutcome::Ignored) => self.ignored += 1,
            Ok(ItemOutcome::Applied {
                outcome,
                disposition,
            }) => {
                match outcome {
                    SyncOutcome::Created { .. } => self.created += 1,
                    SyncOutcome::Deleted { removed, .. } => self.deleted += removed,
                    SyncOutcome::Ignored => self.ignored += 1,
                }
                if matches!(disposition, Disposition::Removed(_)) {
                    self.mail_removed += 1;
                }
            }
        }
    }
}

impl std::ops::Add for Summary {
    type Output = Summary;

    fn add(self, other: Summary) -> Summary {
        Summary {
            created: self.created + other.created,
            deleted: self.deleted + other.deleted,
            ignored: self.ignored + other.ignored,
            failed: self.failed + other.failed,
            mail_removed: self.mail_removed + other.mail_removed,
            failed_mailboxes: self.failed_mailboxes + other.failed_mailboxes,
        }
    }
}
