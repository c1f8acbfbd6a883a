//! Capability interface for the mail and calendar service.
//!
//! The sync engine only talks to a `MailCalendarProvider` passed in by
//! the caller. `crate::microsoft::GraphProvider` is the production
//! implementation.
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// A resolved mail or calendar folder inside one mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    pub mailbox: String,
    pub id: String,
}

/// Identity of one message in a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub mailbox: String,
    pub id: String,
}

/// Full content of one inbox message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundMessage {
    pub item: ItemRef,
    pub subject: String,
    pub body: String,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Recoverable by the mailbox owner
    SoftDelete,
    MoveToDeleted,
    HardDelete,
}

impl DeleteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteMode::SoftDelete => "soft-delete",
            DeleteMode::MoveToDeleted => "move-to-deleted",
            DeleteMode::HardDelete => "hard-delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarItemKind {
    /// Single-instance item the mailbox owns and can delete
    Appointment,
    /// Meeting organized by someone else
    MeetingInvitation,
    /// Series master or occurrence
    Recurring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub subject: String,
    pub body: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    /// Zone applied to both start and end
    pub time_zone_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRef {
    pub mailbox: String,
    pub id: String,
    pub subject: String,
    pub kind: CalendarItemKind,
}

#[async_trait]
pub trait MailCalendarProvider: Send + Sync {
    async fn resolve_inbox(&self, mailbox: &str) -> Result<FolderHandle>;

    async fn resolve_calendar(&self, mailbox: &str) -> Result<FolderHandle>;

    /// Up to `max_count` messages in provider order
    async fn list_items(&self, folder: &FolderHandle, max_count: usize) -> Result<Vec<ItemRef>>;

    async fn bind_message(&self, item: &ItemRef) -> Result<BoundMessage>;

    async fn delete_message(&self, item: &ItemRef, mode: DeleteMode) -> Result<()>;

    async fn create_appointment(
        &self,
        calendar: &FolderHandle,
        appointment: &NewAppointment,
    ) -> Result<AppointmentRef>;

    /// Calendar items whose subject contains `subject_substring`. The
    /// provider's own matching may be looser than ours, callers filter
    /// the results again.
    async fn find_appointments(
        &self,
        calendar: &FolderHandle,
        subject_substring: &str,
        max_count: usize,
    ) -> Result<Vec<AppointmentRef>>;

    async fn delete_appointment(&self, appointment: &AppointmentRef, mode: DeleteMode)
    -> Result<()>;

    async fn send_message(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<()>;

    async fn list_appointments(
        &self,
        calendar: &FolderHandle,
        max_count: usize,
    ) -> Result<Vec<AppointmentRef>>;
}
