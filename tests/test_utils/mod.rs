//! Test utilities for integration tests
#![allow(dead_code)]
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::New_York;

use mailcal::parse::CommandParser;
use mailcal::provider::{
    AppointmentRef, BoundMessage, CalendarItemKind, DeleteMode, FolderHandle, ItemRef,
    MailCalendarProvider, NewAppointment,
};
use mailcal::sync::{AppointmentSynchronizer, SyncEngine, SyncOptions};

#[derive(Debug, Clone)]
pub struct FakeMessage {
    pub id: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
struct FakeState {
    inboxes: HashMap<String, Vec<FakeMessage>>,
    calendars: HashMap<String, Vec<AppointmentRef>>,
    created: Vec<NewAppointment>,
    deleted_messages: Vec<(String, DeleteMode)>,
    deleted_appointments: Vec<(String, DeleteMode)>,
    sent: Vec<(String, String, String)>,
    calls: Vec<String>,
    failures: HashSet<String>,
    next_id: usize,
}

/// In-memory mail and calendar service.
///
/// Every call is recorded as `operation:target`. Adding the same key
/// with `failing` makes that call return an error.
#[derive(Default)]
pub struct FakeProvider {
    state: Mutex<FakeState>,
    /// Return every calendar item from `find_appointments` regardless
    /// of subject, like a provider with fuzzier search
    loose_search: bool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loose_search(mut self) -> Self {
        self.loose_search = true;
        self
    }

    pub fn with_message(self, mailbox: &str, id: &str, subject: &str, body: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .inboxes
            .entry(mailbox.to_string())
            .or_default()
            .push(FakeMessage {
                id: id.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        self
    }

    pub fn with_appointment(
        self,
        mailbox: &str,
        id: &str,
        subject: &str,
        kind: CalendarItemKind,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .calendars
            .entry(mailbox.to_string())
            .or_default()
            .push(AppointmentRef {
                mailbox: mailbox.to_string(),
                id: id.to_string(),
                subject: subject.to_string(),
                kind,
            });
        self
    }

    pub fn failing(self, key: &str) -> Self {
        self.state.lock().unwrap().failures.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn inbox_ids(&self, mailbox: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .inboxes
            .get(mailbox)
            .map(|messages| messages.iter().map(|m| m.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn appointment_subjects(&self, mailbox: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calendars
            .get(mailbox)
            .map(|items| items.iter().map(|a| a.subject.clone()).collect())
            .unwrap_or_default()
    }

    pub fn created(&self) -> Vec<NewAppointment> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn deleted_messages(&self) -> Vec<(String, DeleteMode)> {
        self.state.lock().unwrap().deleted_messages.clone()
    }

    pub fn deleted_appointments(&self) -> Vec<(String, DeleteMode)> {
        self.state.lock().unwrap().deleted_appointments.clone()
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Record the call and fail if it was marked as failing
    fn record(&self, operation: &str, target: &str) -> Result<()> {
        let key = format!("{}:{}", operation, target);
        let mut state = self.state.lock().unwrap();
        state.calls.push(key.clone());
        if state.failures.contains(&key) {
            return Err(anyhow!("injected failure for {}", key));
        }
        Ok(())
    }
}

#[async_trait]
impl MailCalendarProvider for FakeProvider {
    async fn resolve_inbox(&self, mailbox: &str) -> Result<FolderHandle> {
        self.record("resolve_inbox", mailbox)?;
        Ok(FolderHandle {
            mailbox: mailbox.to_string(),
            id: format!("{}/inbox", mailbox),
        })
    }

    async fn resolve_calendar(&self, mailbox: &str) -> Result<FolderHandle> {
        self.record("resolve_calendar", mailbox)?;
        Ok(FolderHandle {
            mailbox: mailbox.to_string(),
            id: format!("{}/calendar", mailbox),
        })
    }

    async fn list_items(&self, folder: &FolderHandle, max_count: usize) -> Result<Vec<ItemRef>> {
        self.record("list_items", &folder.mailbox)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .inboxes
            .get(&folder.mailbox)
            .map(|messages| {
                messages
                    .iter()
                    .take(max_count)
                    .map(|m| ItemRef {
                        mailbox: folder.mailbox.clone(),
                        id: m.id.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn bind_message(&self, item: &ItemRef) -> Result<BoundMessage> {
        self.record("bind_message", &item.id)?;
        let state = self.state.lock().unwrap();
        let message = state
            .inboxes
            .get(&item.mailbox)
            .and_then(|messages| messages.iter().find(|m| m.id == item.id))
            .ok_or_else(|| anyhow!("no message {}", item.id))?;
        Ok(BoundMessage {
            item: item.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
            sent_at: Some(Utc.with_ymd_and_hms(2018, 9, 1, 10, 0, 0).unwrap()),
        })
    }

    async fn delete_message(&self, item: &ItemRef, mode: DeleteMode) -> Result<()> {
        self.record("delete_message", &item.id)?;
        let mut state = self.state.lock().unwrap();
        if let Some(messages) = state.inboxes.get_mut(&item.mailbox) {
            messages.retain(|m| m.id != item.id);
        }
        state.deleted_messages.push((item.id.clone(), mode));
        Ok(())
    }

    async fn create_appointment(
        &self,
        calendar: &FolderHandle,
        appointment: &NewAppointment,
    ) -> Result<AppointmentRef> {
        self.record("create_appointment", &calendar.mailbox)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = AppointmentRef {
            mailbox: calendar.mailbox.clone(),
            id: format!("evt-{}", state.next_id),
            subject: appointment.subject.clone(),
            kind: CalendarItemKind::Appointment,
        };
        state
            .calendars
            .entry(calendar.mailbox.clone())
            .or_default()
            .push(created.clone());
        state.created.push(appointment.clone());
        Ok(created)
    }

    async fn find_appointments(
        &self,
        calendar: &FolderHandle,
        subject_substring: &str,
        max_count: usize,
    ) -> Result<Vec<AppointmentRef>> {
        self.record("find_appointments", &calendar.mailbox)?;
        let needle = subject_substring.to_lowercase();
        let state = self.state.lock().unwrap();
        Ok(state
            .calendars
            .get(&calendar.mailbox)
            .map(|items| {
                items
                    .iter()
                    .filter(|a| self.loose_search || a.subject.to_lowercase().contains(&needle))
                    .take(max_count)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_appointment(&self, appointment: &AppointmentRef, mode: DeleteMode) -> Result<()> {
        self.record("delete_appointment", &appointment.id)?;
        let mut state = self.state.lock().unwrap();
        if let Some(items) = state.calendars.get_mut(&appointment.mailbox) {
            items.retain(|a| a.id != appointment.id);
        }
        state
            .deleted_appointments
            .push((appointment.id.clone(), mode));
        Ok(())
    }

    async fn send_message(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<()> {
        self.record("send_message", recipient)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("sent-{}", state.next_id);
        state
            .inboxes
            .entry(recipient.to_string())
            .or_default()
            .push(FakeMessage {
                id,
                subject: subject.to_string(),
                body: body.to_string(),
            });
        state
            .sent
            .push((sender.to_string(), recipient.to_string(), subject.to_string()));
        Ok(())
    }

    async fn list_appointments(
        &self,
        calendar: &FolderHandle,
        max_count: usize,
    ) -> Result<Vec<AppointmentRef>> {
        self.record("list_appointments", &calendar.mailbox)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .calendars
            .get(&calendar.mailbox)
            .map(|items| items.iter().take(max_count).cloned().collect())
            .unwrap_or_default())
    }
}

pub fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 9, 1, 13, 5, 9).unwrap()
}

/// Engine in New York time that moves handled mail to Deleted Items
pub fn test_engine() -> SyncEngine {
    test_engine_with(SyncOptions {
        max_messages: 10,
        remove_processed: Some(DeleteMode::MoveToDeleted),
    })
}

pub fn test_engine_with(options: SyncOptions) -> SyncEngine {
    SyncEngine::new(
        CommandParser::new(New_York),
        AppointmentSynchronizer::new(New_York, 10),
        options,
    )
    .with_clock(fixed_clock)
}

pub const CREATE_BODY: &str = "20180902 09:00\r\n20180902 15:00\r\n";
