//! Apply a parsed command to a mailbox calendar.
use chrono_tz::Tz;

use super::report::SyncOutcome;
use crate::core::{ProviderError, SyncError};
use crate::parse::{Command, format_timestamp};
use crate::provider::{
    CalendarItemKind, DeleteMode, FolderHandle, MailCalendarProvider, NewAppointment,
};

/// How a delete command's match token selects appointments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Case-insensitive substring of the subject, so `id:4` also
    /// matches `id:45`.
    #[default]
    SubjectContains,
}

impl MatchPolicy {
    pub fn matches(&self, subject: &str, token: &str) -> bool {
        match self {
            MatchPolicy::SubjectContains => {
                subject.to_lowercase().contains(&token.to_lowercase())
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AppointmentSynchronizer {
    time_zone: Tz,
    find_limit: usize,
    match_policy: MatchPolicy,
}

impl AppointmentSynchronizer {
    pub fn new(time_zone: Tz, find_limit: usize) -> Self {
        Self {
            time_zone,
            find_limit,
            match_policy: MatchPolicy::default(),
        }
    }

    pub async fn apply(
        &self,
        provider: &dyn MailCalendarProvider,
        calendar: &FolderHandle,
        command: &Command,
    ) -> Result<SyncOutcome, SyncError> {
        match command {
            Command::Ignore => Ok(SyncOutcome::Ignored),
            Command::CreateAppointment {
                subject,
                start_at,
                end_at,
                notes,
            } => {
                let appointment = NewAppointment {
                    subject: subject.clone(),
                    body: notes.clone(),
                    start: start_at.with_timezone(&self.time_zone),
                    end: end_at.with_timezone(&self.time_zone),
                    time_zone_id: self.time_zone.name().to_string(),
                };
                self.create(provider, calendar, appointment).await
            }
            Command::DeleteAppointment { match_token } => {
                self.delete(provider, calendar, match_token).await
            }
        }
    }

    async fn create(
        &self,
        provider: &dyn MailCalendarProvider,
        calendar: &FolderHandle,
        appointment: NewAppointment,
    ) -> Result<SyncOutcome, SyncError> {
        tracing::info!(
            mailbox = %calendar.mailbox,
            "Creating: {} to {}. {}",
            format_timestamp(&appointment.start),
            format_timestamp(&appointment.end),
            appointment.subject
        );

        let created = provider
            .create_appointment(calendar, &appointment)
            .await
            .map_err(|e| ProviderError::new("create appointment", &calendar.mailbox, e))?;

        Ok(SyncOutcome::Created {
            appointment_id: created.id,
            subject: appointment.subject,
        })
    }

    /// Soft-delete every owned single-instance appointment matching
    /// `match_token`. Zero matches is a success. When some deletes
    /// fail the rest are still attempted and the first error is
    /// returned.
    async fn delete(
        &self,
        provider: &dyn MailCalendarProvider,
        calendar: &FolderHandle,
        match_token: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let candidates = provider
            .find_appointments(calendar, match_token, self.find_limit)
            .await
            .map_err(|e| ProviderError::new("find appointments", &calendar.mailbox, e))?;

        let mut removed = 0;
        let mut skipped = 0;
        let mut first_error = None;

        for candidate in candidates {
            if !self.match_policy.matches(&candidate.subject, match_token) {
                tracing::debug!("Not a match for {}: {}", match_token, candidate.subject);
                skipped += 1;
                continue;
            }
            if candidate.kind != CalendarItemKind::Appointment {
                tracing::debug!(
                    "Skipping {:?} that can't be deleted: {}",
                    candidate.kind,
                    candidate.subject
                );
                skipped += 1;
                continue;
            }

            tracing::info!(mailbox = %calendar.mailbox, "Delete appointment: {}", candidate.subject);
            match provider
                .delete_appointment(&candidate, DeleteMode::SoftDelete)
                .await
            {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!("Failed to delete appointment {}: {:#}", candidate.subject, e);
                    first_error.get_or_insert_with(|| {
                        ProviderError::new("delete appointment", candidate.subject.clone(), e)
                    });
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err.into());
        }

        Ok(SyncOutcome::Deleted {
            match_token: match_token.to_string(),
            removed,
            skipped,
        })
    }
}
