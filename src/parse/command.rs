//! Classify an inbound email as a calendar command.
//!
//! Create: subject contains `ID:` (any case, anywhere), body line 1
//! is the start and line 2 the end, both `YYYYMMDD HH:MM`.
//! Delete: subject starts with `delete` and contains `ID:`, the rest
//! of the subject is the match token.
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::date::parse_timestamp;
use crate::core::ParseError;

pub const MARKER_TOKEN: &str = "id:";
pub const DELETE_KEYWORD: &str = "delete";

/// Processing time written at the top of the appointment notes,
/// e.g. `9/1/2018 9:05:09 AM`
const NOTES_TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y %-I:%M:%S %p";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateAppointment {
        subject: String,
        start_at: DateTime<Tz>,
        end_at: DateTime<Tz>,
        notes: String,
    },
    DeleteAppointment {
        match_token: String,
    },
    Ignore,
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::CreateAppointment { .. } => "create",
            Command::DeleteAppointment { .. } => "delete",
            Command::Ignore => "ignore",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommandParser {
    time_zone: Tz,
}

impl CommandParser {
    pub fn new(time_zone: Tz) -> Self {
        Self { time_zone }
    }

    /// Classify a message. Never panics: a message that carries the
    /// marker but can't be read as a create command is an `Err`, not
    /// an `Ignore`.
    ///
    /// Only the leading `delete` is cut from a delete subject, so
    /// `delete id:45 delete` matches on `id:45 delete`.
    pub fn classify(
        &self,
        subject: &str,
        body: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<Command, ParseError> {
        let normalized = subject.to_lowercase();
        if !normalized.contains(MARKER_TOKEN) {
            return Ok(Command::Ignore);
        }

        if let Some(rest) = normalized.strip_prefix(DELETE_KEYWORD) {
            return Ok(Command::DeleteAppointment {
                match_token: rest.trim().to_string(),
            });
        }

        let lines = timestamp_lines(body);
        let [start, end, ..] = lines.as_slice() else {
            return Err(ParseError::MissingTimestampLines(lines.len()));
        };
        let start_at = parse_timestamp(start, self.time_zone)?;
        let end_at = parse_timestamp(end, self.time_zone)?;

        let notes = format!(
            "Timestamp: {}<br>{}",
            processed_at
                .with_timezone(&self.time_zone)
                .format(NOTES_TIMESTAMP_FORMAT),
            body
        );

        Ok(Command::CreateAppointment {
            subject: subject.to_string(),
            start_at,
            end_at,
            notes,
        })
    }
}

/// Non-empty, trimmed lines of `body`. `\r\n`, `\r` and `\n` all end a line.
fn timestamp_lines(body: &str) -> Vec<&str> {
    body.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}
