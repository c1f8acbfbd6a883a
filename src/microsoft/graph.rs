//! `MailCalendarProvider` backed by the Microsoft Graph REST API.
//!
//! Each handle carries its mailbox address so every call can be made
//! against `/users/{mailbox}/...` with application permissions.
use std::time::Duration as StdDuration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use htmd::HtmlToMarkdown;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use super::oauth::{TokenCache, redact_response_body};
use crate::core::AppConfig;
use crate::core::config::GraphCredentials;
use crate::provider::{
    AppointmentRef, BoundMessage, CalendarItemKind, DeleteMode, FolderHandle, ItemRef,
    MailCalendarProvider, NewAppointment,
};

const MAX_RATE_LIMIT_RETRIES: usize = 5;
const MAX_BACKOFF_SECONDS: u64 = 32;
const EVENT_SELECT_FIELDS: &str = "id,subject,type,isOrganizer";
const GRAPH_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Deserialize)]
struct GraphFolder {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GraphList<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct GraphItemId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GraphMessage {
    subject: Option<String>,
    body: Option<GraphBody>,
    #[serde(rename = "sentDateTime")]
    sent_date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct GraphBody {
    #[serde(rename = "contentType")]
    content_type: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphEvent {
    id: String,
    subject: Option<String>,
    #[serde(rename = "type")]
    event_type: Option<String>,
    #[serde(rename = "isOrganizer")]
    is_organizer: Option<bool>,
}

impl GraphEvent {
    /// Only single-instance events we organized can be removed without
    /// sending a cancellation to someone else.
    fn kind(&self) -> CalendarItemKind {
        match (self.event_type.as_deref(), self.is_organizer) {
            (Some("singleInstance") | None, Some(false)) => CalendarItemKind::MeetingInvitation,
            (Some("singleInstance") | None, _) => CalendarItemKind::Appointment,
            _ => CalendarItemKind::Recurring,
        }
    }

    fn into_ref(self, mailbox: &str) -> AppointmentRef {
        let kind = self.kind();
        AppointmentRef {
            mailbox: mailbox.to_string(),
            id: self.id,
            subject: self.subject.unwrap_or_default(),
            kind,
        }
    }
}

#[derive(Debug, Serialize)]
struct ItemBody<'a> {
    #[serde(rename = "contentType")]
    content_type: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct DateTimeTimeZone {
    #[serde(rename = "dateTime")]
    date_time: String,
    #[serde(rename = "timeZone")]
    time_zone: String,
}

#[derive(Debug, Serialize)]
struct NewEventRequest<'a> {
    subject: &'a str,
    body: ItemBody<'a>,
    start: DateTimeTimeZone,
    end: DateTimeTimeZone,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    address: &'a str,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    #[serde(rename = "emailAddress")]
    email_address: EmailAddress<'a>,
}

#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    subject: &'a str,
    body: ItemBody<'a>,
    #[serde(rename = "toRecipients")]
    to_recipients: Vec<Recipient<'a>>,
}

#[derive(Debug, Serialize)]
struct SendMailRequest<'a> {
    message: OutgoingMessage<'a>,
    #[serde(rename = "saveToSentItems")]
    save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
struct MoveRequest<'a> {
    #[serde(rename = "destinationId")]
    destination_id: &'a str,
}

/// Escape a value for use inside a single-quoted OData string literal
fn odata_string(value: &str) -> String {
    value.replace('\'', "''")
}

fn html_to_text(html: &str) -> Result<String> {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "head", "img"])
        .build();
    converter
        .convert(html)
        .context("convert HTML body to text")
}

fn message_body(body: Option<GraphBody>) -> Result<String> {
    let Some(body) = body else {
        return Ok(String::new());
    };
    let content = body.content.unwrap_or_default();
    match body.content_type.as_deref() {
        Some(t) if t.eq_ignore_ascii_case("html") => html_to_text(&content),
        _ => Ok(content),
    }
}

pub struct GraphProvider {
    client: Client,
    api_url: String,
    tokens: TokenCache,
}

impl GraphProvider {
    pub fn new(api_url: &str, token_url: &str, credentials: GraphCredentials) -> Self {
        let client = Client::new();
        Self {
            tokens: TokenCache::new(client.clone(), token_url, credentials),
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.graph_api_url,
            &config.graph_token_url,
            config.graph_credentials.clone(),
        )
    }

    fn user_url(&self, mailbox: &str, path: &str) -> String {
        format!(
            "{}/users/{}/{}",
            self.api_url,
            urlencoding::encode(mailbox),
            path
        )
    }

    /// Send an authorized request, retrying on 429 with the server's
    /// `Retry-After` or an exponential backoff. Returns the body text.
    async fn execute(&self, request: RequestBuilder, what: &str) -> Result<String> {
        let token = self.tokens.access_token().await?;
        let request = request
            .bearer_auth(token)
            .header("accept", "application/json");
        let mut backoff_seconds = 1u64;

        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            let Some(attempt_request) = request.try_clone() else {
                bail!("{}: request can't be retried", what);
            };
            let res = attempt_request
                .send()
                .await
                .with_context(|| format!("request {}", what))?;
            let status = res.status();

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_RATE_LIMIT_RETRIES {
                let retry_after_seconds = res
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(backoff_seconds);
                tracing::warn!(
                    "Rate limited on {}, retrying in {}s (attempt {})",
                    what,
                    retry_after_seconds,
                    attempt + 1
                );
                sleep(StdDuration::from_secs(retry_after_seconds)).await;
                backoff_seconds = (backoff_seconds * 2).min(MAX_BACKOFF_SECONDS);
                continue;
            }

            let text = res.text().await.unwrap_or_default();
            if !status.is_success() {
                bail!(
                    "{} failed: {} ({})",
                    what,
                    status,
                    redact_response_body(&text)
                );
            }
            return Ok(text);
        }

        bail!("{} failed: rate limit retries exhausted", what)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let text = self.execute(request, what).await?;
        serde_json::from_str(&text).with_context(|| format!("decode {} response", what))
    }
}

#[async_trait]
impl MailCalendarProvider for GraphProvider {
    async fn resolve_inbox(&self, mailbox: &str) -> Result<FolderHandle> {
        let url = self.user_url(mailbox, "mailFolders/inbox");
        let folder: GraphFolder = self.fetch(self.client.get(&url), "resolve inbox").await?;
        Ok(FolderHandle {
            mailbox: mailbox.to_string(),
            id: folder.id,
        })
    }

    async fn resolve_calendar(&self, mailbox: &str) -> Result<FolderHandle> {
        let url = self.user_url(mailbox, "calendar");
        let folder: GraphFolder = self.fetch(self.client.get(&url), "resolve calendar").await?;
        Ok(FolderHandle {
            mailbox: mailbox.to_string(),
            id: folder.id,
        })
    }

    async fn list_items(&self, folder: &FolderHandle, max_count: usize) -> Result<Vec<ItemRef>> {
        let url = self.user_url(
            &folder.mailbox,
            &format!("mailFolders/{}/messages", urlencoding::encode(&folder.id)),
        );
        let request = self.client.get(&url).query(&[
            ("$top", max_count.to_string()),
            ("$select", "id".to_string()),
            ("$orderby", "receivedDateTime desc".to_string()),
        ]);
        let list: GraphList<GraphItemId> = self.fetch(request, "list messages").await?;
        Ok(list
            .value
            .into_iter()
            .map(|item| ItemRef {
                mailbox: folder.mailbox.clone(),
                id: item.id,
            })
            .collect())
    }

    async fn bind_message(&self, item: &ItemRef) -> Result<BoundMessage> {
        let url = self.user_url(
            &item.mailbox,
            &format!("messages/{}", urlencoding::encode(&item.id)),
        );
        let request = self
            .client
            .get(&url)
            .query(&[("$select", "subject,body,sentDateTime")])
            .header("Prefer", "outlook.body-content-type=\"text\"");
        let message: GraphMessage = self.fetch(request, "bind message").await?;

        Ok(BoundMessage {
            item: item.clone(),
            subject: message.subject.unwrap_or_default(),
            body: message_body(message.body)?,
            sent_at: message.sent_date_time,
        })
    }

    async fn delete_message(&self, item: &ItemRef, mode: DeleteMode) -> Result<()> {
        let url = self.user_url(
            &item.mailbox,
            &format!("messages/{}", urlencoding::encode(&item.id)),
        );
        let request = match mode {
            DeleteMode::SoftDelete => self.client.delete(&url),
            DeleteMode::MoveToDeleted => self.client.post(format!("{}/move", url)).json(&MoveRequest {
                destination_id: "deleteditems",
            }),
            DeleteMode::HardDelete => self.client.post(format!("{}/permanentDelete", url)),
        };
        self.execute(request, "delete message").await?;
        Ok(())
    }

    async fn create_appointment(
        &self,
        calendar: &FolderHandle,
        appointment: &NewAppointment,
    ) -> Result<AppointmentRef> {
        let url = self.user_url(
            &calendar.mailbox,
            &format!("calendars/{}/events", urlencoding::encode(&calendar.id)),
        );
        let payload = NewEventRequest {
            subject: &appointment.subject,
            body: ItemBody {
                content_type: "HTML",
                content: &appointment.body,
            },
            start: DateTimeTimeZone {
                date_time: appointment
                    .start
                    .naive_local()
                    .format(GRAPH_DATETIME_FORMAT)
                    .to_string(),
                time_zone: appointment.time_zone_id.clone(),
            },
            end: DateTimeTimeZone {
                date_time: appointment
                    .end
                    .naive_local()
                    .format(GRAPH_DATETIME_FORMAT)
                    .to_string(),
                time_zone: appointment.time_zone_id.clone(),
            },
        };
        let event: GraphEvent = self
            .fetch(self.client.post(&url).json(&payload), "create event")
            .await?;
        Ok(event.into_ref(&calendar.mailbox))
    }

    async fn find_appointments(
        &self,
        calendar: &FolderHandle,
        subject_substring: &str,
        max_count: usize,
    ) -> Result<Vec<AppointmentRef>> {
        let url = self.user_url(
            &calendar.mailbox,
            &format!("calendars/{}/events", urlencoding::encode(&calendar.id)),
        );
        let filter = format!("contains(subject,'{}')", odata_string(subject_substring));
        let request = self.client.get(&url).query(&[
            ("$filter", filter),
            ("$top", max_count.to_string()),
            ("$select", EVENT_SELECT_FIELDS.to_string()),
        ]);
        let list: GraphList<GraphEvent> = self.fetch(request, "find events").await?;
        Ok(list
            .value
            .into_iter()
            .map(|event| event.into_ref(&calendar.mailbox))
            .collect())
    }

    async fn delete_appointment(
        &self,
        appointment: &AppointmentRef,
        mode: DeleteMode,
    ) -> Result<()> {
        let url = self.user_url(
            &appointment.mailbox,
            &format!("events/{}", urlencoding::encode(&appointment.id)),
        );
        let request = match mode {
            DeleteMode::SoftDelete | DeleteMode::MoveToDeleted => self.client.delete(&url),
            DeleteMode::HardDelete => self.client.post(format!("{}/permanentDelete", url)),
        };
        self.execute(request, "delete event").await?;
        Ok(())
    }

    async fn send_message(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<()> {
        let url = self.user_url(sender, "sendMail");
        let payload = SendMailRequest {
            message: OutgoingMessage {
                subject,
                body: ItemBody {
                    content_type: "Text",
                    content: body,
                },
                to_recipients: vec![Recipient {
                    email_address: EmailAddress { address: recipient },
                }],
            },
            save_to_sent_items: true,
        };
        self.execute(self.client.post(&url).json(&payload), "send mail")
            .await?;
        Ok(())
    }

    async fn list_appointments(
        &self,
        calendar: &FolderHandle,
        max_count: usize,
    ) -> Result<Vec<AppointmentRef>> {
        let url = self.user_url(
            &calendar.mailbox,
            &format!("calendars/{}/events", urlencoding::encode(&calendar.id)),
        );
        let request = self.client.get(&url).query(&[
            ("$top", max_count.to_string()),
            ("$select", EVENT_SELECT_FIELDS.to_string()),
        ]);
        let list: GraphList<GraphEvent> = self.fetch(request, "list events").await?;
        Ok(list
            .value
            .into_iter()
            .map(|event| event.into_ref(&calendar.mailbox))
            .collect())
    }
}
