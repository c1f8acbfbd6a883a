use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use super::errors::ConfigError;

pub const DEFAULT_GRAPH_API_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_TIME_ZONE: &str = "America/New_York";

/// Separator between addresses in `MAILCAL_MAILBOXES`
const MAILBOX_DELIMITER: char = ';';

#[derive(Clone)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

// Keep the secret out of logs
impl fmt::Debug for GraphCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub mailboxes: Vec<String>,
    pub message_count: usize,
    pub move_emails: bool,
    pub time_zone: Tz,
    pub find_limit: usize,
    pub sync_interval: Duration,
    pub graph_api_url: String,
    pub graph_token_url: String,
    pub graph_credentials: GraphCredentials,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key/value source. `from_env` passes
    /// the process environment, tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mailboxes = parse_mailboxes(&required(&lookup, "MAILCAL_MAILBOXES")?);
        if mailboxes.is_empty() {
            return Err(ConfigError::EmptyMailboxList("MAILCAL_MAILBOXES"));
        }

        let message_count = positive(&lookup, "MAILCAL_MESSAGE_COUNT", 10)?;
        let find_limit = positive(&lookup, "MAILCAL_FIND_LIMIT", 10)?;
        let sync_interval =
            Duration::from_secs(positive(&lookup, "MAILCAL_SYNC_INTERVAL_SECS", 300)? as u64);

        // Anything other than "yes" leaves processed mail in the inbox
        let move_emails = lookup("MAILCAL_MOVE_EMAILS")
            .map(|v| v.trim().eq_ignore_ascii_case("yes"))
            .unwrap_or(false);

        let time_zone_name =
            lookup("MAILCAL_TIME_ZONE").unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string());
        let time_zone =
            Tz::from_str(time_zone_name.trim()).map_err(|e| ConfigError::Invalid {
                key: "MAILCAL_TIME_ZONE",
                value: time_zone_name.clone(),
                reason: e.to_string(),
            })?;

        let graph_credentials = GraphCredentials {
            tenant_id: required(&lookup, "MAILCAL_GRAPH_TENANT_ID")?,
            client_id: required(&lookup, "MAILCAL_GRAPH_CLIENT_ID")?,
            client_secret: required(&lookup, "MAILCAL_GRAPH_CLIENT_SECRET")?,
        };
        let graph_api_url = lookup("MAILCAL_GRAPH_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GRAPH_API_URL.to_string());
        let graph_token_url = lookup("MAILCAL_GRAPH_TOKEN_URL").unwrap_or_else(|| {
            format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                graph_credentials.tenant_id
            )
        });

        Ok(Self {
            mailboxes,
            message_count,
            move_emails,
            time_zone,
            find_limit,
            sync_interval,
            graph_api_url,
            graph_token_url,
            graph_credentials,
        })
    }
}

pub fn parse_mailboxes(raw: &str) -> Vec<String> {
    raw.split(MAILBOX_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn positive<F>(lookup: &F, key: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(ConfigError::Invalid {
            key,
            value,
            reason: "must be greater than zero".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }),
    }
}
