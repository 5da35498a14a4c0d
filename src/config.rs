use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";
pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

#[derive(Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub app_id: String,
    pub app_secret: String,
    /// Mailbox that owns the drafts; also the demo sender and recipient.
    pub user: String,
    pub tenant: String,
    pub authority: String,
    pub scope: String,
    pub graph_api_base: Url,
    pub default_recipient_name: String,
    pub failure_policy: FailurePolicy,
    pub http_timeout_seconds: u64,
}

/// What the trigger does after a workflow step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Skip the remaining steps.
    #[default]
    Abort,
    /// Attempt every step and log each failure.
    Continue,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Abort => "abort",
            FailurePolicy::Continue => "continue",
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" | "short_circuit" => Ok(FailurePolicy::Abort),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(ConfigError::InvalidFailurePolicy(other.to_string())),
        }
    }
}

impl Config {
    /// Reads the process environment only; `main` loads `.env` before the
    /// logger and this run.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let user = required("AAD_USER")?;
        let tenant = match lookup("AAD_TENANT").filter(|t| !t.trim().is_empty()) {
            Some(tenant) => tenant,
            None => tenant_from_user(&user).ok_or(ConfigError::MissingTenant)?,
        };

        let raw_api_base =
            lookup("GRAPH_API_BASE").unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string());
        let graph_api_base = Url::parse(&raw_api_base)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or(ConfigError::InvalidApiBase(raw_api_base))?;

        let server_port = lookup("FUNCTIONS_CUSTOMHANDLER_PORT")
            .or_else(|| lookup("SERVER_PORT"))
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let failure_policy = match lookup("MAIL_FAILURE_POLICY") {
            Some(raw) => raw.parse()?,
            None => FailurePolicy::default(),
        };

        let http_timeout_seconds = match lookup("HTTP_TIMEOUT_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout(raw))?,
            None => 30,
        };

        Ok(Config {
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port,
            app_id: required("AAD_APP_ID")?,
            app_secret: required("AAD_APP_SECRET")?,
            user,
            tenant,
            authority: lookup("AAD_AUTHORITY").unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
            scope: lookup("GRAPH_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            graph_api_base,
            default_recipient_name: lookup("DEFAULT_RECIPIENT_NAME")
                .unwrap_or_else(|| "Joe Bloggs".to_string()),
            failure_policy,
            http_timeout_seconds,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/'),
            self.tenant
        )
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("user", &self.user)
            .field("tenant", &self.tenant)
            .field("authority", &self.authority)
            .field("scope", &self.scope)
            .field("graph_api_base", &self.graph_api_base)
            .field("default_recipient_name", &self.default_recipient_name)
            .field("failure_policy", &self.failure_policy)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .finish()
    }
}

/// `joe@contoso.onmicrosoft.com` -> `contoso.onmicrosoft.com`
fn tenant_from_user(user: &str) -> Option<String> {
    user.rsplit_once('@')
        .map(|(_, domain)| domain.trim())
        .filter(|domain| !domain.is_empty())
        .map(str::to_string)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("AAD_TENANT is required when AAD_USER has no domain")]
    MissingTenant,
    #[error("Invalid server port")]
    InvalidPort,
    #[error("Invalid MAIL_FAILURE_POLICY '{0}' (expected 'abort' or 'continue')")]
    InvalidFailurePolicy(String),
    #[error("Invalid HTTP_TIMEOUT_SECONDS '{0}'")]
    InvalidTimeout(String),
    #[error("Invalid GRAPH_API_BASE '{0}'")]
    InvalidApiBase(String),
}
