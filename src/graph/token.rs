use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Deserializer};

use crate::config::Config;
use crate::error::{AppError, Result};

/// Bearer token returned by the client-credentials grant.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub token_type: String,
    #[serde(deserialize_with = "seconds")]
    pub expires_in: u64,
    #[serde(default, deserialize_with = "seconds")]
    pub ext_expires_in: u64,
    pub access_token: String,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("ext_expires_in", &self.ext_expires_in)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// The v1 endpoint sends lifetimes as strings, v2 as numbers.
fn seconds<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(u64),
        Text(String),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Number(n) => Ok(n),
        Seconds::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Exchanges the application's client id/secret for an access token.
#[derive(Clone)]
pub struct TokenProvider {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

impl TokenProvider {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            token_url: config.token_url(),
            client_id: config.app_id.clone(),
            client_secret: config.app_secret.clone(),
            scope: config.scope.clone(),
        }
    }

    /// Request a fresh token. Nothing is cached; every call hits the endpoint.
    pub async fn acquire_token(&self) -> Result<AccessToken> {
        tracing::info!(url = %self.token_url, "Requesting access token");

        let params = [
            ("grant_type", "client_credentials"),
            ("scope", self.scope.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let res = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            tracing::warn!(status = %status, "Token endpoint rejected the request");
            return Err(AppError::Auth {
                status: status.as_u16(),
                body,
            });
        }

        let token: AccessToken = serde_json::from_str(&body).map_err(|e| AppError::Auth {
            status: status.as_u16(),
            body: format!("invalid token response: {}", e),
        })?;

        if token.access_token.is_empty() {
            return Err(AppError::Auth {
                status: status.as_u16(),
                body: "token response carried an empty access_token".to_string(),
            });
        }

        tracing::info!(expires_in = token.expires_in, "Access token acquired");
        Ok(token)
    }
}
