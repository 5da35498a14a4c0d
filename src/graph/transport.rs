use std::fmt;

use reqwest::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::{Client, StatusCode, Url};

use crate::error::Result;
use crate::graph::AccessToken;

/// Sent when a call has no payload.
const EMPTY_BODY: &str = "{}";

/// HTTP verbs the mail API workflow uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphMethod {
    Post,
    Patch,
}

impl GraphMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraphMethod::Post => "POST",
            GraphMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for GraphMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the workflow needs from a Graph response.
#[derive(Debug, Clone)]
pub struct GraphResponse {
    pub status: StatusCode,
    /// Raw `Location` header; decoding is left to the caller.
    pub location: Option<HeaderValue>,
    pub body: String,
}

impl GraphResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Authenticated JSON requests against the mail API. Status codes are left
/// to the caller.
#[derive(Clone)]
pub struct MailTransport {
    client: Client,
}

impl MailTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn send(
        &self,
        method: GraphMethod,
        url: Url,
        body: Option<String>,
        token: &AccessToken,
    ) -> Result<GraphResponse> {
        tracing::info!(method = %method, url = %url, "Sending request to Graph");

        let body = match body {
            Some(json) => {
                tracing::debug!(body = %json, "Request body");
                json
            }
            None => EMPTY_BODY.to_string(),
        };

        let request = match method {
            GraphMethod::Post => self.client.post(url),
            GraphMethod::Patch => self.client.patch(url),
        };

        let res = request
            .bearer_auth(&token.access_token)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = res.status();
        let location = res.headers().get(LOCATION).cloned();
        let body = res.text().await?;

        tracing::debug!(status = %status, "Graph responded");

        Ok(GraphResponse {
            status,
            location,
            body,
        })
    }
}
