#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use reqwest::Url;
use tokio::net::TcpListener;

use graph_mailer::config::{Config, FailurePolicy};
use graph_mailer::AppState;

pub const USER: &str = "joe@contoso.onmicrosoft.com";
pub const TENANT: &str = "contoso.onmicrosoft.com";
pub const MOCK_TOKEN: &str = "mock-access-token";
pub const LOCATION: &str = "https://graph.microsoft.com/v1.0/users/me/messages('AAMkA123')";

/// One request the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedCall {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("recorded body should be JSON")
    }
}

/// Canned responses for each endpoint.
#[derive(Debug, Clone)]
pub struct Behaviour {
    pub token_status: u16,
    pub create_status: u16,
    /// Held before answering the create call.
    pub create_delay: Option<Duration>,
    pub location: Option<String>,
    pub update_status: u16,
    pub send_status: u16,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            token_status: 200,
            create_status: 201,
            create_delay: None,
            location: Some(LOCATION.to_string()),
            update_status: 200,
            send_status: 202,
        }
    }
}

#[derive(Clone)]
struct MockState {
    behaviour: Behaviour,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

/// In-process stand-in for the token endpoint and the Graph mail API.
pub struct MockGraph {
    pub base_url: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockGraph {
    pub async fn start(behaviour: Behaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let port = listener.local_addr().unwrap().port();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new().fallback(handle).with_state(MockState {
            behaviour,
            calls: calls.clone(),
        });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            calls,
        }
    }

    pub fn config(&self, failure_policy: FailurePolicy) -> Config {
        Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            app_id: "app-id".to_string(),
            app_secret: "app-secret".to_string(),
            user: USER.to_string(),
            tenant: TENANT.to_string(),
            authority: self.base_url.clone(),
            scope: "https://graph.microsoft.com/.default".to_string(),
            graph_api_base: Url::parse(&format!("{}/v1.0", self.base_url)).unwrap(),
            default_recipient_name: "Joe Bloggs".to_string(),
            failure_policy,
            http_timeout_seconds: 5,
        }
    }

    pub fn state(&self, failure_policy: FailurePolicy) -> AppState {
        AppState::new(self.config(failure_policy)).expect("state should build")
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn token_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.path.ends_with("/oauth2/v2.0/token"))
            .collect()
    }

    /// Everything except token requests.
    pub fn mail_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.path.starts_with("/v1.0/"))
            .collect()
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path().to_string();
    state.calls.lock().unwrap().push(RecordedCall {
        method: method.clone(),
        path: path.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    let b = &state.behaviour;
    if method == Method::POST && path.ends_with("/oauth2/v2.0/token") {
        return token_response(b.token_status);
    }
    if method == Method::POST && path.ends_with("/send") {
        return status(b.send_status).into_response();
    }
    if method == Method::PATCH && path.starts_with("/v1.0/users/") {
        return (status(b.update_status), "{}").into_response();
    }
    if method == Method::POST && path.ends_with("/messages") {
        if let Some(delay) = b.create_delay {
            tokio::time::sleep(delay).await;
        }
        let mut response = (status(b.create_status), r#"{"id":"AAMkA123"}"#).into_response();
        if let Some(location) = &b.location {
            response
                .headers_mut()
                .insert(header::LOCATION, HeaderValue::from_str(location).unwrap());
        }
        return response;
    }

    StatusCode::NOT_FOUND.into_response()
}

fn token_response(code: u16) -> Response {
    if code == 200 {
        let body = serde_json::json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "ext_expires_in": 3599,
            "access_token": MOCK_TOKEN
        });
        return (StatusCode::OK, axum::Json(body)).into_response();
    }

    (
        status(code),
        r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret provided."}"#,
    )
        .into_response()
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}
