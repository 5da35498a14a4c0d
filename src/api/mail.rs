use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{Config, FailurePolicy};
use crate::error::Result;
use crate::graph::{MailDraft, RecipientList};
use crate::state::AppState;

/// Path the Functions host forwards the `GraphMail` HTTP trigger to.
pub const FUNCTION_ROUTE: &str = "/api/GraphMail";

pub const DEFAULT_SUBJECT: &str = "Hello world";
pub const DEFAULT_CONTENT: &str = "This is a message from graph-mailer";

/// Mail routes
pub fn mail_routes() -> Router<AppState> {
    Router::new().route(FUNCTION_ROUTE, get(trigger).post(trigger))
}

/// Fields of the inbound body the trigger acts on. Anything else is only
/// logged. A field with the wrong shape is dropped on its own; the others
/// are kept.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailRequest {
    #[serde(default, deserialize_with = "lenient")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub to_recipients: Option<RecipientList>,
    #[serde(default, deserialize_with = "lenient")]
    pub sender_email_address: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sender_name: Option<String>,
}

/// `null` and badly shaped values both become `None`; the latter is logged.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value::<Option<T>>(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring malformed field in request body");
        None
    }))
}

impl MailRequest {
    /// Anything but a JSON object yields the defaults.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Request body is not a mail request object");
            Self::default()
        })
    }

    /// `senderEmailAddress` -> `senderName` (the address when no name is given).
    pub fn reply_to(&self) -> Option<RecipientList> {
        let address = self
            .sender_email_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())?;
        let name = self
            .sender_name
            .clone()
            .unwrap_or_else(|| address.to_string());

        Some(RecipientList::from([(address.to_string(), name)]))
    }

    pub fn into_draft(self, config: &Config) -> MailDraft {
        let to_recipients = self
            .to_recipients
            .filter(|recipients| !recipients.is_empty())
            .unwrap_or_else(|| {
                RecipientList::from([(
                    config.user.clone(),
                    config.default_recipient_name.clone(),
                )])
            });

        MailDraft::new(
            self.subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            self.content.unwrap_or_else(|| DEFAULT_CONTENT.to_string()),
            to_recipients,
            config.user.clone(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed,
    Skipped,
}

/// Per-step result of one invocation. Only ever logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub create: StepOutcome,
    pub update: StepOutcome,
    pub send: StepOutcome,
    pub message_id: Option<String>,
}

/// GET|POST /api/GraphMail - Always 200; failures only reach the logs.
async fn trigger(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let invocation_id = Uuid::new_v4();
    let span = tracing::info_span!("graph_mail", %invocation_id);

    async move {
        tracing::info!("HTTP trigger function processed a request");

        let data = parse_body(&body);
        log_fields(&data);

        let report = deliver(&state, MailRequest::from_value(&data)).await;
        tracing::info!(?report, "Invocation finished");

        StatusCode::OK
    }
    .instrument(span)
    .await
}

/// Run create → (update) → send, honouring the configured failure policy.
pub async fn deliver(state: &AppState, request: MailRequest) -> DeliveryReport {
    let policy = state.config.failure_policy;
    let reply_to = request.reply_to();
    let mut workflow = state.workflow(request.into_draft(&state.config));

    let create = record("create", workflow.create_draft().await);
    let mut halted = policy == FailurePolicy::Abort && create == StepOutcome::Failed;

    let update = match reply_to {
        Some(_) if halted => skip("update"),
        Some(reply_to) => record("update", workflow.update_message(reply_to).await),
        None => StepOutcome::Skipped,
    };
    halted |= policy == FailurePolicy::Abort && update == StepOutcome::Failed;

    let send = if halted {
        skip("send")
    } else {
        record("send", workflow.send_message().await)
    };

    DeliveryReport {
        create,
        update,
        send,
        message_id: workflow.message_id().map(str::to_string),
    }
}

fn record(step: &'static str, result: Result<()>) -> StepOutcome {
    match result {
        Ok(()) => StepOutcome::Succeeded,
        Err(e) => {
            tracing::error!(step, error = %e, "Failed to {} message", step);
            StepOutcome::Failed
        }
    }
}

fn skip(step: &'static str) -> StepOutcome {
    tracing::warn!(step, "Skipping step after an earlier failure");
    StepOutcome::Skipped
}

/// Empty or non-JSON bodies are treated as `{}`.
fn parse_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Object(Map::new());
    }

    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Request body is not JSON, ignoring it");
        Value::Object(Map::new())
    })
}

fn log_fields(data: &Value) {
    match data {
        Value::Object(fields) => {
            tracing::info!("Printing POST'ed data");
            for (key, value) in fields {
                tracing::info!("- {}: {}", key, value);
            }
        }
        other => tracing::info!(body = %other, "Request body is not a JSON object"),
    }
}
