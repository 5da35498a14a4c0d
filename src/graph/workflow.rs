use std::sync::Arc;

use reqwest::header::HeaderValue;
use reqwest::Url;

use crate::error::{AppError, Result, WorkflowError};
use crate::graph::message::{
    message_id_from_location, CreateDraftBody, RecipientList, UpdateReplyToBody,
};
use crate::graph::{AccessToken, GraphMethod, MailTransport, TokenProvider};

/// A message as the caller describes it, plus the id Graph assigns on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailDraft {
    pub id: Option<String>,
    pub subject: String,
    pub html_body: String,
    pub to_recipients: RecipientList,
    pub reply_to_recipients: Option<RecipientList>,
    /// Mailbox the draft is created in and sent from.
    pub owner: String,
}

impl MailDraft {
    pub fn new(
        subject: impl Into<String>,
        html_body: impl Into<String>,
        to_recipients: RecipientList,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            subject: subject.into(),
            html_body: html_body.into(),
            to_recipients,
            reply_to_recipients: None,
            owner: owner.into(),
        }
    }
}

/// Drives one draft through create → (update) → send.
///
/// The token acquired by [`MailWorkflow::create_draft`] is reused by the later
/// steps and dropped with the workflow. Update and send refuse to run until
/// the draft has an id.
pub struct MailWorkflow {
    tokens: Arc<TokenProvider>,
    transport: Arc<MailTransport>,
    api_base: Url,
    token: Option<AccessToken>,
    draft: MailDraft,
}

impl MailWorkflow {
    pub fn new(
        tokens: Arc<TokenProvider>,
        transport: Arc<MailTransport>,
        api_base: Url,
        draft: MailDraft,
    ) -> Self {
        Self {
            tokens,
            transport,
            api_base,
            token: None,
            draft,
        }
    }

    pub fn draft(&self) -> &MailDraft {
        &self.draft
    }

    pub fn message_id(&self) -> Option<&str> {
        self.draft.id.as_deref()
    }

    pub async fn create_draft(&mut self) -> Result<()> {
        tracing::info!(owner = %self.draft.owner, "Creating message");

        let url = endpoint(&self.api_base, &["users", self.draft.owner.as_str(), "messages"])?;
        let body = serde_json::to_string(&CreateDraftBody::new(
            &self.draft.subject,
            &self.draft.html_body,
            &self.draft.to_recipients,
        ))?;

        let token = self.token.insert(self.tokens.acquire_token().await?);
        let response = self
            .transport
            .send(GraphMethod::Post, url, Some(body), token)
            .await?;

        if !response.is_success() {
            return Err(WorkflowError::CreateFailed {
                status: response.status.as_u16(),
                body: response.body,
            }
            .into());
        }

        let id = created_message_id(response.location.as_ref())?;

        tracing::info!(message_id = %id, "Message created");
        self.draft.id = Some(id);
        Ok(())
    }

    /// Replace the draft's reply-to list.
    pub async fn update_message(&mut self, reply_to_recipients: RecipientList) -> Result<()> {
        tracing::info!(owner = %self.draft.owner, "Updating message");

        let (id, token) = self.created()?;
        let url = endpoint(
            &self.api_base,
            &["users", self.draft.owner.as_str(), "messages", id],
        )?;
        let body = serde_json::to_string(&UpdateReplyToBody::new(&reply_to_recipients))?;

        let response = self
            .transport
            .send(GraphMethod::Patch, url, Some(body), token)
            .await?;

        if !response.is_success() {
            return Err(WorkflowError::UpdateFailed {
                status: response.status.as_u16(),
                body: response.body,
            }
            .into());
        }

        tracing::info!("Message updated");
        self.draft.reply_to_recipients = Some(reply_to_recipients);
        Ok(())
    }

    pub async fn send_message(&self) -> Result<()> {
        tracing::info!(owner = %self.draft.owner, "Sending message");

        let (id, token) = self.created()?;
        let url = endpoint(
            &self.api_base,
            &["users", self.draft.owner.as_str(), "messages", id, "send"],
        )?;

        let response = self
            .transport
            .send(GraphMethod::Post, url, None, token)
            .await?;

        if !response.is_success() {
            return Err(WorkflowError::SendFailed {
                status: response.status.as_u16(),
                body: response.body,
            }
            .into());
        }

        tracing::info!(message_id = %id, "Message sent");
        Ok(())
    }

    fn created(&self) -> std::result::Result<(&str, &AccessToken), WorkflowError> {
        match (self.draft.id.as_deref(), self.token.as_ref()) {
            (Some(id), Some(token)) => Ok((id, token)),
            _ => Err(WorkflowError::NotYetCreated),
        }
    }
}

fn created_message_id(location: Option<&HeaderValue>) -> std::result::Result<String, WorkflowError> {
    let location = location.ok_or_else(|| {
        WorkflowError::IdExtraction("response carried no Location header".to_string())
    })?;
    let location = location.to_str().map_err(|_| {
        WorkflowError::IdExtraction("Location header is not visible ASCII".to_string())
    })?;
    message_id_from_location(location)
}

/// Append percent-encoded path segments to the API base.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AppError::Transport(format!("cannot build a request URL from '{}'", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
