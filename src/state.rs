use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::error::Result;
use crate::graph::{MailDraft, MailTransport, MailWorkflow, TokenProvider};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: Arc<TokenProvider>,
    pub transport: Arc<MailTransport>,
}

impl AppState {
    /// Build the process-wide HTTP client (per-call timeout from config) and
    /// the components that share it.
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout()).build()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Config, client: Client) -> Self {
        Self {
            tokens: Arc::new(TokenProvider::new(client.clone(), &config)),
            transport: Arc::new(MailTransport::new(client)),
            config: Arc::new(config),
        }
    }

    /// A request-scoped workflow for `draft`.
    pub fn workflow(&self, draft: MailDraft) -> MailWorkflow {
        MailWorkflow::new(
            self.tokens.clone(),
            self.transport.clone(),
            self.config.graph_api_base.clone(),
            draft,
        )
    }
}
