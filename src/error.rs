#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication failed ({status}): {body}")]
    Auth { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Business-step failures of the draft → update → send sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("create failed ({status}): {body}")]
    CreateFailed { status: u16, body: String },

    #[error("update failed ({status}): {body}")]
    UpdateFailed { status: u16, body: String },

    #[error("send failed ({status}): {body}")]
    SendFailed { status: u16, body: String },

    #[error("id extraction failed: {0}")]
    IdExtraction(String),

    #[error("not yet created")]
    NotYetCreated,
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Transport(format!("request timed out: {}", err))
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Transport(format!("JSON error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
