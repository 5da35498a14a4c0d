pub mod api;
pub mod config;
pub mod error;
pub mod graph;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result, WorkflowError};
pub use state::AppState;
