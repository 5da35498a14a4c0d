//! Microsoft Graph mail client: token acquisition, authenticated transport
//! and the create → update → send draft workflow.

pub mod message;
pub mod token;
pub mod transport;
pub mod workflow;

pub use message::{message_id_from_location, CreateDraftBody, RecipientList, UpdateReplyToBody};
pub use token::{AccessToken, TokenProvider};
pub use transport::{GraphMethod, GraphResponse, MailTransport};
pub use workflow::{MailDraft, MailWorkflow};
