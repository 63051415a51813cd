use async_trait::async_trait;

use crate::api::models::{Contact, Message, NewMessage};
use crate::error::TransportError;

/// The remote message API as seen by the messaging core.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn list_contacts(&self) -> Result<Vec<Contact>, TransportError>;

    async fn list_messages(&self, contact_id: &str) -> Result<Vec<Message>, TransportError>;

    /// Returns the message as stored by the server.
    async fn post_message(&self, contact_id: &str, message: &NewMessage) -> Result<Message, TransportError>;
}
