use serde::{Deserialize, Serialize};

/// Prefix marking a message id that was generated locally and not yet
/// confirmed by the server.
pub const TEMP_ID_PREFIX: &str = "temp-";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "contactId", alias = "id")]
    pub id: String,
    #[serde(rename = "contactName", alias = "name")]
    pub name: String,
    #[serde(rename = "contactRole", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "lastMessageContent", default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_timestamp: Option<String>,
    #[serde(default)]
    pub unread_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    pub recipient_id: String,
    /// Conversation this message belongs to: always the other party's id.
    /// Assigned by the messaging core, not read from the wire.
    #[serde(skip)]
    pub contact_id: String,
    pub content: String,
    pub timestamp: String,
    #[serde(default, rename = "isRead", alias = "read")]
    pub is_read: bool,
    /// `None` once the server has confirmed the message.
    #[serde(skip)]
    pub status: Option<MessageStatus>,
}

impl Message {
    pub fn is_provisional(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender_id == user_id
    }

    pub fn is_failed(&self) -> bool {
        self.status == Some(MessageStatus::Failed)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub role: Option<String>,
    pub uuid: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
