use serde::Serialize;

pub const SEND_FAILED_TEXT: &str = "Failed to send message. Please try again.";
pub const UNKNOWN_CONTACT_LABEL: &str = "this contact";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ContactsFailed,
    MessagesFailed,
    SendFailed,
}

/// One-shot, user-facing notice about a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
}

impl Notification {
    pub fn contacts_failed(reason: &str) -> Self {
        Self {
            kind: NotificationKind::ContactsFailed,
            message: format!("Failed to load contacts: {}", reason),
            contact_id: None,
        }
    }

    pub fn messages_failed(contact_id: &str, contact_name: Option<&str>) -> Self {
        Self {
            kind: NotificationKind::MessagesFailed,
            message: format!("Failed to load messages for {}", contact_name.unwrap_or(UNKNOWN_CONTACT_LABEL)),
            contact_id: Some(contact_id.to_string()),
        }
    }

    pub fn send_failed(contact_id: &str) -> Self {
        Self {
            kind: NotificationKind::SendFailed,
            message: SEND_FAILED_TEXT.to_string(),
            contact_id: Some(contact_id.to_string()),
        }
    }
}

/// Published by the core so views know when to redraw and what to toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Changed,
    Notify(Notification),
}
