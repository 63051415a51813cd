//! Optimistic messaging: contact list, per-contact conversation caches and
//! the send protocol that shows a message before the server confirms it.

pub mod conversation;
pub mod sync;
pub mod events;

pub use self::conversation::Conversation;
pub use self::sync::{MessagingCore, PendingSend, Snapshot};
pub use self::events::{Notification, NotificationKind, SyncEvent};
