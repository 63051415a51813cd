pub mod chat_view;
pub mod login;
pub mod main_window;
pub mod sidebar;

use crate::api::client::ApiClient;
use crate::messaging::MessagingCore;
use crate::session::SharedSession;

pub type Core = MessagingCore<ApiClient, SharedSession>;
