use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::api::client::ApiClient;
use crate::api::models::LoginResponse;
use crate::error::TransportError;

/// The signed-in user, as the messaging core needs to know them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Credentials for the current login. Created once at startup from the
/// settings file and handed to everything that talks to the server.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<CurrentUser>,
}

impl Session {
    pub fn login(&mut self, resp: LoginResponse) -> CurrentUser {
        let name = resp
            .full_name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| resp.email.clone())
            .unwrap_or_else(|| resp.uuid.clone());
        let user = CurrentUser { id: resp.uuid, name, email: resp.email };
        self.token = Some(resp.token);
        self.role = resp.role.map(|r| r.to_uppercase());
        self.user = Some(user.clone());
        user
    }

    pub fn logout(&mut self) {
        self.token = None;
        self.role = None;
        self.user = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

pub type SharedSession = Arc<RwLock<Session>>;

pub fn shared(session: Session) -> SharedSession {
    Arc::new(RwLock::new(session))
}

pub fn read(session: &SharedSession) -> RwLockReadGuard<'_, Session> {
    session.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write(session: &SharedSession) -> RwLockWriteGuard<'_, Session> {
    session.write().unwrap_or_else(PoisonError::into_inner)
}

/// Checks that the server answers, then posts the credentials and, on
/// success, stores the returned token and user in `session`. Persisting
/// the session is left to the caller.
pub async fn sign_in(
    client: &ApiClient,
    session: &SharedSession,
    email: &str,
    password: &str,
) -> Result<CurrentUser, TransportError> {
    let status = client.ping().await?;
    debug!("{} answered with HTTP {}", client.base_url(), status);
    let resp = client.login(email, password).await?;
    let user = write(session).login(resp);
    info!("signed in as {} ({})", user.name, user.id);
    Ok(user)
}

pub fn sign_out(session: &SharedSession) {
    write(session).logout();
    info!("signed out");
}

/// Supplies the identity of the user the core acts for.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<CurrentUser>;
}

impl IdentityProvider for SharedSession {
    fn current_user(&self) -> Option<CurrentUser> {
        let session = read(self);
        if !session.is_authenticated() {
            return None;
        }
        session.user.clone()
    }
}

impl IdentityProvider for Option<CurrentUser> {
    fn current_user(&self) -> Option<CurrentUser> {
        self.clone()
    }
}
