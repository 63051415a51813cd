use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::api::models::{Contact, LoginRequest, LoginResponse, Message, NewMessage};
use crate::api::transport::MessageTransport;
use crate::error::TransportError;
use crate::session::{self, SharedSession};

pub struct ApiClient {
    pub http: HttpClient,
    base: Url,
    session: SharedSession,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SharedSession, timeout: Duration) -> Result<Self, TransportError> {
        let base = Url::parse(&Self::base_api(base_url))?;
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self { http, base, session })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn base_api(base_url: &str) -> String {
        let trimmed = base_url.trim_end_matches('/');
        if trimmed.ends_with("/api") { trimmed.to_string() } else { format!("{}/api", trimmed) }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match session::read(&self.session).token() {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    /// Check that the server answers at all. Any HTTP status counts as
    /// reachable; only connection failures are errors.
    pub async fn ping(&self) -> Result<u16, TransportError> {
        let resp = self.http.get(self.base.clone()).send().await?;
        Ok(resp.status().as_u16())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, TransportError> {
        let url = self.endpoint(&["auth", "login"])?;
        let resp = self.http.post(url).json(&LoginRequest { email, password }).send().await?;
        handle_response::<LoginResponse>(resp)
            .await?
            .ok_or_else(|| TransportError::Decode("empty login response".into()))
    }
}

#[async_trait]
impl MessageTransport for ApiClient {
    async fn list_contacts(&self) -> Result<Vec<Contact>, TransportError> {
        let url = self.endpoint(&["doctor", "messages", "contacts"])?;
        debug!("GET {}", url);
        let resp = self.with_auth(self.http.get(url)).send().await?;
        Ok(handle_response(resp).await?.unwrap_or_default())
    }

    async fn list_messages(&self, contact_id: &str) -> Result<Vec<Message>, TransportError> {
        let url = self.endpoint(&["doctor", "messages", "contact", contact_id])?;
        debug!("GET {}", url);
        let resp = self.with_auth(self.http.get(url)).send().await?;
        Ok(handle_response(resp).await?.unwrap_or_default())
    }

    async fn post_message(&self, contact_id: &str, message: &NewMessage) -> Result<Message, TransportError> {
        let url = self.endpoint(&["doctor", "messages", "contact", contact_id])?;
        debug!("POST {}", url);
        let resp = self.with_auth(self.http.post(url)).json(message).send().await?;
        handle_response(resp)
            .await?
            .ok_or_else(|| TransportError::Decode("server returned no message".into()))
    }
}

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Option<T>, TransportError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = error_message(status.as_u16(), &body);
        warn!("request failed: HTTP {} {}", status.as_u16(), message);
        return Err(TransportError::Status { status: status.as_u16(), message });
    }
    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }
    Ok(Some(resp.json::<T>().await?))
}

/// Prefer the server's own `message` field; otherwise describe the status.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json.get("message").and_then(|v| v.as_str()).map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {}", status))
}
