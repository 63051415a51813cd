use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use log::{debug, info, warn};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::api::models::{Contact, Message, MessageStatus, NewMessage, TEMP_ID_PREFIX};
use crate::api::transport::MessageTransport;
use crate::error::{SyncError, TransportError};
use crate::messaging::conversation::Conversation;
use crate::messaging::events::{Notification, SyncEvent};
use crate::session::IdentityProvider;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct SyncState {
    contacts: Vec<Contact>,
    selected: Option<String>,
    cache: HashMap<String, Conversation>,
    last_error: Option<SyncError>,
    loading: usize,
    sending: usize,
    fetching: HashMap<String, usize>,
    /// Bumped on every confirmed send; `confirmed` maps message id to the
    /// value it got. Only kept while some conversation fetch is running.
    confirm_seq: u64,
    confirmed: HashMap<String, u64>,
}

type SharedState = Arc<Mutex<SyncState>>;

fn lock(state: &Mutex<SyncState>) -> MutexGuard<'_, SyncState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read-only view of the core for rendering.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub contacts: Vec<Contact>,
    pub selected: Option<String>,
    pub messages: Vec<Message>,
    pub loading: bool,
    pub sending: bool,
    pub last_error: Option<SyncError>,
}

/// Keeps the loading flag raised (and the contact marked as being fetched)
/// until dropped.
struct LoadGuard {
    state: SharedState,
    contact_id: Option<String>,
}

impl LoadGuard {
    fn new(state: &SharedState, contact_id: Option<&str>) -> Self {
        let mut st = lock(state);
        st.loading += 1;
        if let Some(id) = contact_id {
            *st.fetching.entry(id.to_string()).or_insert(0) += 1;
        }
        Self { state: state.clone(), contact_id: contact_id.map(str::to_string) }
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        let mut st = lock(&self.state);
        st.loading = st.loading.saturating_sub(1);
        if let Some(id) = &self.contact_id {
            if let Some(n) = st.fetching.get_mut(id) {
                *n -= 1;
                if *n == 0 {
                    st.fetching.remove(id);
                }
            }
            if st.fetching.is_empty() {
                st.confirmed.clear();
            }
        }
    }
}

/// A message that has been appended optimistically and is waiting for the
/// server. Hand it to [`MessagingCore::complete_send`]; if it is dropped
/// instead, the message is marked failed so it never disappears silently.
#[must_use = "the message stays in `sending` until the send is completed"]
pub struct PendingSend {
    provisional: Message,
    settled: bool,
    state: SharedState,
    events: broadcast::Sender<SyncEvent>,
}

impl PendingSend {
    pub fn temp_id(&self) -> &str {
        &self.provisional.id
    }

    pub fn contact_id(&self) -> &str {
        &self.provisional.contact_id
    }

    pub fn content(&self) -> &str {
        &self.provisional.content
    }
}

impl Drop for PendingSend {
    fn drop(&mut self) {
        {
            let mut st = lock(&self.state);
            st.sending = st.sending.saturating_sub(1);
            if !self.settled {
                warn!("send {} abandoned before completion", self.provisional.id);
                mark_failed(&mut st, &self.provisional);
            }
        }
        let _ = self.events.send(SyncEvent::Changed);
    }
}

fn mark_failed(st: &mut SyncState, provisional: &Message) {
    let conv = st.cache.entry(provisional.contact_id.clone()).or_default();
    if !conv.set_status(&provisional.id, Some(MessageStatus::Failed)) {
        let mut failed = provisional.clone();
        failed.status = Some(MessageStatus::Failed);
        conv.push(failed);
    }
}

/// Client-side view of the signed-in user's conversations.
///
/// Contacts, per-contact message caches and the current selection live
/// here and change only through the operations below. Failures are
/// recorded in [`last_error`](Self::last_error) and announced on the
/// event channel; no operation returns an error to its caller.
pub struct MessagingCore<T: ?Sized, I> {
    transport: Arc<T>,
    identity: I,
    state: SharedState,
    events: broadcast::Sender<SyncEvent>,
    cancel: Mutex<CancellationToken>,
    timeout: Option<Duration>,
    temp_seq: AtomicU64,
}

impl<T, I> MessagingCore<T, I>
where
    T: MessageTransport + ?Sized,
    I: IdentityProvider,
{
    pub fn new(transport: Arc<T>, identity: I) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            identity,
            state: Arc::new(Mutex::new(SyncState::default())),
            events,
            cancel: Mutex::new(CancellationToken::new()),
            timeout: None,
            temp_seq: AtomicU64::new(0),
        }
    }

    /// Bound every transport call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    fn state(&self) -> MutexGuard<'_, SyncState> {
        lock(&self.state)
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    fn notify(&self, notification: Notification) {
        info!("notify: {}", notification.message);
        self.emit(SyncEvent::Notify(notification));
    }

    /// Abort every request currently in flight. Later requests are unaffected.
    pub fn cancel_in_flight(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
        debug!("cancelled in-flight requests");
    }

    async fn call<R, F>(&self, request: F) -> Result<R, TransportError>
    where
        F: Future<Output = Result<R, TransportError>>,
    {
        let token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, request)
                    .await
                    .unwrap_or_else(|_| Err(TransportError::Timeout)),
                None => request.await,
            }
        };
        tokio::select! {
            _ = token.cancelled() => Err(TransportError::Cancelled),
            res = bounded => res,
        }
    }

    /// Load the contact list. Does nothing without a signed-in user.
    pub async fn initialize(&self) {
        let Some(user) = self.identity.current_user() else {
            debug!("initialize skipped: no user");
            return;
        };
        info!("loading contacts for {}", user.id);
        let loading = LoadGuard::new(&self.state, None);
        self.emit(SyncEvent::Changed);

        match self.call(self.transport.list_contacts()).await {
            Ok(contacts) => {
                debug!("loaded {} contacts", contacts.len());
                let mut st = self.state();
                st.contacts = contacts;
                st.last_error = None;
            }
            Err(err) => {
                warn!("failed to load contacts: {}", err);
                let reason = err.to_string();
                let cancelled = err.is_cancelled();
                self.state().last_error = Some(SyncError::ContactListFetch(err));
                if !cancelled {
                    self.notify(Notification::contacts_failed(&reason));
                }
            }
        }
        drop(loading);
        self.emit(SyncEvent::Changed);
    }

    /// Synchronous half of [`select_contact`](Self::select_contact): updates
    /// the selection and reports whether the conversation still has to be
    /// fetched.
    pub fn select(&self, contact_id: Option<&str>) -> bool {
        let contact_id = contact_id.map(str::trim).filter(|id| !id.is_empty());
        let needs_fetch = {
            let mut st = self.state();
            st.selected = contact_id.map(str::to_string);
            match contact_id {
                Some(id) => !st.cache.contains_key(id) && !st.fetching.contains_key(id),
                None => false,
            }
        };
        self.emit(SyncEvent::Changed);
        needs_fetch
    }

    /// Select a contact (or clear the selection with `None`), fetching its
    /// conversation the first time it is opened.
    pub async fn select_contact(&self, contact_id: Option<&str>) {
        if self.select(contact_id) {
            if let Some(id) = contact_id {
                self.fetch_messages(id.trim()).await;
            }
        }
    }

    /// Fetch (or refetch) one conversation. On failure the previously cached
    /// messages are kept.
    pub async fn fetch_messages(&self, contact_id: &str) {
        if contact_id.is_empty() {
            return;
        }
        let loading = LoadGuard::new(&self.state, Some(contact_id));
        let started = self.state().confirm_seq;
        self.emit(SyncEvent::Changed);
        debug!("fetching messages for {}", contact_id);

        match self.call(self.transport.list_messages(contact_id)).await {
            Ok(messages) => {
                let mut st = self.state();
                let mut fresh: Conversation = messages
                    .into_iter()
                    .map(|mut m| {
                        m.contact_id = contact_id.to_string();
                        m.status = None;
                        m
                    })
                    .collect();
                if let Some(previous) = st.cache.get(contact_id) {
                    // Keep what the server list cannot know about yet: local
                    // placeholders and sends confirmed after this fetch began.
                    for local in previous.iter() {
                        let confirmed_since = st.confirmed.get(&local.id).is_some_and(|seq| *seq > started);
                        if (local.is_provisional() || confirmed_since) && !fresh.contains(&local.id) {
                            fresh.push(local.clone());
                        }
                    }
                }
                debug!("cached {} messages for {}", fresh.len(), contact_id);
                st.cache.insert(contact_id.to_string(), fresh);
                st.last_error = None;
            }
            Err(err) => {
                warn!("failed to load messages for {}: {}", contact_id, err);
                let cancelled = err.is_cancelled();
                let name = {
                    let mut st = self.state();
                    st.cache.entry(contact_id.to_string()).or_default();
                    st.last_error = Some(SyncError::MessageFetch { contact_id: contact_id.to_string(), source: err });
                    st.contacts.iter().find(|c| c.id == contact_id).map(|c| c.name.clone())
                };
                if !cancelled {
                    self.notify(Notification::messages_failed(contact_id, name.as_deref()));
                }
            }
        }
        drop(loading);
        self.emit(SyncEvent::Changed);
    }

    fn next_temp_id(&self) -> String {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        format!("{}{}-{}", TEMP_ID_PREFIX, Utc::now().timestamp_millis(), seq)
    }

    /// Append a provisional message to the selected conversation. Returns
    /// `None`, changing nothing, when there is no selection, no user, or
    /// the content is blank.
    pub fn begin_send(&self, content: &str) -> Option<PendingSend> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        let user = self.identity.current_user()?;
        let provisional = {
            let mut st = self.state();
            let contact_id = st.selected.clone()?;
            let provisional = Message {
                id: self.next_temp_id(),
                sender_id: user.id,
                sender_name: user.name,
                recipient_id: contact_id.clone(),
                contact_id: contact_id.clone(),
                content: content.to_string(),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                is_read: false,
                status: Some(MessageStatus::Sending),
            };
            st.cache.entry(contact_id).or_default().push(provisional.clone());
            st.sending += 1;
            provisional
        };
        debug!("queued {} for {}", provisional.id, provisional.contact_id);
        self.emit(SyncEvent::Changed);
        Some(PendingSend { provisional, settled: false, state: self.state.clone(), events: self.events.clone() })
    }

    /// Post a provisional message and reconcile the cache with the outcome.
    pub async fn complete_send(&self, mut pending: PendingSend) {
        let body = NewMessage { content: pending.provisional.content.clone() };
        let contact_id = pending.provisional.contact_id.clone();
        let temp_id = pending.provisional.id.clone();

        match self.call(self.transport.post_message(&contact_id, &body)).await {
            Ok(mut message) => {
                message.contact_id = contact_id.clone();
                message.sender_name = pending.provisional.sender_name.clone();
                message.status = None;
                let mut st = self.state();
                if !st.fetching.is_empty() {
                    st.confirm_seq += 1;
                    let seq = st.confirm_seq;
                    st.confirmed.insert(message.id.clone(), seq);
                }
                let conv = st.cache.entry(contact_id).or_default();
                if conv.contains(&message.id) {
                    // A refetch already brought in the server copy.
                    conv.remove(&temp_id);
                } else if !conv.replace(&temp_id, message.clone()) {
                    conv.push(message);
                }
                debug!("send {} confirmed", temp_id);
            }
            Err(err) => {
                warn!("send {} failed: {}", temp_id, err);
                let cancelled = err.is_cancelled();
                {
                    let mut st = self.state();
                    mark_failed(&mut st, &pending.provisional);
                    st.last_error = Some(SyncError::MessageSend { temp_id, source: err });
                }
                if !cancelled {
                    self.notify(Notification::send_failed(&contact_id));
                }
            }
        }
        pending.settled = true;
    }

    /// Optimistically send `content` to the selected contact.
    pub async fn send_message(&self, content: &str) {
        if let Some(pending) = self.begin_send(content) {
            self.complete_send(pending).await;
        }
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.state().contacts.clone()
    }

    pub fn contact(&self, contact_id: &str) -> Option<Contact> {
        self.state().contacts.iter().find(|c| c.id == contact_id).cloned()
    }

    pub fn selected_contact(&self) -> Option<String> {
        self.state().selected.clone()
    }

    /// Messages of the selected conversation, oldest first.
    pub fn active_messages(&self) -> Vec<Message> {
        let st = self.state();
        st.selected
            .as_ref()
            .and_then(|id| st.cache.get(id))
            .map(|conv| conv.messages().to_vec())
            .unwrap_or_default()
    }

    pub fn messages_for(&self, contact_id: &str) -> Option<Vec<Message>> {
        self.state().cache.get(contact_id).map(|conv| conv.messages().to_vec())
    }

    pub fn has_conversation(&self, contact_id: &str) -> bool {
        self.state().cache.contains_key(contact_id)
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading > 0
    }

    pub fn is_sending(&self) -> bool {
        self.state().sending > 0
    }

    pub fn last_error(&self) -> Option<SyncError> {
        self.state().last_error.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        let st = self.state();
        Snapshot {
            contacts: st.contacts.clone(),
            selected: st.selected.clone(),
            messages: st
                .selected
                .as_ref()
                .and_then(|id| st.cache.get(id))
                .map(|conv| conv.messages().to_vec())
                .unwrap_or_default(),
            loading: st.loading > 0,
            sending: st.sending > 0,
            last_error: st.last_error.clone(),
        }
    }
}
