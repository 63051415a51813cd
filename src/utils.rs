use std::future::Future;

use once_cell::sync::Lazy;
use tokio::runtime::Runtime;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::messaging::SyncEvent;

/// Runtime for network work; the GTK main loop never blocks on it.
pub static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .thread_name("medirec-net")
        .enable_all()
        .build()
        .expect("failed to start the network runtime")
});

pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    RUNTIME.spawn(fut)
}

/// Run `fut` on the network runtime and deliver its output on the GTK main loop.
#[cfg(feature = "ui")]
pub fn reply_on_main<T, F>(fut: F) -> glib::Receiver<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let (tx, rx) = glib::MainContext::channel(glib::Priority::default());
    spawn(async move {
        let _ = tx.send(fut.await);
    });
    rx
}

/// Mirror core events onto the GTK main loop.
#[cfg(feature = "ui")]
pub fn forward_events(events: broadcast::Receiver<SyncEvent>) -> glib::Receiver<SyncEvent> {
    let (tx, rx) = glib::MainContext::channel(glib::Priority::default());
    spawn(pump_events(events, move |event| tx.send(event).is_ok()));
    rx
}

/// Hands every event to `deliver` until the core goes away or `deliver`
/// returns false. Events missed by a slow reader collapse into a single
/// `Changed`, since a redraw from the snapshot covers them.
pub async fn pump_events<D>(mut events: broadcast::Receiver<SyncEvent>, mut deliver: D)
where
    D: FnMut(SyncEvent) -> bool,
{
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(missed)) => {
                log::debug!("event reader lagged by {}", missed);
                SyncEvent::Changed
            }
            Err(RecvError::Closed) => return,
        };
        if !deliver(event) {
            return;
        }
    }
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::Notification;

    #[test]
    fn adds_scheme_and_drops_trailing_slash() {
        assert_eq!(normalize_url(" portal.example.org/ "), "https://portal.example.org");
        assert_eq!(normalize_url("http://localhost:8080"), "http://localhost:8080");
    }

    #[tokio::test]
    async fn pump_stops_when_the_sender_is_gone() {
        let (tx, rx) = broadcast::channel(8);
        tx.send(SyncEvent::Changed).unwrap();
        tx.send(SyncEvent::Notify(Notification::send_failed("p-1"))).unwrap();
        drop(tx);

        let mut got = Vec::new();
        pump_events(rx, |event| {
            got.push(event);
            true
        })
        .await;

        assert_eq!(got.len(), 2);
        assert!(matches!(got[1], SyncEvent::Notify(ref n) if n.contact_id.as_deref() == Some("p-1")));
    }

    #[tokio::test]
    async fn lagged_reader_gets_a_redraw_then_the_newest_events() {
        let (tx, rx) = broadcast::channel(2);
        for id in ["p-1", "p-2", "p-3", "p-4"] {
            tx.send(SyncEvent::Notify(Notification::send_failed(id))).unwrap();
        }
        drop(tx);

        let mut got = Vec::new();
        pump_events(rx, |event| {
            got.push(event);
            true
        })
        .await;

        assert!(matches!(got[0], SyncEvent::Changed));
        let ids: Vec<_> = got[1..]
            .iter()
            .filter_map(|e| match e {
                SyncEvent::Notify(n) => n.contact_id.clone(),
                SyncEvent::Changed => None,
            })
            .collect();
        assert_eq!(ids, ["p-3", "p-4"]);
    }

    #[tokio::test]
    async fn pump_stops_when_delivery_fails() {
        let (tx, rx) = broadcast::channel(8);
        tx.send(SyncEvent::Changed).unwrap();
        tx.send(SyncEvent::Changed).unwrap();

        let mut calls = 0;
        pump_events(rx, |_| {
            calls += 1;
            false
        })
        .await;

        assert_eq!(calls, 1);
        drop(tx);
    }
}
