//! Doctor messaging client for the MedRecord portal: a REST transport, a
//! persisted session, and an optimistic conversation cache that GTK views
//! (feature `ui`) render.

pub mod api;
pub mod app;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod session;
pub mod utils;

#[cfg(feature = "ui")]
pub mod ui;
