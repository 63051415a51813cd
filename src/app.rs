use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::Session;

pub const BASE_URL_ENV: &str = "MEDIREC_BASE_URL";
const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Settings persisted between runs, including the signed-in session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppState {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub session: Session,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_timeout(),
            session: Session::default(),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("medirec").join("messages.toml"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Load from the user's config directory, falling back to defaults.
    /// `MEDIREC_BASE_URL` overrides the stored server address.
    pub fn load() -> Self {
        let mut state = match Self::toml_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("ignoring {}: {}", path.display(), e);
                Self::new()
            }),
            _ => Self::new(),
        };
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                state.base_url = crate::utils::normalize_url(&url);
            }
        }
        state
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::toml_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)?;
        Ok(())
    }
}

#[cfg(feature = "ui")]
pub fn build_ui(app: &adw::Application) {
    let state = AppState::load();
    if state.session.is_authenticated() {
        crate::ui::main_window::show_main_window(app, state);
    } else {
        crate::ui::login::show_login_window(app, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CurrentUser;

    #[test]
    fn save_and_load_round_trip_keeps_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("messages.toml");
        let state = AppState {
            base_url: "https://portal.example.org".into(),
            request_timeout_secs: 30,
            session: Session {
                token: Some("tok".into()),
                role: Some("DOCTOR".into()),
                user: Some(CurrentUser { id: "d-1".into(), name: "Dr. Smith".into(), email: None }),
            },
        };
        state.save_to(&path).unwrap();
        assert_eq!(AppState::load_from(&path).unwrap(), state);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.toml");
        fs::write(&path, "base_url = \"https://x.org\"\n").unwrap();
        let state = AppState::load_from(&path).unwrap();
        assert_eq!(state.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(!state.session.is_authenticated());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.toml");
        fs::write(&path, "base_url = [").unwrap();
        assert!(matches!(AppState::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let state = AppState { request_timeout_secs: 0, ..AppState::default() };
        assert_eq!(state.request_timeout(), Duration::from_secs(1));
    }
}
