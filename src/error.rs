use thiserror::Error;

/// Failure talking to the message server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Http(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidUrl(err.to_string())
    }
}

/// Errors recorded by the messaging core. None of them are fatal; the
/// core keeps the most recent one for inspection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("failed to load contacts: {0}")]
    ContactListFetch(#[source] TransportError),

    #[error("failed to load messages for {contact_id}: {source}")]
    MessageFetch {
        contact_id: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to send message {temp_id}: {source}")]
    MessageSend {
        temp_id: String,
        #[source]
        source: TransportError,
    },
}

impl SyncError {
    pub fn transport(&self) -> &TransportError {
        match self {
            SyncError::ContactListFetch(source) => source,
            SyncError::MessageFetch { source, .. } => source,
            SyncError::MessageSend { source, .. } => source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no config directory available")]
    NoConfigDir,
}
