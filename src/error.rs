//! Error taxonomy shared by every trust store backend.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrustError>;

/// Direction of a store mutation, used in error and log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    Add,
    Remove,
}

impl StoreAction {
    pub(crate) fn failure_phrase(self) -> &'static str {
        match self {
            StoreAction::Add => "add cert to",
            StoreAction::Remove => "remove cert from",
        }
    }

    pub(crate) fn success_phrase(self) -> &'static str {
        match self {
            StoreAction::Add => "added to",
            StoreAction::Remove => "removed from",
        }
    }
}

#[derive(Debug, Error)]
pub enum TrustError {
    /// No backend exists for the requested target or host.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("certificate not found: {}", .0.display())]
    CertNotFound(PathBuf),

    /// The file exists but holds no parsable PEM certificate with a common name.
    #[error("could not extract identity from {}: {reason}", .path.display())]
    IdentityExtraction { path: PathBuf, reason: String },

    /// A store path could not be derived from the certificate path.
    #[error("invalid certificate path {}: {reason}", .path.display())]
    PathError { path: PathBuf, reason: String },

    #[error("Could not {} {store} store: {message}", .action.failure_phrase())]
    StoreWrite {
        store: String,
        action: StoreAction,
        message: String,
    },

    #[error("no Firefox profile databases in {}: {reason}", .dir.display())]
    ProfileDiscovery { dir: PathBuf, reason: String },

    /// An unprivileged command exited unsuccessfully or could not be spawned.
    #[error("command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrustError {
    pub(crate) fn store_write(store: &str, action: StoreAction, message: impl Into<String>) -> Self {
        TrustError::StoreWrite {
            store: store.to_string(),
            action,
            message: message.into(),
        }
    }
}
