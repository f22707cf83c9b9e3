//! Client errors.

use deckbridge_core::{EventKind, ManifestError, RegistrationError};
use tokio_tungstenite::tungstenite;

/// Error surfaced by sends and correlated requests.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected reply: {0}")]
    UnexpectedReply(EventKind),
    #[error("completion dropped before it was settled")]
    Abandoned,
}

/// Error starting a plugin.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}
