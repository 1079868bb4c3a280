use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Returned by [`crate::session::SessionHandle::send`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("not connected to the chat server")]
    NotConnected,
    #[error("failed to encode outbound frame: {0}")]
    Encode(String),
}

/// Failure to read the authoritative message list.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no credential available for the message list request")]
    Unauthorized,
    #[error("message list request returned status {0}")]
    Status(u16),
    #[error("message list request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure to establish the push channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("credential cannot be used as a handshake token")]
    InvalidCredential,
    #[error("push channel handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),
}

/// Failure of a login or signup exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("server response did not contain a token")]
    MissingToken,
    #[error("auth request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure of the on-disk session store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("session payload could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a complete login: the exchange itself or persisting its result.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
