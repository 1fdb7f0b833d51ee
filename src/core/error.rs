//! Typed error handling for the StaffDesk client
//!
//! Every store operation returns [`ClientError`]. The variants follow the
//! failure taxonomy of a REST round-trip:
//!
//! - transport failures ([`ClientError::Http`], [`ClientError::Transport`])
//! - server-reported failures ([`ClientError::Server`]), including envelopes
//!   with `success: false`
//! - empty or undecodable responses ([`ClientError::Malformed`])
//! - local failures that never reach the network (payload validation, bad
//!   input, configuration)
//!
//! # Example
//!
//! ```rust,ignore
//! match store.get_by_id(id).await {
//!     Ok(user) => println!("{}", user.full_name),
//!     Err(err) if err.is_unauthorized() => auth.logout().await,
//!     Err(err) => eprintln!("{}", err.user_message()),
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Message used when a failure carries no readable description
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Result alias used across the crate
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors returned by the API client and every store built on it
#[derive(Debug, Error)]
pub enum ClientError {
    /// The reqwest transport failed (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A non-reqwest transport failed before a response was produced
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status or `success: false`
    #[error("{}", server_display(.status, .message))]
    Server {
        status: u16,
        message: Option<String>,
        details: Option<Value>,
    },

    /// The response body was empty or could not be decoded
    #[error("malformed response from {path}: {reason}")]
    Malformed { path: String, reason: String },

    /// A request payload could not be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A payload failed validation before being sent
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Local input could not be interpreted
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The client configuration is unusable
    #[error("invalid configuration: {0}")]
    Config(String),
}

fn server_display(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) => format!("server error ({status}): {message}"),
        None => format!("request failed with status {status}"),
    }
}

/// Error body returned by the backend on failure
///
/// All fields are optional: the backend is not consistent about which ones it
/// fills in, and a body that matches none of them is still a failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
    pub status_code: Option<u16>,
    pub details: Option<Value>,
}

impl ClientError {
    /// Build a server error from a status code and a raw response body
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed: ApiErrorBody = serde_json::from_slice(body).unwrap_or_default();
        let message = parsed
            .message
            .or(parsed.error)
            .filter(|m| !m.trim().is_empty());

        ClientError::Server {
            status,
            message,
            details: parsed.details,
        }
    }

    /// HTTP status code, when the failure came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true for a 401 response
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Returns true when no response was received at all
    pub fn is_transport(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Http(e) => e.status().is_none(),
            _ => false,
        }
    }

    /// Human-readable message suitable for UI display
    ///
    /// Prefers the server-supplied `message`, then the error's own description,
    /// then [`GENERIC_ERROR_MESSAGE`].
    pub fn user_message(&self) -> String {
        if let ClientError::Server {
            message: Some(message),
            ..
        } = self
        {
            return message.clone();
        }

        let description = self.to_string();
        if description.trim().is_empty() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            description
        }
    }
}
