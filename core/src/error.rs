//! Error types for the Basecamp client.
//!
//! # Design
//! A single `Error` enum covers every failure the core can raise. Nothing is
//! retried or swallowed here: transport failures, non-2xx responses and
//! payloads the typecaster does not understand all reach the caller as-is.
//! `Remote` carries the status code and reason phrase so callers can tell
//! "not found" from "unauthorized" without re-parsing a message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A request was attempted before `Connection::establish`.
    #[error("no connection established")]
    NotConfigured,

    /// DNS, connect, TLS or timeout failure below the HTTP layer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("{message} ({status})")]
    Remote { status: u16, message: String },

    /// A decoded node matched none of the typecasting rules.
    #[error("can't typecast {0}")]
    UnrecognizedShape(String),

    /// A typed scalar whose content does not parse as its declared type.
    #[error("invalid {kind} value: {content:?}")]
    InvalidScalar { kind: String, content: String },

    /// Uploading an attachment failed; the attachment keeps no id.
    #[error("could not save attachment: {message} ({status})")]
    Save { status: u16, message: String },

    /// An element action was attempted on a resource that has no id yet.
    #[error("{0} has not been saved")]
    Unsaved(String),

    /// The response body is not well-formed XML or YAML.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A request body could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl Error {
    /// HTTP status attached to the error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Remote { status, .. } | Error::Save { status, .. } => Some(*status),
            _ => None,
        }
    }
}
