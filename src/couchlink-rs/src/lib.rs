//! couchlink Client Library
//!
//! HTTP client for CouchDB-style document databases. Authentication is
//! established lazily through `POST /_session` and the resulting cookie is
//! attached to every later request made by the same [`Client`].

mod client;
mod decode;
mod request;
mod session;

pub use client::Client;
pub use couchlink_core::{AuthPayload, ClientConfig, DecodePolicy, SessionState, UpdateResult};

/// Failure to establish a session
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Session request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Session response had no body")]
    EmptyBody,

    #[error("Session response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Session rejected: {status} - {reason}")]
    Rejected { status: u16, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Response had no body")]
    EmptyBody,

    #[error("Response could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;
