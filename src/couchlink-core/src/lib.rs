//! couchlink Core Library
//!
//! Shared types for the couchlink client:
//! - Client configuration and decode policy
//! - Session state and authentication payload
//! - Write-operation results

pub mod config;
pub mod models;

// Re-export commonly used types
pub use config::{ClientConfig, DecodePolicy};
pub use models::*;
