//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! A non-success HTTP status is not an error: it is recorded inside a
//! [`GenerationResult`](crate::generator::GenerationResult). Only transport and
//! filesystem failures surface here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// True for failures that happened before any HTTP status was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
