// src/errors.rs
//! Error types shared by the session, fetch and export layers.

use std::io;
use thiserror::Error;

/// Sign-in failures. The session stays anonymous when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Microsoft sign-in is not configured: no client id was provided")]
    NotConfigured,

    #[error("Sign-in was cancelled or denied: {0}")]
    Denied(String),

    #[error("No Microsoft access token")]
    NoToken,

    #[error("Login failed: {0}")]
    Provider(String),
}

/// Failures of the workbook fetch, after the fallback has been tried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("No valid access token")]
    MissingToken,

    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// True when the user has to sign in again before any fetch can succeed.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            FetchError::MissingToken | FetchError::Status { status: 401 }
        )
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),
}

pub type AppResult<T> = Result<T, AppError>;
