//! Error types for netprofile

use std::fmt;
use thiserror::Error;

/// Opaque error category identifying the setting type a validation error
/// originated from. Each setting type registers exactly one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorDomain(pub &'static str);

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A per-setting failure (verification, deserialization, secrets update),
/// carrying the originating setting's error domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{domain}: {message}")]
pub struct SettingError {
    pub domain: ErrorDomain,
    pub message: String,
}

impl SettingError {
    pub fn new(domain: ErrorDomain, message: impl Into<String>) -> Self {
        Self {
            domain,
            message: message.into(),
        }
    }
}

/// Errors produced by [`Connection`](crate::Connection) operations.
///
/// All operations are first-failure-wins: nothing aggregates multiple
/// errors, and nothing retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// No 'connection' meta-setting is present.
    #[error("connection setting not found")]
    ConnectionSettingNotFound,
    /// The declared connection type is missing, does not resolve to a
    /// setting held by the connection, or is not a base type.
    #[error("connection type invalid: {0}")]
    ConnectionTypeInvalid(String),
    /// A secrets operation referenced a setting the connection does not hold.
    #[error("setting not found: {0}")]
    SettingNotFound(String),
    /// A bulk map carried a property with the wrong shape.
    #[error("property type mismatch: {0}")]
    PropertyTypeMismatch(String),
    /// A setting-level failure, surfaced with its originating domain.
    #[error(transparent)]
    Setting(#[from] SettingError),
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;
