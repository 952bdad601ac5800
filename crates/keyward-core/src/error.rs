//! The one error type every Keyward crate returns.
//!
//! [`ErrorKind`] is what callers branch on. Store failures are their own
//! kinds so the retry policy can tell transient faults from business
//! rejections, but they all read as internal errors to a caller.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Missing, invalid, expired, or revoked credential.
    Unauthorized,
    /// The caller is not allowed to perform the action.
    Forbidden,
    /// Malformed input or a business rule rejected the request.
    BadRequest,
    /// The requested resource was not found.
    NotFound,
    /// Attempt lockout or rate limit.
    TooManyRequests,
    /// A concurrent writer won a race on the same record.
    Conflict,
    /// An internal error occurred.
    Internal,
    /// The durable record store failed.
    Database,
    /// The ephemeral key-value store failed.
    Cache,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
}

impl ErrorKind {
    /// Whether a caller should see this as an internal error.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Internal
                | Self::Database
                | Self::Cache
                | Self::Configuration
                | Self::Serialization
        )
    }

    /// Whether the failure may succeed if the operation is retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Cache)
    }

    /// Stable upper-snake code, used in log fields and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::BadRequest => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL",
            Self::Database => "DATABASE",
            Self::Cache => "CACHE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One `AppError::<name>(message)` constructor per kind.
macro_rules! kind_constructors {
    ($($name:ident => $kind:ident),* $(,)?) => {
        $(
            #[doc = concat!("An error of kind [`ErrorKind::", stringify!($kind), "`].")]
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ErrorKind::$kind, message)
            }
        )*
    };
}

/// An error with its kind, a message safe to show an operator, and the
/// underlying cause when there is one. Cloning drops the cause.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Like [`AppError::new`], keeping `source` as the cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    kind_constructors! {
        unauthorized => Unauthorized,
        forbidden => Forbidden,
        bad_request => BadRequest,
        not_found => NotFound,
        too_many_requests => TooManyRequests,
        conflict => Conflict,
        internal => Internal,
        database => Database,
        cache => Cache,
        configuration => Configuration,
    }

    /// Whether this error should reach the caller as an internal error.
    pub fn is_internal(&self) -> bool {
        self.kind.is_internal()
    }

    /// Whether this error may clear up on retry.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_kinds() {
        assert!(ErrorKind::Database.is_internal());
        assert!(ErrorKind::Cache.is_internal());
        assert!(!ErrorKind::Unauthorized.is_internal());
        assert!(!ErrorKind::TooManyRequests.is_internal());
    }

    #[test]
    fn test_only_cache_errors_are_transient() {
        assert!(AppError::cache("connection reset").is_transient());
        assert!(!AppError::database("deadlock").is_transient());
        assert!(!AppError::bad_request("wrong code").is_transient());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::not_found("Session not found");
        assert_eq!(err.to_string(), "NOT_FOUND: Session not found");
    }

    #[test]
    fn test_constructors_set_kind() {
        assert_eq!(AppError::too_many_requests("slow down").kind, ErrorKind::TooManyRequests);
        assert_eq!(AppError::conflict("rotated").kind, ErrorKind::Conflict);
        assert_eq!(ErrorKind::Conflict.code(), "CONFLICT");
    }
}
