//! Error types for gatehouse.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all gatehouse operations.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Invalid quantity: {0} (must be positive)")]
    InvalidQuantity(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No pending request for token {token}")]
    NotFound { token: String },

    #[error("Conflict on token {token}: {reason}")]
    Conflict { token: String, reason: String },

    #[error("Token {token} was interrupted while executing; its side effect may have run")]
    Interrupted { token: String },

    #[error("Action {action} failed: {message}")]
    Action {
        action: String,
        message: String,
        retryable: bool,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Session {0} is closed")]
    SessionClosed(String),
}

impl GateError {
    pub fn not_found(token: impl Into<String>) -> Self {
        Self::NotFound {
            token: token.into(),
        }
    }

    pub fn conflict(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub fn interrupted(token: impl Into<String>) -> Self {
        Self::Interrupted {
            token: token.into(),
        }
    }

    /// An action failure that the retry policy may try again.
    pub fn transient(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Action {
            action: action.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// An action failure that must not be retried.
    pub fn permanent(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Action {
            action: action.into(),
            message: message.into(),
            retryable: false,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidQuantity(_) | Self::InvalidInput(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } | Self::Interrupted { .. } => ErrorCategory::Conflict,
            Self::Action { .. } => ErrorCategory::Action,
            Self::Storage(_) | Self::Io(_) | Self::SessionClosed(_) => ErrorCategory::Storage,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// Only action failures flagged as transient qualify; validation,
    /// not-found and conflict errors are always surfaced to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Action { retryable: true, .. })
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Validation => RecoverySuggestion::CorrectInput,
            ErrorCategory::NotFound => RecoverySuggestion::RestartFlow,
            ErrorCategory::Conflict => RecoverySuggestion::RereadState,
            ErrorCategory::Action if self.is_retryable() => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Storage | ErrorCategory::Serialization => {
                RecoverySuggestion::CheckStorage
            }
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, GateError>;
