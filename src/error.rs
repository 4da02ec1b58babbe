//! Error types for the account insight pipeline

use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, InsightError>;

/// Which of the three banking fetches failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankResource {
    Balance,
    Spending,
    DirectDebits,
}

impl fmt::Display for BankResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BankResource::Balance => "balance",
            BankResource::Spending => "category spending",
            BankResource::DirectDebits => "direct debits",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum InsightError {

    // =============================
    // Stage Errors
    // =============================

    #[error("Failed to fetch {resource}: {reason}")]
    FetchError {
        resource: BankResource,
        reason: String,
    },

    #[error("Completion error: {0}")]
    CompletionError(String),

    #[error("Completion response contained no choices")]
    NoCompletionError,

    #[error("Call delivery error: {0}")]
    DeliveryError(String),

    // =============================
    // Pipeline Policy Errors
    // =============================

    #[error("No summary is ready to deliver")]
    NotReadyError,

    #[error("A pipeline run is already in progress")]
    ConcurrentRunError,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl InsightError {
    pub fn fetch(resource: BankResource, reason: impl Into<String>) -> Self {
        InsightError::FetchError {
            resource,
            reason: reason.into(),
        }
    }
}
