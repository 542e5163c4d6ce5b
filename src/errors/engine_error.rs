//! Custom error types for the engine

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Source unavailable: {source_id} - {message}")]
    Unavailable {
        source_id: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Timeout after {elapsed:?}: {source_id}")]
    Timeout {
        source_id: String,
        elapsed: Duration,
    },

    #[error("Insufficient data for {context}: {available} of {required} required")]
    InsufficientData {
        context: String,
        available: usize,
        required: usize,
    },

    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration {
        field: String,
        reason: String,
    },

    #[error("Malformed transaction {hash}: {reason}")]
    MalformedTransaction {
        hash: String,
        reason: String,
    },

    #[error("Data parsing error: {context}")]
    DataParsing {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    pub fn unavailable(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Unavailable {
            source_id: source_id.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Unavailable { .. } | EngineError::Timeout { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
