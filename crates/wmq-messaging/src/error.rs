//! Error types for messaging operations.

use crate::native::MqError;
use thiserror::Error;

/// Comprehensive error type for all messaging operations
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The queue manager or the connection to it is unavailable.
    #[error("{message}: {source}")]
    ConnectionLost {
        message: String,
        #[source]
        source: MqError,
    },

    #[error("{message}: {source}")]
    Native {
        message: String,
        #[source]
        source: MqError,
    },

    #[error("message body could not be transferred: {0}")]
    Io(#[from] std::io::Error),

    #[error("queue was not found. queueName = [{queue_name}]")]
    QueueNotFound { queue_name: String },

    /// A message was redelivered more often than the configured backout limit
    #[error("backout limit was exceeded. messageId = [{message_id}], backoutCount = [{backout_count}]")]
    BackoutLimitExceeded {
        message_id: String,
        backout_count: i32,
    },

    #[error("invalid message identifier: [{value}]")]
    InvalidId { value: String },

    #[error("XA configuration was incorrect. distributed transactions must be enabled on the provider")]
    XaDisabled,

    #[error("session has already been closed")]
    SessionClosed,

    #[error("{message}: {source}")]
    Database {
        message: String,
        #[source]
        source: DbError,
    },

    #[error(transparent)]
    ProcessAbort(#[from] ProcessAbort),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl MessagingError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionLost { .. } => true,
            Self::Native { .. } => false,
            Self::Io(_) => false,
            Self::QueueNotFound { .. } => false,
            Self::BackoutLimitExceeded { .. } => false,
            Self::InvalidId { .. } => false,
            Self::XaDisabled => false,
            Self::SessionClosed => false,
            Self::Database { .. } => false,
            Self::ProcessAbort(_) => false,
            Self::Configuration(_) => false,
        }
    }

    /// Check if error should be retried
    pub fn should_retry(&self) -> bool {
        self.is_transient()
    }

    /// Check if the consuming process must terminate
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ProcessAbort(_))
    }

    /// Native reason code carried by the error, if any
    pub fn reason_code(&self) -> Option<i32> {
        match self {
            Self::ConnectionLost { source, .. } | Self::Native { source, .. } => {
                Some(source.reason_code())
            }
            _ => None,
        }
    }
}

/// Fatal signal asking the supervising process to log and terminate.
///
/// Raised when a poison message cannot be quarantined.
#[derive(Debug, Error)]
#[error("process must abort (exit code {exit_code}): {source}")]
pub struct ProcessAbort {
    exit_code: i32,
    failure_code: Option<String>,
    #[source]
    source: Box<MessagingError>,
}

impl ProcessAbort {
    pub fn new(exit_code: i32, source: MessagingError, failure_code: Option<String>) -> Self {
        Self {
            exit_code,
            failure_code,
            source: Box::new(source),
        }
    }

    /// Process exit code requested by the provider configuration
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Opaque failure code for operational logging
    pub fn failure_code(&self) -> Option<&str> {
        self.failure_code.as_deref()
    }

    /// The fault that triggered the abort
    pub fn cause(&self) -> &MessagingError {
        &self.source
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("poison queue setting was invalid. {reason} queueManagerName = [{queue_manager_name}], poisonQueueNamePattern = [{pattern}], poisonQueueName = [{name}]")]
    InvalidPoisonSetting {
        reason: &'static str,
        queue_manager_name: String,
        pattern: String,
        name: String,
    },

    #[error("invalid isolation level. isolation level: {value}")]
    InvalidIsolationLevel { value: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

/// Failure reported by a database connection
#[derive(Debug, Error)]
#[error("database error: {message}")]
pub struct DbError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DbError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
