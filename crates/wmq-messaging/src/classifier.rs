//! Classification of native faults into messaging errors.

use crate::error::MessagingError;
use crate::mqc;
use crate::native::MqError;
use std::error::Error;

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;

/// Cause chains longer than this are not inspected further
const MAX_CAUSE_DEPTH: usize = 32;

/// Reason codes meaning the queue manager or the connection to it is gone
pub const CONNECTION_LOST_REASON_CODES: [i32; 9] = [
    mqc::MQRC_CONNECTION_BROKEN,
    mqc::MQRC_CONNECTION_QUIESCING,
    mqc::MQRC_CONNECTION_STOPPING,
    mqc::MQRC_OPEN_FAILED,
    mqc::MQRC_Q_MGR_NOT_AVAILABLE,
    mqc::MQRC_Q_MGR_QUIESCING,
    mqc::MQRC_Q_MGR_STOPPING,
    mqc::MQRC_NO_EXTERNAL_PARTICIPANTS,
    mqc::MQRC_UNEXPECTED_ERROR,
];

/// Turns native faults into [`MessagingError`]s.
///
/// Implementations can be swapped on the provider.
pub trait ExceptionClassifier: Send + Sync {
    /// Wrap a native fault, choosing the retryable connectivity variant when
    /// the fault or any of its causes indicates a lost connection
    fn create_messaging_error(&self, message: String, error: MqError) -> MessagingError {
        if self.is_connection_lost(&error) {
            MessagingError::ConnectionLost {
                message,
                source: error,
            }
        } else {
            MessagingError::Native {
                message,
                source: error,
            }
        }
    }

    /// Whether the fault chain indicates a lost connection
    fn is_connection_lost(&self, error: &(dyn Error + 'static)) -> bool;
}

/// Classifies by the fixed set of connection-lost reason codes
#[derive(Debug, Clone, Default)]
pub struct BasicExceptionClassifier;

impl BasicExceptionClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ExceptionClassifier for BasicExceptionClassifier {
    fn is_connection_lost(&self, error: &(dyn Error + 'static)) -> bool {
        let mut current = Some(error);
        let mut depth = 0;
        while let Some(error) = current {
            if depth >= MAX_CAUSE_DEPTH {
                return false;
            }
            if let Some(native) = error.downcast_ref::<MqError>() {
                if CONNECTION_LOST_REASON_CODES.contains(&native.reason_code()) {
                    return true;
                }
            }
            current = error.source();
            depth += 1;
        }
        false
    }
}
