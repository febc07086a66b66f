//! Tests for error types.

use super::*;
use crate::mqc;

fn connection_lost() -> MessagingError {
    MessagingError::ConnectionLost {
        message: "failed to put message".to_string(),
        source: MqError::failed(mqc::MQRC_CONNECTION_BROKEN),
    }
}

#[test]
fn test_error_transience() {
    assert!(connection_lost().is_transient());
    assert!(connection_lost().should_retry());

    assert!(!MessagingError::Native {
        message: "failed to put message".to_string(),
        source: MqError::failed(mqc::MQRC_UNKNOWN_OBJECT_NAME),
    }
    .is_transient());

    assert!(!MessagingError::QueueNotFound {
        queue_name: "test".to_string(),
    }
    .is_transient());

    assert!(!MessagingError::XaDisabled.should_retry());
}

/// Only a process abort asks the consumer to terminate.
#[test]
fn test_only_process_abort_is_fatal() {
    let abort = MessagingError::from(ProcessAbort::new(190, connection_lost(), None));
    assert!(abort.is_fatal());
    assert!(!abort.is_transient());

    assert!(!connection_lost().is_fatal());
    assert!(!MessagingError::SessionClosed.is_fatal());
}

#[test]
fn test_reason_code_is_exposed() {
    assert_eq!(
        connection_lost().reason_code(),
        Some(mqc::MQRC_CONNECTION_BROKEN)
    );
    assert_eq!(MessagingError::SessionClosed.reason_code(), None);
}

#[test]
fn test_queue_not_found_message() {
    let err = MessagingError::QueueNotFound {
        queue_name: "TEST.REQUEST".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "queue was not found. queueName = [TEST.REQUEST]"
    );
}

#[test]
fn test_process_abort_carries_codes_and_cause() {
    let abort = ProcessAbort::new(191, connection_lost(), Some("E-POISON".to_string()));

    assert_eq!(abort.exit_code(), 191);
    assert_eq!(abort.failure_code(), Some("E-POISON"));
    assert!(matches!(abort.cause(), MessagingError::ConnectionLost { .. }));

    let source = std::error::Error::source(&abort).unwrap();
    assert!(source.to_string().starts_with("failed to put message"));
}

#[test]
fn test_native_source_chain_is_preserved() {
    let err = connection_lost();
    let source = std::error::Error::source(&err)
        .and_then(|e| e.downcast_ref::<MqError>())
        .unwrap();
    assert_eq!(source.reason_code(), mqc::MQRC_CONNECTION_BROKEN);
}

#[test]
fn test_configuration_error_converts() {
    let err: MessagingError = ConfigurationError::InvalidIsolationLevel {
        value: "SNAPSHOT".to_string(),
    }
    .into();
    assert!(matches!(err, MessagingError::Configuration(_)));
    assert!(err.to_string().contains("SNAPSHOT"));
}

#[test]
fn test_db_error_source() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
    let err = DbError::with_source("enlist failed", io);

    assert_eq!(err.message(), "enlist failed");
    assert_eq!(err.to_string(), "database error: enlist failed");
    assert!(std::error::Error::source(&err).is_some());
    assert!(std::error::Error::source(&DbError::new("x")).is_none());
}
