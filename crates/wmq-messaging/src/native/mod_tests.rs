//! Tests for native envelope and fault types.

use super::*;

#[test]
fn test_envelope_defaults() {
    let envelope = Envelope::new();
    assert_eq!(envelope.version, mqc::MQMD_VERSION_1);
    assert_eq!(envelope.message_id, mqc::MQMI_NONE);
    assert_eq!(envelope.correlation_id, mqc::MQCI_NONE);
    assert_eq!(envelope.expiry, mqc::MQEI_UNLIMITED);
    assert_eq!(envelope.message_sequence_number, 1);
    assert_eq!(envelope.data_length(), 0);
}

#[test]
fn test_envelope_write_then_read() {
    let mut envelope = Envelope::new();
    envelope.write(b"hello ").unwrap();
    envelope.write(b"world").unwrap();

    assert_eq!(envelope.data_length(), 11);
    assert_eq!(envelope.read_fully().unwrap(), Bytes::from_static(b"hello world"));
}

/// A declared length longer than the transferred data cannot be read.
#[test]
fn test_envelope_read_truncated_data_fails() {
    let mut envelope = Envelope::new();
    envelope.set_received_data(b"abc".to_vec(), 10);

    let err = envelope.read_fully().unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
}

#[test]
fn test_mq_error_codes_and_source() {
    let inner = MqError::failed(mqc::MQRC_CONNECTION_BROKEN);
    let outer = MqError::failed(mqc::MQRC_RESOURCE_PROBLEM).with_source(inner);

    assert_eq!(outer.completion_code(), mqc::MQCC_FAILED);
    assert_eq!(outer.reason_code(), mqc::MQRC_RESOURCE_PROBLEM);

    let source = std::error::Error::source(&outer).expect("source attached");
    let source = source.downcast_ref::<MqError>().expect("native source");
    assert_eq!(source.reason_code(), mqc::MQRC_CONNECTION_BROKEN);
}

#[test]
fn test_option_flags() {
    let options = PutOptions {
        options: mqc::MQPMO_SYNCPOINT | mqc::MQPMO_NEW_MSG_ID,
    };
    assert!(options.contains(mqc::MQPMO_SYNCPOINT));
    assert!(options.contains(mqc::MQPMO_NEW_MSG_ID));
    assert!(!options.contains(mqc::MQPMO_NO_SYNCPOINT));

    let open = OpenOptions(mqc::MQOO_OUTPUT | mqc::MQOO_FAIL_IF_QUIESCING);
    assert!(open.contains(mqc::MQOO_OUTPUT));
    assert!(!open.contains(mqc::MQOO_INPUT_SHARED));
}
