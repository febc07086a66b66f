//! Integration tests for configuration loading and validation

mod common;

use common::*;
use serial_test::serial;
use std::io::Write;
use std::sync::Arc;
use wmq_messaging::{ConfigurationError, MessagingProvider, ProviderConfig};

fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Verify that a configuration file drives a working provider
#[test]
#[serial]
fn test_loaded_configuration_opens_session() {
    let file = yaml_file(
        r#"
queue_manager_name: QM1
sending_queue_names:
  - APP.REPLY
received_queue_name: APP.REQUEST
poison_queue_name_pattern: "%s.POISON"
backout_limit: 3
"#,
    );

    let config = ProviderConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.backout_limit, 3);
    assert_eq!(config.default_response_timeout_ms, 300_000);

    let broker = broker();
    let provider = provider(&broker, config);
    assert_eq!(provider.poison_queue_name(), Some(POISON));

    let session = provider.create_session().unwrap();
    assert_eq!(session.sending_queue_names().collect::<Vec<_>>(), vec![REPLY]);
}

/// Verify that an explicit configuration file must exist
#[test]
#[serial]
fn test_missing_configuration_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");

    let err = ProviderConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigurationError::Parsing { .. }));
}

/// Verify that conflicting poison settings stop provider construction
#[test]
#[serial]
fn test_conflicting_poison_settings_are_rejected() {
    let file = yaml_file(
        r#"
queue_manager_name: QM1
received_queue_name: APP.REQUEST
poison_queue_name: APP.DEAD
poison_queue_name_pattern: "%s.POISON"
"#,
    );
    let config = ProviderConfig::load(Some(file.path())).unwrap();

    let broker = broker();
    let err = MessagingProvider::new(config, Arc::new(broker.connector())).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidPoisonSetting { .. }));
    assert!(err.to_string().contains("queueManagerName = [QM1]"));
}

/// Verify that an explicit poison queue name is used as configured
#[test]
fn test_explicit_poison_queue_name() {
    let config = ProviderConfig {
        received_queue_name: Some(REQUEST.to_string()),
        poison_queue_name: Some(POISON.to_string()),
        ..ProviderConfig::new(QM)
    };

    let broker = broker();
    let provider = provider(&broker, config);
    assert_eq!(provider.poison_queue_name(), Some(POISON));
}

/// Verify that environment variables override the configuration file
#[test]
#[serial]
fn test_environment_overrides_file() {
    let file = yaml_file(
        r#"
queue_manager_name: QM1
backout_limit: 3
"#,
    );

    std::env::set_var("WMQ__BACKOUT_LIMIT", "5");
    std::env::set_var("WMQ__SENDING_QUEUE_NAMES", "APP.REPLY,APP.AUDIT");
    let loaded = ProviderConfig::load(Some(file.path()));
    std::env::remove_var("WMQ__BACKOUT_LIMIT");
    std::env::remove_var("WMQ__SENDING_QUEUE_NAMES");

    let config = loaded.unwrap();
    assert_eq!(config.queue_manager_name, QM);
    assert_eq!(config.backout_limit, 5);
    assert_eq!(config.sending_queue_names, vec![REPLY, AUDIT]);
}
