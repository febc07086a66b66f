//! Common test utilities for wmq-messaging integration tests
//!
//! This module provides:
//! - A broker fixture with the queues used across the suites
//! - Provider and session builders
//! - A log capture for asserting on emitted events

use std::io;
use std::sync::{Arc, Mutex};
use wmq_messaging::{InMemoryBroker, MessagingProvider, ProviderConfig, QueueSession};

pub const QM: &str = "QM1";
#[allow(dead_code)]
pub const REQUEST: &str = "APP.REQUEST";
#[allow(dead_code)]
pub const REPLY: &str = "APP.REPLY";
#[allow(dead_code)]
pub const AUDIT: &str = "APP.AUDIT";
#[allow(dead_code)]
pub const POISON: &str = "APP.REQUEST.POISON";

// ============================================================================
// Fixtures
// ============================================================================

/// Broker with the request, reply, audit and poison queues defined
pub fn broker() -> InMemoryBroker {
    let broker = InMemoryBroker::new(QM);
    for queue in [REQUEST, REPLY, AUDIT, POISON] {
        broker.define_queue(queue);
    }
    broker
}

/// Configuration of a service that consumes requests and sends replies
#[allow(dead_code)]
pub fn service_config() -> ProviderConfig {
    ProviderConfig {
        sending_queue_names: vec![REPLY.to_string(), AUDIT.to_string()],
        received_queue_name: Some(REQUEST.to_string()),
        poison_queue_name_pattern: Some("%s.POISON".to_string()),
        ..ProviderConfig::new(QM)
    }
}

/// Configuration of a client that sends requests and awaits replies
#[allow(dead_code)]
pub fn client_config() -> ProviderConfig {
    ProviderConfig {
        sending_queue_names: vec![REQUEST.to_string()],
        received_queue_name: Some(REPLY.to_string()),
        use_xa: false,
        ..ProviderConfig::new(QM)
    }
}

#[allow(dead_code)]
pub fn provider(broker: &InMemoryBroker, config: ProviderConfig) -> Arc<MessagingProvider> {
    Arc::new(MessagingProvider::new(config, Arc::new(broker.connector())).unwrap())
}

#[allow(dead_code)]
pub fn session(broker: &InMemoryBroker, config: ProviderConfig) -> QueueSession {
    provider(broker, config).create_session().unwrap()
}

// ============================================================================
// Log Capture
// ============================================================================

/// Collects formatted log output written by a scoped subscriber
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl CapturedLogs {
    /// Run `f` with a subscriber writing into this capture
    pub fn capture<T>(&self, level: tracing::Level, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(level)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
