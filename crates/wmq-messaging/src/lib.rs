//! # WMQ Messaging
//!
//! Transactional messaging gateway over a point-to-point queue manager.
//!
//! This library provides:
//! - Sessions that own a queue-manager connection and its opened queues
//! - Send and receive with header mapping between messages and native envelopes
//! - Poison-message diversion once a message exceeds its backout limit
//! - Connection-loss classification so callers can reconnect and retry
//! - Units of work shared between the queue manager and an enlisted database
//!
//! ## Module Organization
//!
//! - [`config`] - Provider configuration and poison-queue resolution
//! - [`error`] - Error types for messaging operations
//! - [`message`] - Sending and received message types
//! - [`fields`] - Header mapping onto native envelopes
//! - [`classifier`] - Native fault classification
//! - [`provider`] - The messaging provider and its poison policy
//! - [`session`] - Queue sessions
//! - [`transaction`] - Distributed transaction coordination
//! - [`native`] - Native queue-manager capability and an in-memory broker
//! - [`mqc`] - Native constants

// Module declarations
pub mod classifier;
pub mod config;
pub mod error;
pub mod fields;
pub mod message;
pub mod mqc;
pub mod native;
pub mod provider;
pub mod session;
pub mod transaction;

// Re-export commonly used types at crate root for convenience
pub use crate::classifier::{BasicExceptionClassifier, ExceptionClassifier};
pub use crate::config::ProviderConfig;
pub use crate::error::{ConfigurationError, DbError, MessagingError, ProcessAbort};
pub use crate::fields::{BasicFieldMapper, FieldMapper};
pub use crate::message::{MessageKind, ReceivedMessage, SendingMessage};
pub use crate::native::{InMemoryBroker, MqError, QueueManagerConnector};
pub use crate::provider::MessagingProvider;
pub use crate::session::QueueSession;
pub use crate::transaction::{
    DbConnection, IsolationLevel, Transaction, TransactionBranch, XaDataSource, XaDbConnection,
    XaDbConnectionFactory, XaTransaction, XaTransactionFactory,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
