//! Native queue-manager capability.
//!
//! The wire protocol of the queue manager is provided by the environment. This
//! module describes the capability the provider relies on: connecting to a
//! queue manager, opening queue handles, moving [`Envelope`]s with put/get and
//! driving the connection's unit of work.
//!
//! [`memory`] contains a complete in-process implementation used for
//! development and testing.

use crate::error::DbError;
use crate::mqc;
use crate::transaction::{DbConnection, XaDataSource};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::{Read, Write};
use thiserror::Error;

pub mod memory;

pub use memory::{BrokerEvent, FaultPoint, InMemoryBroker, InMemoryConnector};

// ============================================================================
// Native Fault
// ============================================================================

/// Fault raised by a native queue-manager call.
///
/// Faults may wrap a cause; classification walks the whole chain.
#[derive(Debug, Error)]
#[error("native call failed: completion code {completion_code}, reason code {reason_code}")]
pub struct MqError {
    completion_code: i32,
    reason_code: i32,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl MqError {
    pub fn new(completion_code: i32, reason_code: i32) -> Self {
        Self {
            completion_code,
            reason_code,
            source: None,
        }
    }

    /// Failed call with the given reason code
    pub fn failed(reason_code: i32) -> Self {
        Self::new(mqc::MQCC_FAILED, reason_code)
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn completion_code(&self) -> i32 {
        self.completion_code
    }

    pub fn reason_code(&self) -> i32 {
        self.reason_code
    }
}

/// Failure to enlist a database connection in the unit of work
#[derive(Debug, Error)]
pub enum EnlistError {
    #[error(transparent)]
    Native(#[from] MqError),

    /// The data source could not provide a connection
    #[error(transparent)]
    Database(#[from] DbError),
}

// ============================================================================
// Envelope
// ============================================================================

/// Native message record: descriptor fields plus the message data.
///
/// A fresh envelope is created for every put and get.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub version: i32,
    pub encoding: i32,
    pub format: String,
    pub message_sequence_number: i32,
    pub message_id: [u8; mqc::ID_LENGTH],
    pub correlation_id: [u8; mqc::ID_LENGTH],
    pub message_type: i32,
    pub put_date_time: Option<DateTime<Utc>>,
    pub character_set: i32,
    pub persistence: i32,
    pub reply_to_queue_name: String,
    /// Expiry in tenths of a second, or `MQEI_UNLIMITED`
    pub expiry: i32,
    pub backout_count: i32,
    data: Vec<u8>,
    data_length: usize,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            version: mqc::MQMD_VERSION_1,
            encoding: mqc::MQENC_NATIVE,
            format: mqc::MQFMT_NONE.to_string(),
            message_sequence_number: 1,
            message_id: mqc::MQMI_NONE,
            correlation_id: mqc::MQCI_NONE,
            message_type: mqc::MQMT_DATAGRAM,
            put_date_time: None,
            character_set: mqc::MQCCSI_Q_MGR,
            persistence: mqc::MQPER_PERSISTENCE_AS_Q_DEF,
            reply_to_queue_name: String::new(),
            expiry: mqc::MQEI_UNLIMITED,
            backout_count: 0,
            data: Vec::new(),
            data_length: 0,
        }
    }
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the message data
    pub fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.data.write_all(bytes)?;
        self.data_length = self.data.len();
        Ok(())
    }

    /// Length of the message data as reported by the queue manager
    pub fn data_length(&self) -> usize {
        self.data_length
    }

    /// Read the complete message data
    pub fn read_fully(&self) -> std::io::Result<Bytes> {
        let mut body = vec![0u8; self.data_length];
        let mut reader = self.data.as_slice();
        reader.read_exact(&mut body)?;
        Ok(Bytes::from(body))
    }

    /// Install data delivered by a get call.
    ///
    /// `declared_length` is the length the queue manager reported, which may
    /// differ from the bytes actually transferred.
    pub fn set_received_data(&mut self, data: Vec<u8>, declared_length: usize) {
        self.data = data;
        self.data_length = declared_length;
    }

    /// Raw message data
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

// ============================================================================
// Call Options
// ============================================================================

/// Options used when opening a queue handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions(pub i32);

impl OpenOptions {
    pub fn contains(&self, flag: i32) -> bool {
        self.0 & flag == flag
    }
}

/// Options for a put call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOptions {
    pub options: i32,
}

impl PutOptions {
    pub fn contains(&self, flag: i32) -> bool {
        self.options & flag == flag
    }
}

/// Options for a get call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOptions {
    pub options: i32,
    pub match_options: i32,
    /// Wait interval in milliseconds, or `MQWI_UNLIMITED`
    pub wait_interval: i32,
}

impl GetOptions {
    pub fn contains(&self, flag: i32) -> bool {
        self.options & flag == flag
    }
}

/// How the client attaches to the queue manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Shared-memory bindings to a local queue manager
    Bindings,
}

/// Environment settings applied when connecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub transport: Transport,
    /// Keep the connection on the thread that created it (required for XA)
    pub thread_affinity: bool,
    /// Let the native library write its own diagnostics to stderr
    pub native_diagnostics: bool,
}

// ============================================================================
// Capability Traits
// ============================================================================

/// Opens connections to a named queue manager
pub trait QueueManagerConnector: Send + Sync {
    fn connect(
        &self,
        queue_manager_name: &str,
        options: &ConnectOptions,
    ) -> Result<Box<dyn QueueManager>, MqError>;
}

/// One open connection to a queue manager
pub trait QueueManager: Send {
    /// Open a queue handle on this connection
    fn access_queue(
        &mut self,
        queue_name: &str,
        options: OpenOptions,
    ) -> Result<Box<dyn QueueHandle>, MqError>;

    /// Start a global unit of work
    fn begin(&mut self) -> Result<(), MqError>;

    fn commit(&mut self) -> Result<(), MqError>;

    fn backout(&mut self) -> Result<(), MqError>;

    /// Obtain a database connection enlisted in this connection's unit of work
    fn enlist_database(
        &mut self,
        data_source: &dyn XaDataSource,
    ) -> Result<Box<dyn DbConnection>, EnlistError>;

    fn disconnect(&mut self) -> Result<(), MqError>;
}

/// An opened queue
pub trait QueueHandle: Send {
    /// Native queue name (may be blank-padded)
    fn name(&self) -> Result<String, MqError>;

    fn put(&mut self, envelope: &mut Envelope, options: &PutOptions) -> Result<(), MqError>;

    fn get(&mut self, envelope: &mut Envelope, options: &GetOptions) -> Result<(), MqError>;

    fn close(&mut self) -> Result<(), MqError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
