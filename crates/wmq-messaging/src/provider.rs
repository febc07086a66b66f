//! Messaging provider: session factory, put/get protocol, poison-message
//! policy and distributed-transaction primitives.
//!
//! # Poison messages
//!
//! A message whose backout count exceeds the configured limit is never
//! delivered. Without a poison queue the provider raises a
//! [`ProcessAbort`] and the consumer stops. With a poison queue the message
//! is diverted there and processing continues.

use crate::classifier::{BasicExceptionClassifier, ExceptionClassifier};
use crate::config::ProviderConfig;
use crate::error::{ConfigurationError, MessagingError, ProcessAbort};
use crate::fields::{BasicFieldMapper, FieldMapper};
use crate::message::{id_to_hex, ReceivedMessage, SendingMessage};
use crate::mqc;
use crate::native::{
    ConnectOptions, EnlistError, Envelope, GetOptions, MqError, OpenOptions, PutOptions,
    QueueHandle, QueueManager, QueueManagerConnector, Transport,
};
use crate::session::{Destinations, QueueSession};
use crate::transaction::{DbConnection, XaDataSource};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, trace};

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;

/// Creates queue sessions and implements the messaging protocol they use
pub struct MessagingProvider {
    config: ProviderConfig,
    poison_queue_name: Option<String>,
    connector: Arc<dyn QueueManagerConnector>,
    field_mapper: Arc<dyn FieldMapper>,
    classifier: Arc<dyn ExceptionClassifier>,
}

impl std::fmt::Debug for MessagingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingProvider")
            .field("config", &self.config)
            .field("poison_queue_name", &self.poison_queue_name)
            .finish_non_exhaustive()
    }
}

impl MessagingProvider {
    /// Create a provider, validating the poison queue settings and
    /// resolving the poison queue name
    pub fn new(
        config: ProviderConfig,
        connector: Arc<dyn QueueManagerConnector>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let poison_queue_name = config.resolved_poison_queue_name();

        let field_mapper = BasicFieldMapper::new()
            .with_character_set_id(config.character_set_id)
            .with_persistence(config.persistence);

        info!(
            queue_manager = %config.queue_manager_name,
            received_queue = config.received_queue_name().unwrap_or_default(),
            poison_queue = poison_queue_name.as_deref().unwrap_or_default(),
            use_xa = config.use_xa,
            "Messaging provider initialized"
        );

        Ok(Self {
            config,
            poison_queue_name,
            connector,
            field_mapper: Arc::new(field_mapper),
            classifier: Arc::new(BasicExceptionClassifier::new()),
        })
    }

    /// Replace the envelope field mapping
    pub fn with_field_mapper(mut self, field_mapper: Arc<dyn FieldMapper>) -> Self {
        self.field_mapper = field_mapper;
        self
    }

    /// Replace the native fault classification
    pub fn with_exception_classifier(mut self, classifier: Arc<dyn ExceptionClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Resolved poison queue name, if any
    pub fn poison_queue_name(&self) -> Option<&str> {
        self.poison_queue_name.as_deref()
    }

    // ========================================================================
    // Session Creation
    // ========================================================================

    /// Environment used for every connection
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            transport: Transport::Bindings,
            thread_affinity: self.config.use_xa,
            native_diagnostics: self.config.native_diagnostics,
        }
    }

    /// Open a connection and all configured queues
    pub fn create_session(self: &Arc<Self>) -> Result<QueueSession, MessagingError> {
        let context = format!(
            "could not initialize queue manager connection/queues. queueManagerName = [{}]",
            self.config.queue_manager_name
        );

        let mut queue_manager = self
            .connector
            .connect(&self.config.queue_manager_name, &self.connect_options())
            .map_err(|e| self.classifier.create_messaging_error(context.clone(), e))?;

        let mut destinations = Destinations::default();
        if let Err(e) = self.open_destinations(queue_manager.as_mut(), &mut destinations) {
            self.close_destinations(&mut destinations);
            self.disconnect(queue_manager.as_mut());
            return Err(self.classifier.create_messaging_error(context, e));
        }

        debug!(
            queue_manager = %self.config.queue_manager_name,
            sending_queues = destinations.sending.len(),
            "Queue session opened"
        );
        Ok(QueueSession::new(Arc::clone(self), queue_manager, destinations))
    }

    fn open_destinations(
        &self,
        queue_manager: &mut dyn QueueManager,
        destinations: &mut Destinations,
    ) -> Result<(), MqError> {
        for name in &self.config.sending_queue_names {
            if let Some(handle) =
                Self::open_queue(queue_manager, name, self.sending_queue_open_options())?
            {
                destinations.sending.insert(name.clone(), handle);
            }
        }

        if let Some(name) = self.config.received_queue_name() {
            destinations.received =
                Self::open_queue(queue_manager, name, self.received_queue_open_options())?;
        }
        if let Some(name) = self.poison_queue_name.as_deref() {
            destinations.poison =
                Self::open_queue(queue_manager, name, self.poison_queue_open_options())?;
        }
        Ok(())
    }

    fn open_queue(
        queue_manager: &mut dyn QueueManager,
        name: &str,
        options: OpenOptions,
    ) -> Result<Option<Box<dyn QueueHandle>>, MqError> {
        if name.is_empty() {
            return Ok(None);
        }
        queue_manager.access_queue(name, options).map(Some)
    }

    pub fn sending_queue_open_options(&self) -> OpenOptions {
        OpenOptions(mqc::MQOO_OUTPUT | mqc::MQOO_FAIL_IF_QUIESCING)
    }

    pub fn received_queue_open_options(&self) -> OpenOptions {
        OpenOptions(mqc::MQOO_INPUT_SHARED | mqc::MQOO_FAIL_IF_QUIESCING)
    }

    pub fn poison_queue_open_options(&self) -> OpenOptions {
        self.sending_queue_open_options()
    }

    pub(crate) fn classify(&self, message: &str, error: MqError) -> MessagingError {
        self.classifier
            .create_messaging_error(message.to_string(), error)
    }

    // ========================================================================
    // Put
    // ========================================================================

    pub fn put_options(&self) -> PutOptions {
        let syncpoint = if self.config.use_xa {
            mqc::MQPMO_SYNCPOINT
        } else {
            mqc::MQPMO_NO_SYNCPOINT
        };
        PutOptions {
            options: syncpoint | mqc::MQPMO_NEW_MSG_ID,
        }
    }

    /// Put a message and return the message id assigned by the queue manager
    pub fn put(
        &self,
        queue: &mut dyn QueueHandle,
        message: &mut SendingMessage,
    ) -> Result<String, MessagingError> {
        let mut envelope = Envelope::new();
        self.field_mapper.set_fields_before_send(
            message,
            &mut envelope,
            self.config.default_time_to_live(),
        )?;
        envelope.write(message.body())?;

        queue
            .put(&mut envelope, &self.put_options())
            .map_err(|e| self.classify("an error occurred while sending the message.", e))?;

        self.field_mapper.get_fields_after_send(&envelope, message)?;
        Ok(message.message_id().unwrap_or_default().to_string())
    }

    // ========================================================================
    // Get
    // ========================================================================

    /// Get options; a non-positive timeout uses the configured default
    pub fn get_options(&self, correlation_id: Option<&str>, timeout: Duration) -> GetOptions {
        let syncpoint = if self.config.use_xa {
            mqc::MQGMO_SYNCPOINT
        } else {
            mqc::MQGMO_NO_SYNCPOINT
        };
        let match_options = if correlation_id.is_some_and(|id| !id.is_empty()) {
            mqc::MQMO_MATCH_CORREL_ID
        } else {
            mqc::MQMO_NONE
        };
        let wait_ms = if timeout.num_milliseconds() <= 0 {
            self.config.default_response_timeout_ms
        } else {
            timeout.num_milliseconds()
        };

        GetOptions {
            options: syncpoint | mqc::MQGMO_WAIT,
            match_options,
            wait_interval: i32::try_from(wait_ms).unwrap_or(i32::MAX),
        }
    }

    /// Get one message.
    ///
    /// Returns `Ok(None)` when no message arrived within the wait interval or
    /// when the message was poison and has been diverted.
    pub fn get(
        &self,
        queue: &mut dyn QueueHandle,
        correlation_id: Option<&str>,
        timeout: Duration,
        poison_queue: Option<&mut dyn QueueHandle>,
    ) -> Result<Option<ReceivedMessage>, MessagingError> {
        let mut envelope = Envelope::new();
        self.field_mapper
            .set_fields_before_receive(correlation_id, &mut envelope)?;

        match queue.get(&mut envelope, &self.get_options(correlation_id, timeout)) {
            Ok(()) => {}
            Err(e) if e.reason_code() == mqc::MQRC_NO_MSG_AVAILABLE => return Ok(None),
            Err(e) => {
                return Err(self.classify("an error occurred while receiving the message.", e))
            }
        }

        if self.is_poison(envelope.backout_count) {
            self.process_poison(poison_queue, envelope)?;
            return Ok(None);
        }

        let body = envelope.read_fully()?;
        let mut message = ReceivedMessage::new(body);
        self.field_mapper
            .get_fields_after_receive(&envelope, &mut message)?;
        Ok(Some(message))
    }

    /// Whether a message with this backout count exceeds the backout limit
    pub fn is_poison(&self, backout_count: i32) -> bool {
        trace!(
            backout_limit = self.config.backout_limit,
            backout_count,
            "Checking backout limit"
        );
        self.config.backout_limit < backout_count
    }

    /// Divert a poison message, or abort when that is impossible
    pub fn process_poison(
        &self,
        poison_queue: Option<&mut dyn QueueHandle>,
        mut envelope: Envelope,
    ) -> Result<(), MessagingError> {
        let exceeded = MessagingError::BackoutLimitExceeded {
            message_id: id_to_hex(&envelope.message_id),
            backout_count: envelope.backout_count,
        };

        let Some(poison_queue) = poison_queue else {
            return Err(ProcessAbort::new(
                self.config.backout_limit_exceeded_exit_code,
                exceeded,
                self.config.backout_limit_exceeded_failure_code.clone(),
            )
            .into());
        };

        error!(
            failure_code = self
                .config
                .backout_limit_exceeded_failure_code
                .as_deref()
                .unwrap_or_default(),
            message_id = %id_to_hex(&envelope.message_id),
            backout_count = envelope.backout_count,
            error = %exceeded,
            "Diverting poison message to the poison queue"
        );

        envelope.expiry = mqc::MQEI_UNLIMITED;
        envelope.correlation_id = envelope.message_id;

        if let Err(e) = poison_queue.put(&mut envelope, &self.put_options()) {
            let failed = self.classify("an error occurred while sending the poison message.", e);
            if failed.should_retry() {
                return Err(failed);
            }
            return Err(ProcessAbort::new(
                self.config.put_poison_failed_exit_code,
                failed,
                self.config.put_poison_failed_failure_code.clone(),
            )
            .into());
        }
        Ok(())
    }

    // ========================================================================
    // Distributed Transactions
    // ========================================================================

    fn check_xa(&self) -> Result<(), MessagingError> {
        if self.config.use_xa {
            Ok(())
        } else {
            Err(MessagingError::XaDisabled)
        }
    }

    pub fn begin(&self, queue_manager: &mut dyn QueueManager) -> Result<(), MessagingError> {
        self.check_xa()?;
        queue_manager
            .begin()
            .map_err(|e| self.classify("failed to begin the transaction.", e))
    }

    pub fn commit(&self, queue_manager: &mut dyn QueueManager) -> Result<(), MessagingError> {
        self.check_xa()?;
        queue_manager
            .commit()
            .map_err(|e| self.classify("failed to commit the transaction.", e))
    }

    pub fn backout(&self, queue_manager: &mut dyn QueueManager) -> Result<(), MessagingError> {
        self.check_xa()?;
        queue_manager
            .backout()
            .map_err(|e| self.classify("failed to back out the transaction.", e))
    }

    /// Database connection bound to the connection's transaction branch
    pub fn database_connection(
        &self,
        queue_manager: &mut dyn QueueManager,
        data_source: &dyn XaDataSource,
    ) -> Result<Box<dyn DbConnection>, MessagingError> {
        self.check_xa()?;
        queue_manager
            .enlist_database(data_source)
            .map_err(|e| match e {
                EnlistError::Native(e) => self.classify("failed to get database connection.", e),
                EnlistError::Database(source) => MessagingError::Database {
                    message: "failed to get database connection.".to_string(),
                    source,
                },
            })
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Close every handle; faults are logged and swallowed
    pub(crate) fn close_destinations(&self, destinations: &mut Destinations) {
        Self::close_all(&mut destinations.sending);
        if let Some(handle) = destinations.received.as_mut() {
            Self::close_queue(handle.as_mut());
        }
        if let Some(handle) = destinations.poison.as_mut() {
            Self::close_queue(handle.as_mut());
        }
    }

    fn close_all(handles: &mut HashMap<String, Box<dyn QueueHandle>>) {
        for handle in handles.values_mut() {
            Self::close_queue(handle.as_mut());
        }
    }

    fn close_queue(handle: &mut dyn QueueHandle) {
        if let Err(e) = handle.close() {
            trace!(error = %e, "Could not close queue");
        }
    }

    /// Disconnect; faults are logged and swallowed
    pub(crate) fn disconnect(&self, queue_manager: &mut dyn QueueManager) {
        if let Err(e) = queue_manager.disconnect() {
            trace!(
                queue_manager = %self.config.queue_manager_name,
                error = %e,
                "Could not disconnect from queue manager"
            );
        }
    }
}
