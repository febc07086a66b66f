//! Queue session: one queue-manager connection and its opened queues.

use crate::error::MessagingError;
use crate::message::{ReceivedMessage, SendingMessage};
use crate::native::{QueueHandle, QueueManager};
use crate::provider::MessagingProvider;
use crate::transaction::{DbConnection, TransactionBranch, XaDataSource};
use chrono::Duration;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

/// Queue handles opened for a session
#[derive(Default)]
pub(crate) struct Destinations {
    pub(crate) sending: HashMap<String, Box<dyn QueueHandle>>,
    pub(crate) received: Option<Box<dyn QueueHandle>>,
    pub(crate) poison: Option<Box<dyn QueueHandle>>,
}

/// An open connection to the queue manager plus its destinations.
///
/// A session is used by one worker at a time. It is closed exactly once,
/// either explicitly or when dropped.
pub struct QueueSession {
    provider: Arc<MessagingProvider>,
    queue_manager: Box<dyn QueueManager>,
    destinations: Destinations,
    closed: bool,
}

impl fmt::Debug for QueueSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueSession")
            .field("queue_manager", &self.provider.config().queue_manager_name)
            .field("sending_queues", &self.destinations.sending.keys())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl QueueSession {
    pub(crate) fn new(
        provider: Arc<MessagingProvider>,
        queue_manager: Box<dyn QueueManager>,
        destinations: Destinations,
    ) -> Self {
        Self {
            provider,
            queue_manager,
            destinations,
            closed: false,
        }
    }

    pub fn provider(&self) -> &Arc<MessagingProvider> {
        &self.provider
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Logical names of the destinations this session can send to
    pub fn sending_queue_names(&self) -> impl Iterator<Item = &str> {
        self.destinations.sending.keys().map(String::as_str)
    }

    fn ensure_open(&self) -> Result<(), MessagingError> {
        if self.closed {
            Err(MessagingError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Send a message to its destination and return the assigned message id
    pub fn send(&mut self, message: &mut SendingMessage) -> Result<String, MessagingError> {
        self.ensure_open()?;
        let queue = self
            .destinations
            .sending
            .get_mut(message.destination())
            .ok_or_else(|| MessagingError::QueueNotFound {
                queue_name: message.destination().to_string(),
            })?;
        self.provider.put(queue.as_mut(), message)
    }

    /// Receive one message from the session's receive queue.
    ///
    /// `queue_name` must name the configured receive queue. A non-positive
    /// `timeout` waits for the configured default. Returns `Ok(None)` when no
    /// message arrived.
    pub fn receive(
        &mut self,
        queue_name: &str,
        correlation_id: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<ReceivedMessage>, MessagingError> {
        self.ensure_open()?;
        let not_found = || MessagingError::QueueNotFound {
            queue_name: queue_name.to_string(),
        };

        let received = self.destinations.received.as_mut().ok_or_else(not_found)?;
        let native_name = received.name().map_err(|source| MessagingError::Native {
            message: "failed to get queue name.".to_string(),
            source,
        })?;
        if native_name.trim() != queue_name {
            return Err(not_found());
        }

        let poison: Option<&mut dyn QueueHandle> = match self.destinations.poison.as_mut() {
            Some(handle) => Some(handle.as_mut()),
            None => None,
        };
        self.provider
            .get(received.as_mut(), correlation_id, timeout, poison)
    }

    /// Close all queues then disconnect. Never fails; closing again is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.provider.close_destinations(&mut self.destinations);
        self.provider.disconnect(self.queue_manager.as_mut());
    }

    /// Database connection bound to this session's transaction branch
    pub fn database_connection(
        &mut self,
        data_source: &dyn XaDataSource,
    ) -> Result<Box<dyn DbConnection>, MessagingError> {
        self.ensure_open()?;
        self.provider
            .database_connection(self.queue_manager.as_mut(), data_source)
    }
}

impl TransactionBranch for QueueSession {
    fn begin(&mut self) -> Result<(), MessagingError> {
        self.ensure_open()?;
        self.provider.begin(self.queue_manager.as_mut())
    }

    fn commit(&mut self) -> Result<(), MessagingError> {
        self.ensure_open()?;
        self.provider.commit(self.queue_manager.as_mut())
    }

    fn backout(&mut self) -> Result<(), MessagingError> {
        self.ensure_open()?;
        self.provider.backout(self.queue_manager.as_mut())
    }
}

impl Drop for QueueSession {
    fn drop(&mut self) {
        self.close();
    }
}
