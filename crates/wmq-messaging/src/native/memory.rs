//! In-memory queue manager implementation for testing and development.
//!
//! This module provides a fully functional in-process queue manager that:
//! - Stores messages per named queue in FIFO order
//! - Holds syncpoint puts and gets in a per-connection unit of work
//! - Increments the backout count of messages returned by a backout
//! - Honours wait intervals, correlation-id matching and message expiry
//! - Injects native faults at chosen call points
//!
//! This backend is intended for:
//! - Unit and integration testing of the messaging provider
//! - Development without a queue-manager installation

use super::{
    ConnectOptions, EnlistError, Envelope, GetOptions, MqError, OpenOptions, PutOptions, QueueHandle,
    QueueManager, QueueManagerConnector,
};
use crate::mqc;
use crate::transaction::{DbConnection, XaDataSource};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// Width native queue names are padded to
const QUEUE_NAME_LENGTH: usize = 48;

// ============================================================================
// Fault Injection and Journal
// ============================================================================

/// Call point at which a fault can be injected
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Connect,
    Open(String),
    Name(String),
    Put(String),
    Get(String),
    Close(String),
    Begin,
    Commit,
    Backout,
    Enlist,
    Disconnect,
}

#[derive(Debug, Clone, Copy)]
struct InjectedFault {
    reason_code: i32,
    cause_reason_code: Option<i32>,
}

impl InjectedFault {
    fn into_error(self) -> MqError {
        let error = MqError::failed(self.reason_code);
        match self.cause_reason_code {
            Some(cause) => error.with_source(MqError::failed(cause)),
            None => error,
        }
    }
}

/// Observable broker activity, recorded in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    Connected { options: ConnectOptions },
    Opened { queue: String, options: OpenOptions },
    Put { queue: String, syncpoint: bool },
    Got { queue: String, syncpoint: bool },
    Closed { queue: String },
    Begin,
    Commit,
    Backout,
    Enlisted,
    Disconnected,
}

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// A message stored in a queue with its arrival time
#[derive(Debug, Clone)]
struct StoredMessage {
    envelope: Envelope,
    put_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Check if message is expired based on its expiry in tenths of a second
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.envelope.expiry == mqc::MQEI_UNLIMITED {
            return false;
        }
        now >= self.put_at + Duration::milliseconds(i64::from(self.envelope.expiry) * 100)
    }
}

struct BrokerState {
    queue_manager_name: String,
    queues: HashMap<String, VecDeque<StoredMessage>>,
    faults: HashMap<FaultPoint, VecDeque<InjectedFault>>,
    journal: Vec<BrokerEvent>,
    next_sequence: u64,
}

impl BrokerState {
    fn take_fault(&mut self, point: &FaultPoint) -> Result<(), MqError> {
        match self.faults.get_mut(point).and_then(VecDeque::pop_front) {
            Some(fault) => Err(fault.into_error()),
            None => Ok(()),
        }
    }

    /// Generate a 24-byte message id: `AMQ `, padded manager name, sequence
    fn next_message_id(&mut self) -> [u8; mqc::ID_LENGTH] {
        self.next_sequence += 1;
        let mut id = [b' '; mqc::ID_LENGTH];
        id[..4].copy_from_slice(b"AMQ ");
        for (slot, byte) in id[4..16]
            .iter_mut()
            .zip(self.queue_manager_name.bytes())
        {
            *slot = byte;
        }
        id[16..].copy_from_slice(&self.next_sequence.to_be_bytes());
        id
    }

    fn queue_mut(&mut self, queue_name: &str) -> Result<&mut VecDeque<StoredMessage>, MqError> {
        self.queues
            .get_mut(queue_name)
            .ok_or_else(|| MqError::failed(mqc::MQRC_UNKNOWN_OBJECT_NAME))
    }
}

/// Work performed under syncpoint on one connection
#[derive(Default)]
struct UnitOfWork {
    global: bool,
    pending_puts: Vec<(String, StoredMessage)>,
    pending_gets: Vec<(String, StoredMessage)>,
}

impl UnitOfWork {
    fn is_active(&self) -> bool {
        self.global || !self.pending_puts.is_empty() || !self.pending_gets.is_empty()
    }
}

struct ConnectionState {
    connected: bool,
    unit_of_work: UnitOfWork,
}

// ============================================================================
// InMemoryBroker
// ============================================================================

/// Shared in-memory queue manager storage
#[derive(Clone)]
pub struct InMemoryBroker {
    shared: Arc<(Mutex<BrokerState>, Condvar)>,
}

impl InMemoryBroker {
    /// Create a broker for the named queue manager
    pub fn new(queue_manager_name: impl Into<String>) -> Self {
        let state = BrokerState {
            queue_manager_name: queue_manager_name.into(),
            queues: HashMap::new(),
            faults: HashMap::new(),
            journal: Vec::new(),
            next_sequence: 0,
        };
        Self {
            shared: Arc::new((Mutex::new(state), Condvar::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.shared
            .0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self) {
        self.shared.1.notify_all();
    }

    /// Define a local queue; defining an existing queue is a no-op
    pub fn define_queue(&self, queue_name: impl Into<String>) {
        self.state().queues.entry(queue_name.into()).or_default();
    }

    /// Number of committed messages on a queue
    pub fn depth(&self, queue_name: &str) -> usize {
        self.state()
            .queues
            .get(queue_name)
            .map_or(0, VecDeque::len)
    }

    /// Copies of the committed messages on a queue, head first
    pub fn browse(&self, queue_name: &str) -> Vec<Envelope> {
        self.state()
            .queues
            .get(queue_name)
            .map(|queue| queue.iter().map(|m| m.envelope.clone()).collect())
            .unwrap_or_default()
    }

    /// Fail the next call at `point` with the given reason code
    pub fn inject_fault(&self, point: FaultPoint, reason_code: i32) {
        self.push_fault(
            point,
            InjectedFault {
                reason_code,
                cause_reason_code: None,
            },
        );
    }

    /// Fail the next call at `point` with a fault whose cause carries `cause_reason_code`
    pub fn inject_fault_with_cause(&self, point: FaultPoint, reason_code: i32, cause_reason_code: i32) {
        self.push_fault(
            point,
            InjectedFault {
                reason_code,
                cause_reason_code: Some(cause_reason_code),
            },
        );
    }

    fn push_fault(&self, point: FaultPoint, fault: InjectedFault) {
        self.state().faults.entry(point).or_default().push_back(fault);
    }

    /// Recorded broker activity.
    ///
    /// The journal is unbounded and grows until [`clear_journal`](Self::clear_journal) is called.
    pub fn journal(&self) -> Vec<BrokerEvent> {
        self.state().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state().journal.clear();
    }

    /// Connector bound to this broker
    pub fn connector(&self) -> InMemoryConnector {
        InMemoryConnector {
            broker: self.clone(),
        }
    }

    fn commit(&self, unit_of_work: UnitOfWork) {
        {
            let mut state = self.state();
            for (queue_name, message) in unit_of_work.pending_puts {
                state.queues.entry(queue_name).or_default().push_back(message);
            }
        }
        self.notify();
    }

    fn backout(&self, unit_of_work: UnitOfWork) {
        {
            let mut state = self.state();
            // Restore in reverse so the original head ends up first again
            for (queue_name, mut message) in unit_of_work.pending_gets.into_iter().rev() {
                message.envelope.backout_count += 1;
                state.queues.entry(queue_name).or_default().push_front(message);
            }
        }
        self.notify();
    }
}

// ============================================================================
// InMemoryConnector
// ============================================================================

/// Opens connections to an [`InMemoryBroker`]
#[derive(Clone)]
pub struct InMemoryConnector {
    broker: InMemoryBroker,
}

impl QueueManagerConnector for InMemoryConnector {
    fn connect(
        &self,
        queue_manager_name: &str,
        options: &ConnectOptions,
    ) -> Result<Box<dyn QueueManager>, MqError> {
        let mut state = self.broker.state();
        state.take_fault(&FaultPoint::Connect)?;
        if state.queue_manager_name != queue_manager_name {
            return Err(MqError::failed(mqc::MQRC_Q_MGR_NAME_ERROR));
        }
        state.journal.push(BrokerEvent::Connected { options: *options });

        Ok(Box::new(InMemoryQueueManager {
            broker: self.broker.clone(),
            connection: Arc::new(Mutex::new(ConnectionState {
                connected: true,
                unit_of_work: UnitOfWork::default(),
            })),
        }))
    }
}

fn lock_connection(connection: &Mutex<ConnectionState>) -> MutexGuard<'_, ConnectionState> {
    connection
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// InMemoryQueueManager
// ============================================================================

/// One connection to the in-memory broker
pub struct InMemoryQueueManager {
    broker: InMemoryBroker,
    connection: Arc<Mutex<ConnectionState>>,
}

impl InMemoryQueueManager {
    fn ensure_connected(&self) -> Result<(), MqError> {
        if lock_connection(&self.connection).connected {
            Ok(())
        } else {
            Err(MqError::failed(mqc::MQRC_HCONN_ERROR))
        }
    }

    fn record(&self, point: FaultPoint, event: BrokerEvent) -> Result<(), MqError> {
        let mut state = self.broker.state();
        state.take_fault(&point)?;
        state.journal.push(event);
        Ok(())
    }

    fn take_unit_of_work(&self) -> UnitOfWork {
        std::mem::take(&mut lock_connection(&self.connection).unit_of_work)
    }
}

impl QueueManager for InMemoryQueueManager {
    fn access_queue(
        &mut self,
        queue_name: &str,
        options: OpenOptions,
    ) -> Result<Box<dyn QueueHandle>, MqError> {
        self.ensure_connected()?;
        {
            let mut state = self.broker.state();
            state.take_fault(&FaultPoint::Open(queue_name.to_string()))?;
            if !state.queues.contains_key(queue_name) {
                return Err(MqError::failed(mqc::MQRC_UNKNOWN_OBJECT_NAME));
            }
            state.journal.push(BrokerEvent::Opened {
                queue: queue_name.to_string(),
                options,
            });
        }

        Ok(Box::new(InMemoryQueueHandle {
            broker: self.broker.clone(),
            connection: Arc::clone(&self.connection),
            queue_name: queue_name.to_string(),
            options,
            open: true,
        }))
    }

    fn begin(&mut self) -> Result<(), MqError> {
        self.ensure_connected()?;
        self.record(FaultPoint::Begin, BrokerEvent::Begin)?;

        let mut connection = lock_connection(&self.connection);
        if connection.unit_of_work.is_active() {
            return Err(MqError::failed(mqc::MQRC_UOW_IN_PROGRESS));
        }
        connection.unit_of_work.global = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), MqError> {
        self.ensure_connected()?;
        self.record(FaultPoint::Commit, BrokerEvent::Commit)?;
        let unit_of_work = self.take_unit_of_work();
        self.broker.commit(unit_of_work);
        Ok(())
    }

    fn backout(&mut self) -> Result<(), MqError> {
        self.ensure_connected()?;
        self.record(FaultPoint::Backout, BrokerEvent::Backout)?;
        let unit_of_work = self.take_unit_of_work();
        self.broker.backout(unit_of_work);
        Ok(())
    }

    fn enlist_database(
        &mut self,
        data_source: &dyn XaDataSource,
    ) -> Result<Box<dyn DbConnection>, EnlistError> {
        self.ensure_connected()?;
        self.record(FaultPoint::Enlist, BrokerEvent::Enlisted)?;
        Ok(data_source.xa_connection()?)
    }

    fn disconnect(&mut self) -> Result<(), MqError> {
        self.ensure_connected()?;
        self.record(FaultPoint::Disconnect, BrokerEvent::Disconnected)?;

        // Uncommitted work does not survive the connection
        let unit_of_work = {
            let mut connection = lock_connection(&self.connection);
            connection.connected = false;
            std::mem::take(&mut connection.unit_of_work)
        };
        self.broker.backout(unit_of_work);
        Ok(())
    }
}

// ============================================================================
// InMemoryQueueHandle
// ============================================================================

/// An opened queue on an in-memory connection
pub struct InMemoryQueueHandle {
    broker: InMemoryBroker,
    connection: Arc<Mutex<ConnectionState>>,
    queue_name: String,
    options: OpenOptions,
    open: bool,
}

impl InMemoryQueueHandle {
    fn ensure_usable(&self) -> Result<(), MqError> {
        if !self.open {
            return Err(MqError::failed(mqc::MQRC_HOBJ_ERROR));
        }
        if !lock_connection(&self.connection).connected {
            return Err(MqError::failed(mqc::MQRC_HCONN_ERROR));
        }
        Ok(())
    }

    /// Find and remove the first deliverable message, dropping expired ones
    fn take_matching(
        queue: &mut VecDeque<StoredMessage>,
        correlation_id: Option<&[u8; mqc::ID_LENGTH]>,
    ) -> Option<StoredMessage> {
        let now = Utc::now();
        queue.retain(|message| !message.is_expired(now));
        let index = queue.iter().position(|message| match correlation_id {
            Some(id) => &message.envelope.correlation_id == id,
            None => true,
        })?;
        queue.remove(index)
    }
}

impl QueueHandle for InMemoryQueueHandle {
    fn name(&self) -> Result<String, MqError> {
        self.broker
            .state()
            .take_fault(&FaultPoint::Name(self.queue_name.clone()))?;
        Ok(format!("{:<width$}", self.queue_name, width = QUEUE_NAME_LENGTH))
    }

    fn put(&mut self, envelope: &mut Envelope, options: &PutOptions) -> Result<(), MqError> {
        self.ensure_usable()?;
        if !self.options.contains(mqc::MQOO_OUTPUT) {
            return Err(MqError::failed(mqc::MQRC_NOT_OPEN_FOR_OUTPUT));
        }
        let syncpoint = options.contains(mqc::MQPMO_SYNCPOINT);

        let message = {
            let mut state = self.broker.state();
            state.take_fault(&FaultPoint::Put(self.queue_name.clone()))?;
            state.queue_mut(&self.queue_name)?;

            if options.contains(mqc::MQPMO_NEW_MSG_ID) || envelope.message_id == mqc::MQMI_NONE {
                envelope.message_id = state.next_message_id();
            }
            let put_at = Utc::now();
            if envelope.put_date_time.is_none() {
                envelope.put_date_time = Some(put_at);
            }
            let message = StoredMessage {
                envelope: envelope.clone(),
                put_at,
            };
            state.journal.push(BrokerEvent::Put {
                queue: self.queue_name.clone(),
                syncpoint,
            });
            if !syncpoint {
                state.queue_mut(&self.queue_name)?.push_back(message);
                None
            } else {
                Some(message)
            }
        };

        match message {
            Some(message) => lock_connection(&self.connection)
                .unit_of_work
                .pending_puts
                .push((self.queue_name.clone(), message)),
            None => self.broker.notify(),
        }
        Ok(())
    }

    fn get(&mut self, envelope: &mut Envelope, options: &GetOptions) -> Result<(), MqError> {
        self.ensure_usable()?;
        if !self.options.contains(mqc::MQOO_INPUT_SHARED) {
            return Err(MqError::failed(mqc::MQRC_NOT_OPEN_FOR_INPUT));
        }
        let syncpoint = options.contains(mqc::MQGMO_SYNCPOINT);
        let correlation_id = (options.match_options & mqc::MQMO_MATCH_CORREL_ID != 0)
            .then_some(envelope.correlation_id);

        let deadline = if !options.contains(mqc::MQGMO_WAIT) {
            Some(Utc::now())
        } else if options.wait_interval == mqc::MQWI_UNLIMITED {
            None
        } else {
            Some(Utc::now() + Duration::milliseconds(i64::from(options.wait_interval.max(0))))
        };

        let (lock, condvar) = &*self.broker.shared;
        let mut state = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.take_fault(&FaultPoint::Get(self.queue_name.clone()))?;

        let message = loop {
            let queue = state.queue_mut(&self.queue_name)?;
            if let Some(message) = Self::take_matching(queue, correlation_id.as_ref()) {
                break message;
            }

            let remaining = match deadline {
                Some(deadline) => match (deadline - Utc::now()).to_std() {
                    Ok(remaining) if !remaining.is_zero() => Some(remaining),
                    _ => return Err(MqError::failed(mqc::MQRC_NO_MSG_AVAILABLE)),
                },
                None => None,
            };
            state = match remaining {
                Some(remaining) => {
                    condvar
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .0
                }
                None => condvar
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
            };
        };

        state.journal.push(BrokerEvent::Got {
            queue: self.queue_name.clone(),
            syncpoint,
        });
        drop(state);

        *envelope = message.envelope.clone();
        envelope.reply_to_queue_name = format!(
            "{:<width$}",
            message.envelope.reply_to_queue_name,
            width = QUEUE_NAME_LENGTH
        );

        if syncpoint {
            lock_connection(&self.connection)
                .unit_of_work
                .pending_gets
                .push((self.queue_name.clone(), message));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), MqError> {
        self.ensure_usable()?;
        let mut state = self.broker.state();
        state.take_fault(&FaultPoint::Close(self.queue_name.clone()))?;
        state.journal.push(BrokerEvent::Closed {
            queue: self.queue_name.clone(),
        });
        self.open = false;
        Ok(())
    }
}
