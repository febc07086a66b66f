//! Mapping between message headers and native envelope fields.

use crate::error::MessagingError;
use crate::message::{id_to_hex, native_id, ReceivedMessage, SendingMessage};
use crate::mqc;
use crate::native::Envelope;
use chrono::{DateTime, Duration, Utc};

#[cfg(test)]
#[path = "fields_tests.rs"]
mod tests;

/// Source of the write timestamp stamped on outgoing envelopes
pub type Clock = fn() -> DateTime<Utc>;

/// Populates and harvests native envelope fields around put and get calls.
///
/// Implementations can be swapped on the provider to support protocol
/// variants.
pub trait FieldMapper: Send + Sync {
    /// Prepare the envelope for a put
    fn set_fields_before_send(
        &self,
        message: &mut SendingMessage,
        envelope: &mut Envelope,
        default_time_to_live: Duration,
    ) -> Result<(), MessagingError>;

    /// Copy queue-manager assigned fields back onto the sent message
    fn get_fields_after_send(
        &self,
        envelope: &Envelope,
        message: &mut SendingMessage,
    ) -> Result<(), MessagingError>;

    /// Prepare the envelope for a get, optionally filtering on correlation id
    fn set_fields_before_receive(
        &self,
        message_id: Option<&str>,
        envelope: &mut Envelope,
    ) -> Result<(), MessagingError>;

    /// Copy header fields from a delivered envelope
    fn get_fields_after_receive(
        &self,
        envelope: &Envelope,
        message: &mut ReceivedMessage,
    ) -> Result<(), MessagingError>;
}

/// Default field mapping
#[derive(Debug, Clone)]
pub struct BasicFieldMapper {
    character_set_id: Option<i32>,
    persistence: bool,
    clock: Clock,
}

impl Default for BasicFieldMapper {
    fn default() -> Self {
        Self {
            character_set_id: None,
            persistence: true,
            clock: Utc::now,
        }
    }
}

impl BasicFieldMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coded character set of the message data; `None` uses the queue manager's
    pub fn with_character_set_id(mut self, character_set_id: Option<i32>) -> Self {
        self.character_set_id = character_set_id;
        self
    }

    pub fn with_persistence(mut self, persistence: bool) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Convert a time-to-live to native expiry (tenths of a second)
    pub fn expiry_for(ttl: Duration) -> i32 {
        let expiry = ttl.num_milliseconds() / 100;
        if expiry <= 0 {
            mqc::MQEI_UNLIMITED
        } else {
            i32::try_from(expiry).unwrap_or(i32::MAX)
        }
    }
}

impl FieldMapper for BasicFieldMapper {
    fn set_fields_before_send(
        &self,
        message: &mut SendingMessage,
        envelope: &mut Envelope,
        default_time_to_live: Duration,
    ) -> Result<(), MessagingError> {
        envelope.version = mqc::MQMD_VERSION_2;
        envelope.encoding =
            mqc::MQENC_INTEGER_NORMAL | mqc::MQENC_DECIMAL_NORMAL | mqc::MQENC_FLOAT_IEEE_NORMAL;
        envelope.format = mqc::MQFMT_NONE.to_string();
        envelope.message_sequence_number = 1;
        envelope.message_id = mqc::MQMI_NONE;
        envelope.message_type = message.kind().native_type();
        envelope.put_date_time = Some((self.clock)());

        if let Some(character_set_id) = self.character_set_id {
            envelope.character_set = character_set_id;
        }
        envelope.persistence = if self.persistence {
            mqc::MQPER_PERSISTENT
        } else {
            mqc::MQPER_NOT_PERSISTENT
        };

        if let Some(correlation_id) = message.correlation_id().filter(|id| !id.is_empty()) {
            envelope.correlation_id = native_id(correlation_id)?;
        }

        if let Some(reply_to) = message.reply_to().filter(|r| !r.is_empty()) {
            envelope.reply_to_queue_name = reply_to.to_string();
        }

        // Effective TTL is written back onto the message
        let ttl = message.time_to_live().unwrap_or(default_time_to_live);
        message.set_time_to_live(ttl);
        envelope.expiry = Self::expiry_for(ttl);

        Ok(())
    }

    fn get_fields_after_send(
        &self,
        envelope: &Envelope,
        message: &mut SendingMessage,
    ) -> Result<(), MessagingError> {
        message.set_message_id(id_to_hex(&envelope.message_id));
        Ok(())
    }

    fn set_fields_before_receive(
        &self,
        message_id: Option<&str>,
        envelope: &mut Envelope,
    ) -> Result<(), MessagingError> {
        if let Some(message_id) = message_id.filter(|id| !id.is_empty()) {
            let correlation_id = native_id(message_id)?;
            if correlation_id != mqc::MQMI_NONE {
                envelope.correlation_id = correlation_id;
            }
        }
        Ok(())
    }

    fn get_fields_after_receive(
        &self,
        envelope: &Envelope,
        message: &mut ReceivedMessage,
    ) -> Result<(), MessagingError> {
        message.set_message_id(id_to_hex(&envelope.message_id));

        if envelope.correlation_id != mqc::MQCI_NONE {
            message.set_correlation_id(id_to_hex(&envelope.correlation_id));
        }

        let reply_to = envelope.reply_to_queue_name.trim();
        if !reply_to.is_empty() {
            message.set_reply_to(reply_to);
        }
        Ok(())
    }
}
