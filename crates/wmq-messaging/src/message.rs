//! Message types exchanged with the messaging session.
//!
//! Identifiers travel on the wire as fixed-length binary values and are
//! represented here as uppercase hexadecimal strings.

use crate::error::MessagingError;
use crate::mqc;
use bytes::Bytes;
use chrono::Duration;

// ============================================================================
// Identifier Conversion
// ============================================================================

/// Convert a binary identifier to its uppercase hex form
pub fn id_to_hex(id: &[u8]) -> String {
    hex::encode_upper(id)
}

/// Convert a hex identifier back to bytes
pub fn id_from_hex(id: &str) -> Result<Vec<u8>, MessagingError> {
    hex::decode(id).map_err(|_| MessagingError::InvalidId {
        value: id.to_string(),
    })
}

/// Convert a hex identifier to the native fixed-length form, zero padded
pub fn native_id(id: &str) -> Result<[u8; mqc::ID_LENGTH], MessagingError> {
    let bytes = id_from_hex(id)?;
    if bytes.len() > mqc::ID_LENGTH {
        return Err(MessagingError::InvalidId {
            value: id.to_string(),
        });
    }
    let mut native = [0u8; mqc::ID_LENGTH];
    native[..bytes.len()].copy_from_slice(&bytes);
    Ok(native)
}

// ============================================================================
// Message Kind
// ============================================================================

/// Role of an outbound message, inferred from its headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Expects a reply on the reply-to queue
    Request,
    /// Answers an earlier request
    Reply,
    /// Fire-and-forget
    Datagram,
}

impl MessageKind {
    /// Native message type value
    pub fn native_type(&self) -> i32 {
        match self {
            Self::Request => mqc::MQMT_REQUEST,
            Self::Reply => mqc::MQMT_REPLY,
            Self::Datagram => mqc::MQMT_DATAGRAM,
        }
    }
}

// ============================================================================
// Sending Message
// ============================================================================

/// A message to be sent to a logical destination
#[derive(Debug, Clone, Default)]
pub struct SendingMessage {
    body: Bytes,
    destination: String,
    correlation_id: Option<String>,
    reply_to: Option<String>,
    time_to_live: Option<Duration>,
    message_id: Option<String>,
    response: bool,
}

impl SendingMessage {
    /// Create a message for the named destination
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Create the response to a received request.
    ///
    /// The response goes to the request's reply-to queue and is correlated
    /// with the request's message id.
    pub fn reply(request: &ReceivedMessage) -> Self {
        Self {
            destination: request.reply_to().unwrap_or_default().to_string(),
            correlation_id: Some(request.message_id().to_string()),
            response: true,
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn time_to_live(&self) -> Option<Duration> {
        self.time_to_live
    }

    /// Record the effective time-to-live used for the send
    pub fn set_time_to_live(&mut self, ttl: Duration) {
        self.time_to_live = Some(ttl);
    }

    /// Message id assigned by the queue manager, once sent
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn set_message_id(&mut self, message_id: impl Into<String>) {
        self.message_id = Some(message_id.into());
    }

    /// Whether this message answers an earlier request
    pub fn is_response(&self) -> bool {
        self.response
    }

    /// Infer the message kind: responses are replies, messages naming a
    /// reply-to queue are requests, everything else is a datagram.
    pub fn kind(&self) -> MessageKind {
        if self.response {
            MessageKind::Reply
        } else if self.reply_to.as_deref().is_some_and(|r| !r.is_empty()) {
            MessageKind::Request
        } else {
            MessageKind::Datagram
        }
    }
}

// ============================================================================
// Received Message
// ============================================================================

/// A message taken from the receive queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceivedMessage {
    body: Bytes,
    message_id: String,
    correlation_id: Option<String>,
    reply_to: Option<String>,
}

impl ReceivedMessage {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn set_message_id(&mut self, message_id: impl Into<String>) {
        self.message_id = message_id.into();
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn set_correlation_id(&mut self, correlation_id: impl Into<String>) {
        self.correlation_id = Some(correlation_id.into());
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn set_reply_to(&mut self, reply_to: impl Into<String>) {
        self.reply_to = Some(reply_to.into());
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
