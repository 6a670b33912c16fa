//! Publisher contract and the envelope publisher
//!
//! Publishing is encode-only: the result is the envelope bytes, and handing
//! them to a queue is the caller's job.

use courier_codec::{
    write_envelope, AvroRecord, CodecError, Context, Message, PublishError, PublishStage,
};
use tracing::debug;

/// Turns a context and a payload into envelope bytes
pub trait Publisher: Send + Sync {
    /// Destination queue this publisher feeds
    fn queue_name(&self) -> &str;

    /// Build the envelope for `payload`
    ///
    /// `context` must already be encoded.
    fn publish(&self, context: &Context, payload: &dyn AvroRecord) -> Result<Vec<u8>, PublishError>;
}

/// Default publisher: payload encoded against its own schema, envelope
/// carrying the payload schema text verbatim
#[derive(Debug, Clone)]
pub struct EnvelopePublisher {
    queue_name: String,
}

impl EnvelopePublisher {
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
        }
    }
}

impl Publisher for EnvelopePublisher {
    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    fn publish(&self, context: &Context, payload: &dyn AvroRecord) -> Result<Vec<u8>, PublishError> {
        // context parts are read before the payload is encoded
        let context_schema = context.schema_text().ok_or_else(|| {
            PublishError::new(
                PublishStage::EncodeTransport,
                CodecError::missing_schema("write context"),
            )
        })?;
        let context_buffer = context.data().ok_or_else(|| {
            PublishError::new(
                PublishStage::EncodeTransport,
                CodecError::missing_data("write context"),
            )
        })?;

        let mut message = Message::new();
        message.encode(payload)?;

        // encode succeeded, so both parts are present
        let message_schema = message.schema_text().unwrap_or_default();
        let message_buffer = message.data().unwrap_or_default();

        let bytes = write_envelope(
            Some(context_schema),
            Some(context_buffer),
            message_schema,
            message_buffer,
        )?;

        debug!(
            queue = %self.queue_name,
            payload_type = message.full_name().as_deref().unwrap_or("<anonymous>"),
            envelope_len = bytes.len(),
            "Published envelope"
        );
        Ok(bytes)
    }
}
