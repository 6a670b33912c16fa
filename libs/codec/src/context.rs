//! Context record carried alongside every payload
//!
//! Unlike payloads, the context is never resolved by name: every consumer
//! reads it generically regardless of payload type. Its schema is parsed
//! straight from the envelope text and decodes always yield a
//! [`GenericRecord`].
//!
//! Context bytes must start with a datum valid for the context schema.
//! Bytes after that datum are carried along untouched; existing producers
//! send an empty-record context followed by `{}`.

use crate::envelope::Envelope;
use crate::error::{CodecResult, ConsumeError, ConsumeStage, PublishError, PublishStage};
use crate::message::{encode_record, Message};
use crate::record::{AvroRecord, GenericRecord};
use crate::schema::Schema;
use bytes::Bytes;

/// Generic, always-anonymous metadata record
#[derive(Debug, Clone, Default)]
pub struct Context {
    message: Message,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context from schema text and already-encoded bytes, ready to publish
    ///
    /// Only the schema text is checked; the bytes are taken as given.
    pub fn from_parts(schema_text: &str, data: impl Into<Bytes>) -> CodecResult<Self> {
        let schema = Schema::parse(schema_text)?;
        Ok(Self {
            message: Message::with_parts(schema, data),
        })
    }

    /// Encode a context value; must happen before the context is published
    pub fn encode(&mut self, value: &dyn AvroRecord) -> Result<(), PublishError> {
        let (schema, data) = encode_record(value)
            .map_err(|e| PublishError::new(PublishStage::EncodeMessageContent, e))?;
        self.message.set_parts(schema, data);
        Ok(())
    }

    /// Decode the context bytes as a generic record
    pub fn decode(&self) -> Result<GenericRecord, ConsumeError> {
        let (schema, value) = self
            .message
            .decode_leading_value()
            .map_err(|e| ConsumeError::new(ConsumeStage::DecodeContext, e))?;
        Ok(GenericRecord::from_value(schema.clone(), value))
    }

    /// Adopt the envelope's context schema and bytes verbatim
    ///
    /// Fails with `DecodeContext` when the schema text does not parse or
    /// the bytes do not hold a datum for it.
    pub fn decode_from_envelope(&mut self, envelope: &Envelope) -> Result<&mut Self, ConsumeError> {
        let schema = Schema::parse(&envelope.context_schema)
            .map_err(|e| ConsumeError::new(ConsumeStage::DecodeContext, e))?;
        let message = Message::with_parts(schema, Bytes::copy_from_slice(&envelope.context_buffer));
        message
            .decode_leading_value()
            .map_err(|e| ConsumeError::new(ConsumeStage::DecodeContext, e))?;

        self.message = message;
        Ok(self)
    }

    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ConsumeError> {
        let mut context = Self::new();
        context.decode_from_envelope(envelope)?;
        Ok(context)
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.message.schema()
    }

    pub fn schema_text(&self) -> Option<&str> {
        self.message.schema_text()
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.message.data()
    }

    pub fn data_buffer(&self) -> Option<Bytes> {
        self.message.data_buffer()
    }

    pub fn as_message(&self) -> &Message {
        &self.message
    }
}
