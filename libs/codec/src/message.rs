//! Schema + encoded bytes for one logical record
//!
//! A `Message` is the unit both sides of the envelope agree on: a schema and
//! the bytes produced by encoding a value against it. On the publish side
//! `encode` fills both from a value. On the consume side
//! `decode_from_envelope` resolves the payload type by name and adopts the
//! payload bytes unchanged; decoding them is a separate step so each stage
//! reports its own failure.

use crate::envelope::Envelope;
use crate::error::{
    CodecError, CodecResult, ConsumeError, ConsumeStage, PublishError, PublishStage,
};
use crate::record::{AvroRecord, GenericRecord, SpecificRecord};
use crate::registry::{RecordFactory, TypeRegistry};
use crate::schema::{read_datum, read_whole_datum, Schema};
use apache_avro::types::Value;
use bytes::Bytes;
use std::fmt;

/// Schema and encoded data of one record
#[derive(Clone, Default)]
pub struct Message {
    schema: Option<Schema>,
    data: Option<Bytes>,
    factory: Option<RecordFactory>,
}

impl Message {
    /// Empty message; `encode` or `decode_from_envelope` fills it
    pub fn new() -> Self {
        Self::default()
    }

    /// Message from an already-encoded record
    pub fn with_parts(schema: Schema, data: impl Into<Bytes>) -> Self {
        Self {
            schema: Some(schema),
            data: Some(data.into()),
            factory: None,
        }
    }

    /// Encode `value`, replacing schema and data with the value's own
    pub fn encode(&mut self, value: &dyn AvroRecord) -> Result<(), PublishError> {
        let (schema, data) = encode_record(value)
            .map_err(|e| PublishError::new(PublishStage::EncodeMessageContent, e))?;

        self.schema = Some(schema);
        self.data = Some(data);
        self.factory = None;
        Ok(())
    }

    /// Decode the stored bytes against the stored schema
    ///
    /// Returns an instance of the resolved type when the message came from
    /// `decode_from_envelope`, and a [`GenericRecord`] otherwise.
    pub fn decode(&self) -> Result<Box<dyn AvroRecord>, ConsumeError> {
        self.decode_record()
            .map_err(|e| ConsumeError::new(ConsumeStage::DecodeMessageContent, e))
    }

    /// Decode the stored bytes straight into a known specific record
    pub fn decode_as<T: SpecificRecord>(&self) -> Result<T, ConsumeError> {
        let value = self
            .decode_value()
            .and_then(|(_, value)| Ok(apache_avro::from_value::<T>(&value)?))
            .map_err(|e| ConsumeError::new(ConsumeStage::DecodeMessageContent, e))?;
        Ok(value)
    }

    /// Identify the payload carried by `envelope`
    ///
    /// Reads the payload schema name, resolves it through `registry` and
    /// adopts the resolved schema plus the envelope's payload bytes as-is.
    pub fn decode_from_envelope(
        &mut self,
        envelope: &Envelope,
        registry: &TypeRegistry,
    ) -> Result<&mut Self, ConsumeError> {
        let resolved = Schema::parse(&envelope.message_schema)
            .and_then(|schema| schema.require_full_name())
            .and_then(|full_name| registry.resolve(&full_name))
            .map_err(|e| ConsumeError::new(ConsumeStage::DecodeMessage, e))?;

        self.schema = Some(resolved.schema().clone());
        self.data = Some(Bytes::copy_from_slice(&envelope.message_buffer));
        self.factory = Some(resolved.factory().clone());
        Ok(self)
    }

    /// Shorthand for `Message::new()` followed by `decode_from_envelope`
    pub fn from_envelope(envelope: &Envelope, registry: &TypeRegistry) -> Result<Self, ConsumeError> {
        let mut message = Self::new();
        message.decode_from_envelope(envelope, registry)?;
        Ok(message)
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn schema_text(&self) -> Option<&str> {
        self.schema.as_ref().map(Schema::text)
    }

    pub fn full_name(&self) -> Option<String> {
        self.schema.as_ref().and_then(Schema::full_name)
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Shared handle to the encoded bytes
    pub fn data_buffer(&self) -> Option<Bytes> {
        self.data.clone()
    }

    pub(crate) fn set_parts(&mut self, schema: Schema, data: Bytes) {
        self.schema = Some(schema);
        self.data = Some(data);
        self.factory = None;
    }

    /// Decode the stored bytes; the datum must span all of them
    pub(crate) fn decode_value(&self) -> CodecResult<(&Schema, Value)> {
        let (schema, data) = self.parts("decode")?;
        let value = read_whole_datum(schema.as_avro(), data)?;
        Ok((schema, value))
    }

    /// Decode the datum at the start of the stored bytes, ignoring the rest
    pub(crate) fn decode_leading_value(&self) -> CodecResult<(&Schema, Value)> {
        let (schema, data) = self.parts("decode")?;
        let datum = read_datum(schema.as_avro(), data)?;
        Ok((schema, datum.value))
    }

    fn parts(&self, operation: &'static str) -> CodecResult<(&Schema, &[u8])> {
        let schema = self
            .schema
            .as_ref()
            .ok_or(CodecError::missing_schema(operation))?;
        let data = self
            .data
            .as_deref()
            .ok_or(CodecError::missing_data(operation))?;
        Ok((schema, data))
    }

    fn decode_record(&self) -> CodecResult<Box<dyn AvroRecord>> {
        let (schema, value) = self.decode_value()?;
        match &self.factory {
            Some(factory) => {
                let mut record = factory();
                record.load_avro_value(value)?;
                Ok(record)
            }
            None => Ok(Box::new(GenericRecord::from_value(schema.clone(), value))),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("full_name", &self.full_name())
            .field("data_len", &self.data.as_ref().map(Bytes::len))
            .field("resolved", &self.factory.is_some())
            .finish()
    }
}

/// Derive a record's schema and encode it against that schema
pub(crate) fn encode_record(value: &dyn AvroRecord) -> CodecResult<(Schema, Bytes)> {
    let schema = value.schema()?;
    let avro_value = value.to_avro_value()?;
    let data = apache_avro::to_avro_datum(schema.as_avro(), avro_value)?;
    Ok((schema, Bytes::from(data)))
}
