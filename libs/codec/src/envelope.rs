//! # Envelope Wire Format
//!
//! The envelope is the only artifact that crosses the queue. It is a single
//! Avro record with four fields, always in this order:
//!
//! ```text
//! ┌────────────────────┬────────────────────┬────────────────────┬────────────────────┐
//! │ contextSchema      │ contextBuffer      │ messageSchema      │ messageBuffer      │
//! │ string             │ bytes              │ string             │ bytes              │
//! └────────────────────┴────────────────────┴────────────────────┴────────────────────┘
//! ```
//!
//! Strings and bytes use the Avro binary rules: a zig-zag varint length
//! followed by the raw bytes. There is no framing beyond that, so field order
//! and the length prefix encoding must stay byte-exact for existing producers
//! and consumers.

use crate::error::{
    CodecError, CodecResult, ConsumeError, ConsumeStage, PublishError, PublishStage,
};
use crate::schema::read_whole_datum;
use apache_avro::types::Value;
use once_cell::sync::Lazy;

/// Fixed record schema of the envelope
pub const ENVELOPE_SCHEMA: &str = r#"{"type":"record","name":"Transport","namespace":"io.courier","fields":[{"name":"contextSchema","type":"string"},{"name":"contextBuffer","type":"bytes"},{"name":"messageSchema","type":"string"},{"name":"messageBuffer","type":"bytes"}]}"#;

const CONTEXT_SCHEMA_FIELD: &str = "contextSchema";
const CONTEXT_BUFFER_FIELD: &str = "contextBuffer";
const MESSAGE_SCHEMA_FIELD: &str = "messageSchema";
const MESSAGE_BUFFER_FIELD: &str = "messageBuffer";

static PARSED_ENVELOPE_SCHEMA: Lazy<apache_avro::Schema> = Lazy::new(|| {
    apache_avro::Schema::parse_str(ENVELOPE_SCHEMA)
        .expect("ENVELOPE_SCHEMA is a valid record schema")
});

/// Decoded four-field envelope
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    pub context_schema: String,
    pub context_buffer: Vec<u8>,
    pub message_schema: String,
    pub message_buffer: Vec<u8>,
}

impl Envelope {
    pub fn encode(&self) -> Result<Vec<u8>, PublishError> {
        write_envelope(
            Some(self.context_schema.as_str()),
            Some(self.context_buffer.as_slice()),
            &self.message_schema,
            &self.message_buffer,
        )
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ConsumeError> {
        read_envelope(bytes)
    }
}

/// Write the four envelope fields in wire order
///
/// The context parts are optional because a context that was never encoded
/// has neither; that is an envelope construction failure, not a panic.
pub fn write_envelope(
    context_schema: Option<&str>,
    context_buffer: Option<&[u8]>,
    message_schema: &str,
    message_buffer: &[u8],
) -> Result<Vec<u8>, PublishError> {
    encode_fields(context_schema, context_buffer, message_schema, message_buffer)
        .map_err(|e| PublishError::new(PublishStage::EncodeTransport, e))
}

/// Read envelope bytes against the fixed four-field layout
///
/// Empty input is the "no body" case and fails like any malformed input,
/// as do truncated fields and bytes left over after the four fields.
pub fn read_envelope(bytes: &[u8]) -> Result<Envelope, ConsumeError> {
    decode_fields(bytes).map_err(|e| ConsumeError::new(ConsumeStage::DecodeTransport, e))
}

fn encode_fields(
    context_schema: Option<&str>,
    context_buffer: Option<&[u8]>,
    message_schema: &str,
    message_buffer: &[u8],
) -> CodecResult<Vec<u8>> {
    let context_schema = context_schema.ok_or(CodecError::missing_schema("write context"))?;
    let context_buffer = context_buffer.ok_or(CodecError::missing_data("write context"))?;

    let record = Value::Record(vec![
        (CONTEXT_SCHEMA_FIELD.to_string(), Value::String(context_schema.to_string())),
        (CONTEXT_BUFFER_FIELD.to_string(), Value::Bytes(context_buffer.to_vec())),
        (MESSAGE_SCHEMA_FIELD.to_string(), Value::String(message_schema.to_string())),
        (MESSAGE_BUFFER_FIELD.to_string(), Value::Bytes(message_buffer.to_vec())),
    ]);

    Ok(apache_avro::to_avro_datum(&PARSED_ENVELOPE_SCHEMA, record)?)
}

fn decode_fields(bytes: &[u8]) -> CodecResult<Envelope> {
    if bytes.is_empty() {
        return Err(CodecError::EmptyEnvelope);
    }

    let value = read_whole_datum(&PARSED_ENVELOPE_SCHEMA, bytes)?;
    let mut fields = match value {
        Value::Record(fields) => fields,
        other => {
            return Err(CodecError::NotARecord {
                schema: ENVELOPE_SCHEMA.to_string(),
                found: format!("{other:?}"),
            })
        }
    };

    Ok(Envelope {
        context_schema: take_string(&mut fields, CONTEXT_SCHEMA_FIELD)?,
        context_buffer: take_bytes(&mut fields, CONTEXT_BUFFER_FIELD)?,
        message_schema: take_string(&mut fields, MESSAGE_SCHEMA_FIELD)?,
        message_buffer: take_bytes(&mut fields, MESSAGE_BUFFER_FIELD)?,
    })
}

fn take_field(fields: &mut [(String, Value)], name: &'static str) -> Option<Value> {
    fields
        .iter_mut()
        .find(|(field, _)| field == name)
        .map(|(_, value)| std::mem::replace(value, Value::Null))
}

fn take_string(fields: &mut [(String, Value)], name: &'static str) -> CodecResult<String> {
    match take_field(fields, name) {
        Some(Value::String(text)) => Ok(text),
        _ => Err(CodecError::envelope_field(name, "a string")),
    }
}

fn take_bytes(fields: &mut [(String, Value)], name: &'static str) -> CodecResult<Vec<u8>> {
    match take_field(fields, name) {
        Some(Value::Bytes(bytes)) => Ok(bytes),
        _ => Err(CodecError::envelope_field(name, "bytes")),
    }
}
