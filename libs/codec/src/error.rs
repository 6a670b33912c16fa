//! Envelope-level errors for context/payload processing
//!
//! Two layers live here. [`CodecError`] describes *what* went wrong at the
//! record codec level (missing schema, unknown type, corrupt bytes) with the
//! diagnostic context needed to debug it. [`ConsumeError`] and
//! [`PublishError`] describe *where* it went wrong: each carries the pipeline
//! stage that failed and keeps the low-level failure as its `source()`.

use std::fmt;
use thiserror::Error;

/// Boxed cause carried by the boundary errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Record codec failures with diagnostic context
#[derive(Debug, Error)]
pub enum CodecError {
    /// Message has no schema to encode or decode against
    #[error("Schema is not set (operation: {operation})")]
    MissingSchema { operation: &'static str },

    /// Message has no encoded bytes
    #[error("Message data is not set (operation: {operation})")]
    MissingData { operation: &'static str },

    /// Envelope input was empty
    #[error("Envelope is empty: 0 bytes received")]
    EmptyEnvelope,

    /// Decoded envelope record lacks a field or has the wrong value type
    #[error("Envelope field '{field}' is missing or not {expected}")]
    EnvelopeField {
        field: &'static str,
        expected: &'static str,
    },

    /// Schema text could not be parsed
    #[error("Invalid schema ({length} bytes of text): {source}")]
    SchemaParse {
        length: usize,
        #[source]
        source: apache_avro::Error,
    },

    /// Schema is valid but has no fully-qualified name (primitive or array)
    #[error("Schema has no fully-qualified name and cannot identify a record type")]
    UnnamedSchema,

    /// Fully-qualified name is not present in the type registry
    #[error("Unknown record type '{name}': not registered ({registered} types registered)")]
    UnknownType { name: String, registered: usize },

    /// Registered factory produced an instance exposing a different schema
    #[error("Record type '{requested}' resolved to an instance with schema '{actual}'")]
    TypeMismatch { requested: String, actual: String },

    /// Decoded value has a shape other than the expected record
    #[error("Expected a record value for schema '{schema}', got {found}")]
    NotARecord { schema: String, found: String },

    /// Decoded value does not conform to the schema it was read with
    #[error("Decoded value does not match schema '{schema}': input is truncated or corrupt")]
    InvalidDatum { schema: String },

    /// Input continues past the end of the decoded datum
    #[error("{remaining} unread bytes after decoding against schema '{schema}'")]
    TrailingBytes { schema: String, remaining: usize },

    /// Underlying Avro encode/decode failure
    #[error("Avro codec failure: {0}")]
    Avro(#[from] apache_avro::Error),
}

impl CodecError {
    pub fn missing_schema(operation: &'static str) -> Self {
        Self::MissingSchema { operation }
    }

    pub fn missing_data(operation: &'static str) -> Self {
        Self::MissingData { operation }
    }

    pub fn envelope_field(field: &'static str, expected: &'static str) -> Self {
        Self::EnvelopeField { field, expected }
    }

    pub fn schema_parse(text: &str, source: apache_avro::Error) -> Self {
        Self::SchemaParse {
            length: text.len(),
            source,
        }
    }

    pub fn unknown_type(name: impl Into<String>, registered: usize) -> Self {
        Self::UnknownType {
            name: name.into(),
            registered,
        }
    }
}

/// Result type for record codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Consume pipeline stages that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumeStage {
    /// Envelope bytes could not be read against the four-field layout
    DecodeTransport,
    /// Context schema text could not be adopted
    DecodeContext,
    /// Payload schema name could not be resolved to a registered type
    DecodeMessage,
    /// Payload bytes could not be decoded against the resolved schema
    DecodeMessageContent,
    /// Handler invocation failed
    HandleMessage,
    /// Failure outside any named stage
    Consume,
}

impl ConsumeStage {
    pub fn description(self) -> Option<&'static str> {
        match self {
            ConsumeStage::DecodeTransport => Some("Failed to decode transport"),
            ConsumeStage::DecodeContext => Some("Failed to decode context"),
            ConsumeStage::DecodeMessage => Some("Failed to decode message"),
            ConsumeStage::DecodeMessageContent => Some("Failed to decode message content"),
            ConsumeStage::HandleMessage => Some("Failed to handle message"),
            ConsumeStage::Consume => None,
        }
    }
}

/// Publish pipeline stages that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublishStage {
    /// Payload value could not be encoded
    EncodeMessageContent,
    /// Envelope could not be written
    EncodeTransport,
    /// Failure outside any named stage (e.g. a queue-backed publisher)
    Publish,
}

impl PublishStage {
    pub fn description(self) -> Option<&'static str> {
        match self {
            PublishStage::EncodeMessageContent => Some("Failed to encode message content"),
            PublishStage::EncodeTransport => Some("Failed to encode transport"),
            PublishStage::Publish => None,
        }
    }
}

/// Failure at the consume boundary
#[derive(Debug, Error)]
#[error("Failed to consume message{}", Suffix(.stage.description(), .label.as_deref()))]
pub struct ConsumeError {
    stage: ConsumeStage,
    label: Option<String>,
    source: BoxError,
}

impl ConsumeError {
    pub fn new(stage: ConsumeStage, source: impl Into<BoxError>) -> Self {
        Self {
            stage,
            label: None,
            source: source.into(),
        }
    }

    /// Attach a caller-supplied label, rendered after the stage text
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn stage(&self) -> ConsumeStage {
        self.stage
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Underlying cause, when it is a codec failure
    pub fn codec_error(&self) -> Option<&CodecError> {
        self.source.downcast_ref::<CodecError>()
    }

    pub fn into_source(self) -> BoxError {
        self.source
    }
}

/// Failure at the publish boundary
#[derive(Debug, Error)]
#[error("Failed to publish message{}", Suffix(.stage.description(), None))]
pub struct PublishError {
    stage: PublishStage,
    source: BoxError,
}

impl PublishError {
    pub fn new(stage: PublishStage, source: impl Into<BoxError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    pub fn stage(&self) -> PublishStage {
        self.stage
    }

    /// Underlying cause, when it is a codec failure
    pub fn codec_error(&self) -> Option<&CodecError> {
        self.source.downcast_ref::<CodecError>()
    }

    pub fn into_source(self) -> BoxError {
        self.source
    }
}

/// Renders `": <stage>: <label>"`, skipping absent parts
struct Suffix<'a>(Option<&'static str>, Option<&'a str>);

impl fmt::Display for Suffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(stage) = self.0 {
            write!(f, ": {stage}")?;
        }
        if let Some(label) = self.1 {
            write!(f, ": {label}")?;
        }
        Ok(())
    }
}
