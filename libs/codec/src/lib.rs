//! # Courier Envelope Codec
//!
//! ## Purpose
//!
//! Packages a *context* record and a *payload* record, each with its own
//! schema, into one self-describing binary envelope, and takes such envelopes
//! apart again on the receiving side:
//! - Envelope wire format (four length-prefixed fields)
//! - Record encode/decode contract (value + schema <-> bytes)
//! - Payload type resolution from the schema name carried in the envelope
//! - Stage-tagged error taxonomy shared by publishers and consumers
//!
//! ## Architecture Role
//!
//! ```text
//! payload value ──► Message::encode ──┐
//! context       ──────────────────────┴─► write_envelope ──► bytes
//!
//! bytes ──► read_envelope ──► Context::decode_from_envelope
//!                        └──► Message::decode_from_envelope ──► TypeRegistry
//!                                        └──► Message::decode ──► Box<dyn AvroRecord>
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Queue transport, acknowledgement or retry
//! - Handler dispatch and re-publishing (see `courier-pipeline`)
//! - Schema evolution or compatibility checking
//!
//! The record codec itself is Avro binary encoding via `apache-avro`.

pub mod context;
pub mod envelope;
pub mod error;
pub mod message;
pub mod record;
pub mod registry;
pub mod schema;

pub use context::Context;
pub use envelope::{read_envelope, write_envelope, Envelope, ENVELOPE_SCHEMA};
pub use error::{
    BoxError, CodecError, CodecResult, ConsumeError, ConsumeStage, PublishError, PublishStage,
};
pub use message::Message;
pub use record::{AvroRecord, GenericRecord, GenericRecordBuilder, SpecificRecord};
pub use registry::{RecordFactory, ResolvedType, TypeRegistry};
pub use schema::Schema;

// Avro value type used by record implementations
pub use apache_avro::types::Value;
