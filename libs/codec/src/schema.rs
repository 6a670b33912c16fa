//! Schema text carried verbatim alongside its parsed form
//!
//! The envelope transports schemas as text, and two schemas are
//! interchangeable exactly when their texts are equal. `Schema` therefore
//! keeps the original text next to the parsed Avro schema rather than
//! re-serializing the parsed form, so publishing never rewrites what a
//! producer supplied.

use crate::error::{CodecError, CodecResult};
use apache_avro::types::Value;
use std::fmt;
use std::sync::Arc;

/// Parsed schema plus the exact text it came from
#[derive(Clone)]
pub struct Schema {
    text: Arc<str>,
    parsed: Arc<apache_avro::Schema>,
}

impl Schema {
    /// Parse schema text, keeping the text as-is
    pub fn parse(text: &str) -> CodecResult<Self> {
        let parsed = apache_avro::Schema::parse_str(text)
            .map_err(|source| CodecError::schema_parse(text, source))?;

        Ok(Self {
            text: Arc::from(text),
            parsed: Arc::new(parsed),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn as_avro(&self) -> &apache_avro::Schema {
        &self.parsed
    }

    /// Fully-qualified `namespace.name`, for named schemas only
    pub fn full_name(&self) -> Option<String> {
        full_name_of(&self.parsed)
    }

    /// Fully-qualified name, or an error for unnamed schemas
    pub fn require_full_name(&self) -> CodecResult<String> {
        self.full_name().ok_or(CodecError::UnnamedSchema)
    }

    /// Field names of a record schema, in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        match self.parsed.as_ref() {
            apache_avro::Schema::Record(record) => {
                record.fields.iter().map(|field| field.name.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn full_name_of(schema: &apache_avro::Schema) -> Option<String> {
    let name = schema.name()?;
    Some(match name.namespace.as_deref() {
        Some(namespace) if !namespace.is_empty() => format!("{}.{}", namespace, name.name),
        _ => name.name.clone(),
    })
}

/// Datum decoded by [`read_datum`] and the count of input bytes left after it
pub(crate) struct Datum {
    pub value: Value,
    pub remaining: usize,
}

/// Decode one datum and check it against `schema`
///
/// The Avro decoder yields `Null` for a string or bytes value cut short by
/// the end of input, so a datum is only accepted once it validates.
pub(crate) fn read_datum(schema: &apache_avro::Schema, bytes: &[u8]) -> CodecResult<Datum> {
    let mut reader = bytes;
    let value = apache_avro::from_avro_datum(schema, &mut reader, None)?;
    if !value.validate(schema) {
        return Err(CodecError::InvalidDatum {
            schema: schema_label(schema),
        });
    }

    Ok(Datum {
        value,
        remaining: reader.len(),
    })
}

/// Like [`read_datum`], but the datum must span the whole input
pub(crate) fn read_whole_datum(schema: &apache_avro::Schema, bytes: &[u8]) -> CodecResult<Value> {
    let datum = read_datum(schema, bytes)?;
    if datum.remaining > 0 {
        return Err(CodecError::TrailingBytes {
            schema: schema_label(schema),
            remaining: datum.remaining,
        });
    }
    Ok(datum.value)
}

fn schema_label(schema: &apache_avro::Schema) -> String {
    full_name_of(schema).unwrap_or_else(|| "<anonymous>".to_string())
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Schema {}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("full_name", &self.full_name())
            .field("text", &self.text)
            .finish()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
