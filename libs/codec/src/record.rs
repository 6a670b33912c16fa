//! Record capabilities shared by contexts and payloads
//!
//! A record is anything that can describe itself with a [`Schema`] and move
//! in and out of an Avro [`Value`]. Two flavours exist:
//!
//! - [`SpecificRecord`]: a named application type (serde struct + schema
//!   constant). These are what the type registry instantiates by name.
//! - [`GenericRecord`]: an anonymous schema + value pair. Contexts always
//!   decode to this, and it is handy for publishing ad-hoc records.
//!
//! Handlers receive payloads as `Box<dyn AvroRecord>` because the concrete
//! type is only known once the envelope has been read; `downcast_ref` and
//! `downcast` recover it.

use crate::error::{CodecError, CodecResult};
use crate::schema::Schema;
use apache_avro::types::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt::Debug;

/// Object-safe record contract used throughout the pipeline
pub trait AvroRecord: Any + Send + Sync + Debug {
    /// Schema describing this value
    fn schema(&self) -> CodecResult<Schema>;

    /// Convert into an Avro value for encoding
    fn to_avro_value(&self) -> CodecResult<Value>;

    /// Replace this record's contents with a decoded value
    fn load_avro_value(&mut self, value: Value) -> CodecResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl dyn AvroRecord {
    pub fn downcast_ref<T: AvroRecord>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast<T: AvroRecord>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast::<T>().ok()
    }

    pub fn is<T: AvroRecord>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Named record type with a compile-time schema
///
/// `Default` is the zero-argument constructor the type registry calls before
/// loading decoded data into the instance.
///
/// ```ignore
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct OrderPlaced { id: String }
///
/// impl SpecificRecord for OrderPlaced {
///     const SCHEMA: &'static str = r#"{"type":"record","name":"OrderPlaced",
///         "namespace":"io.shop","fields":[{"name":"id","type":"string"}]}"#;
/// }
/// ```
pub trait SpecificRecord: Serialize + DeserializeOwned + Default + Debug + Send + Sync + 'static {
    const SCHEMA: &'static str;
}

impl<T: SpecificRecord> AvroRecord for T {
    fn schema(&self) -> CodecResult<Schema> {
        Schema::parse(T::SCHEMA)
    }

    fn to_avro_value(&self) -> CodecResult<Value> {
        Ok(apache_avro::to_value(self)?)
    }

    fn load_avro_value(&mut self, value: Value) -> CodecResult<()> {
        *self = apache_avro::from_value::<T>(&value)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

/// Anonymous record: schema plus decoded value
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRecord {
    schema: Schema,
    value: Value,
}

impl GenericRecord {
    /// Empty record (no fields set) for the given schema
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            value: Value::Record(Vec::new()),
        }
    }

    pub fn from_value(schema: Schema, value: Value) -> Self {
        Self { schema, value }
    }

    pub fn builder(schema: Schema) -> GenericRecordBuilder {
        GenericRecordBuilder {
            schema,
            fields: Vec::new(),
        }
    }

    pub fn schema_ref(&self) -> &Schema {
        &self.schema
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Look up a top-level field by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        match &self.value {
            Value::Record(fields) => fields
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

impl AvroRecord for GenericRecord {
    fn schema(&self) -> CodecResult<Schema> {
        Ok(self.schema.clone())
    }

    fn to_avro_value(&self) -> CodecResult<Value> {
        Ok(self.value.clone())
    }

    fn load_avro_value(&mut self, value: Value) -> CodecResult<()> {
        self.value = value;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

/// Sets record fields by name, emitting them in schema order
#[derive(Debug)]
pub struct GenericRecordBuilder {
    schema: Schema,
    fields: Vec<(String, Value)>,
}

impl GenericRecordBuilder {
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
        self
    }

    /// Build the record; fails if the schema is not a record schema
    pub fn build(self) -> CodecResult<GenericRecord> {
        let order = self.schema.field_names();
        if !matches!(self.schema.as_avro(), apache_avro::Schema::Record(_)) {
            return Err(CodecError::NotARecord {
                schema: self.schema.text().to_string(),
                found: "non-record schema".to_string(),
            });
        }

        let mut fields = self.fields;
        fields.sort_by_key(|(name, _)| {
            order
                .iter()
                .position(|known| *known == name.as_str())
                .unwrap_or(usize::MAX)
        });

        Ok(GenericRecord {
            value: Value::Record(fields),
            schema: self.schema,
        })
    }
}
