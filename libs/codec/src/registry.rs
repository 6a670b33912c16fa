//! Type registry for payload resolution by schema name
//!
//! The receiving side does not know a payload's concrete type until it reads
//! the schema name off the wire. The registry maps fully-qualified schema
//! names to zero-argument factories and is populated once by the host
//! application before any envelope is consumed. After that it is only read,
//! so a single `Arc<TypeRegistry>` can be shared by every consumer thread.

use crate::error::{CodecError, CodecResult};
use crate::record::{AvroRecord, SpecificRecord};
use crate::schema::Schema;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Zero-argument constructor for a registered record type
pub type RecordFactory = Arc<dyn Fn() -> Box<dyn AvroRecord> + Send + Sync>;

/// Name -> factory lookup used to identify payload types at decode time
#[derive(Clone, Default)]
pub struct TypeRegistry {
    factories: HashMap<String, RecordFactory>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a specific record under the full name declared by its schema
    pub fn register<T: SpecificRecord>(&mut self) -> CodecResult<()> {
        let full_name = Schema::parse(T::SCHEMA)?.require_full_name()?;
        self.register_factory(full_name, || Box::new(T::default()) as Box<dyn AvroRecord>);
        Ok(())
    }

    /// Register an arbitrary factory; replaces any previous entry for `full_name`
    pub fn register_factory<F>(&mut self, full_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn AvroRecord> + Send + Sync + 'static,
    {
        self.factories.insert(full_name.into(), Arc::new(factory));
    }

    /// Instantiate the type registered for `full_name`
    ///
    /// The fresh instance must expose a schema naming the requested type,
    /// otherwise the registration is inconsistent and resolution fails.
    pub fn resolve(&self, full_name: &str) -> CodecResult<ResolvedType> {
        let factory = self
            .factories
            .get(full_name)
            .ok_or_else(|| CodecError::unknown_type(full_name, self.factories.len()))?;

        let instance = factory();
        let schema = instance.schema()?;
        let actual = schema.require_full_name()?;
        if actual != full_name {
            return Err(CodecError::TypeMismatch {
                requested: full_name.to_string(),
                actual,
            });
        }

        trace!(type_name = %full_name, "Resolved record type");

        Ok(ResolvedType {
            instance,
            schema,
            factory: Arc::clone(factory),
        })
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.factories.contains_key(full_name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.type_names().collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

/// A freshly instantiated record type and its schema
pub struct ResolvedType {
    instance: Box<dyn AvroRecord>,
    schema: Schema,
    factory: RecordFactory,
}

impl ResolvedType {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn instance(&self) -> &dyn AvroRecord {
        self.instance.as_ref()
    }

    pub fn into_instance(self) -> Box<dyn AvroRecord> {
        self.instance
    }

    pub fn factory(&self) -> &RecordFactory {
        &self.factory
    }
}

impl fmt::Debug for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedType")
            .field("schema", &self.schema)
            .field("instance", &self.instance)
            .finish()
    }
}
