//! Entity descriptions: mapping metadata, blank-record factories and the
//! catalog the crud registry resolves entity names against

use crate::core::form::FormType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A persisted entity instance
///
/// Records are plain JSON objects; the identifier lives under the field
/// named by [`EntityMetadata::identifier`].
pub type Record = Map<String, Value>;

/// How a field is mapped by the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A column holding a scalar value; sortable and searchable
    Plain,
    /// A relation to another entity
    Association,
}

/// One mapped field of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub name: String,
    pub kind: FieldKind,
}

/// Mapping metadata of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Entity name (e.g., "Book")
    pub name: String,

    /// Name of the identifier field
    #[serde(default = "default_identifier")]
    pub identifier: String,

    /// Mapped fields, in declaration order
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
}

fn default_identifier() -> String {
    "id".to_string()
}

impl EntityMetadata {
    /// Create metadata with the default `id` identifier and no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: default_identifier(),
            fields: Vec::new(),
        }
    }

    /// Use another field as identifier
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Declare a plain (scalar) field
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldMapping {
            name: name.into(),
            kind: FieldKind::Plain,
        });
        self
    }

    /// Declare an association to another entity
    pub fn association(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldMapping {
            name: name.into(),
            kind: FieldKind::Association,
        });
        self
    }

    /// Whether `name` is a plain mapped field
    ///
    /// Associations and unknown names are not fields.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.name == name && f.kind == FieldKind::Plain)
    }

    /// Read the identifier of a record as a string
    pub fn identifier_of(&self, record: &Record) -> Option<String> {
        match record.get(&self.identifier)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Produces a blank record for an entity
pub type EntityFactory = Arc<dyn Fn() -> Record + Send + Sync>;

/// Everything the controller needs to know about one entity
#[derive(Clone)]
pub struct EntityType {
    metadata: EntityMetadata,
    factory: EntityFactory,
    form: Arc<dyn FormType>,
}

impl EntityType {
    /// Describe an entity
    ///
    /// The default factory builds a record with every plain field set to
    /// `null`; use [`EntityType::with_factory`] for other defaults.
    pub fn new(metadata: EntityMetadata, form: impl FormType + 'static) -> Self {
        let blank: Record = metadata
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::Plain)
            .map(|f| (f.name.clone(), Value::Null))
            .collect();

        Self {
            metadata,
            factory: Arc::new(move || blank.clone()),
            form: Arc::new(form),
        }
    }

    /// Replace the blank-record factory
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Record + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    pub fn form_type(&self) -> Arc<dyn FormType> {
        self.form.clone()
    }

    /// Create a new blank instance
    pub fn instantiate(&self) -> Record {
        (self.factory)()
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("metadata", &self.metadata)
            .field("form", &self.form.name())
            .finish()
    }
}

/// Known entity types, keyed by entity name
#[derive(Default, Clone, Debug)]
pub struct EntityCatalog {
    types: HashMap<String, Arc<EntityType>>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity type; a type with the same name is replaced
    pub fn register(&mut self, entity: EntityType) {
        self.types
            .insert(entity.name().to_string(), Arc::new(entity));
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<EntityType>> {
        self.types.get(name).cloned()
    }

    pub fn entity_names(&self) -> Vec<&str> {
        self.types.keys().map(|s| s.as_str()).collect()
    }
}
