//! Core module containing fundamental traits and types for the framework

pub mod entity;
pub mod error;
pub mod form;
pub mod query;
pub mod service;
pub mod template;
pub mod translation;
pub mod validation;

pub use entity::{EntityCatalog, EntityMetadata, EntityType, FieldKind, FieldMapping, Record};
pub use error::{ConfigError, CrudError, NotFoundError, StorageError, TemplateError};
pub use form::{CsrfTokenManager, EmptyType, Form, FormField, FormType, InputKind, SimpleFormType};
pub use query::{Criteria, ListParams, SortDirection, SortSpec};
pub use service::{EntityManager, PersistenceProvider, Repository};
pub use template::{CrudTemplate, TemplateRenderer, TeraRenderer};
pub use translation::{CatalogTranslator, IdentityTranslator, Translator};
