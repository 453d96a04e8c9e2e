//! # crud-rs
//!
//! A generic CRUD controller: register entities once, get paginated lists,
//! edition forms and deletion for all of them, rendered as HTML fragments.
//!
//! ## Features
//!
//! - **Registry-based**: each crud id maps to an entity, its displayed
//!   attributes, its routes and its page size
//! - **Search, sort and paginate**: exact-match search across plain fields,
//!   sort on any plain field
//! - **Forms**: typed fields with filters, validators and a CSRF token
//! - **Pluggable collaborators**: persistence, templates and translation
//!   behind traits
//! - **Configuration-Based**: declare cruds in YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crud::prelude::*;
//!
//! let book = EntityType::new(
//!     EntityMetadata::new("Book").field("title").field("year"),
//!     SimpleFormType::new("book")
//!         .field(FormField::text("title").required())
//!         .field(FormField::integer("year")),
//! );
//!
//! ServerBuilder::new()
//!     .with_persistence(InMemoryPersistence::new())
//!     .register_entity(book)
//!     .register_crud(CrudDefinition::new("book", "Book").attributes(["title", "year"]))
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod crud;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        entity::{EntityCatalog, EntityMetadata, EntityType, Record},
        error::{ConfigError, CrudError, NotFoundError},
        form::{CsrfTokenManager, FormField, FormType, InputKind, SimpleFormType},
        query::{Criteria, ListParams, SortDirection, SortSpec},
        service::{EntityManager, PersistenceProvider, Repository},
        template::{CrudTemplate, TemplateRenderer, TeraRenderer},
        translation::{CatalogTranslator, IdentityTranslator, Translator},
        validation::{filters, validators},
    };

    // === Crud ===
    pub use crate::crud::{
        CrudConfig, CrudController, CrudDefinition, CrudRegistry, CrudRequest, CrudRoutes,
    };

    // === Storage ===
    pub use crate::storage::InMemoryPersistence;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresPersistence;

    // === Config ===
    pub use crate::config::CrudsConfig;

    // === Server ===
    pub use crate::server::ServerBuilder;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::{Router, response::Html};
}
