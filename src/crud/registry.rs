//! Crud registry: which entity each crud id serves and how it is displayed

use crate::config::CrudsConfig;
use crate::core::entity::{EntityCatalog, EntityType};
use crate::core::error::{ConfigError, CrudError, NotFoundError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Default route prefix under which cruds are mounted
pub const DEFAULT_ROUTE_PREFIX: &str = "/crud";

/// Default number of records per list page
pub const DEFAULT_RESULTS_PER_PAGE: usize = 10;

/// URL paths of the four crud actions
///
/// `edit` and `drop` contain an `{id}` placeholder replaced by the object
/// identifier when templates build links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudRoutes {
    pub list: String,
    pub edit: String,
    pub new: String,
    pub drop: String,
}

impl CrudRoutes {
    /// Routes served by this crate's router for `crud_id`
    pub fn for_crud(prefix: &str, crud_id: &str) -> Self {
        let base = format!("{}/{}", prefix.trim_end_matches('/'), crud_id);
        Self {
            list: format!("{}/list", base),
            edit: format!("{}/{{id}}/edit", base),
            new: format!("{}/new", base),
            drop: format!("{}/{{id}}/drop", base),
        }
    }
}

fn default_results_per_page() -> usize {
    DEFAULT_RESULTS_PER_PAGE
}

/// Declarative registration of one crud
///
/// # Example
///
/// ```rust,ignore
/// let definition = CrudDefinition::new("book", "Book")
///     .attributes(["title", "author", "year"])
///     .results_per_page(20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudDefinition {
    /// Crud identifier, unique per registry
    pub id: String,

    /// Name of the entity in the catalog
    pub entity: String,

    /// Attributes displayed in the list, in order
    #[serde(default)]
    pub attributes: Vec<String>,

    /// Explicit routes; derived from the registry prefix when absent
    #[serde(default)]
    pub routes: Option<CrudRoutes>,

    #[serde(default = "default_results_per_page")]
    pub results_per_page: usize,
}

impl CrudDefinition {
    pub fn new(id: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity: entity.into(),
            attributes: Vec::new(),
            routes: None,
            results_per_page: DEFAULT_RESULTS_PER_PAGE,
        }
    }

    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn routes(mut self, routes: CrudRoutes) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn results_per_page(mut self, results_per_page: usize) -> Self {
        self.results_per_page = results_per_page;
        self
    }
}

/// A registered crud
#[derive(Debug, Clone)]
pub struct CrudConfig {
    pub id: String,
    pub entity: Arc<EntityType>,
    pub attributes: Vec<String>,
    pub routes: CrudRoutes,
    pub results_per_page: usize,
}

impl CrudConfig {
    pub fn entity_name(&self) -> &str {
        self.entity.name()
    }

    /// Lowercased entity name, used as template class name and
    /// translation domain
    pub fn class_name(&self) -> String {
        self.entity.name().to_lowercase()
    }
}

/// Registry of all cruds served by the controller
///
/// Filled once at startup, then shared read-only between requests.
#[derive(Debug)]
pub struct CrudRegistry {
    route_prefix: String,
    cruds: HashMap<String, Arc<CrudConfig>>,
}

impl Default for CrudRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CrudRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            cruds: HashMap::new(),
        }
    }

    /// Change the prefix used to derive routes of definitions without any
    pub fn with_route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = prefix.into();
        self
    }

    pub fn route_prefix(&self) -> &str {
        &self.route_prefix
    }

    /// Register a crud
    ///
    /// The entity must be known to `catalog`. Registering an id a second
    /// time replaces the previous configuration.
    pub fn register(
        &mut self,
        catalog: &EntityCatalog,
        definition: CrudDefinition,
    ) -> Result<(), CrudError> {
        let entity = catalog
            .resolve(&definition.entity)
            .ok_or_else(|| ConfigError::UnknownEntity {
                crud_id: definition.id.clone(),
                entity: definition.entity.clone(),
            })?;

        if definition.results_per_page == 0 {
            return Err(ConfigError::InvalidResultsPerPage {
                crud_id: definition.id,
            }
            .into());
        }

        let routes = definition
            .routes
            .unwrap_or_else(|| CrudRoutes::for_crud(&self.route_prefix, &definition.id));

        tracing::debug!(crud = %definition.id, entity = %definition.entity, "Registered crud");

        let config = CrudConfig {
            id: definition.id.clone(),
            entity,
            attributes: definition.attributes,
            routes,
            results_per_page: definition.results_per_page,
        };
        self.cruds.insert(definition.id, Arc::new(config));
        Ok(())
    }

    /// Build a registry from a loaded configuration
    pub fn from_config(catalog: &EntityCatalog, config: &CrudsConfig) -> Result<Self, CrudError> {
        let mut registry = Self::new();
        if let Some(prefix) = &config.route_prefix {
            registry = registry.with_route_prefix(prefix.clone());
        }
        for definition in &config.cruds {
            registry.register(catalog, definition.clone())?;
        }
        Ok(registry)
    }

    /// Configuration registered under `crud_id`
    pub fn lookup(&self, crud_id: &str) -> Result<Arc<CrudConfig>, CrudError> {
        self.cruds.get(crud_id).cloned().ok_or_else(|| {
            NotFoundError::Crud {
                crud_id: crud_id.to_string(),
            }
            .into()
        })
    }

    /// Get all registered crud ids
    pub fn crud_ids(&self) -> Vec<&str> {
        self.cruds.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cruds.is_empty()
    }
}
