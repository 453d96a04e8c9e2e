//! ServerBuilder for fluent API to build HTTP servers

use super::router::{build_crud_routes, health_routes};
use crate::config::CrudsConfig;
use crate::core::entity::{EntityCatalog, EntityType};
use crate::core::service::PersistenceProvider;
use crate::core::template::{TemplateRenderer, TeraRenderer};
use crate::core::translation::{IdentityTranslator, Translator};
use crate::crud::controller::CrudController;
use crate::crud::registry::{CrudDefinition, CrudRegistry};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Builder for creating HTTP servers serving registered cruds
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_persistence(InMemoryPersistence::new())
///     .register_entity(book_type())
///     .register_crud(CrudDefinition::new("book", "Book").attributes(["title"]))
///     .build()?;
/// ```
pub struct ServerBuilder {
    persistence: Option<Arc<dyn PersistenceProvider>>,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    translator: Option<Arc<dyn Translator>>,
    route_prefix: Option<String>,
    catalog: EntityCatalog,
    configs: Vec<CrudsConfig>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            persistence: None,
            renderer: None,
            translator: None,
            route_prefix: None,
            catalog: EntityCatalog::new(),
            configs: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Set the persistence provider (required)
    pub fn with_persistence(mut self, persistence: impl PersistenceProvider + 'static) -> Self {
        self.persistence = Some(Arc::new(persistence));
        self
    }

    /// Replace the built-in Tera templates
    pub fn with_renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Translate list labels; keys are displayed as-is otherwise
    pub fn with_translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Some(Arc::new(translator));
        self
    }

    /// Mount cruds under `prefix` instead of `/crud`
    ///
    /// Takes precedence over the prefix of loaded configuration files.
    pub fn with_route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = Some(prefix.into());
        self
    }

    /// Add custom routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Make an entity type available to crud definitions
    pub fn register_entity(mut self, entity: EntityType) -> Self {
        self.catalog.register(entity);
        self
    }

    /// Register a single crud
    pub fn register_crud(mut self, definition: CrudDefinition) -> Self {
        self.configs.push(CrudsConfig {
            route_prefix: None,
            cruds: vec![definition],
        });
        self
    }

    /// Register every crud of a configuration
    pub fn with_config(mut self, config: CrudsConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Load and register a YAML configuration file
    pub fn with_config_file(self, path: &str) -> Result<Self> {
        let config = CrudsConfig::from_yaml_file(path)?;
        tracing::debug!(path, cruds = config.cruds.len(), "Loaded crud configuration");
        Ok(self.with_config(config))
    }

    /// Build the controller shared by all handlers
    ///
    /// Configurations are merged in registration order; the last definition
    /// of a crud id wins.
    pub fn build_controller(mut self) -> Result<CrudController> {
        let persistence = self.persistence.take().ok_or_else(|| {
            anyhow::anyhow!("PersistenceProvider is required. Call .with_persistence()")
        })?;

        let mut config = CrudsConfig::merge(std::mem::take(&mut self.configs));
        if let Some(prefix) = self.route_prefix.take() {
            config.route_prefix = Some(prefix);
        }
        let registry = CrudRegistry::from_config(&self.catalog, &config)?;

        let renderer: Arc<dyn TemplateRenderer> = match self.renderer.take() {
            Some(renderer) => renderer,
            None => Arc::new(TeraRenderer::new()?),
        };
        let translator: Arc<dyn Translator> = match self.translator.take() {
            Some(translator) => translator,
            None => Arc::new(IdentityTranslator),
        };

        tracing::info!(
            cruds = ?registry.crud_ids(),
            prefix = registry.route_prefix(),
            "Crud registry ready"
        );

        Ok(CrudController::new(
            Arc::new(registry),
            persistence,
            renderer,
            translator,
        ))
    }

    /// Build the final router
    ///
    /// This generates:
    /// - Health routes
    /// - Crud routes for every registered crud
    /// - Custom routes
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let controller = Arc::new(self.build_controller()?);
        let prefix = controller.registry().route_prefix().to_string();

        let mut app = health_routes().merge(build_crud_routes(controller, &prefix));
        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::EntityMetadata;
    use crate::core::form::{FormField, SimpleFormType};
    use crate::storage::InMemoryPersistence;

    fn book_type() -> EntityType {
        EntityType::new(
            EntityMetadata::new("Book").field("title"),
            SimpleFormType::new("book").field(FormField::text("title")),
        )
    }

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ServerBuilder::new();
        assert!(builder.persistence.is_none());
        assert!(builder.configs.is_empty());
        assert!(builder.custom_routes.is_empty());
        assert!(builder.route_prefix.is_none());
    }

    #[test]
    fn test_register_crud_appends_config() {
        let builder = ServerBuilder::new()
            .register_crud(CrudDefinition::new("book", "Book"))
            .register_crud(CrudDefinition::new("novel", "Book"));
        assert_eq!(builder.configs.len(), 2);
    }

    #[test]
    fn test_build_without_persistence_fails() {
        let result = ServerBuilder::new().build_controller();
        let err_msg = format!("{}", result.err().expect("should be Err"));
        assert!(
            err_msg.contains("PersistenceProvider is required"),
            "error should mention persistence: {}",
            err_msg
        );
    }

    #[test]
    fn test_build_with_unknown_entity_fails() {
        let result = ServerBuilder::new()
            .with_persistence(InMemoryPersistence::new())
            .register_crud(CrudDefinition::new("car", "Car"))
            .build_controller();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_prefix_overrides_config() {
        let config = CrudsConfig::from_yaml_str("route_prefix: /admin\ncruds: []\n").unwrap();
        let controller = ServerBuilder::new()
            .with_persistence(InMemoryPersistence::new())
            .register_entity(book_type())
            .with_config(config)
            .with_route_prefix("/backoffice")
            .register_crud(CrudDefinition::new("book", "Book"))
            .build_controller()
            .expect("build should succeed");

        assert_eq!(controller.registry().route_prefix(), "/backoffice");
        assert_eq!(
            controller.registry().lookup("book").unwrap().routes.list,
            "/backoffice/book/list"
        );
    }

    #[test]
    fn test_config_prefix_used_by_default() {
        let config = CrudsConfig::from_yaml_str(
            "route_prefix: /admin\ncruds:\n  - id: book\n    entity: Book\n",
        )
        .unwrap();
        let controller = ServerBuilder::new()
            .with_persistence(InMemoryPersistence::new())
            .register_entity(book_type())
            .with_config(config)
            .build_controller()
            .unwrap();
        assert_eq!(controller.registry().route_prefix(), "/admin");
    }

    #[test]
    fn test_build_produces_router() {
        let router = ServerBuilder::new()
            .with_persistence(InMemoryPersistence::new())
            .register_entity(book_type())
            .register_crud(CrudDefinition::new("book", "Book"))
            .with_custom_routes(Router::new())
            .build()
            .expect("build should produce a Router");
        let _ = router;
    }

    #[test]
    fn test_with_config_file_missing_fails() {
        assert!(
            ServerBuilder::new()
                .with_config_file("/nonexistent/cruds.yaml")
                .is_err()
        );
    }
}
