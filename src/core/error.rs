//! Typed error handling for the crud-rs controller
//!
//! Every action handler returns `Result<_, CrudError>`. The surrounding HTTP
//! layer turns the error into a response through [`IntoResponse`], so a
//! missing crud registration or a missing object becomes a plain 404.
//!
//! # Error Categories
//!
//! - [`ConfigError`]: registration and configuration loading failures
//! - [`NotFoundError`]: unknown crud id, missing object, refused delete
//! - [`StorageError`]: persistence backend failures
//! - [`TemplateError`]: template rendering failures
//!
//! Form validation failures are not errors: the edit action re-renders the
//! form with its field errors.
//!
//! # Example
//!
//! ```rust,ignore
//! match controller.drop_object("book", "42", &request).await {
//!     Ok(html) => println!("{}", html.0),
//!     Err(CrudError::NotFound(e)) => println!("404: {}", e),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The main error type of the crud controller
#[derive(Debug)]
pub enum CrudError {
    /// Registration or configuration errors
    Config(ConfigError),

    /// Unknown crud id, unknown object, or a refused action
    NotFound(NotFoundError),

    /// Storage backend errors
    Storage(StorageError),

    /// Template rendering errors
    Template(TemplateError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for CrudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrudError::Config(e) => write!(f, "{}", e),
            CrudError::NotFound(e) => write!(f, "{}", e),
            CrudError::Storage(e) => write!(f, "{}", e),
            CrudError::Template(e) => write!(f, "{}", e),
            CrudError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for CrudError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrudError::Config(e) => Some(e),
            CrudError::NotFound(e) => Some(e),
            CrudError::Storage(e) => Some(e),
            CrudError::Template(e) => Some(e),
            CrudError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CrudError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            CrudError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CrudError::NotFound(_) => StatusCode::NOT_FOUND,
            CrudError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CrudError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CrudError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            CrudError::Config(e) => e.error_code(),
            CrudError::NotFound(e) => e.error_code(),
            CrudError::Storage(_) => "STORAGE_ERROR",
            CrudError::Template(_) => "TEMPLATE_ERROR",
            CrudError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is in the not-found class
    pub fn is_not_found(&self) -> bool {
        matches!(self, CrudError::NotFound(_))
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            CrudError::NotFound(NotFoundError::Crud { crud_id }) => {
                Some(serde_json::json!({ "crud_id": crud_id }))
            }
            CrudError::NotFound(NotFoundError::Object { entity, id }) => {
                Some(serde_json::json!({ "entity": entity, "id": id }))
            }
            CrudError::Config(ConfigError::UnknownEntity { crud_id, entity }) => {
                Some(serde_json::json!({ "crud_id": crud_id, "entity": entity }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for CrudError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "{}", self);
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors raised while registering cruds or loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The entity named by a crud definition is not in the catalog
    #[error("Crud '{crud_id}' references unknown entity '{entity}'")]
    UnknownEntity { crud_id: String, entity: String },

    /// A crud definition asks for zero results per page
    #[error("Crud '{crud_id}' must display at least one result per page")]
    InvalidResultsPerPage { crud_id: String },

    /// A configuration source could not be parsed
    #[error("Failed to parse configuration{}: {message}", .file.as_ref().map(|f| format!(" '{}'", f)).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// A configuration file could not be read
    #[error("Failed to read '{path}': {message}")]
    Io { path: String, message: String },
}

impl ConfigError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::UnknownEntity { .. } => "UNKNOWN_ENTITY",
            ConfigError::InvalidResultsPerPage { .. } => "INVALID_RESULTS_PER_PAGE",
            ConfigError::ParseError { .. } => "CONFIG_PARSE_ERROR",
            ConfigError::Io { .. } => "CONFIG_IO_ERROR",
        }
    }
}

impl From<ConfigError> for CrudError {
    fn from(err: ConfigError) -> Self {
        CrudError::Config(err)
    }
}

// =============================================================================
// Not Found Errors
// =============================================================================

/// Errors surfaced to the client as HTTP 404
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// No crud registered under this id
    #[error("No crud registered under '{crud_id}'")]
    Crud { crud_id: String },

    /// The requested object does not exist
    #[error("{entity} with id '{id}' not found")]
    Object { entity: String, id: String },

    /// The action refused the request (wrong method or invalid token)
    #[error("Action '{action}' is not available on crud '{crud_id}'")]
    Action { crud_id: String, action: String },
}

impl NotFoundError {
    pub fn error_code(&self) -> &'static str {
        match self {
            NotFoundError::Crud { .. } => "CRUD_NOT_FOUND",
            NotFoundError::Object { .. } => "OBJECT_NOT_FOUND",
            NotFoundError::Action { .. } => "ACTION_NOT_FOUND",
        }
    }
}

impl From<NotFoundError> for CrudError {
    fn from(err: NotFoundError) -> Self {
        CrudError::NotFound(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by a persistence backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage operation '{operation}' failed: {message}")]
    OperationFailed { operation: String, message: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for CrudError {
    fn from(err: StorageError) -> Self {
        CrudError::Storage(err)
    }
}

/// Storage traits return `anyhow::Result`; their failures land here
impl From<anyhow::Error> for CrudError {
    fn from(err: anyhow::Error) -> Self {
        CrudError::Storage(StorageError::Backend(format!("{:#}", err)))
    }
}

// =============================================================================
// Template Errors
// =============================================================================

/// Errors raised while rendering a template
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to render template '{template}': {message}")]
    Render { template: String, message: String },

    #[error("Failed to load templates: {0}")]
    Load(String),
}

impl From<TemplateError> for CrudError {
    fn from(err: TemplateError) -> Self {
        CrudError::Template(err)
    }
}
