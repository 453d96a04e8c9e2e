//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses are properly formatted
//! - Error conversions work correctly
//! - Error matching allows callers to handle specific cases

use axum::http::StatusCode;
use axum::response::IntoResponse;
use crud::core::error::{StorageError, TemplateError};
use crud::prelude::*;

fn crud_not_found() -> CrudError {
    CrudError::NotFound(NotFoundError::Crud {
        crud_id: "book".to_string(),
    })
}

fn object_not_found() -> CrudError {
    CrudError::NotFound(NotFoundError::Object {
        entity: "Book".to_string(),
        id: "42".to_string(),
    })
}

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_not_found_errors_return_404() {
        assert_eq!(crud_not_found().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(object_not_found().status_code(), StatusCode::NOT_FOUND);

        let refused = CrudError::NotFound(NotFoundError::Action {
            crud_id: "book".to_string(),
            action: "drop".to_string(),
        });
        assert_eq!(refused.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_error_returns_500() {
        let err = CrudError::Storage(StorageError::OperationFailed {
            operation: "flush".to_string(),
            message: "disk full".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_template_error_returns_500() {
        let err = CrudError::Template(TemplateError::Load("missing".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_config_error_returns_500() {
        let err = CrudError::Config(ConfigError::InvalidResultsPerPage {
            crud_id: "book".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

// =============================================================================
// Error Code Tests
// =============================================================================

mod error_code_tests {
    use super::*;

    #[test]
    fn test_not_found_codes() {
        assert_eq!(crud_not_found().error_code(), "CRUD_NOT_FOUND");
        assert_eq!(object_not_found().error_code(), "OBJECT_NOT_FOUND");
        assert_eq!(
            CrudError::NotFound(NotFoundError::Action {
                crud_id: "book".to_string(),
                action: "drop".to_string(),
            })
            .error_code(),
            "ACTION_NOT_FOUND"
        );
    }

    #[test]
    fn test_config_codes() {
        let unknown = CrudError::Config(ConfigError::UnknownEntity {
            crud_id: "car".to_string(),
            entity: "Car".to_string(),
        });
        assert_eq!(unknown.error_code(), "UNKNOWN_ENTITY");

        let parse = CrudError::Config(ConfigError::ParseError {
            file: None,
            message: "oops".to_string(),
        });
        assert_eq!(parse.error_code(), "CONFIG_PARSE_ERROR");
    }

    #[test]
    fn test_other_codes() {
        assert_eq!(
            CrudError::Storage(StorageError::Backend("x".to_string())).error_code(),
            "STORAGE_ERROR"
        );
        assert_eq!(
            CrudError::Template(TemplateError::Load("x".to_string())).error_code(),
            "TEMPLATE_ERROR"
        );
        assert_eq!(
            CrudError::Internal("x".to_string()).error_code(),
            "INTERNAL_ERROR"
        );
    }
}

// =============================================================================
// Error Response Tests
// =============================================================================

mod error_response_tests {
    use super::*;

    #[test]
    fn test_error_response_has_code_and_message() {
        let response = crud_not_found().to_response();
        assert_eq!(response.code, "CRUD_NOT_FOUND");
        assert!(response.message.contains("book"));
    }

    #[test]
    fn test_error_response_includes_object_details() {
        let response = object_not_found().to_response();
        let details = response.details.expect("object errors carry details");
        assert_eq!(details["entity"], "Book");
        assert_eq!(details["id"], "42");
    }

    #[test]
    fn test_internal_error_has_no_details() {
        let response = CrudError::Internal("boom".to_string()).to_response();
        assert!(response.details.is_none());
        assert_eq!(response.message, "Internal error: boom");

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("details").is_none());
    }
}

// =============================================================================
// Conversion Tests
// =============================================================================

mod error_conversion_tests {
    use super::*;

    #[test]
    fn test_leaf_errors_convert() {
        let err: CrudError = NotFoundError::Crud {
            crud_id: "book".to_string(),
        }
        .into();
        assert!(err.is_not_found());

        let err: CrudError = TemplateError::Render {
            template: "crud/list.html".to_string(),
            message: "oops".to_string(),
        }
        .into();
        assert!(matches!(err, CrudError::Template(_)));
    }

    #[test]
    fn test_anyhow_error_converts_to_storage() {
        let err: CrudError = anyhow::anyhow!("connection refused")
            .context("Failed to list Book records")
            .into();
        assert!(matches!(err, CrudError::Storage(StorageError::Backend(_))));
        let message = err.to_string();
        assert!(message.contains("Failed to list Book records"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn test_source_is_the_leaf_error() {
        let err = object_not_found();
        let source = std::error::Error::source(&err).expect("leaf error as source");
        assert_eq!(source.to_string(), err.to_string());
    }
}

// =============================================================================
// IntoResponse Tests
// =============================================================================

mod into_response_tests {
    use super::*;

    #[test]
    fn test_not_found_into_response_status() {
        let response = object_not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_into_response_status() {
        let response = CrudError::Storage(StorageError::Backend("down".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
