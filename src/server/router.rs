//! Router builder utilities for crud and health routes

use crate::crud::handlers::{AppState, drop_object, edit_object, list_objects, new_object};
use axum::{
    Json, Router,
    routing::{any, get},
};
use serde_json::{Value, json};

/// Build crud routes under `prefix`
///
/// These routes are generic and work for every registered crud:
/// - GET {prefix}/{crud}/list - Paginated, sortable, searchable list
/// - GET|POST {prefix}/{crud}/new - Creation form
/// - GET|POST {prefix}/{crud}/{id}/edit - Edition form
/// - ANY {prefix}/{crud}/{id}/drop - Deletion (POST with token only, 404 otherwise)
pub fn build_crud_routes(state: AppState, prefix: &str) -> Router {
    let prefix = prefix.trim_end_matches('/');

    Router::new()
        .route(&format!("{}/{{crud}}/list", prefix), get(list_objects))
        .route(
            &format!("{}/{{crud}}/new", prefix),
            get(new_object).post(new_object),
        )
        .route(
            &format!("{}/{{crud}}/{{id}}/edit", prefix),
            get(edit_object).post(edit_object),
        )
        .route(
            &format!("{}/{{crud}}/{{id}}/drop", prefix),
            any(drop_object),
        )
        .with_state(state)
}

/// Build health check routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "crud-rs"
    }))
}
