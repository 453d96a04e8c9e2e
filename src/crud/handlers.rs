//! HTTP handlers for crud actions
//!
//! Thin axum adapters: extract the crud id, object id, method and form
//! body, then delegate to the shared [`CrudController`].

use axum::{
    Form,
    extract::{Path, Query, State, rejection::FormRejection},
    http::Method,
    response::Html,
};
use std::sync::Arc;

use crate::core::error::CrudError;
use crate::core::form::Submission;
use crate::core::query::ListParams;
use crate::crud::controller::{CrudController, CrudRequest};

/// Application state shared across handlers
pub type AppState = Arc<CrudController>;

/// Form body of a request, empty when missing or undecodable
///
/// The controller decides the outcome from the submitted fields alone: an
/// edit re-renders with errors, a drop answers 404.
fn submission(form: Result<Form<Submission>, FormRejection>) -> Submission {
    match form {
        Ok(Form(data)) => data,
        Err(rejection) => {
            tracing::debug!("Ignoring form body: {}", rejection);
            Submission::new()
        }
    }
}

/// List records of a crud
///
/// GET {prefix}/{crud}/list?page=&direction=&attribute=&search=
pub async fn list_objects(
    State(controller): State<AppState>,
    Path(crud_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Html<String>, CrudError> {
    controller.list_objects(&crud_id, &params).await
}

/// Show or submit the creation form
///
/// GET|POST {prefix}/{crud}/new
pub async fn new_object(
    State(controller): State<AppState>,
    Path(crud_id): Path<String>,
    method: Method,
    form: Result<Form<Submission>, FormRejection>,
) -> Result<Html<String>, CrudError> {
    let request = CrudRequest::new(method, submission(form));
    controller.edit_object(&crud_id, None, &request).await
}

/// Show or submit the edition form of an existing record
///
/// GET|POST {prefix}/{crud}/{id}/edit
pub async fn edit_object(
    State(controller): State<AppState>,
    Path((crud_id, object_id)): Path<(String, String)>,
    method: Method,
    form: Result<Form<Submission>, FormRejection>,
) -> Result<Html<String>, CrudError> {
    let request = CrudRequest::new(method, submission(form));
    controller
        .edit_object(&crud_id, Some(object_id.as_str()), &request)
        .await
}

/// Delete a record
///
/// POST {prefix}/{crud}/{id}/drop with a valid `_token`; any other method,
/// body or token answers 404.
pub async fn drop_object(
    State(controller): State<AppState>,
    Path((crud_id, object_id)): Path<(String, String)>,
    method: Method,
    form: Result<Form<Submission>, FormRejection>,
) -> Result<Html<String>, CrudError> {
    let request = CrudRequest::new(method, submission(form));
    controller.drop_object(&crud_id, &object_id, &request).await
}
