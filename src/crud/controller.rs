//! The generic crud controller
//!
//! One [`CrudController`] serves every registered crud. Each action looks the
//! crud id up in the registry, talks to the persistence, form, translation
//! and template collaborators, and returns the rendered HTML fragment.

use crate::core::entity::Record;
use crate::core::error::{CrudError, NotFoundError};
use crate::core::form::{CsrfTokenManager, EmptyType, Form, FormType, FormView, Submission};
use crate::core::query::{Criteria, ListParams, max_page, page_offset};
use crate::core::service::PersistenceProvider;
use crate::core::template::{CrudTemplate, TemplateRenderer};
use crate::core::translation::Translator;
use crate::crud::registry::{CrudConfig, CrudRegistry};
use axum::http::Method;
use axum::response::Html;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Method and submitted form data of an incoming request
#[derive(Debug, Clone)]
pub struct CrudRequest {
    pub method: Method,
    pub data: Submission,
}

impl CrudRequest {
    pub fn new(method: Method, data: Submission) -> Self {
        Self { method, data }
    }

    pub fn get() -> Self {
        Self::new(Method::GET, Submission::new())
    }

    pub fn post(data: Submission) -> Self {
        Self::new(Method::POST, data)
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }
}

/// Context of the list template
#[derive(Debug, Serialize)]
struct ListView<'a> {
    page: usize,
    max_page: usize,
    objects: Vec<Record>,
    rows: Vec<RowView>,
    attributes: &'a [String],
    identifier: &'a str,
    class_name: String,
    list_route: &'a str,
    edit_route: &'a str,
    new_route: &'a str,
    drop_route: &'a str,
    label_attributes: IndexMap<String, String>,
    order_direction: &'a str,
    order_attribute: &'a str,
    search_filter: &'a str,
    sortable_attributes: IndexMap<String, bool>,
    delete_form: FormView,
}

/// One list row, pre-formatted for display
#[derive(Debug, Serialize)]
struct RowView {
    id: String,
    cells: Vec<String>,
}

/// Context of the edit template
#[derive(Debug, Serialize)]
struct EditView<'a> {
    form: FormView,
    persisted: bool,
    object_id: Option<&'a str>,
    class_name: String,
    edit_route: &'a str,
    new_route: &'a str,
    list_route: &'a str,
}

/// Context of the delete confirmation template
#[derive(Debug, Serialize)]
struct DropView<'a> {
    class_name: String,
    object_id: &'a str,
    list_route: &'a str,
}

/// Serves list, edit and delete actions for every registered crud
pub struct CrudController {
    registry: Arc<CrudRegistry>,
    persistence: Arc<dyn PersistenceProvider>,
    renderer: Arc<dyn TemplateRenderer>,
    translator: Arc<dyn Translator>,
    csrf: Arc<CsrfTokenManager>,
}

impl CrudController {
    pub fn new(
        registry: Arc<CrudRegistry>,
        persistence: Arc<dyn PersistenceProvider>,
        renderer: Arc<dyn TemplateRenderer>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            registry,
            persistence,
            renderer,
            translator,
            csrf: Arc::new(CsrfTokenManager::new()),
        }
    }

    /// Share a token manager with other parts of the application
    pub fn with_csrf(mut self, csrf: Arc<CsrfTokenManager>) -> Self {
        self.csrf = csrf;
        self
    }

    pub fn registry(&self) -> &CrudRegistry {
        &self.registry
    }

    pub fn csrf(&self) -> &Arc<CsrfTokenManager> {
        &self.csrf
    }

    fn create_form(&self, form_type: Arc<dyn FormType>, record: Record) -> Form {
        Form::new(form_type, record, self.csrf.clone())
    }

    /// List, search and paginate the records of a crud
    pub async fn list_objects(
        &self,
        crud_id: &str,
        params: &ListParams,
    ) -> Result<Html<String>, CrudError> {
        let config = self.registry.lookup(crud_id)?;
        let metadata = config.entity.metadata();
        let class_name = config.class_name();
        let page = params.page();

        tracing::debug!(crud = %crud_id, page, search = %params.search, "Listing objects");

        let mut label_attributes = IndexMap::new();
        let mut sortable_attributes = IndexMap::new();
        let mut criteria = Criteria::new();
        for attribute in &config.attributes {
            let label = self
                .translator
                .translate(attribute, &HashMap::new(), &class_name);
            label_attributes.insert(attribute.clone(), label);

            let sortable = metadata.has_field(attribute);
            sortable_attributes.insert(attribute.clone(), sortable);
            if sortable && !params.search.is_empty() {
                criteria.insert(attribute.clone(), params.search.clone());
            }
        }

        let order_by = params.sort_spec().filter(|sort| {
            let known = metadata.has_field(&sort.attribute);
            if !known {
                tracing::warn!(
                    crud = %crud_id,
                    attribute = %sort.attribute,
                    "Ignoring sort on an attribute that is not a mapped field"
                );
            }
            known
        });

        let repository = self.persistence.repository_for(metadata);
        let total = repository.count_by(&criteria).await?;
        let objects = repository
            .find_by(
                &criteria,
                order_by.as_ref(),
                Some(config.results_per_page),
                Some(page_offset(page, config.results_per_page)),
            )
            .await?;

        // Records without an identifier cannot be linked to
        let rows = objects
            .iter()
            .filter_map(|object| {
                let id = metadata
                    .identifier_of(object)
                    .filter(|id| !id.is_empty())?;
                Some(RowView {
                    id,
                    cells: config
                        .attributes
                        .iter()
                        .map(|attribute| cell_text(object.get(attribute)))
                        .collect(),
                })
            })
            .collect();

        let delete_form = self.create_form(Arc::new(EmptyType), Record::new());

        let view = ListView {
            page,
            max_page: max_page(total, config.results_per_page),
            objects,
            rows,
            attributes: &config.attributes,
            identifier: &metadata.identifier,
            class_name,
            list_route: &config.routes.list,
            edit_route: &config.routes.edit,
            new_route: &config.routes.new,
            drop_route: &config.routes.drop,
            label_attributes,
            order_direction: &params.direction,
            order_attribute: &params.attribute,
            search_filter: &params.search,
            sortable_attributes,
            delete_form: delete_form.view(),
        };

        self.render(CrudTemplate::List, &view)
    }

    /// Edit an existing record, or create one when `object_id` is `None`
    pub async fn edit_object(
        &self,
        crud_id: &str,
        object_id: Option<&str>,
        request: &CrudRequest,
    ) -> Result<Html<String>, CrudError> {
        let config = self.registry.lookup(crud_id)?;
        let metadata = config.entity.metadata();

        tracing::debug!(crud = %crud_id, id = ?object_id, method = %request.method, "Editing object");

        let record = match object_id {
            None => config.entity.instantiate(),
            Some(id) => self.find_object(&config, id).await?,
        };

        let mut form = self.create_form(config.entity.form_type(), record);
        let mut persisted = false;

        if request.is_post() {
            form.bind_request(&request.data);

            if form.is_valid() {
                let mut record = form.data().clone();
                let mut manager = self.persistence.entity_manager();
                manager.persist(metadata, &mut record).await?;
                manager.flush().await?;
                persisted = true;

                tracing::info!(
                    crud = %crud_id,
                    id = ?metadata.identifier_of(&record),
                    "Persisted object"
                );
            }
        }

        let view = EditView {
            form: form.view(),
            persisted,
            object_id,
            class_name: config.class_name(),
            edit_route: &config.routes.edit,
            new_route: &config.routes.new,
            list_route: &config.routes.list,
        };

        self.render(CrudTemplate::Edit, &view)
    }

    /// Delete a record
    ///
    /// Only a POST carrying a valid confirmation token deletes anything;
    /// every other request is answered with not-found.
    pub async fn drop_object(
        &self,
        crud_id: &str,
        object_id: &str,
        request: &CrudRequest,
    ) -> Result<Html<String>, CrudError> {
        let config = self.registry.lookup(crud_id)?;

        tracing::debug!(crud = %crud_id, id = %object_id, method = %request.method, "Dropping object");

        let mut form = self.create_form(Arc::new(EmptyType), Record::new());

        if request.is_post() {
            form.bind_request(&request.data);

            if form.is_valid() {
                let metadata = config.entity.metadata();
                let object = self.find_object(&config, object_id).await?;

                let mut manager = self.persistence.entity_manager();
                manager.remove(metadata, &object).await?;
                manager.flush().await?;

                tracing::info!(crud = %crud_id, id = %object_id, "Removed object");

                let view = DropView {
                    class_name: config.class_name(),
                    object_id,
                    list_route: &config.routes.list,
                };
                return self.render(CrudTemplate::Drop, &view);
            }
        }

        Err(NotFoundError::Action {
            crud_id: crud_id.to_string(),
            action: "drop".to_string(),
        }
        .into())
    }

    async fn find_object(&self, config: &CrudConfig, id: &str) -> Result<Record, CrudError> {
        self.persistence
            .repository_for(config.entity.metadata())
            .find(id)
            .await?
            .ok_or_else(|| {
                NotFoundError::Object {
                    entity: config.entity_name().to_string(),
                    id: id.to_string(),
                }
                .into()
            })
    }

    fn render<T: Serialize>(&self, template: CrudTemplate, view: &T) -> Result<Html<String>, CrudError> {
        let context = serde_json::to_value(view)
            .map_err(|e| CrudError::Internal(format!("Failed to build template context: {}", e)))?;
        self.renderer.render(template, &context).map(Html)
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
