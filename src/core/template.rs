//! Template rendering for the three crud views
//!
//! The controller renders exactly three templates: the list fragment, the
//! edit form fragment and the delete confirmation. [`TeraRenderer`] ships
//! built-in versions of all three and lets applications override any of
//! them from a template directory.

use crate::core::error::{CrudError, TemplateError};
use serde_json::Value;
use tera::{Context, Tera};

/// The views rendered by the crud controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrudTemplate {
    List,
    Edit,
    Drop,
}

impl CrudTemplate {
    pub const ALL: [CrudTemplate; 3] = [CrudTemplate::List, CrudTemplate::Edit, CrudTemplate::Drop];

    /// Template name as registered in the engine
    pub fn name(&self) -> &'static str {
        match self {
            CrudTemplate::List => "crud/list.html",
            CrudTemplate::Edit => "crud/edit.html",
            CrudTemplate::Drop => "crud/drop.html",
        }
    }

    fn builtin_source(&self) -> &'static str {
        match self {
            CrudTemplate::List => include_str!("../../templates/crud/list.html.tera"),
            CrudTemplate::Edit => include_str!("../../templates/crud/edit.html.tera"),
            CrudTemplate::Drop => include_str!("../../templates/crud/drop.html.tera"),
        }
    }
}

/// Renders a crud view with a JSON object as context
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: CrudTemplate, context: &Value) -> Result<String, CrudError>;
}

/// Tera-backed renderer
///
/// # Example
///
/// ```rust,ignore
/// // Built-in templates only
/// let renderer = TeraRenderer::new()?;
///
/// // templates/crud/list.html overrides the built-in list view
/// let renderer = TeraRenderer::from_glob("templates/**/*.html")?;
/// ```
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Renderer with the built-in templates
    pub fn new() -> Result<Self, TemplateError> {
        Self::from_tera(Tera::default())
    }

    /// Renderer loading templates matching `glob`
    ///
    /// Templates are named after their path relative to the glob root;
    /// built-ins fill in whichever crud view the directory does not define.
    pub fn from_glob(glob: &str) -> Result<Self, TemplateError> {
        let tera = Tera::new(glob).map_err(|e| TemplateError::Load(e.to_string()))?;
        Self::from_tera(tera)
    }

    /// Wrap an existing Tera instance, adding missing built-ins
    pub fn from_tera(mut tera: Tera) -> Result<Self, TemplateError> {
        let defined: Vec<String> = tera.get_template_names().map(|n| n.to_string()).collect();

        for template in CrudTemplate::ALL {
            if defined.iter().any(|n| n == template.name()) {
                tracing::debug!(template = template.name(), "Using application template");
                continue;
            }
            tera.add_raw_template(template.name(), template.builtin_source())
                .map_err(|e| TemplateError::Load(format!("{}: {}", template.name(), e)))?;
        }

        Ok(Self { tera })
    }
}

impl TemplateRenderer for TeraRenderer {
    fn render(&self, template: CrudTemplate, context: &Value) -> Result<String, CrudError> {
        let render_error = |message: String| TemplateError::Render {
            template: template.name().to_string(),
            message,
        };

        let context = Context::from_value(context.clone()).map_err(|e| render_error(e.to_string()))?;

        self.tera
            .render(template.name(), &context)
            .map_err(|e| {
                // Tera keeps the useful part of the message in the source chain
                let mut message = e.to_string();
                let mut source = std::error::Error::source(&e);
                while let Some(cause) = source {
                    message.push_str(": ");
                    message.push_str(&cause.to_string());
                    source = cause.source();
                }
                render_error(message).into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_templates_parse() {
        let renderer = TeraRenderer::new().expect("built-in templates must parse");
        let names: Vec<&str> = renderer.tera.get_template_names().collect();
        for template in CrudTemplate::ALL {
            assert!(names.contains(&template.name()));
        }
    }

    #[test]
    fn test_render_drop() {
        let renderer = TeraRenderer::new().unwrap();
        let html = renderer
            .render(
                CrudTemplate::Drop,
                &json!({ "class_name": "book", "object_id": "42", "list_route": "/crud/book/list" }),
            )
            .unwrap();
        assert!(html.contains("The book has been deleted."));
        assert!(html.contains("data-id=\"42\""));
    }

    #[test]
    fn test_render_escapes_html() {
        let renderer = TeraRenderer::new().unwrap();
        let html = renderer
            .render(
                CrudTemplate::Drop,
                &json!({ "class_name": "<b>", "object_id": "1", "list_route": "/" }),
            )
            .unwrap();
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn test_missing_variable_is_render_error() {
        let renderer = TeraRenderer::new().unwrap();
        let err = renderer.render(CrudTemplate::Drop, &json!({})).unwrap_err();
        assert!(matches!(err, CrudError::Template(TemplateError::Render { .. })));
    }

    #[test]
    fn test_application_template_overrides_builtin() {
        let mut tera = Tera::default();
        tera.add_raw_template("crud/drop.html", "gone: {{ object_id }}")
            .unwrap();
        let renderer = TeraRenderer::from_tera(tera).unwrap();

        let html = renderer
            .render(CrudTemplate::Drop, &json!({ "object_id": "7" }))
            .unwrap();
        assert_eq!(html, "gone: 7");

        // built-ins still fill the other views
        assert!(renderer.tera.get_template_names().any(|n| n == "crud/list.html"));
    }

    #[test]
    fn test_non_object_context_is_rejected() {
        let renderer = TeraRenderer::new().unwrap();
        assert!(renderer.render(CrudTemplate::Drop, &json!([1, 2])).is_err());
    }
}
