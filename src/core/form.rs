//! Declarative forms bound to entity records
//!
//! A [`FormType`] lists the fields an entity exposes for editing. A [`Form`]
//! binds a form type to one record, reads submitted request data into it,
//! runs the field filters and validators, and produces a serialisable
//! [`FormView`] for templates.
//!
//! Every form type with CSRF protection expects a `_token` value equal to the
//! token [`CsrfTokenManager::token_for`] issues for its name. [`EmptyType`]
//! carries nothing else and is used as the confirmation form of the delete
//! action.

use crate::core::entity::Record;
use crate::core::validation::{Filter, Validator, validators};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Name of the submitted field carrying the CSRF token
pub const TOKEN_FIELD: &str = "_token";

/// Message attached to fields whose submitted value cannot be converted
pub const INVALID_VALUE_MESSAGE: &str = "This value is not valid.";

/// Message attached to a form whose CSRF token is missing or wrong
pub const INVALID_TOKEN_MESSAGE: &str =
    "The CSRF token is invalid. Please try to resubmit the form.";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Input widget and conversion rule of a form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    TextArea,
    Integer,
    Float,
    Boolean,
    Date,
    Email,
}

/// One field of a form type
#[derive(Clone)]
pub struct FormField {
    pub name: String,
    pub label: Option<String>,
    pub kind: InputKind,
    pub required: bool,
    filters: Vec<Filter>,
    validators: Vec<Validator>,
}

impl FormField {
    pub fn new(name: impl Into<String>, kind: InputKind) -> Self {
        let mut field = Self {
            name: name.into(),
            label: None,
            kind,
            required: false,
            filters: Vec::new(),
            validators: Vec::new(),
        };
        if kind == InputKind::Email {
            field.validators.push(Arc::new(validators::email()));
        }
        field
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, InputKind::Text)
    }

    pub fn textarea(name: impl Into<String>) -> Self {
        Self::new(name, InputKind::TextArea)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, InputKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, InputKind::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, InputKind::Boolean)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, InputKind::Date)
    }

    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, InputKind::Email)
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Reject null and blank values
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn validator<V>(mut self, validator: V) -> Self
    where
        V: Fn(&str, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Convert the raw submitted value according to the field kind
    fn convert(&self, raw: Option<&str>) -> Result<Value, ()> {
        if self.kind == InputKind::Boolean {
            let checked = raw.is_some_and(|s| !matches!(s, "" | "0" | "false" | "off"));
            return Ok(Value::Bool(checked));
        }

        let raw = match raw {
            None | Some("") => return Ok(Value::Null),
            Some(raw) => raw,
        };

        match self.kind {
            InputKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .map_err(|_| ()),
            InputKind::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or(()),
            InputKind::Date => chrono::NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map(|d| Value::String(d.format(DATE_FORMAT).to_string()))
                .map_err(|_| ()),
            _ => Ok(Value::String(raw.to_string())),
        }
    }

    /// Run filters then validators, collecting error messages
    fn process(&self, mut value: Value) -> (Value, Vec<String>) {
        let mut errors = Vec::new();

        for filter in &self.filters {
            match filter(&self.name, value.clone()) {
                Ok(filtered) => value = filtered,
                Err(e) => {
                    errors.push(e.to_string());
                    return (value, errors);
                }
            }
        }

        if self.required {
            if let Err(message) = validators::required()(&self.name, &value) {
                errors.push(message);
                return (value, errors);
            }
        }

        for validator in &self.validators {
            if let Err(message) = validator(&self.name, &value) {
                errors.push(message);
            }
        }

        (value, errors)
    }
}

impl fmt::Debug for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormField")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("filters", &self.filters.len())
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Describes which fields of a record a form edits
pub trait FormType: Send + Sync {
    /// Form name, also the CSRF token intention
    fn name(&self) -> &str;

    /// Editable fields, in display order
    fn fields(&self) -> &[FormField];

    /// Whether a `_token` must accompany submissions
    fn csrf_protection(&self) -> bool {
        true
    }
}

/// Form type built field by field
///
/// # Example
///
/// ```rust,ignore
/// let form = SimpleFormType::new("book")
///     .field(FormField::text("title").required().filter(filters::trim()))
///     .field(FormField::integer("year").validator(validators::positive()));
/// ```
#[derive(Debug, Clone)]
pub struct SimpleFormType {
    name: String,
    fields: Vec<FormField>,
    csrf_protection: bool,
}

impl SimpleFormType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            csrf_protection: true,
        }
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn without_csrf(mut self) -> Self {
        self.csrf_protection = false;
        self
    }
}

impl FormType for SimpleFormType {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[FormField] {
        &self.fields
    }

    fn csrf_protection(&self) -> bool {
        self.csrf_protection
    }
}

/// Placeholder form with no fields
///
/// Only carries a CSRF token; the delete action uses it as confirmation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyType;

impl FormType for EmptyType {
    fn name(&self) -> &str {
        "form"
    }

    fn fields(&self) -> &[FormField] {
        &[]
    }
}

/// Issues and checks CSRF tokens, one per form intention
#[derive(Debug, Default)]
pub struct CsrfTokenManager {
    tokens: RwLock<HashMap<String, String>>,
}

impl CsrfTokenManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for `intention`, generated on first use
    pub fn token_for(&self, intention: &str) -> String {
        if let Some(token) = self
            .tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(intention)
        {
            return token.clone();
        }

        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(intention.to_string())
            .or_insert_with(|| Uuid::new_v4().simple().to_string())
            .clone()
    }

    /// Whether `token` is the token issued for `intention`
    pub fn is_token_valid(&self, intention: &str, token: &str) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(intention)
            .is_some_and(|expected| expected == token)
    }
}

/// Submitted request data
pub type Submission = HashMap<String, String>;

/// A form type bound to one record
pub struct Form {
    form_type: Arc<dyn FormType>,
    data: Record,
    csrf: Arc<CsrfTokenManager>,
    submitted: bool,
    raw: HashMap<String, String>,
    errors: Vec<String>,
    field_errors: IndexMap<String, Vec<String>>,
}

impl Form {
    pub fn new(form_type: Arc<dyn FormType>, data: Record, csrf: Arc<CsrfTokenManager>) -> Self {
        Self {
            form_type,
            data,
            csrf,
            submitted: false,
            raw: HashMap::new(),
            errors: Vec::new(),
            field_errors: IndexMap::new(),
        }
    }

    /// Read submitted values into the bound record and validate them
    ///
    /// Only fields declared by the form type are bound; anything else in
    /// the submission is ignored.
    pub fn bind_request(&mut self, submission: &Submission) {
        self.submitted = true;
        self.errors.clear();
        self.field_errors.clear();
        self.raw.clear();

        if self.form_type.csrf_protection() {
            let intention = self.form_type.name();
            let valid = submission
                .get(TOKEN_FIELD)
                .is_some_and(|token| self.csrf.is_token_valid(intention, token));
            if !valid {
                self.errors.push(INVALID_TOKEN_MESSAGE.to_string());
            }
        }

        let form_type = self.form_type.clone();
        for field in form_type.fields() {
            let raw = submission.get(&field.name).map(|s| s.as_str());
            match field.convert(raw) {
                Ok(value) => {
                    let (value, errors) = field.process(value);
                    self.data.insert(field.name.clone(), value);
                    if !errors.is_empty() {
                        self.field_errors.insert(field.name.clone(), errors);
                    }
                }
                Err(()) => {
                    let raw = raw.unwrap_or_default().to_string();
                    self.raw.insert(field.name.clone(), raw);
                    self.field_errors.insert(
                        field.name.clone(),
                        vec![INVALID_VALUE_MESSAGE.to_string()],
                    );
                }
            }
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Submitted, with a valid token and no field errors
    pub fn is_valid(&self) -> bool {
        self.submitted && self.errors.is_empty() && self.field_errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn field_errors(&self, field: &str) -> &[String] {
        self.field_errors
            .get(field)
            .map(|e| e.as_slice())
            .unwrap_or(&[])
    }

    pub fn data(&self) -> &Record {
        &self.data
    }

    pub fn into_data(self) -> Record {
        self.data
    }

    /// Template-facing snapshot of the form
    pub fn view(&self) -> FormView {
        let fields = self
            .form_type
            .fields()
            .iter()
            .map(|field| {
                let value = match self.raw.get(&field.name) {
                    Some(raw) => raw.clone(),
                    None => display_value(self.data.get(&field.name)),
                };
                FieldView {
                    name: field.name.clone(),
                    label: field.label.clone().unwrap_or_else(|| humanize(&field.name)),
                    kind: field.kind,
                    checked: matches!(self.data.get(&field.name), Some(Value::Bool(true))),
                    value,
                    required: field.required,
                    errors: self.field_errors(&field.name).to_vec(),
                }
            })
            .collect();

        FormView {
            name: self.form_type.name().to_string(),
            token: self
                .form_type
                .csrf_protection()
                .then(|| self.csrf.token_for(self.form_type.name())),
            token_field: TOKEN_FIELD,
            submitted: self.submitted,
            valid: self.is_valid(),
            errors: self.errors.clone(),
            fields,
        }
    }
}

/// Serialisable form state handed to templates
#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    pub name: String,
    pub token: Option<String>,
    pub token_field: &'static str,
    pub submitted: bool,
    pub valid: bool,
    pub errors: Vec<String>,
    pub fields: Vec<FieldView>,
}

/// Serialisable state of one field
#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    pub name: String,
    pub label: String,
    pub kind: InputKind,
    pub value: String,
    pub checked: bool,
    pub required: bool,
    pub errors: Vec<String>,
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(true)) => "1".to_string(),
        Some(Value::Bool(false)) => String::new(),
        Some(other) => other.to_string(),
    }
}

/// `published_at` -> `Published at`
fn humanize(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
