//! Validation and filtering system
//!
//! Declarative filters and validators attached to form fields. Filters run
//! first and may rewrite a bound value; validators then accept or reject it.

pub mod filters;
pub mod validators;

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;

/// A boxed validator, as stored on a form field
pub type Validator = Arc<dyn Fn(&str, &Value) -> Result<(), String> + Send + Sync>;

/// A boxed filter, as stored on a form field
pub type Filter = Arc<dyn Fn(&str, Value) -> Result<Value> + Send + Sync>;
