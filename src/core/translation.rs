//! Message translation for list labels
//!
//! The list action asks a [`Translator`] for the label of every displayed
//! attribute, using the lowercased entity name as translation domain.

use crate::core::error::ConfigError;
use serde_yaml::Value as YamlValue;
use std::collections::HashMap;
use std::path::Path;

/// Translates message keys within a domain
pub trait Translator: Send + Sync {
    /// Translate `key`, replacing `%name%` placeholders from `params`
    ///
    /// Unknown keys translate to themselves.
    fn translate(&self, key: &str, params: &HashMap<String, String>, domain: &str) -> String;
}

/// Translator that returns every key unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, key: &str, params: &HashMap<String, String>, _domain: &str) -> String {
        replace_placeholders(key, params)
    }
}

/// In-memory message catalogs, domain to key to message
///
/// Catalog files are YAML maps; nested maps are flattened with dots:
///
/// ```yaml
/// title: Title
/// author:
///   name: Author
/// ```
///
/// yields the keys `title` and `author.name`.
#[derive(Debug, Clone, Default)]
pub struct CatalogTranslator {
    locale: String,
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl CatalogTranslator {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            catalogs: HashMap::new(),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Add a single message
    pub fn add_message(
        &mut self,
        domain: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.catalogs
            .entry(domain.into())
            .or_default()
            .insert(key.into(), message.into());
    }

    /// Merge the messages of a YAML catalog into `domain`
    pub fn add_yaml_str(&mut self, domain: &str, yaml: &str) -> Result<(), ConfigError> {
        let value: YamlValue = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })?;

        let mut messages = Vec::new();
        flatten("", &value, &mut messages);
        for (key, message) in messages {
            self.add_message(domain, key, message);
        }
        Ok(())
    }

    /// Load every `{domain}.{locale}.yaml` (or `.yml`) file of a directory
    pub fn from_dir(dir: impl AsRef<Path>, locale: impl Into<String>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let mut translator = Self::new(locale);
        let io_error = |e: std::io::Error| ConfigError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        };

        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(domain) = translator.domain_of(file_name) else {
                continue;
            };

            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            translator
                .add_yaml_str(&domain, &content)
                .map_err(|e| match e {
                    ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                        file: Some(path.display().to_string()),
                        message,
                    },
                    other => other,
                })?;
            tracing::debug!(domain = %domain, file = %path.display(), "Loaded translation catalog");
        }

        Ok(translator)
    }

    /// `book.en.yaml` -> `book` when the locale is `en`
    fn domain_of(&self, file_name: &str) -> Option<String> {
        let stem = file_name
            .strip_suffix(".yaml")
            .or_else(|| file_name.strip_suffix(".yml"))?;
        let domain = stem.strip_suffix(&format!(".{}", self.locale))?;
        (!domain.is_empty()).then(|| domain.to_string())
    }
}

impl Translator for CatalogTranslator {
    fn translate(&self, key: &str, params: &HashMap<String, String>, domain: &str) -> String {
        let message = self
            .catalogs
            .get(domain)
            .and_then(|catalog| catalog.get(key))
            .map(|m| m.as_str())
            .unwrap_or(key);
        replace_placeholders(message, params)
    }
}

fn replace_placeholders(message: &str, params: &HashMap<String, String>) -> String {
    params
        .iter()
        .fold(message.to_string(), |acc, (name, value)| {
            acc.replace(&format!("%{}%", name), value)
        })
}

fn flatten(prefix: &str, value: &YamlValue, out: &mut Vec<(String, String)>) {
    match value {
        YamlValue::Mapping(map) => {
            for (k, v) in map {
                let key = match k {
                    YamlValue::String(s) => s.clone(),
                    YamlValue::Number(n) => n.to_string(),
                    YamlValue::Bool(b) => b.to_string(),
                    _ => continue,
                };
                let full = if prefix.is_empty() {
                    key
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&full, v, out);
            }
        }
        YamlValue::String(s) => out.push((prefix.to_string(), s.clone())),
        YamlValue::Number(n) => out.push((prefix.to_string(), n.to_string())),
        YamlValue::Bool(b) => out.push((prefix.to_string(), b.to_string())),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_params() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_identity_translator() {
        let t = IdentityTranslator;
        assert_eq!(t.translate("title", &no_params(), "book"), "title");
    }

    #[test]
    fn test_catalog_lookup_by_domain() {
        let mut t = CatalogTranslator::new("en");
        t.add_message("book", "title", "Title");
        t.add_message("author", "title", "Honorific");

        assert_eq!(t.translate("title", &no_params(), "book"), "Title");
        assert_eq!(t.translate("title", &no_params(), "author"), "Honorific");
        assert_eq!(t.translate("title", &no_params(), "other"), "title");
        assert_eq!(t.translate("missing", &no_params(), "book"), "missing");
    }

    #[test]
    fn test_placeholders() {
        let mut t = CatalogTranslator::new("en");
        t.add_message("book", "count", "%count% books");
        let params = HashMap::from([("count".to_string(), "3".to_string())]);
        assert_eq!(t.translate("count", &params, "book"), "3 books");
    }

    #[test]
    fn test_yaml_catalog_is_flattened() {
        let mut t = CatalogTranslator::new("fr");
        t.add_yaml_str("book", "title: Titre\nauthor:\n  name: Auteur\nyear: 1965\n")
            .unwrap();
        assert_eq!(t.translate("title", &no_params(), "book"), "Titre");
        assert_eq!(t.translate("author.name", &no_params(), "book"), "Auteur");
        assert_eq!(t.translate("year", &no_params(), "book"), "1965");
    }

    #[test]
    fn test_invalid_yaml() {
        let mut t = CatalogTranslator::new("en");
        let err = t.add_yaml_str("book", "title: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_from_dir_filters_locale() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("book.en.yaml"), "title: Title\n").unwrap();
        std::fs::write(dir.path().join("book.fr.yaml"), "title: Titre\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let t = CatalogTranslator::from_dir(dir.path(), "fr").unwrap();
        assert_eq!(t.locale(), "fr");
        assert_eq!(t.translate("title", &no_params(), "book"), "Titre");
    }

    #[test]
    fn test_domain_of() {
        let t = CatalogTranslator::new("en");
        assert_eq!(t.domain_of("book.en.yaml"), Some("book".to_string()));
        assert_eq!(t.domain_of("book.en.yml"), Some("book".to_string()));
        assert_eq!(t.domain_of("book.fr.yaml"), None);
        assert_eq!(t.domain_of(".en.yaml"), None);
    }
}
