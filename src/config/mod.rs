//! Configuration loading and management

use crate::core::error::ConfigError;
use crate::crud::registry::CrudDefinition;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Complete configuration of the crud system
///
/// ```yaml
/// route_prefix: /admin
/// cruds:
///   - id: book
///     entity: Book
///     attributes: [title, author, year]
///     results_per_page: 20
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudsConfig {
    /// Prefix of the derived crud routes; the registry default when absent
    #[serde(default)]
    pub route_prefix: Option<String>,

    /// Crud definitions, in declaration order
    #[serde(default)]
    pub cruds: Vec<CrudDefinition>,
}

impl CrudsConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })
    }

    /// Find a crud definition by id
    pub fn find_crud(&self, id: &str) -> Option<&CrudDefinition> {
        self.cruds.iter().find(|def| def.id == id)
    }

    /// Merge multiple configurations into one
    ///
    /// Later configurations win: a crud id defined twice keeps the last
    /// definition at the position of its first declaration, and the last
    /// route prefix set is used.
    pub fn merge(configs: Vec<CrudsConfig>) -> Self {
        let mut route_prefix = None;
        let mut cruds: IndexMap<String, CrudDefinition> = IndexMap::new();

        for config in configs {
            if config.route_prefix.is_some() {
                route_prefix = config.route_prefix;
            }
            for definition in config.cruds {
                cruds.insert(definition.id.clone(), definition);
            }
        }

        Self {
            route_prefix,
            cruds: cruds.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
route_prefix: /admin
cruds:
  - id: book
    entity: Book
    attributes: [title, year]
    results_per_page: 20
  - id: author
    entity: Author
"#;

    #[test]
    fn test_from_yaml_str() {
        let config = CrudsConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.route_prefix.as_deref(), Some("/admin"));
        assert_eq!(config.cruds.len(), 2);

        let book = config.find_crud("book").unwrap();
        assert_eq!(book.entity, "Book");
        assert_eq!(book.attributes, vec!["title", "year"]);
        assert_eq!(book.results_per_page, 20);

        let author = config.find_crud("author").unwrap();
        assert_eq!(author.results_per_page, 10);
        assert!(author.attributes.is_empty());
        assert!(config.find_crud("car").is_none());
    }

    #[test]
    fn test_empty_document_defaults() {
        let config = CrudsConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, CrudsConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = CrudsConfig::from_yaml_str("cruds: [").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { file: None, .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = CrudsConfig::from_yaml_file("/nonexistent/cruds.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_merge_later_wins() {
        let first = CrudsConfig::from_yaml_str(YAML).unwrap();
        let second = CrudsConfig::from_yaml_str(
            "cruds:\n  - id: book\n    entity: Book\n    results_per_page: 5\n  - id: car\n    entity: Car\n",
        )
        .unwrap();

        let merged = CrudsConfig::merge(vec![first, second]);
        assert_eq!(merged.route_prefix.as_deref(), Some("/admin"));

        let ids: Vec<&str> = merged.cruds.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["book", "author", "car"]);
        assert_eq!(merged.find_crud("book").unwrap().results_per_page, 5);
    }

    #[test]
    fn test_merge_empty() {
        assert_eq!(CrudsConfig::merge(vec![]), CrudsConfig::default());
    }
}
