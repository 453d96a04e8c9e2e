//! List parameters, query criteria and pagination math

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query parameters of the list action
///
/// ```text
/// GET /crud/book/list?page=2
/// GET /crud/book/list?page=1&direction=up&attribute=title&search=Dune
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListParams {
    /// Page number (starts at 1)
    pub page: usize,

    /// `"up"` sorts ascending; any other value sorts descending
    pub direction: String,

    /// Attribute to sort on; empty means no ordering
    pub attribute: String,

    /// Free-text search value; empty means no filtering
    pub search: String,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            direction: String::new(),
            attribute: String::new(),
            search: String::new(),
        }
    }
}

impl ListParams {
    /// Get page number, ensuring minimum of 1
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Sort specification requested by these parameters
    pub fn sort_spec(&self) -> Option<SortSpec> {
        if self.attribute.is_empty() {
            return None;
        }
        Some(SortSpec {
            attribute: self.attribute.clone(),
            direction: SortDirection::from_param(&self.direction),
        })
    }
}

/// Ordering direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// `"up"` is ascending, everything else descending
    pub fn from_param(direction: &str) -> Self {
        if direction == "up" {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Attribute and direction to order a result set by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub attribute: String,
    pub direction: SortDirection,
}

/// Exact-match filters, attribute name to expected value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria(IndexMap<String, Value>);

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(attribute.into(), value.into());
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.0.get(attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Number of the last page for `total` matching records
///
/// Integer division plus one: an empty result set still has page 1, and a
/// total that is an exact multiple of `per_page` yields a trailing empty
/// page.
pub fn max_page(total: usize, per_page: usize) -> usize {
    total / per_page.max(1) + 1
}

/// Offset of the first record on `page` (1-based)
pub fn page_offset(page: usize, per_page: usize) -> usize {
    page.saturating_sub(1).saturating_mul(per_page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_params_defaults() {
        let params = ListParams::default();
        assert_eq!(params.page(), 1);
        assert!(params.sort_spec().is_none());
        assert!(params.search.is_empty());
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let params = ListParams {
            page: 0,
            ..Default::default()
        };
        assert_eq!(params.page(), 1);
    }

    #[test]
    fn test_sort_spec_direction() {
        let mut params = ListParams {
            attribute: "title".to_string(),
            direction: "up".to_string(),
            ..Default::default()
        };
        assert_eq!(
            params.sort_spec(),
            Some(SortSpec {
                attribute: "title".to_string(),
                direction: SortDirection::Ascending,
            })
        );

        params.direction = "down".to_string();
        assert_eq!(
            params.sort_spec().map(|s| s.direction),
            Some(SortDirection::Descending)
        );

        params.direction = String::new();
        assert_eq!(
            params.sort_spec().map(|s| s.direction),
            Some(SortDirection::Descending)
        );
    }

    #[test]
    fn test_max_page() {
        assert_eq!(max_page(0, 10), 1);
        assert_eq!(max_page(9, 10), 1);
        assert_eq!(max_page(10, 10), 2);
        assert_eq!(max_page(25, 10), 3);
        assert_eq!(max_page(7, 1), 8);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(0, 10), 0);
        assert_eq!(page_offset(usize::MAX / 2, 10), usize::MAX);
    }

    #[test]
    fn test_criteria_keeps_insertion_order() {
        let mut criteria = Criteria::new();
        criteria.insert("title", "Dune");
        criteria.insert("author", json!("Dune"));
        let keys: Vec<&String> = criteria.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["title", "author"]);
        assert_eq!(criteria.len(), 2);
    }
}
