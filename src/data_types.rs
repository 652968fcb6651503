// src/data_types.rs
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One spreadsheet row as returned by the workbook API, aligned with the header row.
pub type RawRecord = Vec<Value>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl User {
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.email.as_deref())
            .unwrap_or("")
    }
}

/// A row keyed by display column name. Cells missing from the source row are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformedRecord {
    cells: HashMap<String, String>,
}

impl TransformedRecord {
    pub fn new() -> Self {
        TransformedRecord {
            cells: HashMap::new(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Cell text for display; absent cells render empty.
    pub fn cell(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TransformedRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = TransformedRecord::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

pub static PAGE_SIZES: [PageSize; 4] = [PageSize(5), PageSize(10), PageSize(20), PageSize(50)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageSize(pub usize);

impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

impl std::fmt::Display for PageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} entries", self.0)
    }
}

/// Filter and pagination parameters. `page` is 1-based; zero values are read as 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub name_filter: String,
    pub equipment_filter: String,
    pub page: usize,
    pub page_size: usize,
}

impl Default for Query {
    fn default() -> Self {
        Query {
            name_filter: String::new(),
            equipment_filter: String::new(),
            page: 1,
            page_size: PageSize::default().0,
        }
    }
}

impl Query {
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.max(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub records: Vec<TransformedRecord>,
    pub total_matching: usize,
    pub columns: Vec<String>,
    /// Every record that passed the filters, before slicing. Export and print read this.
    pub matching: Vec<TransformedRecord>,
}

impl ResultPage {
    pub fn total_pages(&self, page_size: usize) -> usize {
        self.total_matching.div_ceil(page_size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_prefers_display_name() {
        let user = User {
            display_name: Some("Aino Virtanen".into()),
            email: Some("aino@example.com".into()),
        };
        assert_eq!(user.greeting_name(), "Aino Virtanen");

        let user = User {
            display_name: None,
            email: Some("aino@example.com".into()),
        };
        assert_eq!(user.greeting_name(), "aino@example.com");
    }

    #[test]
    fn zero_page_parameters_are_clamped() {
        let query = Query {
            page: 0,
            page_size: 0,
            ..Query::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), 1);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = ResultPage {
            total_matching: 21,
            ..ResultPage::default()
        };
        assert_eq!(page.total_pages(10), 3);
        assert_eq!(ResultPage::default().total_pages(10), 0);
    }

    #[test]
    fn page_size_labels() {
        assert_eq!(PageSize(20).to_string(), "20 entries");
    }
}
