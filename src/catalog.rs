//! Product catalog and its category/subcategory filter.

use std::collections::BTreeSet;

use crate::models::{Category, Product};

/// Multi-select filter over the catalog.
///
/// Within a dimension the selected values are OR-ed; the two dimensions are
/// AND-ed. An empty dimension does not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    categories: BTreeSet<String>,
    subcategories: BTreeSet<String>,
}

impl CatalogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection<C, S>(categories: C, subcategories: S) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            subcategories: subcategories.into_iter().map(Into::into).collect(),
        }
    }

    /// Select or deselect a category. Returns whether it is now selected.
    pub fn toggle_category(&mut self, id: &str) -> bool {
        toggle(&mut self.categories, id)
    }

    /// Select or deselect a subcategory. Returns whether it is now selected.
    pub fn toggle_subcategory(&mut self, id: &str) -> bool {
        toggle(&mut self.subcategories, id)
    }

    pub fn is_category_selected(&self, id: &str) -> bool {
        self.categories.contains(id)
    }

    pub fn is_subcategory_selected(&self, id: &str) -> bool {
        self.subcategories.contains(id)
    }

    pub fn clear(&mut self) {
        self.categories.clear();
        self.subcategories.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.subcategories.is_empty()
    }

    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = self.categories.is_empty()
            || product
                .category_id
                .as_deref()
                .is_some_and(|id| self.categories.contains(id));

        let subcategory_ok = self.subcategories.is_empty()
            || product
                .subcategories
                .iter()
                .any(|sub| self.subcategories.contains(sub));

        category_ok && subcategory_ok
    }

    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

fn toggle(set: &mut BTreeSet<String>, id: &str) -> bool {
    if set.remove(id) {
        false
    } else {
        set.insert(id.to_string());
        true
    }
}

/// Products and categories as fetched from the API.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
}

impl Catalog {
    pub fn new(products: Vec<Product>, categories: Vec<Category>) -> Self {
        Self { products, categories }
    }

    pub fn filtered(&self, filter: &CatalogFilter) -> Vec<&Product> {
        filter.apply(&self.products)
    }

    pub fn category_name(&self, id: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }
}
