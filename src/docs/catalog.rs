//! Static slug -> category table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::config::settings::CategoryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Foundations,
    Components,
    Other,
}

impl Category {
    /// Listing order used by `GET /api/docs`.
    pub const ORDER: [Category; 3] = [Category::Foundations, Category::Components, Category::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Foundations => "Foundations",
            Category::Components => "Components",
            Category::Other => "Other",
        }
    }

    pub fn rank(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|c| c == self)
            .unwrap_or(Self::ORDER.len())
    }
}

#[derive(Debug, Clone)]
pub struct CategoryTable {
    by_slug: HashMap<String, Category>,
    default: Category,
}

impl CategoryTable {
    pub fn new(entries: impl IntoIterator<Item = (String, Category)>, default: Category) -> Self {
        let mut by_slug = HashMap::new();
        for (slug, category) in entries {
            // First assignment wins when a slug is listed twice.
            by_slug.entry(slug).or_insert(category);
        }
        Self { by_slug, default }
    }

    pub fn from_config(config: &CategoryConfig) -> Self {
        let foundations = config
            .foundations
            .iter()
            .map(|slug| (slug.clone(), Category::Foundations));
        let components = config
            .components
            .iter()
            .map(|slug| (slug.clone(), Category::Components));
        Self::new(foundations.chain(components), Category::Other)
    }

    pub fn category_for(&self, slug: &str) -> Category {
        self.by_slug.get(slug).copied().unwrap_or(self.default)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::from_config(&CategoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_slugs_map_to_their_category() {
        let table = CategoryTable::default();
        assert_eq!(table.category_for("typography"), Category::Foundations);
        assert_eq!(table.category_for("button"), Category::Components);
    }

    #[test]
    fn unknown_slug_falls_back_to_other() {
        let table = CategoryTable::default();
        assert_eq!(table.category_for("changelog"), Category::Other);
    }

    #[test]
    fn rank_follows_listing_order() {
        assert!(Category::Foundations.rank() < Category::Components.rank());
        assert!(Category::Components.rank() < Category::Other.rank());
    }
}
