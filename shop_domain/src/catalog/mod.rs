//! Product catalog and calendar seasons.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::entities::{fold_key, Product, ProductId};

/// Seasons of the year (northern-hemisphere meteorological months).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Season {
    #[default]
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Map a timestamp onto its season.
    pub fn from_datetime(timestamp: DateTime<Utc>) -> Self {
        match timestamp.month() {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        }
    }
}

/// The products known to the engine, keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProductCatalog {
    products: HashMap<ProductId, Product>,
}

impl ProductCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a product.
    pub fn add_product(&mut self, product: Product) -> ProductId {
        let id = product.id.clone();
        self.products.insert(id.clone(), product);
        id
    }

    /// Get product by ID.
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    /// Products of a brand (case-insensitive), sorted by id.
    pub fn products_by_brand(&self, brand: &str) -> Vec<&Product> {
        let brand = fold_key(brand);
        self.sorted_filter(|p| fold_key(&p.brand) == brand)
    }

    /// Products in a category (case-insensitive), sorted by id.
    pub fn products_in_category(&self, category: &str) -> Vec<&Product> {
        let category = fold_key(category);
        self.sorted_filter(|p| fold_key(&p.category) == category)
    }

    /// All products, sorted by id.
    pub fn products(&self) -> Vec<&Product> {
        self.sorted_filter(|_| true)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    fn sorted_filter<F>(&self, predicate: F) -> Vec<&Product>
    where
        F: Fn(&Product) -> bool,
    {
        let mut products: Vec<_> = self.products.values().filter(|p| predicate(p)).collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        products
    }
}

impl FromIterator<Product> for ProductCatalog {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        let mut catalog = ProductCatalog::new();
        for product in iter {
            catalog.add_product(product);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_season_from_datetime() {
        let at = |month| Utc.with_ymd_and_hms(2024, month, 15, 12, 0, 0).unwrap();

        assert_eq!(Season::from_datetime(at(1)), Season::Winter);
        assert_eq!(Season::from_datetime(at(3)), Season::Spring);
        assert_eq!(Season::from_datetime(at(7)), Season::Summer);
        assert_eq!(Season::from_datetime(at(10)), Season::Autumn);
        assert_eq!(Season::from_datetime(at(12)), Season::Winter);
    }

    #[test]
    fn test_catalog_lookups() {
        let catalog: ProductCatalog = vec![
            Product::new("p2", "Tee").with_brand("Aether").with_category("tops"),
            Product::new("p1", "Shirt").with_brand("aether").with_category("tops"),
            Product::new("p3", "Jeans").with_brand("Denim Co").with_category("bottoms"),
        ]
        .into_iter()
        .collect();

        assert_eq!(catalog.len(), 3);

        let by_brand = catalog.products_by_brand("AETHER");
        assert_eq!(by_brand.len(), 2);
        assert_eq!(by_brand[0].id, ProductId::new("p1"));

        assert_eq!(catalog.products_in_category("bottoms").len(), 1);
        assert!(catalog.get(&ProductId::new("p3")).is_some());
    }

    #[test]
    fn test_lookups_fold_unicode() {
        let catalog: ProductCatalog = vec![
            Product::new("p1", "Scarf").with_brand("Ünique").with_category("Écharpes"),
        ]
        .into_iter()
        .collect();

        assert_eq!(catalog.products_by_brand("üNIQUE").len(), 1);
        assert_eq!(catalog.products_in_category("ÉCHARPES").len(), 1);
    }
}
