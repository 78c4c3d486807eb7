//! Product catalog summaries

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use storepulse_core::types::Product;

/// Distinct non-blank values in first-seen order
pub fn distinct_values<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductSummary {
    pub total_products: usize,
    pub brands: Vec<String>,
    pub lines: Vec<String>,
}

/// Counts and distinct brands/lines of a deduplicated product list
pub fn summarize_products(products: &[Product]) -> ProductSummary {
    ProductSummary {
        total_products: products.len(),
        brands: distinct_values(products.iter().map(|p| p.brand.as_deref())),
        lines: distinct_values(products.iter().map(|p| p.line.as_deref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(sku: &str, brand: Option<&str>, line: Option<&str>) -> Product {
        Product {
            sku: sku.to_string(),
            description: None,
            brand: brand.map(str::to_string),
            line: line.map(str::to_string),
            unit: None,
            price: None,
        }
    }

    #[test]
    fn test_distinct_brands_and_lines() {
        let products = vec![
            product("A", Some("Acme"), Some("Filters")),
            product("B", Some("Acme"), None),
            product("C", Some(" "), Some("Brakes")),
            product("D", Some("Bolt"), Some("Filters")),
        ];
        let summary = summarize_products(&products);
        assert_eq!(summary.total_products, 4);
        assert_eq!(summary.brands, vec!["Acme", "Bolt"]);
        assert_eq!(summary.lines, vec!["Filters", "Brakes"]);
    }
}
