//! Filtering over an already-fetched product list.

use crate::types::Product;

/// Unique, non-empty categories in first-seen order.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for product in products {
        if !product.category.is_empty() && !seen.contains(&product.category) {
            seen.push(product.category.clone());
        }
    }
    seen
}

/// Keep only products in `category`; `None` keeps everything.
///
/// Order is preserved and nothing outside the input is ever returned.
#[must_use]
pub fn filter_by_category(products: Vec<Product>, category: Option<&str>) -> Vec<Product> {
    match category {
        Some(category) => products
            .into_iter()
            .filter(|product| product.category == category)
            .collect(),
        None => products,
    }
}

/// Normalize a search box value.
///
/// Returns `None` for empty or whitespace-only input, meaning "list
/// everything".
#[must_use]
pub fn normalize_keyword(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|keyword| !keyword.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductId;

    fn product(id: i32, category: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("p{id}"),
            category: category.to_string(),
            ..Product::default()
        }
    }

    fn fixture() -> Vec<Product> {
        vec![
            product(1, "Laptop"),
            product(2, "Audio"),
            product(3, ""),
            product(4, "Laptop"),
            product(5, "Toys"),
        ]
    }

    #[test]
    fn test_categories_unique_in_first_seen_order() {
        assert_eq!(categories(&fixture()), vec!["Laptop", "Audio", "Toys"]);
        assert!(categories(&[]).is_empty());
    }

    #[test]
    fn test_filter_is_subset_of_input() {
        let all = fixture();
        let laptops = filter_by_category(all.clone(), Some("Laptop"));
        let ids: Vec<i32> = laptops.iter().map(|p| p.id.as_i32()).collect();
        assert_eq!(ids, vec![1, 4]);
        assert!(laptops.iter().all(|p| all.contains(p)));
    }

    #[test]
    fn test_filter_none_is_identity() {
        assert_eq!(filter_by_category(fixture(), None), fixture());
    }

    #[test]
    fn test_filter_unknown_category_is_empty() {
        assert!(filter_by_category(fixture(), Some("Garden")).is_empty());
    }

    #[test]
    fn test_normalize_keyword() {
        assert_eq!(normalize_keyword(None), None);
        assert_eq!(normalize_keyword(Some("")), None);
        assert_eq!(normalize_keyword(Some("   ")), None);
        assert_eq!(normalize_keyword(Some("  mouse ")), Some("mouse"));
    }
}
