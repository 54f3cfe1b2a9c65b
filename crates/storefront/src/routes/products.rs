//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::catalog::{categories, filter_by_category, normalize_keyword};
use shopfront_core::{Product, ProductId};

use super::error_page;
use crate::filters;
use crate::models::{Flash, session::take_flash};
use crate::state::AppState;

const LOAD_ERROR: &str = "Failed to load products. Please try again later.";
const SEARCH_ERROR: &str = "Failed to search products. Please try again later.";
const DETAIL_ERROR: &str = "Failed to load product details. Please try again later.";

/// Longest description excerpt shown on a product card.
const CARD_DESCRIPTION_CHARS: usize = 90;

// =============================================================================
// Views
// =============================================================================

/// Product card data for the listing grid.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: i32,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub excerpt: String,
    pub price: String,
    pub stock_label: &'static str,
    pub stock_class: &'static str,
    pub can_purchase: bool,
    pub image_url: String,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        let status = product.stock_status();
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            excerpt: excerpt(&product.description, CARD_DESCRIPTION_CHARS),
            price: product.price.display(),
            stock_label: status.label(),
            stock_class: status.css_class(),
            can_purchase: product.can_purchase(),
            image_url: product
                .embedded_image_uri()
                .unwrap_or_else(|| image_path(product.id)),
        }
    }
}

/// Full product data for the detail page.
#[derive(Clone)]
pub struct ProductDetailView {
    pub id: i32,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub price: String,
    pub release_date: Option<String>,
    pub stock_quantity: i32,
    pub stock_label: &'static str,
    pub stock_class: &'static str,
    pub can_purchase: bool,
    pub max_quantity: u32,
    pub image_uri: Option<String>,
}

impl ProductDetailView {
    fn new(product: &Product, image_uri: Option<String>) -> Self {
        let status = product.stock_status();
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
            price: product.price.display(),
            release_date: product
                .release_date
                .map(|d| d.format("%B %-d, %Y").to_string()),
            stock_quantity: product.stock_quantity,
            stock_label: status.label(),
            stock_class: status.css_class(),
            can_purchase: product.can_purchase(),
            max_quantity: product.clamp_quantity(u32::MAX),
            image_uri,
        }
    }
}

/// A category filter chip.
#[derive(Clone)]
pub struct CategoryChip {
    pub label: String,
    pub href: String,
    pub active: bool,
}

/// Same-origin URL of a product's image.
pub(crate) fn image_path(id: ProductId) -> String {
    format!("/products/{id}/image")
}

fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.truncate(out.trim_end().len());
    out.push('…');
    out
}

/// Listing URL preserving the current search.
fn listing_href(keyword: Option<&str>, category: Option<&str>) -> String {
    let mut params = Vec::new();
    if let Some(keyword) = keyword {
        params.push(format!("q={}", urlencoding::encode(keyword)));
    }
    if let Some(category) = category {
        params.push(format!("category={}", urlencoding::encode(category)));
    }
    if params.is_empty() {
        "/products".to_string()
    } else {
        format!("/products?{}", params.join("&"))
    }
}

fn category_chips(
    available: &[String],
    keyword: Option<&str>,
    selected: Option<&str>,
) -> Vec<CategoryChip> {
    let mut chips = vec![CategoryChip {
        label: "All Products".to_string(),
        href: listing_href(keyword, None),
        active: selected.is_none(),
    }];
    chips.extend(available.iter().map(|category| CategoryChip {
        label: category.clone(),
        href: listing_href(keyword, Some(category)),
        active: selected == Some(category.as_str()),
    }));
    chips
}

// =============================================================================
// Templates
// =============================================================================

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub flash: Option<Flash>,
    pub products: Vec<ProductCardView>,
    pub categories: Vec<CategoryChip>,
    pub search_query: String,
    pub selected_category: Option<String>,
    pub error: Option<&'static str>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub flash: Option<Flash>,
    pub product: ProductDetailView,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the product listing.
///
/// One backend call per request: search when a keyword is given, otherwise
/// the full list. The category filter runs over whatever came back.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListingQuery>,
) -> impl IntoResponse {
    let keyword = normalize_keyword(query.q.as_deref());
    let selected = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let result = match keyword {
        Some(keyword) => state
            .catalog()
            .search_products(keyword)
            .await
            .map_err(|e| (e, SEARCH_ERROR)),
        None => state
            .catalog()
            .list_products()
            .await
            .map_err(|e| (e, LOAD_ERROR)),
    };

    let (fetched, error) = match result {
        Ok(products) => (products, None),
        Err((e, message)) => {
            tracing::error!("Failed to fetch products: {e}");
            (Vec::new(), Some(message))
        }
    };

    let mut available = categories(&fetched);
    if let Some(selected) = selected.filter(|s| !available.iter().any(|c| c == s)) {
        available.push(selected.to_string());
    }

    let products = filter_by_category(fetched, selected)
        .iter()
        .map(ProductCardView::from)
        .collect();

    ProductsIndexTemplate {
        flash: take_flash(&session).await,
        products,
        categories: category_chips(&available, keyword, selected),
        search_query: keyword.unwrap_or_default().to_string(),
        selected_category: selected.map(str::to_string),
        error,
    }
}

/// Display the product detail page.
///
/// The image comes from the embedded data when present, otherwise from a
/// second request to the image endpoint.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Response {
    let id = ProductId::new(id);

    let product = match state.catalog().get_product(id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            return error_page(StatusCode::NOT_FOUND, "Product not found", "Product not found");
        }
        Err(e) => {
            tracing::error!("Failed to fetch product {id}: {e}");
            return error_page(StatusCode::BAD_GATEWAY, "Something went wrong", DETAIL_ERROR);
        }
    };

    let image_uri = match product.embedded_image_uri() {
        Some(uri) => Some(uri),
        None => match state.catalog().product_image(id).await {
            Ok(image) => image.map(|image| image.to_data_uri()),
            Err(e) => {
                tracing::warn!("Failed to fetch image for product {id}: {e}");
                None
            }
        },
    };

    ProductShowTemplate {
        flash: take_flash(&session).await,
        product: ProductDetailView::new(&product, image_uri),
    }
    .into_response()
}

/// Proxy a product's image bytes from the backend.
#[instrument(skip(state))]
pub async fn image(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    match state.catalog().product_image(ProductId::new(id)).await {
        Ok(Some(image)) => (
            [
                (header::CONTENT_TYPE, image.content_type),
                (header::CACHE_CONTROL, "private, max-age=60".to_string()),
            ],
            image.bytes,
        )
            .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::warn!("Failed to proxy image for product {id}: {e}");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use shopfront_core::Price;

    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::new(4),
            name: "Trail Shoe".to_string(),
            brand: "Acme".to_string(),
            category: "Footwear".to_string(),
            description: "Grippy".to_string(),
            price: Price::from_cents(12_999),
            product_available: true,
            stock_quantity: 3,
            ..Product::default()
        }
    }

    #[test]
    fn test_card_view_formats_price_and_stock() {
        let card = ProductCardView::from(&product());
        assert_eq!(card.price, "$129.99");
        assert_eq!(card.stock_label, "Low Stock");
        assert!(card.can_purchase);
        assert_eq!(card.image_url, "/products/4/image");
    }

    #[test]
    fn test_card_view_prefers_embedded_image() {
        let mut p = product();
        p.image_data = Some("AAAA".to_string());
        p.image_type = "image/png".to_string();
        assert_eq!(
            ProductCardView::from(&p).image_url,
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn test_detail_view_bounds_quantity_by_stock() {
        let view = ProductDetailView::new(&product(), None);
        assert_eq!(view.max_quantity, 3);

        let mut p = product();
        p.stock_quantity = 0;
        let view = ProductDetailView::new(&p, None);
        assert_eq!(view.max_quantity, 1);
        assert!(!view.can_purchase);
    }

    #[test]
    fn test_detail_view_release_date() {
        let mut p = product();
        p.release_date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1);
        let view = ProductDetailView::new(&p, None);
        assert_eq!(view.release_date.as_deref(), Some("March 1, 2024"));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("a long description", 6), "a long…");
        assert_eq!(excerpt("abc def", 4), "abc…");
    }

    #[test]
    fn test_listing_href_encodes() {
        assert_eq!(listing_href(None, None), "/products");
        assert_eq!(
            listing_href(Some("red shoe"), Some("Home & Garden")),
            "/products?q=red%20shoe&category=Home%20%26%20Garden"
        );
    }

    #[test]
    fn test_category_chips_mark_active() {
        let available = vec!["Laptop".to_string(), "Audio".to_string()];
        let chips = category_chips(&available, None, Some("Audio"));

        let labels: Vec<&str> = chips.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["All Products", "Laptop", "Audio"]);
        assert!(!chips[0].active);
        assert!(chips[2].active);
    }
}
