//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Landing page
//! GET  /health                    - Health check
//!
//! # Products
//! GET  /products                  - Listing (?q= search, ?category= filter)
//! GET  /products/{id}             - Product detail
//! GET  /products/{id}/image       - Image proxy (raw bytes)
//!
//! # Cart
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add to cart (HTMX: badge fragment + cart-updated)
//! POST /cart/update               - Set line quantity
//! POST /cart/remove               - Remove line
//! POST /cart/clear                - Empty the cart
//! POST /cart/checkout             - Placeholder, flashes a notice
//! GET  /cart/count                - Cart count badge (fragment)
//! GET  /cart/events               - Cart count stream (SSE)
//!
//! # Admin
//! GET  /admin/products            - Product table
//! GET  /admin/products/new        - Create form
//! POST /admin/products            - Create (multipart)
//! GET  /admin/products/{id}/edit  - Edit form
//! POST /admin/products/{id}       - Update (multipart)
//! POST /admin/products/{id}/delete - Delete
//! ```

pub mod admin;
pub mod cart;
pub mod home;
pub mod products;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::filters;
use crate::models::Flash;
use crate::state::AppState;

/// Header HTMX sets on every request it issues.
const HX_REQUEST_HEADER: &str = "hx-request";

/// Whether the request came from HTMX rather than a full page navigation.
pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Full-page error template (404 and backend failures).
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorPageTemplate {
    pub flash: Option<Flash>,
    pub title: String,
    pub message: String,
}

/// Render the error page with a status code.
pub(crate) fn error_page(status: StatusCode, title: &str, message: &str) -> Response {
    (
        status,
        ErrorPageTemplate {
            flash: None,
            title: title.to_string(),
            message: message.to_string(),
        },
    )
        .into_response()
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/image", get(products::image))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/checkout", post(cart::checkout))
        .route("/count", get(cart::count))
        .route("/events", get(cart::events))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(admin::index).post(admin::create))
        .route("/products/new", get(admin::new_product))
        .route("/products/{id}", post(admin::update))
        .route("/products/{id}/edit", get(admin::edit))
        .route("/products/{id}/delete", post(admin::delete))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/admin", admin_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_is_htmx() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));

        headers.insert(HX_REQUEST_HEADER, HeaderValue::from_static("true"));
        assert!(is_htmx(&headers));

        headers.insert(HX_REQUEST_HEADER, HeaderValue::from_static("false"));
        assert!(!is_htmx(&headers));
    }

    #[test]
    fn test_error_page_status() {
        let response = error_page(StatusCode::NOT_FOUND, "Not found", "Product not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
