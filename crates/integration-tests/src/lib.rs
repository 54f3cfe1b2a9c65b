//! Integration test harness for Shopfront.
//!
//! Each test gets its own in-process products backend and storefront, both
//! bound to ephemeral ports, so nothing external needs to be running.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_catalog` - listing, search, category filter, detail
//! - `storefront_cart` - cart add/update/remove/clear, badge, checkout
//! - `storefront_admin` - product create/update/delete

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use reqwest::Client;
use serde::Deserialize;

use shopfront_core::{Price, Product, ProductId, ProductInput};
use shopfront_storefront::cart::{CartStore, KvStore};
use shopfront_storefront::catalog::CatalogClient;
use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::state::AppState;

/// Bytes served for every stored image.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

// =============================================================================
// Fake products backend
// =============================================================================

/// What the fake backend has stored.
#[derive(Debug, Default)]
pub struct BackendData {
    pub products: BTreeMap<i32, Product>,
    pub images: BTreeMap<i32, (String, Vec<u8>)>,
    next_id: i32,
}

impl BackendData {
    /// Store a product and assign it the next id.
    pub fn insert(&mut self, mut product: Product) -> ProductId {
        self.next_id += 1;
        product.id = ProductId::new(self.next_id);
        self.images.insert(
            self.next_id,
            ("image/png".to_string(), PNG_BYTES.to_vec()),
        );
        self.products.insert(self.next_id, product);
        ProductId::new(self.next_id)
    }
}

/// Shared handle on the fake backend's data.
pub type Backend = Arc<Mutex<BackendData>>;

/// A product fixture.
pub fn product(name: &str, category: &str, cents: i64, stock: i32) -> Product {
    Product {
        name: name.to_string(),
        description: format!("{name} description"),
        brand: "Acme".to_string(),
        category: category.to_string(),
        price: Price::from_cents(cents),
        product_available: true,
        stock_quantity: stock,
        image_name: "image.png".to_string(),
        image_type: "image/png".to_string(),
        ..Product::default()
    }
}

/// Default catalog: a laptop, a mouse with little stock, and a sold-out mug.
pub fn seeded_backend() -> Backend {
    let mut data = BackendData::default();
    data.insert(product("Laptop Pro", "Laptop", 129_999, 20));
    data.insert(product("Wireless Mouse", "Accessories", 2_550, 3));
    data.insert(product("Coffee Mug", "Kitchen", 1_200, 0));
    Arc::new(Mutex::new(data))
}

#[derive(Deserialize)]
struct SearchQuery {
    keyword: String,
}

async fn list(State(backend): State<Backend>) -> Json<Vec<Product>> {
    Json(backend.lock().unwrap().products.values().cloned().collect())
}

async fn search(
    State(backend): State<Backend>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<Product>> {
    let keyword = query.keyword.to_lowercase();
    let data = backend.lock().unwrap();
    Json(
        data.products
            .values()
            .filter(|p| {
                [&p.name, &p.description, &p.brand, &p.category]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&keyword))
            })
            .cloned()
            .collect(),
    )
}

async fn fetch(State(backend): State<Backend>, Path(id): Path<i32>) -> Response {
    match backend.lock().unwrap().products.get(&id) {
        Some(product) => Json(product.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn image(State(backend): State<Backend>, Path(id): Path<i32>) -> Response {
    match backend.lock().unwrap().images.get(&id) {
        Some((content_type, bytes)) => {
            ([(header::CONTENT_TYPE, content_type.clone())], bytes.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Read the `product` JSON part and the optional `imageFile` part.
async fn read_product(mut multipart: Multipart) -> Option<(ProductInput, Option<(String, Vec<u8>)>)> {
    let mut input = None;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.ok()? {
        match field.name() {
            Some("product") => {
                let bytes = field.bytes().await.ok()?;
                input = Some(serde_json::from_slice::<ProductInput>(&bytes).ok()?);
            }
            Some("imageFile") => {
                let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
                let bytes = field.bytes().await.ok()?;
                upload = Some((content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }
    input.map(|input| (input, upload))
}

fn apply(product: &mut Product, input: ProductInput) {
    product.name = input.name;
    product.description = input.description;
    product.brand = input.brand;
    product.price = input.price;
    product.category = input.category;
    product.release_date = input.release_date;
    product.product_available = input.product_available;
    product.stock_quantity = input.stock_quantity;
    product.image_name = input.image_name.unwrap_or_default();
    product.image_type = input.image_type.unwrap_or_default();
}

async fn create(State(backend): State<Backend>, multipart: Multipart) -> Response {
    let Some((input, Some(upload))) = read_product(multipart).await else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let mut product = Product::default();
    apply(&mut product, input);

    let mut data = backend.lock().unwrap();
    let id = data.insert(product);
    data.images.insert(id.as_i32(), upload);
    let stored = data.products.get(&id.as_i32()).cloned().unwrap_or_default();
    (StatusCode::CREATED, Json(stored)).into_response()
}

async fn update(
    State(backend): State<Backend>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> StatusCode {
    let Some((input, upload)) = read_product(multipart).await else {
        return StatusCode::BAD_REQUEST;
    };
    let mut data = backend.lock().unwrap();
    let Some(product) = data.products.get_mut(&id) else {
        return StatusCode::NOT_FOUND;
    };
    apply(product, input);
    if let Some(upload) = upload {
        data.images.insert(id, upload);
    }
    StatusCode::OK
}

async fn remove(State(backend): State<Backend>, Path(id): Path<i32>) -> StatusCode {
    let mut data = backend.lock().unwrap();
    data.images.remove(&id);
    match data.products.remove(&id) {
        Some(_) => StatusCode::OK,
        None => StatusCode::NOT_FOUND,
    }
}

/// Router implementing the products REST API under `/api`.
pub fn backend_router(backend: Backend) -> Router {
    let api = Router::new()
        .route("/products", get(list))
        .route("/products/search", get(search))
        .route("/product", axum::routing::post(create))
        .route("/product/{id}", get(fetch).put(update).delete(remove))
        .route("/product/{id}/image", get(image))
        .with_state(backend);

    Router::new().nest("/api", api)
}

/// Router that fails every backend call with a 500.
pub fn failing_backend_router() -> Router {
    Router::new().fallback(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable") })
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

// =============================================================================
// Storefront under test
// =============================================================================

/// A running storefront wired to a fake backend.
pub struct TestContext {
    /// Cookie-keeping client; follows redirects.
    pub client: Client,
    pub base_url: String,
    pub backend: Backend,
    pub carts: CartStore,
}

impl TestContext {
    /// Storefront over the seeded catalog.
    pub async fn new() -> Self {
        Self::with_backend(seeded_backend()).await
    }

    /// Storefront over the given backend data.
    pub async fn with_backend(backend: Backend) -> Self {
        let backend_addr = serve(backend_router(Arc::clone(&backend))).await;
        Self::start(&format!("http://{backend_addr}/api"), backend).await
    }

    /// Storefront whose backend answers every request with a 500.
    pub async fn with_failing_backend() -> Self {
        let backend_addr = serve(failing_backend_router()).await;
        Self::start(
            &format!("http://{backend_addr}/api"),
            Arc::new(Mutex::new(BackendData::default())),
        )
        .await
    }

    async fn start(api_base_url: &str, backend: Backend) -> Self {
        let config = StorefrontConfig::for_backend(api_base_url.parse().unwrap());
        let catalog = CatalogClient::new(&config.api).unwrap();
        let carts = CartStore::new(KvStore::in_memory());
        let state = AppState::from_parts(config, catalog, carts.clone());

        let addr = serve(shopfront_storefront::app(state)).await;
        let client = Client::builder().cookie_store(true).build().unwrap();

        Self {
            client,
            base_url: format!("http://{addr}"),
            backend,
            carts,
        }
    }

    /// Absolute URL for a storefront path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a page, returning status and body.
    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.text().await.unwrap())
    }

    /// POST an urlencoded form, following any redirect.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> (StatusCode, String) {
        let response = self
            .client
            .post(self.url(path))
            .form(fields)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        (status, response.text().await.unwrap())
    }

    /// Current cart badge count as rendered by `/cart/count`.
    pub async fn badge(&self) -> u32 {
        let (_, body) = self.get("/cart/count").await;
        body.split("<span class=\"badge\">")
            .nth(1)
            .and_then(|rest| rest.split('<').next())
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0)
    }
}
