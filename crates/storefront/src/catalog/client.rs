//! `CatalogClient` implementation.

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use shopfront_core::{Product, ProductId, ProductInput};

use super::{ApiError, ImageUpload, ProductImage};
use crate::config::CatalogApiConfig;

/// Longest slice of a response body included in logs and errors.
const BODY_PREVIEW_CHARS: usize = 500;

/// Client for the products REST backend.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &CatalogApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    // =========================================================================
    // Response Handling
    // =========================================================================

    /// Turn a non-success status into `ApiError::Status`, logging the body.
    async fn ensure_success(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        tracing::error!(
            status = %status,
            body = %preview,
            "Products backend returned non-success status"
        );
        Err(ApiError::Status {
            status: status.as_u16(),
            body: preview,
        })
    }

    /// Read a JSON body, logging the raw text when it does not parse.
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(BODY_PREVIEW_CHARS).collect::<String>(),
                "Failed to parse products backend response"
            );
            ApiError::Parse(e)
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self
            .inner
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, url = %url, "Products backend request failed"))?;

        let response = Self::ensure_success(response).await?;
        Self::read_json(response).await
    }

    /// Build the multipart body shared by create and update.
    fn product_form(input: &ProductInput, image: Option<ImageUpload>) -> Result<Form, ApiError> {
        let json = serde_json::to_vec(input)?;
        let mut form = Form::new().part(
            "product",
            Part::bytes(json).mime_str("application/json")?,
        );

        if let Some(image) = image {
            form = form.part(
                "imageFile",
                Part::bytes(image.bytes)
                    .file_name(image.file_name)
                    .mime_str(&image.content_type)?,
            );
        }

        Ok(form)
    }

    // =========================================================================
    // Read Methods
    // =========================================================================

    /// Fetch every product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a product list.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let products: Vec<Product> = self.get_json(&self.endpoint("/products")).await?;
        debug!(count = products.len(), "Products fetched");
        Ok(products)
    }

    /// Search products by keyword.
    ///
    /// An empty or whitespace-only keyword lists every product instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a product list.
    #[instrument(skip(self))]
    pub async fn search_products(&self, keyword: &str) -> Result<Vec<Product>, ApiError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return self.list_products().await;
        }

        let mut url = Url::parse(&self.endpoint("/products/search"))?;
        url.query_pairs_mut().append_pair("keyword", keyword);

        let products: Vec<Product> = self.get_json(url.as_str()).await?;
        debug!(count = products.len(), "Search results fetched");
        Ok(products)
    }

    /// Fetch one product. A 404 yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error for any other failure.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, ApiError> {
        match self.get_json(&self.endpoint(&format!("/product/{id}"))).await {
            Ok(product) => Ok(Some(product)),
            Err(ApiError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch a product's image bytes. A 404 or empty body yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error for any other failure.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product_image(&self, id: ProductId) -> Result<Option<ProductImage>, ApiError> {
        let url = self.endpoint(&format!("/product/{id}/image"));
        let response = self.inner.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        if bytes.is_empty() {
            return Ok(None);
        }
        debug!(content_type = ?content_type, len = bytes.len(), "Image fetched");
        Ok(Some(ProductImage::new(content_type.as_deref(), bytes.to_vec())))
    }

    // =========================================================================
    // Write Methods
    // =========================================================================

    /// Create a product with its image.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the product or the request fails.
    #[instrument(skip(self, input, image), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: &ProductInput,
        image: ImageUpload,
    ) -> Result<Product, ApiError> {
        let form = Self::product_form(input, Some(image))?;
        let response = self
            .inner
            .client
            .post(self.endpoint("/product"))
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let product: Product = Self::read_json(response).await?;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Update a product. The image part is only sent when `image` is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update or the request fails.
    #[instrument(skip(self, input, image), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
        image: Option<ImageUpload>,
    ) -> Result<(), ApiError> {
        let form = Self::product_form(input, image)?;
        let response = self
            .inner
            .client
            .put(self.endpoint(&format!("/product/{id}")))
            .multipart(form)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        tracing::info!("Product updated");
        Ok(())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` on 404, or any other request failure.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .delete(self.endpoint(&format!("/product/{id}")))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::warn!("Delete requested for missing product");
            return Err(ApiError::NotFound(format!("product {id}")));
        }
        Self::ensure_success(response).await?;
        tracing::info!("Product deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client(base: &str) -> CatalogClient {
        CatalogClient::new(&CatalogApiConfig {
            base_url: Url::parse(base).unwrap(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let c = client("http://localhost:8080/");
        assert_eq!(c.endpoint("/products"), "http://localhost:8080/products");

        let c = client("http://localhost:8080/api");
        assert_eq!(c.endpoint("/product/3"), "http://localhost:8080/api/product/3");
    }

    #[test]
    fn test_product_form_builds_without_image() {
        let input = ProductInput::new_default(chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(CatalogClient::product_form(&input, None).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_http_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let c = client("http://127.0.0.1:9/api");
        let err = c.list_products().await.unwrap_err();
        assert!(matches!(err, ApiError::Http(_)));
    }
}
