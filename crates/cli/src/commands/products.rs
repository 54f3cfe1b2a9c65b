//! Catalog commands against the products backend.
//!
//! # Import File Format
//!
//! ```yaml
//! - name: Desk Lamp
//!   brand: Lumen
//!   description: Warm LED lamp
//!   price: 39.90
//!   category: Home
//!   release_date: 2024-11-05
//!   stock_quantity: 12
//!   image: images/lamp.png   # relative to the YAML file
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use shopfront_core::catalog::{filter_by_category, normalize_keyword};
use shopfront_core::{Price, ProductId, ProductInput};
use shopfront_storefront::catalog::{ApiError, CatalogClient, ImageUpload};
use shopfront_storefront::config::{CatalogApiConfig, ConfigError};

/// Errors that can occur during catalog commands.
#[derive(Debug, Error)]
pub enum ProductsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid import file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} of {1} products failed to import")]
    PartialImport(usize, usize),
}

/// One product in an import file.
#[derive(Debug, Deserialize)]
pub struct ImportEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    pub price: Price,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub stock_quantity: i32,
    pub image: PathBuf,
}

const fn default_available() -> bool {
    true
}

impl ImportEntry {
    fn to_input(&self, today: NaiveDate) -> ProductInput {
        ProductInput {
            name: self.name.clone(),
            description: self.description.clone(),
            brand: self.brand.clone(),
            price: self.price,
            category: self.category.clone(),
            release_date: Some(self.release_date.unwrap_or(today)),
            product_available: self.available,
            stock_quantity: self.stock_quantity,
            ..ProductInput::new_default(today)
        }
    }
}

/// Parse an import file's contents.
///
/// # Errors
///
/// Returns the YAML error if the document is not a list of products.
pub fn parse_import(yaml: &str) -> Result<Vec<ImportEntry>, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

fn client() -> Result<CatalogClient, ProductsError> {
    dotenvy::dotenv().ok();
    let config = CatalogApiConfig::from_env()?;
    info!("Using products backend at {}", config.base_url);
    Ok(CatalogClient::new(&config)?)
}

/// Print products, optionally searched and filtered by category.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
pub async fn list(search: Option<&str>, category: Option<&str>) -> Result<(), ProductsError> {
    let client = client()?;
    let products = match normalize_keyword(search) {
        Some(keyword) => client.search_products(keyword).await?,
        None => client.list_products().await?,
    };
    let products = filter_by_category(products, category);

    info!("{:>5}  {:<32} {:<16} {:>12}  STATUS", "ID", "NAME", "CATEGORY", "PRICE");
    for product in &products {
        info!(
            "{:>5}  {:<32} {:<16} {:>12}  {}",
            product.id.as_i32(),
            product.name,
            product.category,
            product.price.display(),
            product.stock_status().label()
        );
    }
    info!("{} products", products.len());

    Ok(())
}

/// Create every product listed in a YAML file.
///
/// Image paths are resolved relative to the file. A failing entry is logged
/// and skipped; the command fails at the end if any entry failed.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if any product
/// could not be created.
pub async fn import(file: &Path) -> Result<(), ProductsError> {
    let yaml = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| ProductsError::Io {
            path: file.to_path_buf(),
            source,
        })?;
    let entries = parse_import(&yaml)?;
    info!(count = entries.len(), "Parsed import file");

    let client = client()?;
    let base_dir = file.parent().unwrap_or_else(|| Path::new("."));
    let today = chrono::Local::now().date_naive();
    let mut failed = 0;

    for entry in &entries {
        let image_path = base_dir.join(&entry.image);
        let bytes = match tokio::fs::read(&image_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Skipping {}: cannot read {}: {e}", entry.name, image_path.display());
                failed += 1;
                continue;
            }
        };
        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let upload = ImageUpload::new(file_name, None, bytes);

        match client.create_product(&entry.to_input(today), upload).await {
            Ok(product) => info!("Created #{} {}", product.id, product.name),
            Err(e) => {
                tracing::error!("Failed to create {}: {e}", entry.name);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(ProductsError::PartialImport(failed, entries.len()));
    }
    info!("Import complete!");
    Ok(())
}

/// Delete a product.
///
/// # Errors
///
/// Returns an error if the product does not exist or the backend fails.
pub async fn delete(id: i32) -> Result<(), ProductsError> {
    let client = client()?;
    client.delete_product(ProductId::new(id)).await?;
    info!("Deleted product {id}");
    Ok(())
}
