//! Catalog product and cart line types.
//!
//! Field names on the wire are camelCase to match the products backend.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::{Price, ProductId};

/// Stock count at or below which an available product is flagged as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// MIME type assumed when the backend does not report one.
pub const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

/// A catalog item as returned by the products backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub id: ProductId,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub brand: String,
    pub price: Price,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(with = "release_date")]
    pub release_date: Option<NaiveDate>,
    pub product_available: bool,
    pub stock_quantity: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub image_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub image_type: String,
    #[serde(
        deserialize_with = "image_data::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_data: Option<String>,
}

/// Display classification of a product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InStock => "In Stock",
            Self::LowStock => "Low Stock",
            Self::OutOfStock => "Out of Stock",
        }
    }

    /// CSS modifier used by the templates.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::InStock => "in-stock",
            Self::LowStock => "low-stock",
            Self::OutOfStock => "out-of-stock",
        }
    }
}

impl Product {
    /// Classify stock for display.
    ///
    /// A product with no stock displays as out of stock even when its
    /// availability flag is set; the two fields are stored independently.
    #[must_use]
    pub const fn stock_status(&self) -> StockStatus {
        if !self.product_available || self.stock_quantity <= 0 {
            StockStatus::OutOfStock
        } else if self.stock_quantity <= LOW_STOCK_THRESHOLD {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    /// Whether the add-to-cart action is offered.
    #[must_use]
    pub const fn can_purchase(&self) -> bool {
        !matches!(self.stock_status(), StockStatus::OutOfStock)
    }

    /// MIME type of the stored image, falling back to JPEG.
    #[must_use]
    pub fn image_mime(&self) -> &str {
        if self.image_type.is_empty() {
            DEFAULT_IMAGE_TYPE
        } else {
            &self.image_type
        }
    }

    /// Data URI for the embedded image, if the backend sent one.
    #[must_use]
    pub fn embedded_image_uri(&self) -> Option<String> {
        self.image_data
            .as_deref()
            .filter(|data| !data.is_empty())
            .map(|data| format!("data:{};base64,{data}", self.image_mime()))
    }

    /// Bound a requested add-to-cart quantity to `1..=stock_quantity`.
    ///
    /// Always returns at least 1, even when stock is exhausted.
    #[must_use]
    pub fn clamp_quantity(&self, requested: u32) -> u32 {
        let stock = u32::try_from(self.stock_quantity).unwrap_or(0).max(1);
        requested.clamp(1, stock)
    }

    /// Snapshot this product as a cart line with the given quantity.
    #[must_use]
    pub fn to_cart_item(&self, quantity: u32, image: Option<String>) -> CartItem {
        CartItem {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            quantity: quantity.max(1),
            image,
        }
    }
}

/// Editable product fields sent as the JSON part of a create/update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProductId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    pub price: Price,
    #[serde(default)]
    pub category: String,
    #[serde(default, with = "release_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub product_available: bool,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl ProductInput {
    /// Blank form for a new product, released `today`.
    #[must_use]
    pub const fn new_default(today: NaiveDate) -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            brand: String::new(),
            price: Price::ZERO,
            category: String::new(),
            release_date: Some(today),
            product_available: true,
            stock_quantity: 0,
            image_name: None,
            image_type: None,
        }
    }

    /// Pre-fill from a stored product, keeping its image metadata so an
    /// update without a new upload does not lose it.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: Some(product.id),
            name: product.name.clone(),
            description: product.description.clone(),
            brand: product.brand.clone(),
            price: product.price,
            category: product.category.clone(),
            release_date: product.release_date,
            product_available: product.product_available,
            stock_quantity: product.stock_quantity,
            image_name: Some(product.image_name.clone()).filter(|s| !s.is_empty()),
            image_type: Some(product.image_type.clone()).filter(|s| !s.is_empty()),
        }
    }
}

/// A line in the shopping cart.
///
/// Name and price are snapshots taken when the product was first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartItem {
    /// Price multiplied by quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lenient release-date handling.
///
/// Accepts `2024-03-01`, `2024-03-01T00:00:00.000+00:00` or null; anything
/// unparseable is treated as unknown rather than failing the whole product.
mod release_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let head = raw.trim().get(..10)?;
        NaiveDate::parse_from_str(head, FORMAT).ok()
    }
}

/// Image bytes arrive either base64-encoded or as a JSON array of bytes.
mod image_data {
    use serde::{Deserialize, Deserializer};

    use super::{BASE64, Engine};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Encoded(String),
        Bytes(Vec<u8>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Encoded(s)) if !s.is_empty() => Some(s),
            Some(Raw::Bytes(bytes)) if !bytes.is_empty() => Some(BASE64.encode(bytes)),
            _ => None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(available: bool, stock: i32) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Laptop".to_string(),
            price: Price::from_cents(99_999),
            product_available: available,
            stock_quantity: stock,
            ..Product::default()
        }
    }

    #[test]
    fn test_deserialize_backend_payload() {
        let json = r#"{
            "id": 3,
            "name": "Headphones",
            "description": "Noise cancelling",
            "brand": "Acme",
            "price": 149.5,
            "category": "Audio",
            "releaseDate": "2024-02-10T00:00:00.000+00:00",
            "productAvailable": true,
            "stockQuantity": 12,
            "imageName": "hp.png",
            "imageType": "image/png",
            "imageData": null
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(product.price.display(), "$149.50");
        assert_eq!(
            product.release_date,
            NaiveDate::from_ymd_opt(2024, 2, 10)
        );
        assert!(product.image_data.is_none());
    }

    #[test]
    fn test_deserialize_missing_and_null_fields() {
        let product: Product =
            serde_json::from_str(r#"{"id": 9, "name": null, "releaseDate": "soon"}"#).unwrap();
        assert_eq!(product.name, "");
        assert_eq!(product.release_date, None);
        assert_eq!(product.price, Price::ZERO);
    }

    #[test]
    fn test_image_data_as_byte_array_is_base64_encoded() {
        let product: Product =
            serde_json::from_str(r#"{"id": 1, "imageData": [104, 105]}"#).unwrap();
        assert_eq!(product.image_data.as_deref(), Some("aGk="));
        assert_eq!(
            product.embedded_image_uri().as_deref(),
            Some("data:image/jpeg;base64,aGk=")
        );
    }

    #[test]
    fn test_embedded_image_uses_stored_mime() {
        let mut p = product(true, 3);
        p.image_type = "image/png".to_string();
        p.image_data = Some("AAAA".to_string());
        assert_eq!(
            p.embedded_image_uri().as_deref(),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[test]
    fn test_stock_status() {
        assert_eq!(product(true, 20).stock_status(), StockStatus::InStock);
        assert_eq!(product(true, 5).stock_status(), StockStatus::LowStock);
        assert_eq!(product(true, 0).stock_status(), StockStatus::OutOfStock);
        assert_eq!(product(true, -2).stock_status(), StockStatus::OutOfStock);
        assert_eq!(product(false, 50).stock_status(), StockStatus::OutOfStock);
        assert!(!product(true, 0).can_purchase());
    }

    #[test]
    fn test_clamp_quantity() {
        let p = product(true, 4);
        assert_eq!(p.clamp_quantity(0), 1);
        assert_eq!(p.clamp_quantity(3), 3);
        assert_eq!(p.clamp_quantity(10), 4);
        assert_eq!(product(true, 0).clamp_quantity(5), 1);
    }

    #[test]
    fn test_input_serializes_wire_shape() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let input = ProductInput::new_default(today);
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["releaseDate"], "2025-01-31");
        assert_eq!(value["productAvailable"], true);
        assert!(value.get("id").is_none());
        assert!(value.get("imageName").is_none());
    }

    #[test]
    fn test_input_from_product_keeps_image_metadata() {
        let mut p = product(true, 2);
        p.image_name = "laptop.jpg".to_string();
        p.image_type = "image/jpeg".to_string();
        let input = ProductInput::from_product(&p);
        assert_eq!(input.id, Some(ProductId::new(1)));
        assert_eq!(input.image_name.as_deref(), Some("laptop.jpg"));
        assert_eq!(input.image_type.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn test_cart_item_line_total() {
        let item = product(true, 9).to_cart_item(3, None);
        assert_eq!(item.line_total(), Price::from_cents(299_997));
    }
}
