//! Cart mutation arithmetic.
//!
//! A [`Cart`] is an ordered list of [`CartItem`]s keyed by product id. The
//! storefront persists it as a JSON array; this module only knows how to
//! change it.

use serde::{Deserialize, Serialize};

use crate::types::{CartItem, Price, ProductId};

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Decode a stored JSON array.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the text is not a JSON array of cart items.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Encode as a JSON array.
    ///
    /// # Errors
    ///
    /// Serialization of cart items cannot fail in practice; the error is
    /// surfaced rather than hidden.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.items)
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Look up a line by product id.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines, saturating at `u32::MAX`.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .map(|item| item.quantity)
            .fold(0, u32::saturating_add)
    }

    /// Sum of every line's price times quantity.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Add `quantity` units of a product.
    ///
    /// If the product is already in the cart its quantity grows and its
    /// stored name and price are left untouched; otherwise `snapshot` is
    /// appended. A quantity of zero adds one unit.
    pub fn add(&mut self, snapshot: CartItem, quantity: u32) {
        let quantity = quantity.max(1);
        if let Some(existing) = self.items.iter_mut().find(|item| item.id == snapshot.id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem {
                quantity,
                ..snapshot
            });
        }
    }

    /// Set a line's quantity.
    ///
    /// Quantities below one and unknown ids leave the cart unchanged.
    /// Returns whether anything changed.
    pub fn set_quantity(&mut self, id: ProductId, quantity: u32) -> bool {
        if quantity < 1 {
            return false;
        }
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) if item.quantity != quantity => {
                item.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    /// Remove a line. Returns whether it was present.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl From<Vec<CartItem>> for Cart {
    fn from(items: Vec<CartItem>) -> Self {
        Self { items }
    }
}
